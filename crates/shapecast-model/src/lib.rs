#![deny(clippy::unwrap_used)]

//! Data model shared by callers of the coercion engine: untyped values, the
//! closed set of type descriptors, and the callables/namespaces that symbol
//! descriptors resolve against.
//!
//! Nothing in this crate coerces anything. It only describes shapes and
//! holds values; `shapecast` does the work.

mod callable;
mod descriptor;
mod json;
mod key;
mod namespace;
mod value;

pub use callable::{Callable, CallableFunc, HostError, Param, Signature};
pub use descriptor::{
    Candidates, Descriptor, DescriptorId, DescriptorKind, FieldDefault, FieldSpec,
    PartialRecordBuilder, PartialRecordDescriptor, PrimitiveKind, RecordBuilder,
    RecordDescriptor, SymbolPathDescriptor,
};
pub use key::KeyValue;
pub use namespace::{Namespace, NamespaceRegistry};
pub use value::{ObjectValue, RecordValue, Value, format_value};

pub use indexmap::IndexMap;
pub use num_complex::Complex64;
pub use rust_decimal::Decimal;
