#![deny(clippy::unwrap_used)]

//! Type-directed coercion of untyped values.
//!
//! A [`Descriptor`] declares a shape; [`compile`] turns it into a
//! [`Coercion`] that validates and converts untyped input (decoded JSON,
//! nested maps and lists) into that shape, or reports where and why it does
//! not fit. Symbol and invocation descriptors additionally resolve dotted
//! paths against a caller-supplied [`NamespaceRegistry`] and call what they
//! find.
//!
//! ```
//! use shapecast::{Descriptor, Value, cast};
//!
//! let pair = Descriptor::tuple_of([Descriptor::int(), Descriptor::text()]);
//! let value = Value::list([Value::Int(1), Value::text("two")]);
//! assert_eq!(
//!     cast(&pair, &value).ok(),
//!     Some(Value::Tuple(vec![Value::Int(1), Value::text("two")]))
//! );
//! ```

mod caster;
mod compile;
mod config;
mod context;
mod error;
mod invoke;
mod overrides;
mod record;
mod resolve;

pub use caster::Caster;
pub use compile::{Coercion, compile};
pub use config::{
    CastConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_DESCRIPTOR_DEPTH, EnvelopeKeys, Limits,
};
pub use context::{CastContext, Converter, ImplicitConversions};
pub use error::{CastError, CoercionError, ConfigError, LookupError, Mismatch};
pub use overrides::{Override, OverrideError, apply_overrides, parse_override};

pub use shapecast_model::{
    Callable, Candidates, Complex64, Decimal, Descriptor, DescriptorId, DescriptorKind,
    FieldDefault, FieldSpec, HostError, IndexMap, KeyValue, Namespace, NamespaceRegistry,
    ObjectValue, Param, PartialRecordDescriptor, PrimitiveKind, RecordDescriptor, RecordValue,
    Signature, SymbolPathDescriptor, Value, format_value,
};

/// Casts with no implicit conversions, no namespaces and the default
/// configuration.
pub fn cast(descriptor: &Descriptor, value: &Value) -> Result<Value, CastError> {
    cast_with(descriptor, value, &CastContext::default())
}

pub fn cast_with(
    descriptor: &Descriptor,
    value: &Value,
    ctx: &CastContext,
) -> Result<Value, CastError> {
    compile(descriptor, ctx)?.apply(value)
}
