use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use num_complex::Complex64;
use rust_decimal::Decimal;

use crate::callable::Callable;
use crate::key::KeyValue;
use crate::namespace::Namespace;

/// An untyped or coerced value.
///
/// Decoded input (JSON, overrides) only ever uses the scalar variants plus
/// `List` and `Map`. The remaining variants are produced by coercion
/// (`Tuple`, `Set`, `Queue`, `Record`, `Decimal`) or by the host
/// (`Callable`, `Namespace`, `Object`).
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex64),
    Decimal(Decimal),
    Text(String),
    Bytes(Arc<Vec<u8>>),
    List(Arc<Vec<Value>>),
    Tuple(Vec<Value>),
    Set(Arc<BTreeSet<KeyValue>>),
    Queue(Arc<im::Vector<Value>>),
    Map(Arc<IndexMap<KeyValue, Value>>),
    Record(Arc<RecordValue>),
    Callable(Callable),
    Namespace(Arc<Namespace>),
    Object(ObjectValue),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    pub fn queue(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Queue(Arc::new(items.into_iter().collect()))
    }

    pub fn set(items: impl IntoIterator<Item = KeyValue>) -> Self {
        Value::Set(Arc::new(items.into_iter().collect()))
    }

    /// Builds a map keyed by text, the shape decoded JSON objects take.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Arc::new(
            entries
                .into_iter()
                .map(|(key, value)| (KeyValue::Text(key.into()), value))
                .collect(),
        ))
    }

    pub fn empty_map() -> Self {
        Value::Map(Arc::new(IndexMap::new()))
    }

    pub fn record(record: RecordValue) -> Self {
        Value::Record(Arc::new(record))
    }

    /// Short kind label used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Complex(_) => "Complex",
            Value::Decimal(_) => "Decimal",
            Value::Text(_) => "Text",
            Value::Bytes(_) => "Bytes",
            Value::List(_) => "List",
            Value::Tuple(_) => "Tuple",
            Value::Set(_) => "Set",
            Value::Queue(_) => "Queue",
            Value::Map(_) => "Map",
            Value::Record(_) => "Record",
            Value::Callable(_) => "Callable",
            Value::Namespace(_) => "Namespace",
            Value::Object(_) => "Object",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Looks up a text key on a `Map` value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(&KeyValue::Text(key.to_string())),
            _ => None,
        }
    }
}

/// A constructed record: the result of coercing into a record or partial
/// record descriptor. Fields keep the descriptor's declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordValue {
    pub name: String,
    pub fields: IndexMap<String, Value>,
}

impl RecordValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// An opaque host object, typically what a registered constructor returns.
#[derive(Clone)]
pub struct ObjectValue {
    type_name: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ObjectValue {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Complex(a), Value::Complex(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Queue(a), Value::Queue(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same(b),
            (Value::Namespace(a), Value::Namespace(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(&a.inner, &b.inner),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Complex(v) => f.debug_tuple("Complex").field(v).finish(),
            Value::Decimal(v) => f.debug_tuple("Decimal").field(v).finish(),
            Value::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Value::Bytes(v) => f.debug_tuple("Bytes").field(v).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Tuple(v) => f.debug_tuple("Tuple").field(v).finish(),
            Value::Set(v) => f.debug_tuple("Set").field(v).finish(),
            Value::Queue(v) => f.debug_tuple("Queue").field(v).finish(),
            Value::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Value::Record(v) => f
                .debug_struct("Record")
                .field("name", &v.name)
                .field("fields", &v.fields)
                .finish(),
            Value::Callable(v) => write!(f, "Callable({})", v.name()),
            Value::Namespace(v) => write!(f, "Namespace({})", v.name()),
            Value::Object(v) => write!(f, "Object({})", v.type_name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Complex(v) => write!(f, "({}{:+}j)", v.re, v.im),
            Value::Decimal(v) => write!(f, "Decimal({v})"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Bytes(v) => write!(f, "b\"{}\"", v.escape_ascii()),
            Value::List(items) => write_seq(f, "[", items.iter(), "]"),
            Value::Tuple(items) => {
                if items.len() == 1 {
                    write!(f, "({},)", items[0])
                } else {
                    write_seq(f, "(", items.iter(), ")")
                }
            }
            Value::Set(items) => write_seq(f, "{", items.iter(), "}"),
            Value::Queue(items) => write_seq(f, "queue[", items.iter(), "]"),
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Record(record) => {
                write!(f, "{}(", record.name)?;
                for (idx, (name, value)) in record.fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                write!(f, ")")
            }
            Value::Callable(callable) => write!(f, "<callable {}>", callable.name()),
            Value::Namespace(namespace) => write!(f, "<namespace {}>", namespace.name()),
            Value::Object(object) => write!(f, "<{} object>", object.type_name),
        }
    }
}

fn write_seq<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = T>,
    close: &str,
) -> fmt::Result {
    write!(f, "{open}")?;
    for (idx, item) in items.enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

/// Renders a value the way diagnostics print it.
pub fn format_value(value: &Value) -> String {
    value.to_string()
}
