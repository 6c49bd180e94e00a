use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use num_complex::Complex64;
use rust_decimal::Decimal;

use crate::value::{RecordValue, Value};

/// Hashable, totally ordered projection of a [`Value`], used for set
/// elements and map keys. Floats are keyed by their bit pattern.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(u64),
    Complex(u64, u64),
    Decimal(Decimal),
    Text(String),
    Bytes(Arc<Vec<u8>>),
    Tuple(Vec<KeyValue>),
    Record(String, Vec<(String, KeyValue)>),
}

impl KeyValue {
    pub fn text(text: impl Into<String>) -> Self {
        KeyValue::Text(text.into())
    }

    /// Returns `None` for values that have no stable identity as a key:
    /// mutable containers, callables, namespaces and host objects.
    pub fn try_from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => Some(KeyValue::None),
            Value::Bool(value) => Some(KeyValue::Bool(*value)),
            Value::Int(value) => Some(KeyValue::Int(*value)),
            Value::Float(value) => Some(KeyValue::Float(value.to_bits())),
            Value::Complex(value) => {
                Some(KeyValue::Complex(value.re.to_bits(), value.im.to_bits()))
            }
            Value::Decimal(value) => Some(KeyValue::Decimal(*value)),
            Value::Text(value) => Some(KeyValue::Text(value.clone())),
            Value::Bytes(value) => Some(KeyValue::Bytes(value.clone())),
            Value::Tuple(items) => items
                .iter()
                .map(KeyValue::try_from_value)
                .collect::<Option<Vec<_>>>()
                .map(KeyValue::Tuple),
            Value::Record(record) => {
                let fields = record
                    .fields
                    .iter()
                    .map(|(name, value)| {
                        KeyValue::try_from_value(value).map(|key| (name.clone(), key))
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(KeyValue::Record(record.name.clone(), fields))
            }
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            KeyValue::None => Value::None,
            KeyValue::Bool(value) => Value::Bool(*value),
            KeyValue::Int(value) => Value::Int(*value),
            KeyValue::Float(bits) => Value::Float(f64::from_bits(*bits)),
            KeyValue::Complex(re, im) => {
                Value::Complex(Complex64::new(f64::from_bits(*re), f64::from_bits(*im)))
            }
            KeyValue::Decimal(value) => Value::Decimal(*value),
            KeyValue::Text(value) => Value::Text(value.clone()),
            KeyValue::Bytes(value) => Value::Bytes(value.clone()),
            KeyValue::Tuple(items) => Value::Tuple(items.iter().map(KeyValue::to_value).collect()),
            KeyValue::Record(name, fields) => {
                let fields: IndexMap<String, Value> = fields
                    .iter()
                    .map(|(field, key)| (field.clone(), key.to_value()))
                    .collect();
                Value::record(RecordValue {
                    name: name.clone(),
                    fields,
                })
            }
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_value(), f)
    }
}
