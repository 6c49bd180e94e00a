//! `a.b.c=<literal>` assignments into nested maps, used to patch decoded
//! input before it is cast.
//!
//! The right-hand side is a JSON document, or exactly one of the bare
//! words `True`, `False` and `None`. The bare words are not recognized
//! inside JSON arrays or objects, and single-quoted strings are not
//! accepted: write `a=[true, null]` and `a="x"` instead.

use std::sync::Arc;

use shapecast_model::{KeyValue, Value};

#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("override `{text}` has no `=`")]
    MissingAssignment { text: String },
    #[error("override `{text}` has an empty key segment")]
    EmptyKey { text: String },
    #[error("override `{text}` does not hold a literal: {source}")]
    Literal {
        text: String,
        source: serde_json::Error,
    },
    #[error("cannot assign through `{path}`, it is not a map")]
    NotAMap { path: String },
}

/// One parsed assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct Override {
    pub keys: Vec<String>,
    pub value: Value,
}

impl Override {
    /// Assigns into `target`, creating intermediate maps as needed.
    pub fn apply(&self, target: &mut Value) -> Result<(), OverrideError> {
        let mut walked = String::from("$");
        insert_path(target, &self.keys, self.value.clone(), &mut walked)
    }
}

/// Splits on the first `=`. The right-hand side is JSON, or one of the
/// bare words `True`, `False` and `None` standing alone.
pub fn parse_override(text: &str) -> Result<Override, OverrideError> {
    let Some((lhs, rhs)) = text.split_once('=') else {
        return Err(OverrideError::MissingAssignment {
            text: text.to_string(),
        });
    };
    let keys: Vec<String> = lhs.trim().split('.').map(str::to_string).collect();
    if keys.iter().any(String::is_empty) {
        return Err(OverrideError::EmptyKey {
            text: text.to_string(),
        });
    }
    let value = match rhs.trim() {
        "True" => Value::Bool(true),
        "False" => Value::Bool(false),
        "None" => Value::None,
        literal => Value::from_json_str(literal).map_err(|source| OverrideError::Literal {
            text: text.to_string(),
            source,
        })?,
    };
    Ok(Override { keys, value })
}

/// Parses every override first, then applies them in order. Later
/// assignments win.
pub fn apply_overrides<S: AsRef<str>>(
    target: &mut Value,
    overrides: impl IntoIterator<Item = S>,
) -> Result<(), OverrideError> {
    let parsed = overrides
        .into_iter()
        .map(|text| parse_override(text.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    for item in &parsed {
        item.apply(target)?;
    }
    Ok(())
}

fn insert_path(
    target: &mut Value,
    keys: &[String],
    value: Value,
    walked: &mut String,
) -> Result<(), OverrideError> {
    let Value::Map(entries) = target else {
        return Err(OverrideError::NotAMap {
            path: walked.clone(),
        });
    };
    let entries = Arc::make_mut(entries);
    match keys {
        [] => Ok(()),
        [last] => {
            entries.insert(KeyValue::text(last.as_str()), value);
            Ok(())
        }
        [first, rest @ ..] => {
            let child = entries
                .entry(KeyValue::text(first.as_str()))
                .or_insert_with(Value::empty_map);
            walked.push('.');
            walked.push_str(first);
            insert_path(child, rest, value, walked)
        }
    }
}
