//! Keyword-shaped coercion shared by records, partial records and inspected
//! invocations: validate the key set, coerce each present field, fill the
//! declared defaults.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use shapecast_model::{
    Callable, Descriptor, FieldDefault, KeyValue, PartialRecordDescriptor, RecordDescriptor,
    RecordValue, Signature, Value,
};

use crate::compile::{Coercion, Compiler, Cursor, PathSegment};
use crate::error::{CastError, ConfigError, Mismatch};

struct ShapeField {
    coercion: Coercion,
    default: Option<FieldDefault>,
}

/// Field coercions plus the key-set rule `required ⊆ keys ⊆ fields`.
pub(crate) struct KwargsShape {
    label: String,
    fields: IndexMap<String, ShapeField>,
    required: BTreeSet<String>,
}

impl KwargsShape {
    fn for_record(compiler: &Compiler<'_>, spec: &RecordDescriptor) -> Result<Self, CastError> {
        let mut fields = IndexMap::new();
        for field in spec.fields() {
            fields.insert(
                field.name.clone(),
                ShapeField {
                    coercion: compiler.compile(&field.ty)?,
                    default: field.default.clone(),
                },
            );
        }
        Ok(Self {
            label: spec.name().to_string(),
            fields,
            required: spec.required().clone(),
        })
    }

    fn for_partial(
        compiler: &Compiler<'_>,
        spec: &PartialRecordDescriptor,
    ) -> Result<Self, CastError> {
        let mut fields = IndexMap::new();
        for (name, ty) in spec.fields() {
            fields.insert(
                name.to_string(),
                ShapeField {
                    coercion: compiler.compile(ty)?,
                    default: None,
                },
            );
        }
        let required = if spec.is_total() {
            fields.keys().cloned().collect()
        } else {
            BTreeSet::new()
        };
        Ok(Self {
            label: spec.name().to_string(),
            fields,
            required,
        })
    }

    /// One field per declared parameter. Every parameter must carry a type.
    pub(crate) fn for_signature(
        compiler: &Compiler<'_>,
        callable: &Callable,
    ) -> Result<Self, CastError> {
        let Some(signature) = callable.signature() else {
            return Err(ConfigError::MissingSignature {
                callable: callable.name().to_string(),
            }
            .into());
        };
        let mut fields = IndexMap::new();
        let mut required = BTreeSet::new();
        for param in signature.params() {
            let Some(ty) = &param.ty else {
                return Err(untyped(callable, signature, &param.name));
            };
            if param.default.is_none() {
                required.insert(param.name.clone());
            }
            fields.insert(
                param.name.clone(),
                ShapeField {
                    coercion: compiler.compile(ty)?,
                    default: param.default.clone().map(FieldDefault::Value),
                },
            );
        }
        Ok(Self {
            label: format!("{}{}", callable.name(), signature),
            fields,
            required,
        })
    }

    /// Returns the coerced fields in declaration order, defaults included.
    pub(crate) fn cast(
        &self,
        value: &Value,
        cursor: &mut Cursor,
    ) -> Result<IndexMap<String, Value>, CastError> {
        let Value::Map(entries) = value else {
            return Err(cursor.mismatch(value, &self.label, Mismatch::WrongKind));
        };

        let mut present = BTreeSet::new();
        let mut unknown = Vec::new();
        for key in entries.keys() {
            match key {
                KeyValue::Text(name) if self.fields.contains_key(name) => {
                    present.insert(name.as_str());
                }
                other => unknown.push(other.to_string()),
            }
        }
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|name| !present.contains(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() || !unknown.is_empty() {
            return Err(cursor.mismatch(value, &self.label, Mismatch::KeySet { missing, unknown }));
        }

        let mut out = IndexMap::with_capacity(self.fields.len());
        for (name, field) in &self.fields {
            match entries.get(&KeyValue::Text(name.clone())) {
                Some(raw) => {
                    let coerced = field
                        .coercion
                        .run_at(PathSegment::Field(name.clone()), raw, cursor)?;
                    out.insert(name.clone(), coerced);
                }
                None => {
                    if let Some(default) = &field.default {
                        out.insert(name.clone(), default.produce());
                    }
                }
            }
        }
        Ok(out)
    }
}

fn untyped(callable: &Callable, signature: &Signature, param: &str) -> CastError {
    ConfigError::UntypedParameter {
        callable: callable.name().to_string(),
        param: param.to_string(),
        signature: signature.to_string(),
    }
    .into()
}

pub(crate) fn compile_record(
    compiler: &Compiler<'_>,
    descriptor: &Descriptor,
    spec: &RecordDescriptor,
) -> Result<Coercion, CastError> {
    let shape = KwargsShape::for_record(compiler, spec)?;
    let name = spec.name().to_string();
    let constructor = spec.constructor().cloned();
    Ok(compiler.coercion(descriptor, move |value, cursor| {
        let fields = shape.cast(value, cursor)?;
        match &constructor {
            Some(constructor) => constructor
                .call(Vec::new(), fields)
                .map_err(CastError::from_host),
            None => Ok(Value::record(RecordValue {
                name: name.clone(),
                fields,
            })),
        }
    }))
}

pub(crate) fn compile_partial(
    compiler: &Compiler<'_>,
    descriptor: &Descriptor,
    spec: &PartialRecordDescriptor,
) -> Result<Coercion, CastError> {
    let shape = KwargsShape::for_partial(compiler, spec)?;
    let name = spec.name().to_string();
    Ok(compiler.coercion(descriptor, move |value, cursor| {
        let fields = shape.cast(value, cursor)?;
        Ok(Value::record(RecordValue {
            name: name.clone(),
            fields,
        }))
    }))
}
