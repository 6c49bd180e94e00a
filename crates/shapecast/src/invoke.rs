//! Constructing objects from data: resolve a callable named in an envelope
//! map, coerce its arguments and call it.

use indexmap::IndexMap;
use shapecast_model::{Callable, Descriptor, DescriptorKind, KeyValue, Value};

use crate::compile::{Coercion, Compiler, Cursor, PathSegment};
use crate::config::EnvelopeKeys;
use crate::context::CastContext;
use crate::error::{CastError, ConfigError, Mismatch};
use crate::record::KwargsShape;

fn compile_path(compiler: &Compiler<'_>, path: &Descriptor) -> Result<Coercion, CastError> {
    match path.kind() {
        DescriptorKind::SymbolPath(_) => compiler.compile(path),
        _ => Err(ConfigError::InvocationPath {
            descriptor: path.to_string(),
        }
        .into()),
    }
}

/// The part both invocation forms share: the envelope must be a map carrying
/// the callable key, and that key must name a callable.
#[derive(Clone)]
struct Target {
    path: Coercion,
    keys: EnvelopeKeys,
    expected: Descriptor,
}

impl Target {
    fn resolve<'v>(
        &self,
        value: &'v Value,
        cursor: &mut Cursor,
    ) -> Result<(&'v IndexMap<KeyValue, Value>, Callable), CastError> {
        let Value::Map(envelope) = value else {
            return Err(cursor.mismatch(value, &self.expected, Mismatch::WrongKind));
        };
        let Some(reference) = envelope.get(&KeyValue::text(self.keys.callable.as_str())) else {
            return Err(cursor.mismatch(
                value,
                &self.expected,
                Mismatch::MissingCallableKey {
                    key: self.keys.callable.clone(),
                },
            ));
        };
        let segment = PathSegment::Field(self.keys.callable.clone());
        match self.path.run_at(segment.clone(), reference, cursor)? {
            Value::Callable(callable) => Ok((envelope.as_ref(), callable)),
            _ => Err(cursor.scoped(segment, |cursor| {
                cursor.mismatch(reference, &self.expected, Mismatch::NotCallable)
            })),
        }
    }
}

pub(crate) fn compile_invocation(
    compiler: &Compiler<'_>,
    descriptor: &Descriptor,
    path: &Descriptor,
    args: &Descriptor,
    kwargs: &Descriptor,
) -> Result<Coercion, CastError> {
    let target = Target {
        path: compile_path(compiler, path)?,
        keys: compiler.context().config().envelope.clone(),
        expected: descriptor.clone(),
    };
    let args = compiler.compile(args)?;
    let kwargs = compiler.compile(kwargs)?;
    Ok(compiler.coercion(descriptor, move |value, cursor| {
        let (envelope, callable) = target.resolve(value, cursor)?;
        let keys = &target.keys;

        let raw_args = envelope
            .get(&KeyValue::text(keys.args.as_str()))
            .cloned()
            .unwrap_or_else(|| Value::list([]));
        let coerced_args = args.run_at(PathSegment::Field(keys.args.clone()), &raw_args, cursor)?;
        let positional = into_positional(&args, coerced_args)?;

        let raw_kwargs = envelope
            .get(&KeyValue::text(keys.kwargs.as_str()))
            .cloned()
            .unwrap_or_else(Value::empty_map);
        let coerced_kwargs =
            kwargs.run_at(PathSegment::Field(keys.kwargs.clone()), &raw_kwargs, cursor)?;
        let mut keyword = into_keyword(&kwargs, coerced_kwargs)?;

        fill_signature_defaults(&callable, positional.len(), &mut keyword);
        callable
            .call(positional, keyword)
            .map_err(CastError::from_host)
    }))
}

pub(crate) fn compile_inspected(
    compiler: &Compiler<'_>,
    descriptor: &Descriptor,
    path: &Descriptor,
) -> Result<Coercion, CastError> {
    let target = Target {
        path: compile_path(compiler, path)?,
        keys: compiler.context().config().envelope.clone(),
        expected: descriptor.clone(),
    };
    // The parameter shape is only known once the callable is resolved.
    let ctx: CastContext = compiler.context().clone();
    Ok(compiler.coercion(descriptor, move |value, cursor| {
        let (envelope, callable) = target.resolve(value, cursor)?;
        let shape = KwargsShape::for_signature(&Compiler::new(&ctx), &callable)?;
        let raw_kwargs = envelope
            .get(&KeyValue::text(target.keys.kwargs.as_str()))
            .cloned()
            .unwrap_or_else(Value::empty_map);
        let keyword = cursor.scoped(PathSegment::Field(target.keys.kwargs.clone()), |cursor| {
            shape.cast(&raw_kwargs, cursor)
        })?;
        callable
            .call(Vec::new(), keyword)
            .map_err(CastError::from_host)
    }))
}

fn into_positional(args: &Coercion, coerced: Value) -> Result<Vec<Value>, CastError> {
    match coerced {
        Value::List(items) => Ok(items.as_ref().clone()),
        Value::Tuple(items) => Ok(items),
        Value::Queue(items) => Ok(items.iter().cloned().collect()),
        other => Err(ConfigError::ArgsNotSequence {
            descriptor: args.descriptor().to_string(),
            found: other.kind_name().to_string(),
        }
        .into()),
    }
}

fn into_keyword(kwargs: &Coercion, coerced: Value) -> Result<IndexMap<String, Value>, CastError> {
    let not_mapping = |found: &Value| -> CastError {
        ConfigError::KwargsNotMapping {
            descriptor: kwargs.descriptor().to_string(),
            found: found.kind_name().to_string(),
        }
        .into()
    };
    match &coerced {
        Value::Map(entries) => entries
            .iter()
            .map(|(key, value)| match key {
                KeyValue::Text(name) => Ok((name.clone(), value.clone())),
                _ => Err(not_mapping(&coerced)),
            })
            .collect(),
        Value::Record(record) => Ok(record.fields.clone()),
        other => Err(not_mapping(other)),
    }
}

/// Declared defaults for parameters covered neither positionally nor by
/// keyword.
fn fill_signature_defaults(
    callable: &Callable,
    positional: usize,
    keyword: &mut IndexMap<String, Value>,
) {
    let Some(signature) = callable.signature() else {
        return;
    };
    for param in signature.params().iter().skip(positional) {
        if let Some(default) = &param.default {
            if !keyword.contains_key(&param.name) {
                keyword.insert(param.name.clone(), default.clone());
            }
        }
    }
}
