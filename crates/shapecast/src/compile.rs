use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use shapecast_model::{Descriptor, DescriptorKind, KeyValue, PrimitiveKind, Value};
use tracing::{debug, trace};

use crate::context::CastContext;
use crate::error::{CastError, CoercionError, ConfigError, Mismatch};
use crate::{invoke, record, resolve};

type CoerceFn = dyn Fn(&Value, &mut Cursor) -> Result<Value, CastError> + Send + Sync;

/// A compiled coercion function for one descriptor.
///
/// Kind dispatch happened when this was built; applying it only walks the
/// prepared closures. Cloning is cheap and the result can be shared across
/// threads.
#[derive(Clone)]
pub struct Coercion {
    descriptor: Descriptor,
    func: Arc<CoerceFn>,
    max_depth: usize,
}

impl Coercion {
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn apply(&self, value: &Value) -> Result<Value, CastError> {
        let mut cursor = Cursor::new(self.max_depth);
        self.run(value, &mut cursor)
    }

    pub(crate) fn run(&self, value: &Value, cursor: &mut Cursor) -> Result<Value, CastError> {
        (self.func)(value, cursor)
    }

    /// Runs one level deeper, under `segment`.
    pub(crate) fn run_at(
        &self,
        segment: PathSegment,
        value: &Value,
        cursor: &mut Cursor,
    ) -> Result<Value, CastError> {
        cursor.path.push(segment);
        let result = if cursor.path.len() > cursor.max_depth {
            Err(cursor.mismatch(
                value,
                &self.descriptor,
                Mismatch::DepthExceeded {
                    limit: cursor.max_depth,
                },
            ))
        } else {
            self.run(value, cursor)
        };
        cursor.path.pop();
        result
    }
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercion")
            .field("descriptor", &self.descriptor)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Position inside the value being coerced, for diagnostics and the depth
/// limit.
#[derive(Debug)]
pub(crate) struct Cursor {
    path: Vec<PathSegment>,
    max_depth: usize,
}

impl Cursor {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            path: Vec::new(),
            max_depth,
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            match segment {
                PathSegment::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                PathSegment::Index(idx) => out.push_str(&format!("[{idx}]")),
                PathSegment::Key(key) => out.push_str(&format!("[{key}]")),
            }
        }
        out
    }

    /// Runs `f` with `segment` appended to the path.
    pub(crate) fn scoped<T>(
        &mut self,
        segment: PathSegment,
        f: impl FnOnce(&mut Cursor) -> T,
    ) -> T {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    pub(crate) fn mismatch(
        &self,
        value: &Value,
        expected: &dyn fmt::Display,
        reason: Mismatch,
    ) -> CastError {
        CastError::from(CoercionError {
            path: self.render(),
            value: value.clone(),
            expected: expected.to_string(),
            reason,
        })
    }
}

/// Compiles `descriptor` against the conversions and namespaces in `ctx`.
pub fn compile(descriptor: &Descriptor, ctx: &CastContext) -> Result<Coercion, CastError> {
    debug!(descriptor = %descriptor, "compiling coercion");
    Compiler::new(ctx).compile(descriptor)
}

/// Builds coercions for one descriptor tree. Nesting is counted per
/// descriptor level and capped at `limits.max_descriptor_depth`.
pub(crate) struct Compiler<'a> {
    ctx: &'a CastContext,
    depth: Cell<usize>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(ctx: &'a CastContext) -> Self {
        Self {
            ctx,
            depth: Cell::new(0),
        }
    }

    pub(crate) fn context(&self) -> &'a CastContext {
        self.ctx
    }

    pub(crate) fn coercion(
        &self,
        descriptor: &Descriptor,
        func: impl Fn(&Value, &mut Cursor) -> Result<Value, CastError> + Send + Sync + 'static,
    ) -> Coercion {
        Coercion {
            descriptor: descriptor.clone(),
            func: Arc::new(func),
            max_depth: self.ctx.config().limits.max_depth,
        }
    }

    pub(crate) fn compile(&self, descriptor: &Descriptor) -> Result<Coercion, CastError> {
        let limit = self.ctx.config().limits.max_descriptor_depth;
        let depth = self.depth.get() + 1;
        if depth > limit {
            return Err(ConfigError::DescriptorTooDeep { limit }.into());
        }
        self.depth.set(depth);
        let result = self.compile_kind(descriptor);
        self.depth.set(depth - 1);
        result
    }

    fn compile_kind(&self, descriptor: &Descriptor) -> Result<Coercion, CastError> {
        if let Some(converter) = self.ctx.conversions().get(descriptor) {
            let converter = converter.clone();
            return Ok(self.coercion(descriptor, move |value, _| converter(value)));
        }

        let expected = descriptor.clone();
        let coercion = match descriptor.kind() {
            DescriptorKind::Any => self.coercion(descriptor, |value, _| Ok(value.clone())),
            DescriptorKind::Primitive(kind) => {
                let kind = *kind;
                self.coercion(descriptor, move |value, cursor| {
                    if admits(kind, value) {
                        Ok(value.clone())
                    } else {
                        Err(cursor.mismatch(value, &expected, Mismatch::WrongKind))
                    }
                })
            }
            DescriptorKind::Float => self.coercion(descriptor, move |value, cursor| match value {
                Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(value.clone()),
                _ => Err(cursor.mismatch(value, &expected, Mismatch::WrongKind)),
            }),
            DescriptorKind::Complex => {
                self.coercion(descriptor, move |value, cursor| match value {
                    Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Complex(_) => {
                        Ok(value.clone())
                    }
                    _ => Err(cursor.mismatch(value, &expected, Mismatch::WrongKind)),
                })
            }
            DescriptorKind::Decimal => self.coercion(descriptor, move |value, cursor| {
                to_decimal(value, cursor, &expected)
            }),
            DescriptorKind::Literal(allowed) => {
                let allowed = allowed.clone();
                self.coercion(descriptor, move |value, cursor| {
                    if allowed.contains(value) {
                        Ok(value.clone())
                    } else {
                        Err(cursor.mismatch(value, &expected, Mismatch::NotInLiteral))
                    }
                })
            }
            DescriptorKind::Record(spec) => record::compile_record(self, descriptor, spec)?,
            DescriptorKind::PartialRecord(spec) => {
                record::compile_partial(self, descriptor, spec)?
            }
            DescriptorKind::ListOf(elem) => {
                let elem = self.compile(elem)?;
                self.coercion(descriptor, move |value, cursor| {
                    let items = coerce_elements(&elem, value, cursor, &expected)?;
                    Ok(Value::List(Arc::new(items)))
                })
            }
            DescriptorKind::QueueOf(elem) => {
                let elem = self.compile(elem)?;
                self.coercion(descriptor, move |value, cursor| {
                    let items = coerce_elements(&elem, value, cursor, &expected)?;
                    Ok(Value::Queue(Arc::new(items.into_iter().collect())))
                })
            }
            DescriptorKind::SetOf(elem) => {
                let elem = self.compile(elem)?;
                self.coercion(descriptor, move |value, cursor| {
                    let items = coerce_elements(&elem, value, cursor, &expected)?;
                    let mut set = std::collections::BTreeSet::new();
                    for (idx, item) in items.into_iter().enumerate() {
                        let Some(key) = KeyValue::try_from_value(&item) else {
                            return Err(cursor.scoped(PathSegment::Index(idx), |cursor| {
                                cursor.mismatch(&item, elem.descriptor(), Mismatch::Unhashable)
                            }));
                        };
                        set.insert(key);
                    }
                    Ok(Value::Set(Arc::new(set)))
                })
            }
            DescriptorKind::MapOf(key, val) => {
                let key = self.compile(key)?;
                let val = self.compile(val)?;
                self.coercion(descriptor, move |value, cursor| {
                    let Value::Map(entries) = value else {
                        return Err(cursor.mismatch(value, &expected, Mismatch::WrongKind));
                    };
                    let mut out = IndexMap::with_capacity(entries.len());
                    for (raw_key, raw_value) in entries.iter() {
                        let segment = PathSegment::Key(raw_key.to_string());
                        let coerced_key =
                            key.run_at(segment.clone(), &raw_key.to_value(), cursor)?;
                        let Some(coerced_key) = KeyValue::try_from_value(&coerced_key) else {
                            return Err(cursor.scoped(segment, |cursor| {
                                let expected = key.descriptor();
                                cursor.mismatch(&coerced_key, expected, Mismatch::Unhashable)
                            }));
                        };
                        let coerced_value = val.run_at(segment, raw_value, cursor)?;
                        out.insert(coerced_key, coerced_value);
                    }
                    Ok(Value::Map(Arc::new(out)))
                })
            }
            DescriptorKind::TupleOf(elems) => {
                let elems = elems
                    .iter()
                    .map(|elem| self.compile(elem))
                    .collect::<Result<Vec<_>, _>>()?;
                self.coercion(descriptor, move |value, cursor| {
                    let items: &[Value] = match value {
                        Value::List(items) => items.as_slice(),
                        Value::Tuple(items) => items.as_slice(),
                        Value::Queue(items) => {
                            let items: Vec<Value> = items.iter().cloned().collect();
                            return coerce_tuple(&elems, &items, value, cursor, &expected);
                        }
                        _ => return Err(cursor.mismatch(value, &expected, Mismatch::WrongKind)),
                    };
                    coerce_tuple(&elems, items, value, cursor, &expected)
                })
            }
            DescriptorKind::UnionOf(alts) => {
                if alts.is_empty() {
                    return Err(ConfigError::EmptyUnion {
                        descriptor: descriptor.to_string(),
                    }
                    .into());
                }
                let alts = alts
                    .iter()
                    .map(|alt| self.compile(alt))
                    .collect::<Result<Vec<_>, _>>()?;
                self.coercion(descriptor, move |value, cursor| {
                    for alt in &alts {
                        match alt.run(value, cursor) {
                            Ok(coerced) => return Ok(coerced),
                            Err(CastError::Coercion(err)) => {
                                trace!(
                                    alternative = %alt.descriptor(),
                                    error = %err,
                                    "union alternative rejected"
                                );
                            }
                            Err(err) => return Err(err),
                        }
                    }
                    Err(cursor.mismatch(
                        value,
                        &expected,
                        Mismatch::UnionExhausted {
                            alternatives: alts.len(),
                        },
                    ))
                })
            }
            DescriptorKind::SymbolPath(spec) => {
                resolve::compile_symbol_path(self, descriptor, spec)
            }
            DescriptorKind::Invocation { path, args, kwargs } => {
                invoke::compile_invocation(self, descriptor, path, args, kwargs)?
            }
            DescriptorKind::InspectedInvocation { path } => {
                invoke::compile_inspected(self, descriptor, path)?
            }
            _ => {
                return Err(ConfigError::Unsupported {
                    descriptor: descriptor.to_string(),
                }
                .into());
            }
        };
        Ok(coercion)
    }
}

/// `Bool` counts as an `Int`, nothing else crosses kinds.
fn admits(kind: PrimitiveKind, value: &Value) -> bool {
    matches!(
        (kind, value),
        (PrimitiveKind::None, Value::None)
            | (PrimitiveKind::Bool, Value::Bool(_))
            | (PrimitiveKind::Int, Value::Int(_) | Value::Bool(_))
            | (PrimitiveKind::Text, Value::Text(_))
            | (PrimitiveKind::Bytes, Value::Bytes(_))
    )
}

fn to_decimal(value: &Value, cursor: &Cursor, expected: &Descriptor) -> Result<Value, CastError> {
    let decimal = match value {
        Value::Text(text) => {
            let text = text.trim();
            Decimal::from_str_exact(text)
                .or_else(|_| Decimal::from_str(text))
                .or_else(|_| Decimal::from_scientific(text))
                .ok()
        }
        Value::Int(int) => Some(Decimal::from(*int)),
        Value::Bool(flag) => Some(Decimal::from(i64::from(*flag))),
        Value::Float(float) => Decimal::from_f64_retain(*float),
        _ => return Err(cursor.mismatch(value, expected, Mismatch::WrongKind)),
    };
    match decimal {
        Some(decimal) => Ok(Value::Decimal(decimal)),
        None => Err(cursor.mismatch(value, expected, Mismatch::InvalidDecimal)),
    }
}

/// Elements of anything iterable: lists, tuples, queues and sets. Text is
/// deliberately not iterable here.
fn elements(value: &Value) -> Option<Vec<Cow<'_, Value>>> {
    match value {
        Value::List(items) => Some(items.iter().map(Cow::Borrowed).collect()),
        Value::Tuple(items) => Some(items.iter().map(Cow::Borrowed).collect()),
        Value::Queue(items) => Some(items.iter().map(Cow::Borrowed).collect()),
        Value::Set(items) => Some(items.iter().map(|key| Cow::Owned(key.to_value())).collect()),
        _ => None,
    }
}

fn coerce_elements(
    elem: &Coercion,
    value: &Value,
    cursor: &mut Cursor,
    expected: &Descriptor,
) -> Result<Vec<Value>, CastError> {
    let Some(items) = elements(value) else {
        return Err(cursor.mismatch(value, expected, Mismatch::WrongKind));
    };
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| elem.run_at(PathSegment::Index(idx), item, cursor))
        .collect()
}

fn coerce_tuple(
    elems: &[Coercion],
    items: &[Value],
    value: &Value,
    cursor: &mut Cursor,
    expected: &Descriptor,
) -> Result<Value, CastError> {
    if items.len() != elems.len() {
        return Err(cursor.mismatch(
            value,
            expected,
            Mismatch::Arity {
                expected: elems.len(),
                found: items.len(),
            },
        ));
    }
    let coerced = elems
        .iter()
        .zip(items)
        .enumerate()
        .map(|(idx, (elem, item))| elem.run_at(PathSegment::Index(idx), item, cursor))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Tuple(coerced))
}
