use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::callable::Callable;
use crate::value::Value;

/// Immutable handle to a type descriptor.
///
/// Cloning is cheap and preserves identity: clones report the same
/// [`DescriptorId`]. Two descriptors built separately are distinct even when
/// they are structurally equal, which is what implicit-conversion tables and
/// compile caches key on.
#[derive(Clone)]
pub struct Descriptor(Arc<DescriptorKind>);

/// Allocation identity of a [`Descriptor`]. Only meaningful while some
/// handle to the descriptor is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorId(usize);

/// The closed set of shapes the engine understands.
#[derive(Debug)]
#[non_exhaustive]
pub enum DescriptorKind {
    // ── Scalars ─────────────────────────────────────────────────────────────
    /// Accepts every value unchanged.
    Any,
    Primitive(PrimitiveKind),
    /// Integers or floats, returned as given.
    Float,
    /// Integers, floats or complex numbers, returned as given.
    Complex,
    /// Text, integers or floats, converted to a decimal.
    Decimal,
    /// One of the listed values, compared with strict equality.
    Literal(Vec<Value>),

    // ── Structures ──────────────────────────────────────────────────────────
    Record(RecordDescriptor),
    PartialRecord(PartialRecordDescriptor),
    ListOf(Descriptor),
    SetOf(Descriptor),
    QueueOf(Descriptor),
    MapOf(Descriptor, Descriptor),
    /// Fixed arity, positional.
    TupleOf(Vec<Descriptor>),
    /// Alternatives are tried in declared order.
    UnionOf(Vec<Descriptor>),

    // ── Symbols ─────────────────────────────────────────────────────────────
    SymbolPath(SymbolPathDescriptor),
    /// Call with explicitly typed positional and keyword arguments.
    Invocation {
        path: Descriptor,
        args: Descriptor,
        kwargs: Descriptor,
    },
    /// Call whose keyword arguments are typed by the callable's signature.
    InspectedInvocation {
        path: Descriptor,
    },
}

/// Host scalar kinds matched by kind alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Only `Value::None`.
    None,
    /// Only `Value::Bool`.
    Bool,
    /// `Value::Int`, and `Value::Bool` as its subtype.
    Int,
    /// Only `Value::Text`; text is never parsed into another kind.
    Text,
    /// Only `Value::Bytes`.
    Bytes,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::None => "None",
            PrimitiveKind::Bool => "Bool",
            PrimitiveKind::Int => "Int",
            PrimitiveKind::Text => "Text",
            PrimitiveKind::Bytes => "Bytes",
        }
    }
}

impl Descriptor {
    pub fn from_kind(kind: DescriptorKind) -> Self {
        Descriptor(Arc::new(kind))
    }

    pub fn kind(&self) -> &DescriptorKind {
        &self.0
    }

    pub fn id(&self) -> DescriptorId {
        DescriptorId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn same(&self, other: &Descriptor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn any() -> Self {
        Self::from_kind(DescriptorKind::Any)
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::from_kind(DescriptorKind::Primitive(kind))
    }

    pub fn none() -> Self {
        Self::primitive(PrimitiveKind::None)
    }

    pub fn bool() -> Self {
        Self::primitive(PrimitiveKind::Bool)
    }

    pub fn int() -> Self {
        Self::primitive(PrimitiveKind::Int)
    }

    pub fn text() -> Self {
        Self::primitive(PrimitiveKind::Text)
    }

    pub fn bytes() -> Self {
        Self::primitive(PrimitiveKind::Bytes)
    }

    pub fn float() -> Self {
        Self::from_kind(DescriptorKind::Float)
    }

    pub fn complex() -> Self {
        Self::from_kind(DescriptorKind::Complex)
    }

    pub fn decimal() -> Self {
        Self::from_kind(DescriptorKind::Decimal)
    }

    pub fn literal(allowed: impl IntoIterator<Item = Value>) -> Self {
        Self::from_kind(DescriptorKind::Literal(allowed.into_iter().collect()))
    }

    pub fn list_of(elem: Descriptor) -> Self {
        Self::from_kind(DescriptorKind::ListOf(elem))
    }

    pub fn set_of(elem: Descriptor) -> Self {
        Self::from_kind(DescriptorKind::SetOf(elem))
    }

    pub fn queue_of(elem: Descriptor) -> Self {
        Self::from_kind(DescriptorKind::QueueOf(elem))
    }

    pub fn map_of(key: Descriptor, value: Descriptor) -> Self {
        Self::from_kind(DescriptorKind::MapOf(key, value))
    }

    pub fn tuple_of(elems: impl IntoIterator<Item = Descriptor>) -> Self {
        Self::from_kind(DescriptorKind::TupleOf(elems.into_iter().collect()))
    }

    pub fn union_of(alts: impl IntoIterator<Item = Descriptor>) -> Self {
        Self::from_kind(DescriptorKind::UnionOf(alts.into_iter().collect()))
    }

    /// `Union[inner, None]`.
    pub fn optional(inner: Descriptor) -> Self {
        Self::union_of([inner, Self::none()])
    }

    pub fn symbol_path(path: SymbolPathDescriptor) -> Self {
        Self::from_kind(DescriptorKind::SymbolPath(path))
    }

    pub fn invocation(path: Descriptor, args: Descriptor, kwargs: Descriptor) -> Self {
        Self::from_kind(DescriptorKind::Invocation { path, args, kwargs })
    }

    pub fn inspected_invocation(path: Descriptor) -> Self {
        Self::from_kind(DescriptorKind::InspectedInvocation { path })
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Descriptor({self})")
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            DescriptorKind::Any => write!(f, "Any"),
            DescriptorKind::Primitive(kind) => write!(f, "{}", kind.name()),
            DescriptorKind::Float => write!(f, "Float"),
            DescriptorKind::Complex => write!(f, "Complex"),
            DescriptorKind::Decimal => write!(f, "Decimal"),
            DescriptorKind::Literal(allowed) => write_list(f, "Literal", allowed),
            DescriptorKind::Record(record) => write!(f, "{}", record.name),
            DescriptorKind::PartialRecord(record) => write!(f, "{}", record.name),
            DescriptorKind::ListOf(elem) => write!(f, "List[{elem}]"),
            DescriptorKind::SetOf(elem) => write!(f, "Set[{elem}]"),
            DescriptorKind::QueueOf(elem) => write!(f, "Queue[{elem}]"),
            DescriptorKind::MapOf(key, value) => write!(f, "Map[{key}, {value}]"),
            DescriptorKind::TupleOf(elems) => write_list(f, "Tuple", elems),
            DescriptorKind::UnionOf(alts) => write_list(f, "Union", alts),
            DescriptorKind::SymbolPath(path) => write!(f, "{path}"),
            DescriptorKind::Invocation { path, args, kwargs } => {
                write!(f, "Call[{path}, {args}, {kwargs}]")
            }
            DescriptorKind::InspectedInvocation { path } => write!(f, "Call[{path}]"),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, head: &str, items: &[T]) -> fmt::Result {
    write!(f, "{head}[")?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum FieldDefault {
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    pub fn produce(&self) -> Value {
        match self {
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Value(value) => f.debug_tuple("Value").field(value).finish(),
            FieldDefault::Factory(_) => write!(f, "Factory(<fn>)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: String,
    pub ty: Descriptor,
    pub default: Option<FieldDefault>,
}

/// A fixed-shape structure. `required` is exactly the set of fields declared
/// without a default, computed once when the descriptor is built.
#[derive(Debug)]
pub struct RecordDescriptor {
    name: String,
    fields: IndexMap<String, FieldSpec>,
    required: BTreeSet<String>,
    constructor: Option<Callable>,
}

impl RecordDescriptor {
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            fields: IndexMap::new(),
            constructor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Invoked with the coerced fields as keyword arguments in place of
    /// building a plain [`crate::RecordValue`].
    pub fn constructor(&self) -> Option<&Callable> {
        self.constructor.as_ref()
    }
}

pub struct RecordBuilder {
    name: String,
    fields: IndexMap<String, FieldSpec>,
    constructor: Option<Callable>,
}

impl RecordBuilder {
    /// Declares a required field. Redeclaring a name replaces the earlier
    /// declaration in place.
    pub fn field(self, name: impl Into<String>, ty: Descriptor) -> Self {
        self.push(name.into(), ty, None)
    }

    pub fn field_with_default(
        self,
        name: impl Into<String>,
        ty: Descriptor,
        default: Value,
    ) -> Self {
        self.push(name.into(), ty, Some(FieldDefault::Value(default)))
    }

    pub fn field_with_factory(
        self,
        name: impl Into<String>,
        ty: Descriptor,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.push(name.into(), ty, Some(FieldDefault::Factory(Arc::new(factory))))
    }

    pub fn constructor(mut self, constructor: Callable) -> Self {
        self.constructor = Some(constructor);
        self
    }

    fn push(mut self, name: String, ty: Descriptor, default: Option<FieldDefault>) -> Self {
        self.fields.insert(name.clone(), FieldSpec { name, ty, default });
        self
    }

    pub fn build(self) -> Descriptor {
        let required = self
            .fields
            .values()
            .filter(|field| field.default.is_none())
            .map(|field| field.name.clone())
            .collect();
        Descriptor::from_kind(DescriptorKind::Record(RecordDescriptor {
            name: self.name,
            fields: self.fields,
            required,
            constructor: self.constructor,
        }))
    }
}

/// A keyed structure without defaults. When `total`, every declared key
/// must be present; otherwise any subset of the declared keys is accepted.
#[derive(Debug)]
pub struct PartialRecordDescriptor {
    name: String,
    fields: IndexMap<String, Descriptor>,
    total: bool,
}

impl PartialRecordDescriptor {
    pub fn builder(name: impl Into<String>) -> PartialRecordBuilder {
        PartialRecordBuilder {
            name: name.into(),
            fields: IndexMap::new(),
            total: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn is_total(&self) -> bool {
        self.total
    }
}

pub struct PartialRecordBuilder {
    name: String,
    fields: IndexMap<String, Descriptor>,
    total: bool,
}

impl PartialRecordBuilder {
    pub fn total(mut self, total: bool) -> Self {
        self.total = total;
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: Descriptor) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    pub fn build(self) -> Descriptor {
        Descriptor::from_kind(DescriptorKind::PartialRecord(PartialRecordDescriptor {
            name: self.name,
            fields: self.fields,
            total: self.total,
        }))
    }
}

// ---------------------------------------------------------------------------
// Symbol paths
// ---------------------------------------------------------------------------

/// An allow-list of names, or no restriction at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Candidates {
    Any,
    Only(Vec<String>),
}

impl Candidates {
    pub fn only<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Candidates::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn admits(&self, name: &str) -> bool {
        match self {
            Candidates::Any => true,
            Candidates::Only(names) => names.iter().any(|candidate| candidate == name),
        }
    }
}

impl fmt::Display for Candidates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidates::Any => write!(f, "*"),
            Candidates::Only(names) => write!(f, "({})", names.join(", ")),
        }
    }
}

/// Dotted path `root.member.member`. `roots` constrains the leading
/// segment; `names` constrains the remainder joined back with dots; `paths`
/// constrains the whole resolved path, so it can pair roots with names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolPathDescriptor {
    pub roots: Candidates,
    pub names: Candidates,
    pub paths: Candidates,
}

impl SymbolPathDescriptor {
    pub fn any() -> Self {
        Self {
            roots: Candidates::Any,
            names: Candidates::Any,
            paths: Candidates::Any,
        }
    }

    pub fn roots<S: Into<String>>(roots: impl IntoIterator<Item = S>) -> Self {
        Self {
            roots: Candidates::only(roots),
            ..Self::any()
        }
    }

    pub fn only<R: Into<String>, N: Into<String>>(
        roots: impl IntoIterator<Item = R>,
        names: impl IntoIterator<Item = N>,
    ) -> Self {
        Self {
            roots: Candidates::only(roots),
            names: Candidates::only(names),
            paths: Candidates::Any,
        }
    }

    /// Allows exactly the listed `root.name` paths. The roots are the
    /// distinct leading segments, in first-seen order.
    pub fn only_paths<S: Into<String>>(paths: impl IntoIterator<Item = S>) -> Self {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        let mut roots: Vec<String> = Vec::new();
        for path in &paths {
            let root = path.split('.').next().unwrap_or_default();
            if !roots.iter().any(|known| known == root) {
                roots.push(root.to_string());
            }
        }
        Self {
            roots: Candidates::Only(roots),
            names: Candidates::Any,
            paths: Candidates::Only(paths),
        }
    }

    /// Whether `root` followed by `members` passes the name and path lists.
    pub fn admits(&self, root: &str, members: &[&str]) -> bool {
        let names = members.join(".");
        if !self.names.admits(&names) {
            return false;
        }
        match &self.paths {
            Candidates::Any => true,
            Candidates::Only(_) if names.is_empty() => self.paths.admits(root),
            Candidates::Only(_) => self.paths.admits(&format!("{root}.{names}")),
        }
    }
}

impl fmt::Display for SymbolPathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.roots, &self.names, &self.paths) {
            (_, _, paths @ Candidates::Only(_)) => write!(f, "Symbol[{paths}]"),
            (Candidates::Any, Candidates::Any, _) => write!(f, "Symbol"),
            (roots, names, _) => write!(f, "Symbol[{roots}.{names}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_set_excludes_defaulted_fields() {
        let descriptor = RecordDescriptor::builder("c")
            .field("x", Descriptor::int())
            .field_with_default("y", Descriptor::float(), Value::Int(1))
            .field_with_factory("z", Descriptor::text(), || Value::text("ok"))
            .build();
        let DescriptorKind::Record(record) = descriptor.kind() else {
            panic!("expected a record descriptor");
        };
        assert_eq!(record.required().iter().collect::<Vec<_>>(), vec!["x"]);
        let names: Vec<&str> = record.fields().map(|field| field.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn identity_survives_clone_but_not_rebuild() {
        let a = Descriptor::list_of(Descriptor::int());
        let b = a.clone();
        let c = Descriptor::list_of(Descriptor::int());
        assert_eq!(a.id(), b.id());
        assert!(a.same(&b));
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn display_renders_type_notation() {
        let descriptor = Descriptor::map_of(
            Descriptor::text(),
            Descriptor::optional(Descriptor::tuple_of([Descriptor::int(), Descriptor::float()])),
        );
        assert_eq!(descriptor.to_string(), "Map[Text, Union[Tuple[Int, Float], None]]");
        let literal = Descriptor::literal([Value::text("xx"), Value::text("zz")]);
        assert_eq!(literal.to_string(), r#"Literal["xx", "zz"]"#);
        let path = Descriptor::symbol_path(SymbolPathDescriptor::only(["mod"], ["Widget"]));
        assert_eq!(path.to_string(), "Symbol[(mod).(Widget)]");
        let pairs = SymbolPathDescriptor::only_paths(["mod.Widget", "other.Gadget"]);
        assert_eq!(
            Descriptor::symbol_path(pairs).to_string(),
            "Symbol[(mod.Widget, other.Gadget)]"
        );
    }

    #[test]
    fn path_lists_pair_roots_with_names() {
        let pairs = SymbolPathDescriptor::only_paths(["mod.Widget", "other.Gadget", "mod.Gadget"]);
        assert_eq!(pairs.roots, Candidates::only(["mod", "other"]));
        assert!(pairs.admits("mod", &["Widget"]));
        assert!(pairs.admits("other", &["Gadget"]));
        assert!(!pairs.admits("other", &["Widget"]));
        assert!(!pairs.admits("mod", &[]));
    }
}
