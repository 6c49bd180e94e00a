use std::fmt;

use shapecast_model::{HostError, Value};

/// Every failure the engine can report.
///
/// `Coercion` is the recoverable "value does not fit" case. `Config` means
/// the descriptor (or configuration) itself is unusable and is a programmer
/// error. `Lookup` is raised by symbol resolution when a registered root or
/// member is missing. `Host` carries whatever a converter or callable
/// returned, untouched.
#[derive(Debug, thiserror::Error)]
pub enum CastError {
    #[error(transparent)]
    Coercion(Box<CoercionError>),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Host(HostError),
}

impl CastError {
    pub fn is_coercion(&self) -> bool {
        matches!(self, CastError::Coercion(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, CastError::Config(_))
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, CastError::Lookup(_))
    }

    pub fn as_coercion(&self) -> Option<&CoercionError> {
        match self {
            CastError::Coercion(err) => Some(err),
            _ => None,
        }
    }

    /// Wraps a host error, unwrapping it back into a `CastError` when the
    /// host simply forwarded one of ours.
    pub fn from_host(err: HostError) -> Self {
        match err.downcast::<CastError>() {
            Ok(err) => *err,
            Err(err) => CastError::Host(err),
        }
    }
}

impl From<CoercionError> for CastError {
    fn from(err: CoercionError) -> Self {
        CastError::Coercion(Box::new(err))
    }
}

/// A value that does not satisfy an otherwise valid descriptor.
#[derive(Debug, Clone)]
pub struct CoercionError {
    /// Where in the input the mismatch sits, e.g. `$.items[2].name`.
    pub path: String,
    pub value: Value,
    /// Rendered descriptor the value was checked against.
    pub expected: String,
    pub reason: Mismatch,
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}) is not compatible with {}: {}",
            self.path,
            self.value,
            self.value.kind_name(),
            self.expected,
            self.reason
        )
    }
}

impl std::error::Error for CoercionError {}

/// Why a value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    // ── Shape ───────────────────────────────────────────────────────────────
    /// The value is not of a kind the descriptor accepts.
    WrongKind,
    /// The value is not equal to any of the literal's members.
    NotInLiteral,
    /// A record or keyword mapping is missing required keys or carries
    /// undeclared ones.
    KeySet {
        missing: Vec<String>,
        unknown: Vec<String>,
    },
    /// A tuple input of the wrong length.
    Arity {
        expected: usize,
        found: usize,
    },
    /// Every union alternative rejected the value.
    UnionExhausted {
        alternatives: usize,
    },
    /// A set element or map key that has no hashable form.
    Unhashable,
    /// Text that does not parse as a decimal, or a float with no decimal form.
    InvalidDecimal,

    // ── Symbols and invocation ──────────────────────────────────────────────
    /// Empty input or an empty segment between dots.
    MalformedSymbolPath,
    /// The path's root, names or full path are outside the allow-lists.
    SymbolNotAllowed,
    /// The invocation envelope lacks the callable key.
    MissingCallableKey {
        key: String,
    },
    /// The callable key resolved to something that cannot be called.
    NotCallable,

    // ── Limits ──────────────────────────────────────────────────────────────
    /// The value nests deeper than `limits.max_depth`.
    DepthExceeded {
        limit: usize,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::WrongKind => write!(f, "unexpected kind"),
            Mismatch::NotInLiteral => write!(f, "not one of the allowed literals"),
            Mismatch::KeySet { missing, unknown } => {
                let mut parts = Vec::new();
                if !missing.is_empty() {
                    parts.push(format!("missing keys [{}]", missing.join(", ")));
                }
                if !unknown.is_empty() {
                    parts.push(format!("unknown keys [{}]", unknown.join(", ")));
                }
                write!(f, "{}", parts.join("; "))
            }
            Mismatch::Arity { expected, found } => {
                write!(f, "expected {expected} elements, found {found}")
            }
            Mismatch::UnionExhausted { alternatives } => {
                write!(f, "none of {alternatives} alternatives matched")
            }
            Mismatch::Unhashable => write!(f, "value cannot be used as a key"),
            Mismatch::InvalidDecimal => write!(f, "not representable as a decimal"),
            Mismatch::MalformedSymbolPath => write!(f, "malformed symbol path"),
            Mismatch::SymbolNotAllowed => {
                write!(f, "symbol is not in the allowed roots and names")
            }
            Mismatch::MissingCallableKey { key } => write!(f, "the \"{key}\" key is missing"),
            Mismatch::NotCallable => write!(f, "resolved symbol is not callable"),
            Mismatch::DepthExceeded { limit } => {
                write!(f, "nesting exceeds the depth limit of {limit}")
            }
        }
    }
}

/// The descriptor or configuration is unusable; not a property of the value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    // ── Descriptors ─────────────────────────────────────────────────────────
    /// A descriptor kind this engine has no rule for.
    #[error("descriptor {descriptor} is not supported by this engine")]
    Unsupported { descriptor: String },
    /// A union with nothing to try.
    #[error("union {descriptor} has no alternatives")]
    EmptyUnion { descriptor: String },
    /// Descriptor nesting deeper than `limits.max_depth`, rejected while
    /// compiling.
    #[error("descriptor nests deeper than the depth limit of {limit}")]
    DescriptorTooDeep { limit: usize },
    /// An invocation whose path is not a symbol path descriptor.
    #[error("invocation path must be a symbol path descriptor, found {descriptor}")]
    InvocationPath { descriptor: String },

    // ── Inspected invocation ────────────────────────────────────────────────
    /// A signature parameter without a declared type.
    #[error(
        "unable to get the declared type of `{param}` for {callable}{signature}; use an explicit invocation descriptor instead"
    )]
    UntypedParameter {
        callable: String,
        param: String,
        signature: String,
    },
    /// A callable with no signature at all.
    #[error(
        "{callable} declares no signature to inspect; use an explicit invocation descriptor instead"
    )]
    MissingSignature { callable: String },

    // ── Explicit invocation ─────────────────────────────────────────────────
    /// The args descriptor produced something other than a sequence.
    #[error("positional arguments descriptor {descriptor} produced {found}, expected a sequence")]
    ArgsNotSequence { descriptor: String, found: String },
    /// The kwargs descriptor produced something other than a text-keyed mapping.
    #[error(
        "keyword arguments descriptor {descriptor} produced {found}, expected a mapping with text keys"
    )]
    KwargsNotMapping { descriptor: String, found: String },

    // ── Configuration ───────────────────────────────────────────────────────
    /// `CastConfig` TOML that failed to deserialize.
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Symbol resolution could not find a registered root or member.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no namespace named `{root}` is registered")]
    UnknownRoot { root: String },
    #[error("`{owner}` has no member `{member}`")]
    MissingMember { owner: String, member: String },
}
