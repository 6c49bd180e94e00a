use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptor::Descriptor;
use crate::value::Value;

/// Error type raised by host code (callables, constructors, converters).
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

pub type CallableFunc =
    dyn Fn(Vec<Value>, IndexMap<String, Value>) -> Result<Value, HostError> + Send + Sync;

/// A host function reachable through a [`crate::Namespace`].
///
/// The optional [`Signature`] is what inspected invocation derives its
/// keyword-argument shape from; callables without one can only be invoked
/// with an explicit argument descriptor.
#[derive(Clone)]
pub struct Callable(Arc<CallableImpl>);

struct CallableImpl {
    name: String,
    signature: Option<Signature>,
    func: Box<CallableFunc>,
}

impl Callable {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Vec<Value>, IndexMap<String, Value>) -> Result<Value, HostError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Callable(Arc::new(CallableImpl {
            name: name.into(),
            signature: None,
            func: Box::new(func),
        }))
    }

    pub fn with_signature(
        name: impl Into<String>,
        signature: Signature,
        func: impl Fn(Vec<Value>, IndexMap<String, Value>) -> Result<Value, HostError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Callable(Arc::new(CallableImpl {
            name: name.into(),
            signature: Some(signature),
            func: Box::new(func),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.0.signature.as_ref()
    }

    pub fn call(
        &self,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
    ) -> Result<Value, HostError> {
        (self.0.func)(args, kwargs)
    }

    /// Identity comparison; two handles are the same callable only if they
    /// share one registration.
    pub fn same(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.0.name)
            .field("signature", &self.0.signature)
            .finish_non_exhaustive()
    }
}

/// Declared parameters of a callable, in positional order.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new(params: impl IntoIterator<Item = Param>) -> Self {
        Self {
            params: params.into_iter().collect(),
        }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, param) in self.params.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.name)?;
            if let Some(ty) = &param.ty {
                write!(f, ": {ty}")?;
            }
            if let Some(default) = &param.default {
                write!(f, " = {default}")?;
            }
        }
        write!(f, ")")
    }
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub ty: Option<Descriptor>,
    pub default: Option<Value>,
}

impl Param {
    pub fn typed(name: impl Into<String>, ty: Descriptor) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            default: None,
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}
