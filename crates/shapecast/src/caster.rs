use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use shapecast_model::{Descriptor, DescriptorId, Value};
use tracing::debug;

use crate::compile::{Coercion, compile};
use crate::context::CastContext;
use crate::error::CastError;

/// A context plus a cache of compiled coercions keyed by descriptor identity.
///
/// The engine itself keeps no state between calls; a `Caster` is the
/// caller-owned place to amortize compilation. Each cached entry holds on to
/// its descriptor, so an identity is never reused while it is cached.
#[derive(Debug, Default)]
pub struct Caster {
    ctx: CastContext,
    cache: RwLock<FxHashMap<DescriptorId, (Descriptor, Coercion)>>,
}

impl Caster {
    pub fn new(ctx: CastContext) -> Self {
        Self {
            ctx,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn context(&self) -> &CastContext {
        &self.ctx
    }

    /// Returns the compiled coercion for `descriptor`, compiling it on first
    /// use.
    pub fn coercion(&self, descriptor: &Descriptor) -> Result<Coercion, CastError> {
        let id = descriptor.id();
        // Fast-path: already compiled.
        {
            let cache = self.cache.read();
            if let Some((_, coercion)) = cache.get(&id) {
                debug!(descriptor = %descriptor, "coercion cache hit");
                return Ok(coercion.clone());
            }
        }
        debug!(descriptor = %descriptor, "coercion cache miss");
        let coercion = compile(descriptor, &self.ctx)?;
        let mut cache = self.cache.write();
        // Another thread may have compiled it meanwhile; keep the first.
        let (_, cached) = cache
            .entry(id)
            .or_insert_with(|| (descriptor.clone(), coercion));
        Ok(cached.clone())
    }

    pub fn cast(&self, descriptor: &Descriptor, value: &Value) -> Result<Value, CastError> {
        self.coercion(descriptor)?.apply(value)
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Drops every cached coercion, releasing the descriptors they hold.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}
