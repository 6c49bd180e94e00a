use std::sync::Arc;

use rustc_hash::FxHashMap;
use shapecast_model::{Descriptor, DescriptorId, NamespaceRegistry, Value};

use crate::config::CastConfig;
use crate::error::CastError;

pub type Converter = dyn Fn(&Value) -> Result<Value, CastError> + Send + Sync;

/// Caller-registered overrides, keyed by descriptor identity.
///
/// A descriptor found here is handed to its converter and no other rule
/// runs for it, including the checks its kind would normally perform.
#[derive(Clone, Default)]
pub struct ImplicitConversions {
    // The descriptor handle is kept so its identity cannot be reused while
    // the entry exists.
    entries: FxHashMap<DescriptorId, (Descriptor, Arc<Converter>)>,
}

impl ImplicitConversions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        descriptor: &Descriptor,
        converter: impl Fn(&Value) -> Result<Value, CastError> + Send + Sync + 'static,
    ) -> Self {
        self.insert(descriptor, converter);
        self
    }

    pub fn insert(
        &mut self,
        descriptor: &Descriptor,
        converter: impl Fn(&Value) -> Result<Value, CastError> + Send + Sync + 'static,
    ) {
        self.entries
            .insert(descriptor.id(), (descriptor.clone(), Arc::new(converter)));
    }

    pub fn get(&self, descriptor: &Descriptor) -> Option<&Arc<Converter>> {
        self.entries.get(&descriptor.id()).map(|(_, converter)| converter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ImplicitConversions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.values().map(|(descriptor, _)| descriptor))
            .finish()
    }
}

/// Everything a cast reads besides the descriptor and the value. All parts
/// are shared and read-only, so one context can serve concurrent casts.
#[derive(Clone, Debug, Default)]
pub struct CastContext {
    conversions: Arc<ImplicitConversions>,
    namespaces: Arc<NamespaceRegistry>,
    config: Arc<CastConfig>,
}

impl CastContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversions(mut self, conversions: ImplicitConversions) -> Self {
        self.conversions = Arc::new(conversions);
        self
    }

    pub fn with_namespaces(mut self, namespaces: NamespaceRegistry) -> Self {
        self.namespaces = Arc::new(namespaces);
        self
    }

    pub fn with_shared_namespaces(mut self, namespaces: Arc<NamespaceRegistry>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_config(mut self, config: CastConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn conversions(&self) -> &ImplicitConversions {
        &self.conversions
    }

    pub fn namespaces(&self) -> &Arc<NamespaceRegistry> {
        &self.namespaces
    }

    pub fn config(&self) -> &CastConfig {
        &self.config
    }
}
