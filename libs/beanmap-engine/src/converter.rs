use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use beanmap_api::{Converter, MapperError};

/// Converters by exact `(source, destination)` type pair.
///
/// Filled during assembly, frozen afterwards; lookups take no lock.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<(TypeId, TypeId), Arc<dyn Converter>>,
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.converters.len())
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `MapConfiguration` when the pair already has a converter.
    pub fn register(&mut self, converter: Arc<dyn Converter>) -> Result<(), MapperError> {
        let source = converter.source_type();
        let destination = converter.destination_type();
        let key = (source.id(), destination.id());
        if self.converters.contains_key(&key) {
            return Err(MapperError::map_configuration(format!(
                "converter {source} -> {destination} is already registered"
            )));
        }
        tracing::debug!(%source, %destination, "converter registered");
        self.converters.insert(key, converter);
        Ok(())
    }

    /// Exact pair only: a converter for a base type never applies to a subtype.
    pub fn lookup(&self, source: TypeId, destination: TypeId) -> Option<&Arc<dyn Converter>> {
        self.converters.get(&(source, destination))
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}
