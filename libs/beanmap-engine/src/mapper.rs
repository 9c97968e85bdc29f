use std::any::{Any, TypeId};
use std::sync::Arc;

use beanmap_api::{runtime_type, Bean, MapperError, TypeKey, Value};

use crate::catalog::{CatalogEntry, TypeCatalog};
use crate::converter::ConverterRegistry;
use crate::definition::MapDefinition;
use crate::registry::MapRegistry;

/// Assembled mapper. Immutable apart from its internal caches; share it
/// across threads by reference or `Arc`.
#[derive(Debug)]
pub struct Mapper {
    catalog: TypeCatalog,
    registry: MapRegistry,
    converters: ConverterRegistry,
}

impl Mapper {
    pub(crate) fn new(
        catalog: TypeCatalog,
        registry: MapRegistry,
        converters: ConverterRegistry,
    ) -> Self {
        Self {
            catalog,
            registry,
            converters,
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &MapRegistry {
        &self.registry
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// Map `source` to a new `D`.
    ///
    /// A map whose constructor produces a descendant of `D` cannot be used
    /// here; use [`Mapper::map_any`] to receive the object as constructed.
    pub fn map<S: Bean, D: Bean>(&self, source: &S) -> Result<D, MapperError> {
        let source_entry = self.catalog.resolve::<S>();
        let destination_entry = self.catalog.resolve::<D>();
        let value = self.map_entries(source, &source_entry, &destination_entry)?;
        value.downcast::<D>().map(|d| *d).map_err(|other| {
            MapperError::not_constructible(format!(
                "map produced {} where exactly {} was requested",
                self.name_of(runtime_type(&*other)),
                TypeKey::of::<D>()
            ))
        })
    }

    /// Map `source` into an existing `destination`.
    pub fn map_into<S: Bean, D: Bean>(&self, source: &S, destination: &mut D) -> Result<(), MapperError> {
        let source_entry = self.catalog.resolve::<S>();
        let destination_entry = self.catalog.resolve::<D>();
        let definition = self.registry.select(&source_entry, &destination_entry)?;
        self.execute(&definition, source, &source_entry, destination, &destination_entry)
    }

    /// Map every source, stopping at the first failure.
    pub fn map_all<'s, S, D, I>(&self, sources: I) -> Result<Vec<D>, MapperError>
    where
        S: Bean,
        D: Bean,
        I: IntoIterator<Item = &'s S>,
    {
        sources.into_iter().map(|source| self.map(source)).collect()
    }

    /// Dynamic form of [`Mapper::map`]: `source` is selected by its runtime
    /// type, the result is returned as constructed.
    pub fn map_any(&self, source: Option<&dyn Any>, destination: TypeKey) -> Result<Value, MapperError> {
        let source = source.ok_or_else(|| MapperError::null_argument("source"))?;
        let source_entry = self.registered(runtime_type(source), "source")?;
        let destination_entry = self
            .catalog
            .entry(destination.id())
            .cloned()
            .ok_or_else(|| {
                MapperError::no_matching_map(format!("{destination} is not a registered bean"))
            })?;
        self.map_entries(source, &source_entry, &destination_entry)
    }

    /// Dynamic form of [`Mapper::map_into`].
    pub fn map_any_into(
        &self,
        source: Option<&dyn Any>,
        destination: Option<&mut dyn Any>,
    ) -> Result<(), MapperError> {
        let source = source.ok_or_else(|| MapperError::null_argument("source"))?;
        let destination = destination.ok_or_else(|| MapperError::null_argument("destination"))?;
        let source_entry = self.registered(runtime_type(source), "source")?;
        let destination_entry = self.registered(runtime_type(destination), "destination")?;
        let definition = self.registry.select(&source_entry, &destination_entry)?;
        self.execute(&definition, source, &source_entry, destination, &destination_entry)
    }

    fn map_entries(
        &self,
        source: &dyn Any,
        source_entry: &CatalogEntry,
        destination_entry: &Arc<CatalogEntry>,
    ) -> Result<Value, MapperError> {
        let definition = self.registry.select(source_entry, destination_entry)?;

        let (mut target, target_entry) = match definition.construct() {
            Some(value) => {
                let entry = self
                    .catalog
                    .entry(runtime_type(&*value))
                    .filter(|e| e.is_a(destination_entry.key()))
                    .cloned()
                    .ok_or_else(|| {
                        MapperError::not_constructible(format!(
                            "constructor of map {} produces {}, which is not a {}",
                            definition.key(),
                            self.name_of(runtime_type(&*value)),
                            destination_entry.key()
                        ))
                    })?;
                (value, entry)
            }
            None => (destination_entry.construct()?, destination_entry.clone()),
        };

        self.execute(&definition, source, source_entry, &mut *target, &target_entry)?;
        Ok(target)
    }

    /// Run `definition` with both objects viewed as the definition's types.
    fn execute(
        &self,
        definition: &MapDefinition,
        source: &dyn Any,
        source_entry: &CatalogEntry,
        target: &mut dyn Any,
        target_entry: &CatalogEntry,
    ) -> Result<(), MapperError> {
        let key = definition.key();
        let source_view = source_entry
            .ancestor(key.source)
            .and_then(|a| a.upcast(source))
            .ok_or_else(|| {
                MapperError::incompatible_binding(format!("source is not a {}", key.source))
            })?;
        let target_view = target_entry
            .ancestor(key.destination)
            .and_then(move |a| a.upcast_mut(target))
            .ok_or_else(|| {
                MapperError::incompatible_binding(format!("destination is not a {}", key.destination))
            })?;

        definition
            .execute(source_view, target_view, self)
            .map_err(|e| e.with_context(format!("map {key}")))
    }

    fn registered(&self, id: TypeId, role: &str) -> Result<Arc<CatalogEntry>, MapperError> {
        self.catalog.entry(id).cloned().ok_or_else(|| {
            MapperError::no_matching_map(format!("{role} type {id:?} is not a registered bean"))
        })
    }

    fn name_of(&self, id: TypeId) -> String {
        match self.catalog.entry(id) {
            Some(entry) => entry.key().to_string(),
            None => format!("{id:?}"),
        }
    }
}
