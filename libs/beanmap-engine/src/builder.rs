use std::sync::Arc;

use beanmap_api::{Bean, Converter, MapperError};

use crate::catalog::TypeCatalog;
use crate::config::MapperConfig;
use crate::convention::{Convention, NameBasedConvention};
use crate::converter::ConverterRegistry;
use crate::converters;
use crate::definition::MappingKey;
use crate::map_config::MapConfig;
use crate::mapper::Mapper;
use crate::registry::MapRegistry;

/// Assembles a [`Mapper`].
///
/// Every `add_*` call validates immediately; an error means the assembly
/// is abandoned and no mapper is built.
#[derive(Debug, Default)]
pub struct MapperBuilder {
    catalog: TypeCatalog,
    registry: MapRegistry,
    converters: ConverterRegistry,
}

impl MapperBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `T` known to the mapper. Needed only for types reached at run
    /// time without being named by any map, e.g. a descendant passed as
    /// the source of a value-merging binding.
    pub fn register<T: Bean>(mut self) -> Self {
        self.catalog.register_bean::<T>();
        self
    }

    /// Declare the map `S -> D`.
    ///
    /// ```ignore
    /// let builder = MapperBuilder::new().add_map::<Order, OrderDto, _>(|config| {
    ///     config
    ///         .bind("customer.name", "customer_name")?
    ///         .use_convention(NameBasedConvention::strict_match())?;
    ///     Ok(())
    /// })?;
    /// ```
    pub fn add_map<S, D, F>(mut self, configure: F) -> Result<Self, MapperError>
    where
        S: Bean,
        D: Bean,
        F: FnOnce(&mut MapConfig<'_, S, D>) -> Result<(), MapperError>,
    {
        let key = MappingKey::of::<S, D>();
        self.declare(configure)
            .map_err(|e| e.with_context(format!("map {key}")))?;
        Ok(self)
    }

    /// Fallback used when no declared map matches a runtime pair. Only the
    /// first registered fallback is consulted.
    pub fn add_map_any_by_convention<C>(mut self, convention: C) -> Result<Self, MapperError>
    where
        C: Convention + 'static,
    {
        convention
            .validate()
            .map_err(|e| e.with_context("any-by-convention"))?;
        self.registry.add_fallback(Arc::new(convention));
        tracing::debug!(
            fallbacks = self.registry.fallback_count(),
            "any-by-convention map registered"
        );
        Ok(self)
    }

    pub fn add_converter(mut self, converter: Arc<dyn Converter>) -> Result<Self, MapperError> {
        self.converters.register(converter)?;
        Ok(self)
    }

    pub fn add_converters<I>(mut self, converters: I) -> Result<Self, MapperError>
    where
        I: IntoIterator<Item = Arc<dyn Converter>>,
    {
        for converter in converters {
            self.converters.register(converter)?;
        }
        Ok(self)
    }

    /// Apply settings loaded from a file.
    pub fn with_config(self, config: &MapperConfig) -> Result<Self, MapperError> {
        let mut builder = self;
        if let Some(options) = &config.any_by_convention {
            builder = builder
                .add_map_any_by_convention(NameBasedConvention::from_options(options.clone()))?;
        }
        if config.converters.numbers {
            builder = builder.add_converters(converters::numbers())?;
        }
        Ok(builder)
    }

    pub fn build_mapper(self) -> Mapper {
        tracing::info!(
            maps = self.registry.definitions().len(),
            converters = self.converters.len(),
            fallbacks = self.registry.fallback_count(),
            types = self.catalog.len(),
            "mapper assembled"
        );
        Mapper::new(self.catalog, self.registry, self.converters)
    }

    fn declare<S, D, F>(&mut self, configure: F) -> Result<(), MapperError>
    where
        S: Bean,
        D: Bean,
        F: FnOnce(&mut MapConfig<'_, S, D>) -> Result<(), MapperError>,
    {
        let key = MappingKey::of::<S, D>();
        if self.registry.get(key).is_some() {
            return Err(MapperError::map_configuration("already registered"));
        }

        self.catalog.register_bean::<S>();
        self.catalog.register_bean::<D>();

        let mut config = MapConfig::<S, D>::new(&mut self.catalog);
        configure(&mut config)?;
        let definition = config.finish()?;
        let bindings = definition.bindings().len();
        self.registry.add(definition)?;

        tracing::debug!(map = %key, bindings, "map registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanmap_api::{converter, ErrorKind, TypeKey};

    #[derive(Bean, Debug, Default, Clone)]
    struct Source {
        pub x: String,
    }

    #[derive(Bean, Debug, Default, Clone)]
    struct Derived {
        #[bean(parent)]
        pub base: Source,
    }

    #[derive(Bean, Debug, Clone)]
    #[bean(no_default)]
    struct Handle {
        pub x: String,
    }

    impl Handle {
        fn open() -> Self {
            Self { x: "open".into() }
        }
    }

    #[test]
    fn duplicate_maps_fail_the_assembly() {
        let err = MapperBuilder::new()
            .add_map::<Source, Source, _>(|_| Ok(()))
            .unwrap()
            .add_map::<Source, Source, _>(|_| Ok(()))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MapConfiguration);
        assert!(err.message.starts_with("map "));
        assert!(err.message.ends_with("already registered"));
    }

    #[test]
    fn duplicate_converters_fail_the_assembly() {
        let err = MapperBuilder::new()
            .add_converter(converter(|v: &i32| i64::from(*v)))
            .unwrap()
            .add_converters(vec![converter(|v: &i32| i64::from(*v) * 2)])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MapConfiguration);
    }

    #[test]
    fn destinations_without_constructor_need_a_strategy() {
        let err = MapperBuilder::new()
            .add_map::<Source, Handle, _>(|c| {
                c.bind("x", "x")?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotConstructible);

        let mapper = MapperBuilder::new()
            .add_map::<Source, Handle, _>(|c| {
                c.construct_destination_object_using(Handle::open)?;
                Ok(())
            })
            .unwrap()
            .build_mapper();
        let handle: Handle = mapper.map(&Source::default()).unwrap();
        assert_eq!(handle.x, "open");
    }

    #[test]
    fn registered_descendants_reach_the_dynamic_api() {
        let builder = MapperBuilder::new()
            .add_map::<Source, Source, _>(|c| {
                c.bind("x", "x")?;
                Ok(())
            })
            .unwrap();
        let source = Derived {
            base: Source { x: "d".into() },
        };

        let err = MapperBuilder::new()
            .build_mapper()
            .map_any(Some(&source), TypeKey::of::<Source>())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoMatchingMap);

        let mapper = builder.register::<Derived>().build_mapper();
        let value = mapper.map_any(Some(&source), TypeKey::of::<Source>()).unwrap();
        assert_eq!(value.downcast_ref::<Source>().map(|s| s.x.as_str()), Some("d"));
    }

    #[test]
    fn unsupported_fallback_options_fail_fast() {
        let err = MapperBuilder::new()
            .add_map_any_by_convention(NameBasedConvention::flexible_match())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedConventionOption);
        assert!(err.message.starts_with("any-by-convention: "));
    }

    #[test]
    fn settings_install_fallback_and_converters() {
        let config = MapperConfig::parse("[any_by_convention]\n[converters]\nnumbers = true\n").unwrap();
        let mapper = MapperBuilder::new().with_config(&config).unwrap().build_mapper();
        assert_eq!(mapper.registry().fallback_count(), 1);
        assert_eq!(mapper.converters().len(), converters::numbers().len());
    }
}
