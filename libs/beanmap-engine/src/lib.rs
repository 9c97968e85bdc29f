//! Object-graph mapping engine: map registration and selection across type
//! hierarchies, bindings, conventions and converters.

pub mod binding;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod convention;
pub mod converter;
pub mod converters;
pub mod definition;
mod lock;
pub mod map_config;
pub mod mapper;
pub mod registry;

pub use binding::{Binding, BindingKind};
pub use builder::MapperBuilder;
pub use catalog::{CatalogEntry, TypeCatalog};
pub use config::MapperConfig;
pub use convention::{Convention, ConventionOptions, NameBasedConvention};
pub use converter::ConverterRegistry;
pub use definition::{MapDefinition, MappingKey};
pub use map_config::MapConfig;
pub use mapper::Mapper;
pub use registry::{MapRegistry, Specificity, Tier};
