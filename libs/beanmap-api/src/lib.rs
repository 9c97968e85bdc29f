//! Data model shared by the mapping engine and the types it maps.

extern crate self as beanmap_api;

pub mod bean;
pub mod converter;
pub mod error;
pub mod member;
pub mod types;
pub mod value;

pub use bean::{default_constructor, Bean, BeanInfo, Construction, ParentLink};
pub use beanmap_api_derive::Bean;
pub use converter::{converter, try_converter, Converter};
pub use error::{ErrorKind, MapperError};
pub use member::{FieldAccessor, MemberAccessor, MemberKind, PropertyAccessor};
pub use types::TypeKey;
pub use value::{runtime_type, MemberValue, Value};
