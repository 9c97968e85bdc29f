use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::member::MemberAccessor;
use crate::types::TypeKey;
use crate::value::Value;

/// A type that takes part in mapping.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Bean, Default)]
/// pub struct Customer {
///     #[bean(parent)]
///     pub base: Person,
///     pub email: Option<String>,
///     #[bean(property)]
///     rating: i32,
/// }
/// ```
pub trait Bean: Any {
    fn describe() -> BeanInfo;
}

/// How instances of a type come into existence when the mapper needs one.
#[derive(Debug, Clone, Copy)]
pub enum Construction {
    /// Parameterless constructor.
    Default(fn() -> Value),
    /// Never instantiated directly; mapped through descendants.
    Abstract,
    /// Concrete, but without a parameterless constructor.
    Unavailable,
}

/// Link from a type to one of its direct ancestors.
///
/// Inheritance is composition: the descendant embeds the ancestor and the
/// link knows how to reach it.
#[derive(Clone, Copy)]
pub struct ParentLink {
    describe: fn() -> BeanInfo,
    upcast: fn(&dyn Any) -> Option<&dyn Any>,
    upcast_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
}

impl ParentLink {
    pub fn new(
        describe: fn() -> BeanInfo,
        upcast: fn(&dyn Any) -> Option<&dyn Any>,
        upcast_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
    ) -> Self {
        Self {
            describe,
            upcast,
            upcast_mut,
        }
    }

    pub fn describe(&self) -> BeanInfo {
        (self.describe)()
    }

    pub fn describer(&self) -> fn() -> BeanInfo {
        self.describe
    }

    /// `None` when `value` is not of the descending type.
    pub fn upcast<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.upcast)(value)
    }

    pub fn upcast_mut<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.upcast_mut)(value)
    }
}

impl fmt::Debug for ParentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentLink").finish_non_exhaustive()
    }
}

/// Introspection record of one type: construction, direct parents and the
/// members it declares itself.
#[derive(Clone)]
pub struct BeanInfo {
    type_key: TypeKey,
    construction: Construction,
    parents: Vec<ParentLink>,
    properties: Vec<Arc<dyn MemberAccessor>>,
    fields: Vec<Arc<dyn MemberAccessor>>,
}

impl BeanInfo {
    /// Empty description of `T`. Starts out `Unavailable`.
    pub fn of<T: Any>() -> Self {
        Self {
            type_key: TypeKey::of::<T>(),
            construction: Construction::Unavailable,
            parents: Vec::new(),
            properties: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_constructor(mut self, construct: fn() -> Value) -> Self {
        self.construction = Construction::Default(construct);
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.construction = Construction::Abstract;
        self
    }

    pub fn with_parent(mut self, parent: ParentLink) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn with_property(mut self, member: impl MemberAccessor + 'static) -> Self {
        self.properties.push(Arc::new(member));
        self
    }

    pub fn with_field(mut self, member: impl MemberAccessor + 'static) -> Self {
        self.fields.push(Arc::new(member));
        self
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn construction(&self) -> Construction {
        self.construction
    }

    pub fn parents(&self) -> &[ParentLink] {
        &self.parents
    }

    pub fn properties(&self) -> &[Arc<dyn MemberAccessor>] {
        &self.properties
    }

    pub fn fields(&self) -> &[Arc<dyn MemberAccessor>] {
        &self.fields
    }
}

impl fmt::Debug for BeanInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanInfo")
            .field("type", &self.type_key)
            .field("construction", &self.construction)
            .field("parents", &self.parents.len())
            .field("properties", &self.properties)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Parameterless constructor for any `Default` type.
pub fn default_constructor<T: Default + Any>() -> Value {
    Box::new(T::default())
}
