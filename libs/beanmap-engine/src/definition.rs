use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use beanmap_api::{Bean, MapperError, TypeKey, Value};

use crate::binding::{ApplyFn, Binding};
use crate::mapper::Mapper;

pub(crate) type Hook = ApplyFn;
pub(crate) type ConstructFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Registration identity of a map: the exact `(source, destination)` pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingKey {
    pub source: TypeKey,
    pub destination: TypeKey,
}

impl MappingKey {
    pub fn new(source: TypeKey, destination: TypeKey) -> Self {
        Self {
            source,
            destination,
        }
    }

    pub fn of<S: Bean, D: Bean>() -> Self {
        Self::new(TypeKey::of::<S>(), TypeKey::of::<D>())
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

impl fmt::Debug for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Compiled plan for one type pair. Immutable once built.
pub struct MapDefinition {
    key: MappingKey,
    constructor: Option<ConstructFn>,
    before: Vec<Hook>,
    bindings: Vec<Binding>,
    after: Vec<Hook>,
}

impl fmt::Debug for MapDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapDefinition")
            .field("key", &self.key)
            .field("constructor", &self.constructor.is_some())
            .field("before", &self.before.len())
            .field("bindings", &self.bindings)
            .field("after", &self.after.len())
            .finish()
    }
}

impl MapDefinition {
    pub(crate) fn new(
        key: MappingKey,
        constructor: Option<ConstructFn>,
        before: Vec<Hook>,
        bindings: Vec<Binding>,
        after: Vec<Hook>,
    ) -> Self {
        Self {
            key,
            constructor,
            before,
            bindings,
            after,
        }
    }

    /// Definition made of convention bindings only.
    pub(crate) fn synthesized(key: MappingKey, bindings: &[Binding]) -> Self {
        Self::new(key, None, Vec::new(), bindings.to_vec(), Vec::new())
    }

    pub fn key(&self) -> MappingKey {
        self.key
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub(crate) fn construct(&self) -> Option<Value> {
        self.constructor.as_ref().map(|construct| construct())
    }

    /// Before-hooks, then bindings, then after-hooks, each in declaration
    /// order. `source` and `target` are already viewed as this definition's
    /// types.
    pub(crate) fn execute(
        &self,
        source: &dyn Any,
        target: &mut dyn Any,
        mapper: &Mapper,
    ) -> Result<(), MapperError> {
        for hook in &self.before {
            hook(source, target)?;
        }
        for binding in &self.bindings {
            binding.apply(source, target, mapper)?;
        }
        for hook in &self.after {
            hook(source, target)?;
        }
        Ok(())
    }
}

pub(crate) fn downcast<T: Any>(value: &dyn Any) -> Result<&T, MapperError> {
    value.downcast_ref::<T>().ok_or_else(|| mismatch::<T>())
}

pub(crate) fn downcast_mut<T: Any>(value: &mut dyn Any) -> Result<&mut T, MapperError> {
    value.downcast_mut::<T>().ok_or_else(|| mismatch::<T>())
}

fn mismatch<T>() -> MapperError {
    MapperError::incompatible_binding(format!("expected an instance of {}", type_name::<T>()))
}
