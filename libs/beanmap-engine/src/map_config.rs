use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use beanmap_api::{Bean, Construction, MapperError, MemberAccessor, TypeKey, Value};

use crate::binding::{ApplyFn, Binding, BindingKind};
use crate::catalog::{CatalogEntry, TypeCatalog};
use crate::convention::Convention;
use crate::definition::{downcast, downcast_mut, ConstructFn, Hook, MapDefinition, MappingKey};

/// Configuration progress of one map. Calls may only move it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ConfigState {
    Unconfigured,
    ConstructorSet,
    BeforeHooksDeclared,
    BindingsDeclared,
    AfterHooksDeclared,
}

impl ConfigState {
    fn last_call(self) -> &'static str {
        match self {
            ConfigState::Unconfigured => "nothing",
            ConfigState::ConstructorSet => "construct_destination_object_using",
            ConfigState::BeforeHooksDeclared => "before_map",
            ConfigState::BindingsDeclared => "a binding",
            ConfigState::AfterHooksDeclared => "after_map",
        }
    }
}

/// Configuration handle for the map `S -> D`, passed to the callback of
/// [`MapperBuilder::add_map`](crate::builder::MapperBuilder::add_map).
///
/// Call order: constructor, before-hooks, bindings, after-hooks. An
/// out-of-order call fails with `MapConfiguration`.
pub struct MapConfig<'c, S, D> {
    catalog: &'c mut TypeCatalog,
    state: ConfigState,
    constructor: Option<ConstructFn>,
    before: Vec<Hook>,
    bindings: Vec<Binding>,
    after: Vec<Hook>,
    conventions: Vec<Arc<dyn Convention>>,
    _types: PhantomData<fn(&S) -> D>,
}

impl<'c, S: Bean, D: Bean> MapConfig<'c, S, D> {
    pub(crate) fn new(catalog: &'c mut TypeCatalog) -> Self {
        Self {
            catalog,
            state: ConfigState::Unconfigured,
            constructor: None,
            before: Vec::new(),
            bindings: Vec::new(),
            after: Vec::new(),
            conventions: Vec::new(),
            _types: PhantomData,
        }
    }

    /// Build destinations with `construct` instead of `D`'s parameterless
    /// constructor. `T` must be `D` or one of its descendants.
    pub fn construct_destination_object_using<T, F>(&mut self, construct: F) -> Result<&mut Self, MapperError>
    where
        T: Bean,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.advance(
            "construct_destination_object_using",
            ConfigState::Unconfigured,
            ConfigState::ConstructorSet,
        )?;
        self.catalog.register_bean::<T>();
        if !self.catalog.resolve::<T>().is_a(TypeKey::of::<D>()) {
            return Err(MapperError::map_configuration(format!(
                "constructor produces {}, which is not a {}",
                TypeKey::of::<T>(),
                TypeKey::of::<D>()
            )));
        }
        self.constructor = Some(Arc::new(move || Box::new(construct()) as Value));
        Ok(self)
    }

    /// Runs before any binding, in declaration order.
    pub fn before_map<F>(&mut self, hook: F) -> Result<&mut Self, MapperError>
    where
        F: Fn(&S, &mut D) + Send + Sync + 'static,
    {
        self.advance(
            "before_map",
            ConfigState::BeforeHooksDeclared,
            ConfigState::BeforeHooksDeclared,
        )?;
        self.before.push(erase_hook(hook));
        Ok(self)
    }

    /// Runs after all bindings, in declaration order.
    pub fn after_map<F>(&mut self, hook: F) -> Result<&mut Self, MapperError>
    where
        F: Fn(&S, &mut D) + Send + Sync + 'static,
    {
        self.advance(
            "after_map",
            ConfigState::AfterHooksDeclared,
            ConfigState::AfterHooksDeclared,
        )?;
        self.after.push(erase_hook(hook));
        Ok(self)
    }

    /// Plain binding from a dotted source path (`"customer.name"`) to a
    /// destination member.
    pub fn bind(&mut self, source_path: &str, destination: &str) -> Result<&mut Self, MapperError> {
        self.bind_path(source_path, destination, BindingKind::Plain)
    }

    /// Value-merging binding: the source value is mapped into the member's
    /// current value instead of replacing it.
    pub fn map_inner(&mut self, source_path: &str, destination: &str) -> Result<&mut Self, MapperError> {
        self.bind_path(source_path, destination, BindingKind::ValueMerging)
    }

    pub fn bind_constant<V, C>(&mut self, value: V, consumer: C) -> Result<&mut Self, MapperError>
    where
        V: Clone + Send + Sync + 'static,
        C: Fn(&mut D, V) + Send + Sync + 'static,
    {
        self.advance_binding("bind_constant")?;
        let apply: ApplyFn = Arc::new(
            move |_: &dyn Any, target: &mut dyn Any| -> Result<(), MapperError> {
                consumer(downcast_mut::<D>(target)?, value.clone());
                Ok(())
            },
        );
        let name = format!("constant #{}", self.bindings.len());
        self.bindings.push(Binding::function(name, apply));
        Ok(self)
    }

    pub fn bind_function<V, P, C>(&mut self, producer: P, consumer: C) -> Result<&mut Self, MapperError>
    where
        V: 'static,
        P: Fn(&S) -> V + Send + Sync + 'static,
        C: Fn(&mut D, V) + Send + Sync + 'static,
    {
        self.advance_binding("bind_function")?;
        let apply: ApplyFn = Arc::new(
            move |source: &dyn Any, target: &mut dyn Any| -> Result<(), MapperError> {
                let value = producer(downcast::<S>(source)?);
                consumer(downcast_mut::<D>(target)?, value);
                Ok(())
            },
        );
        let name = format!("function #{}", self.bindings.len());
        self.bindings.push(Binding::function(name, apply));
        Ok(self)
    }

    /// Append the convention's bindings after the explicit ones. They run
    /// after every explicit binding, so a member written by both ends up
    /// with the convention's value.
    pub fn use_convention<C>(&mut self, convention: C) -> Result<&mut Self, MapperError>
    where
        C: Convention + 'static,
    {
        self.advance_binding("use_convention")?;
        convention.validate()?;
        self.conventions.push(Arc::new(convention));
        Ok(self)
    }

    pub(crate) fn finish(self) -> Result<MapDefinition, MapperError> {
        let source = self.catalog.resolve::<S>();
        let destination = self.catalog.resolve::<D>();

        if self.constructor.is_none()
            && matches!(destination.construction(), Construction::Unavailable)
        {
            return Err(MapperError::not_constructible(format!(
                "{} has no parameterless constructor and the map declares none",
                destination.key()
            )));
        }

        let mut bindings = self.bindings;
        for convention in &self.conventions {
            bindings.extend(convention.bindings(&source, &destination)?.iter().cloned());
        }

        Ok(MapDefinition::new(
            MappingKey::of::<S, D>(),
            self.constructor,
            self.before,
            bindings,
            self.after,
        ))
    }

    fn advance(
        &mut self,
        call: &str,
        allowed_up_to: ConfigState,
        next: ConfigState,
    ) -> Result<(), MapperError> {
        if self.state > allowed_up_to {
            return Err(MapperError::map_configuration(format!(
                "{call} cannot follow {}",
                self.state.last_call()
            )));
        }
        self.state = self.state.max(next);
        Ok(())
    }

    fn advance_binding(&mut self, call: &str) -> Result<(), MapperError> {
        self.advance(
            call,
            ConfigState::BindingsDeclared,
            ConfigState::BindingsDeclared,
        )
    }

    fn bind_path(
        &mut self,
        source_path: &str,
        destination: &str,
        kind: BindingKind,
    ) -> Result<&mut Self, MapperError> {
        self.advance_binding(match kind {
            BindingKind::Plain => "bind",
            BindingKind::ValueMerging => "map_inner",
        })?;
        let path = self.resolve_path(source_path)?;
        let destination_entry = self.catalog.resolve::<D>();
        let member = destination_entry.writable(destination).cloned().ok_or_else(|| {
            MapperError::map_configuration(format!(
                "{} has no writable member '{destination}'",
                destination_entry.key()
            ))
        })?;
        self.bindings.push(Binding::path(path, member, kind)?);
        Ok(self)
    }

    fn resolve_path(&self, source_path: &str) -> Result<Vec<Arc<dyn MemberAccessor>>, MapperError> {
        let mut current: Arc<CatalogEntry> = self.catalog.resolve::<S>();
        let mut path: Vec<Arc<dyn MemberAccessor>> = Vec::new();

        for segment in source_path.split('.') {
            if let Some(previous) = path.last() {
                let value_type = previous.value_type();
                current = self.catalog.entry(value_type.id()).cloned().ok_or_else(|| {
                    MapperError::map_configuration(format!(
                        "cannot resolve '{segment}' in '{source_path}': {value_type} is not a \
                         registered bean (mark '{}' as #[bean(nested)])",
                        previous.name()
                    ))
                })?;
            }
            let member = current.readable(segment).cloned().ok_or_else(|| {
                MapperError::map_configuration(format!(
                    "{} has no readable member '{segment}'",
                    current.key()
                ))
            })?;
            path.push(member);
        }
        Ok(path)
    }
}

fn erase_hook<S, D, F>(hook: F) -> Hook
where
    S: Any,
    D: Any,
    F: Fn(&S, &mut D) + Send + Sync + 'static,
{
    Arc::new(
        move |source: &dyn Any, target: &mut dyn Any| -> Result<(), MapperError> {
            hook(downcast::<S>(source)?, downcast_mut::<D>(target)?);
            Ok(())
        },
    )
}
