use std::any::Any;
use std::fmt;
use std::sync::Arc;

use beanmap_api::{MapperError, MemberAccessor, MemberValue, Value};

use crate::mapper::Mapper;

/// What a path binding does with a non-null source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Write the value (converted when the types differ).
    Plain,
    /// Map the value into the member's current value, or into a new
    /// instance of the member's type when it is null.
    ValueMerging,
}

pub(crate) type ApplyFn =
    Arc<dyn Fn(&dyn Any, &mut dyn Any) -> Result<(), MapperError> + Send + Sync>;

/// One unit of work of a map definition.
#[derive(Clone)]
pub enum Binding {
    Path(PathBinding),
    Function(FunctionBinding),
}

impl Binding {
    /// Binding reading `source_path` (left to right, starting at the source
    /// root) and writing `destination`.
    pub fn path(
        source_path: Vec<Arc<dyn MemberAccessor>>,
        destination: Arc<dyn MemberAccessor>,
        kind: BindingKind,
    ) -> Result<Self, MapperError> {
        if source_path.is_empty() {
            return Err(MapperError::map_configuration(format!(
                "binding '{}' has an empty source path",
                destination.name()
            )));
        }
        Ok(Binding::Path(PathBinding {
            source_path: source_path.into(),
            destination,
            kind,
        }))
    }

    pub(crate) fn function(name: String, apply: ApplyFn) -> Self {
        Binding::Function(FunctionBinding {
            name: name.into(),
            apply,
        })
    }

    /// Destination member name, or the label of a functional binding.
    pub fn name(&self) -> &str {
        match self {
            Binding::Path(b) => b.destination.name(),
            Binding::Function(b) => &b.name,
        }
    }

    pub(crate) fn apply(
        &self,
        source: &dyn Any,
        target: &mut dyn Any,
        mapper: &Mapper,
    ) -> Result<(), MapperError> {
        tracing::trace!(binding = %self.name(), "applying binding");
        let result = match self {
            Binding::Path(b) => b.apply(source, target, mapper),
            Binding::Function(b) => (b.apply)(source, target),
        };
        result.map_err(|e| e.with_context(format!("binding '{}'", self.name())))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Path(b) => fmt::Debug::fmt(b, f),
            Binding::Function(b) => f.debug_tuple("FunctionBinding").field(&b.name).finish(),
        }
    }
}

#[derive(Clone)]
pub struct PathBinding {
    source_path: Arc<[Arc<dyn MemberAccessor>]>,
    destination: Arc<dyn MemberAccessor>,
    kind: BindingKind,
}

impl fmt::Debug for PathBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<&str> = self.source_path.iter().map(|m| m.name()).collect();
        write!(
            f,
            "PathBinding({} -> {}, {:?})",
            path.join("."),
            self.destination.name(),
            self.kind
        )
    }
}

impl PathBinding {
    pub fn source_path(&self) -> &[Arc<dyn MemberAccessor>] {
        &self.source_path
    }

    pub fn destination(&self) -> &Arc<dyn MemberAccessor> {
        &self.destination
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    fn apply(&self, source: &dyn Any, target: &mut dyn Any, mapper: &Mapper) -> Result<(), MapperError> {
        let Some(last) = self.source_path.last() else {
            return Err(MapperError::map_configuration("empty source path"));
        };
        walk(&self.source_path, source, &mut |value| match self.kind {
            BindingKind::Plain => self.write_plain(value, &**last, target, mapper),
            BindingKind::ValueMerging => match value {
                Some(value) => self.merge(value.as_any(), target, mapper),
                None => self.destination.set(target, None),
            },
        })
    }

    fn write_plain(
        &self,
        value: Option<MemberValue<'_>>,
        read_through: &dyn MemberAccessor,
        target: &mut dyn Any,
        mapper: &Mapper,
    ) -> Result<(), MapperError> {
        let value = match value {
            Some(v) => Some(self.coerce(v, read_through, mapper)?),
            None => None,
        };
        self.destination.set(target, value)
    }

    /// Take the value as is when it already has the destination's declared
    /// type, otherwise go through the converter for the exact pair.
    fn coerce(
        &self,
        value: MemberValue<'_>,
        read_through: &dyn MemberAccessor,
        mapper: &Mapper,
    ) -> Result<Value, MapperError> {
        let declared = self.destination.value_type();
        let actual = value.runtime_type();
        if actual == declared.id() {
            return value.into_owned(read_through);
        }
        match mapper.converters().lookup(actual, declared.id()) {
            Some(converter) => converter.convert(value.as_any()),
            None => Err(MapperError::incompatible_binding(format!(
                "cannot assign {} to {declared} and no converter is registered",
                read_through.value_type()
            ))),
        }
    }

    fn merge(&self, value: &dyn Any, target: &mut dyn Any, mapper: &Mapper) -> Result<(), MapperError> {
        let destination = &*self.destination;

        if destination.is_readable() {
            if destination.supports_in_place() {
                if let Some(existing) = destination.get_mut(target)? {
                    return mapper.map_any_into(Some(value), Some(existing));
                }
            } else if let Some(existing) = destination.get(target)? {
                let mut existing = existing.into_owned(destination)?;
                mapper.map_any_into(Some(value), Some(&mut *existing))?;
                return destination.set(target, Some(existing));
            }
        }

        let created = mapper.map_any(Some(value), destination.value_type())?;
        destination.set(target, Some(created))
    }
}

#[derive(Clone)]
pub struct FunctionBinding {
    name: Arc<str>,
    apply: ApplyFn,
}

/// Apply `path` to `current` and hand the final value to `consume`.
///
/// A null intermediate result short-circuits to `consume(None)`.
fn walk(
    path: &[Arc<dyn MemberAccessor>],
    current: &dyn Any,
    consume: &mut dyn FnMut(Option<MemberValue<'_>>) -> Result<(), MapperError>,
) -> Result<(), MapperError> {
    let Some((member, rest)) = path.split_first() else {
        return Err(MapperError::map_configuration("empty source path"));
    };
    match member.get(current)? {
        None => consume(None),
        Some(value) if rest.is_empty() => consume(Some(value)),
        Some(value) => walk(rest, value.as_any(), consume),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MapperBuilder;
    use beanmap_api::{Bean, ErrorKind, FieldAccessor, TypeKey};

    #[derive(Bean, Debug, Default, Clone, PartialEq)]
    struct Address {
        pub city: String,
        pub zip: Option<String>,
    }

    #[derive(Bean, Debug, Default, Clone, PartialEq)]
    struct Person {
        #[bean(nested)]
        pub address: Option<Address>,
        pub age: i32,
    }

    #[derive(Bean, Debug, Default, Clone, PartialEq)]
    struct Card {
        pub city: Option<String>,
        pub age: i64,
        pub label: String,
    }

    fn member(info: beanmap_api::BeanInfo, name: &str) -> Arc<dyn MemberAccessor> {
        info.fields()
            .iter()
            .chain(info.properties())
            .find(|m| m.name() == name)
            .cloned()
            .unwrap()
    }

    #[test]
    fn path_walks_nested_members() {
        let mapper = MapperBuilder::new().build_mapper();
        let binding = Binding::path(
            vec![member(Person::describe(), "address"), member(Address::describe(), "city")],
            member(Card::describe(), "city"),
            BindingKind::Plain,
        )
        .unwrap();

        let person = Person {
            address: Some(Address {
                city: "Oslo".into(),
                zip: None,
            }),
            age: 3,
        };
        let mut card = Card::default();
        binding.apply(&person, &mut card, &mapper).unwrap();
        assert_eq!(card.city.as_deref(), Some("Oslo"));
    }

    #[test]
    fn null_intermediate_writes_null() {
        let mapper = MapperBuilder::new().build_mapper();
        let binding = Binding::path(
            vec![member(Person::describe(), "address"), member(Address::describe(), "city")],
            member(Card::describe(), "city"),
            BindingKind::Plain,
        )
        .unwrap();

        let mut card = Card {
            city: Some("stale".into()),
            ..Default::default()
        };
        binding.apply(&Person::default(), &mut card, &mapper).unwrap();
        assert_eq!(card.city, None);
    }

    #[test]
    fn null_into_non_nullable_member_is_incompatible() {
        let mapper = MapperBuilder::new().build_mapper();
        let binding = Binding::path(
            vec![member(Person::describe(), "address"), member(Address::describe(), "zip")],
            member(Card::describe(), "label"),
            BindingKind::Plain,
        )
        .unwrap();

        let err = binding
            .apply(&Person::default(), &mut Card::default(), &mapper)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IncompatibleBinding);
        assert!(err.message.starts_with("binding 'label': "));
    }

    #[test]
    fn type_mismatch_needs_a_converter() {
        let binding = Binding::path(
            vec![member(Person::describe(), "age")],
            member(Card::describe(), "age"),
            BindingKind::Plain,
        )
        .unwrap();
        let person = Person {
            age: 41,
            ..Default::default()
        };

        let bare = MapperBuilder::new().build_mapper();
        let err = binding.apply(&person, &mut Card::default(), &bare).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IncompatibleBinding);

        let mapper = MapperBuilder::new()
            .add_converter(beanmap_api::converter(|v: &i32| i64::from(*v)))
            .unwrap()
            .build_mapper();
        let mut card = Card::default();
        binding.apply(&person, &mut card, &mapper).unwrap();
        assert_eq!(card.age, 41);
    }

    #[test]
    fn function_bindings_carry_their_label_in_errors() {
        let mapper = MapperBuilder::new().build_mapper();
        let binding = Binding::function(
            "function #0".into(),
            Arc::new(|_: &dyn Any, _: &mut dyn Any| -> Result<(), MapperError> {
                Err(MapperError::incompatible_binding("boom"))
            }),
        );
        let err = binding.apply(&1_u8, &mut 2_u8, &mapper).unwrap_err();
        assert_eq!(err.message, "binding 'function #0': boom");
    }

    #[test]
    fn empty_paths_are_rejected() {
        let destination: Arc<dyn MemberAccessor> = Arc::new(FieldAccessor::required(
            "label",
            |c: &Card| &c.label,
            |c: &mut Card| &mut c.label,
        ));
        let err = Binding::path(Vec::new(), destination.clone(), BindingKind::Plain).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MapConfiguration);
        assert_eq!(destination.value_type(), TypeKey::of::<String>());
    }
}
