use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use beanmap_api::{
    Bean, BeanInfo, Construction, MapperError, MemberAccessor, MemberKind, MemberValue,
    ParentLink, TypeKey, Value,
};

/// One ancestor of a catalogued type (the type itself at distance 0).
#[derive(Clone)]
pub struct Ancestor {
    key: TypeKey,
    distance: usize,
    /// Parent links from the descendant down to this ancestor.
    chain: Arc<[ParentLink]>,
}

impl Ancestor {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn distance(&self) -> usize {
        self.distance
    }

    /// View `value` (an instance of the descendant) as this ancestor.
    pub fn upcast<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        self.chain.iter().try_fold(value, |v, link| link.upcast(v))
    }

    pub fn upcast_mut<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        self.chain.iter().try_fold(value, |v, link| link.upcast_mut(v))
    }
}

impl std::fmt::Debug for Ancestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ancestor")
            .field("key", &self.key)
            .field("distance", &self.distance)
            .finish()
    }
}

/// Catalogued type: its description, precomputed ancestor table and the
/// effective member lists (own members first, then inherited ones not
/// shadowed by name).
pub struct CatalogEntry {
    info: BeanInfo,
    ancestors: Vec<Ancestor>,
    properties: Vec<Arc<dyn MemberAccessor>>,
    fields: Vec<Arc<dyn MemberAccessor>>,
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("type", &self.info.type_key())
            .field("ancestors", &self.ancestors)
            .finish_non_exhaustive()
    }
}

impl CatalogEntry {
    pub fn key(&self) -> TypeKey {
        self.info.type_key()
    }

    pub fn construction(&self) -> Construction {
        self.info.construction()
    }

    /// Ancestors ordered by distance, then parent declaration order.
    pub fn ancestors(&self) -> &[Ancestor] {
        &self.ancestors
    }

    pub fn ancestor(&self, key: TypeKey) -> Option<&Ancestor> {
        self.ancestors.iter().find(|a| a.key == key)
    }

    pub fn is_a(&self, key: TypeKey) -> bool {
        self.ancestor(key).is_some()
    }

    pub fn properties(&self) -> &[Arc<dyn MemberAccessor>] {
        &self.properties
    }

    pub fn fields(&self) -> &[Arc<dyn MemberAccessor>] {
        &self.fields
    }

    /// Readable member by name; properties shadow fields.
    pub fn readable(&self, name: &str) -> Option<&Arc<dyn MemberAccessor>> {
        self.properties
            .iter()
            .chain(&self.fields)
            .find(|m| m.name() == name && m.is_readable())
    }

    /// Writable member by name; properties shadow fields.
    pub fn writable(&self, name: &str) -> Option<&Arc<dyn MemberAccessor>> {
        self.properties
            .iter()
            .chain(&self.fields)
            .find(|m| m.name() == name && m.is_writable())
    }

    /// Instantiate through the parameterless constructor.
    pub fn construct(&self) -> Result<Value, MapperError> {
        match self.info.construction() {
            Construction::Default(construct) => Ok(construct()),
            Construction::Abstract => Err(MapperError::not_constructible(format!(
                "{} is abstract",
                self.key()
            ))),
            Construction::Unavailable => Err(MapperError::not_constructible(format!(
                "{} has no parameterless constructor",
                self.key()
            ))),
        }
    }
}

/// Registry of the bean types known to a mapper.
///
/// Filled during assembly, read-only afterwards.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    entries: HashMap<TypeId, Arc<CatalogEntry>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type together with its ancestors and the bean types of
    /// its `nested` members.
    pub fn register(&mut self, describe: fn() -> BeanInfo) {
        let mut visiting = HashSet::new();
        self.register_info(describe(), &mut visiting);
    }

    pub fn register_bean<T: Bean>(&mut self) {
        self.register(T::describe);
    }

    pub fn entry(&self, id: TypeId) -> Option<&Arc<CatalogEntry>> {
        self.entries.get(&id)
    }

    /// Entry for `T`, built on the fly when `T` was never registered.
    pub fn resolve<T: Bean>(&self) -> Arc<CatalogEntry> {
        match self.entries.get(&TypeId::of::<T>()) {
            Some(entry) => entry.clone(),
            None => Arc::new(self.build_entry(T::describe())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register_info(&mut self, info: BeanInfo, visiting: &mut HashSet<TypeId>) {
        let id = info.type_key().id();
        if self.entries.contains_key(&id) || !visiting.insert(id) {
            return;
        }

        for parent in info.parents() {
            self.register_info(parent.describe(), visiting);
        }

        let nested: Vec<fn() -> BeanInfo> = info
            .properties()
            .iter()
            .chain(info.fields())
            .filter_map(|m| m.nested())
            .collect();

        let entry = self.build_entry(info);
        tracing::debug!(
            bean = %entry.key(),
            ancestors = entry.ancestors.len(),
            properties = entry.properties.len(),
            fields = entry.fields.len(),
            "type registered"
        );
        self.entries.insert(id, Arc::new(entry));

        // After insertion, so self-referencing graphs terminate.
        for describe in nested {
            self.register_info(describe(), visiting);
        }
    }

    fn build_entry(&self, info: BeanInfo) -> CatalogEntry {
        let mut ancestors = vec![Ancestor {
            key: info.type_key(),
            distance: 0,
            chain: Arc::from(Vec::new()),
        }];
        let mut properties = info.properties().to_vec();
        let mut fields = info.fields().to_vec();

        for link in info.parents() {
            let parent_info = link.describe();
            let parent = match self.entries.get(&parent_info.type_key().id()) {
                Some(entry) => entry.clone(),
                None => Arc::new(self.build_entry(parent_info)),
            };

            for ancestor in parent.ancestors() {
                let chain: Arc<[ParentLink]> = std::iter::once(*link)
                    .chain(ancestor.chain.iter().copied())
                    .collect();
                ancestors.push(Ancestor {
                    key: ancestor.key,
                    distance: ancestor.distance + 1,
                    chain,
                });
            }
            inherit(&mut properties, parent.properties(), link);
            inherit(&mut fields, parent.fields(), link);
        }

        // Stable: parent declaration order survives within a distance.
        ancestors.sort_by_key(|a| a.distance);
        let mut seen = HashSet::new();
        ancestors.retain(|a| seen.insert(a.key.id()));

        CatalogEntry {
            info,
            ancestors,
            properties,
            fields,
        }
    }
}

fn inherit(
    own: &mut Vec<Arc<dyn MemberAccessor>>,
    inherited: &[Arc<dyn MemberAccessor>],
    link: &ParentLink,
) {
    for member in inherited {
        if own.iter().any(|m| m.name() == member.name()) {
            continue;
        }
        own.push(Arc::new(InheritedMember {
            link: *link,
            inner: member.clone(),
        }));
    }
}

/// Member of an ancestor seen through a descendant.
struct InheritedMember {
    link: ParentLink,
    inner: Arc<dyn MemberAccessor>,
}

impl InheritedMember {
    fn unreachable(&self) -> MapperError {
        MapperError::incompatible_binding(format!(
            "member '{}' of {} is not reachable from the given object",
            self.inner.name(),
            self.inner.owner()
        ))
    }
}

impl MemberAccessor for InheritedMember {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> MemberKind {
        self.inner.kind()
    }

    fn owner(&self) -> TypeKey {
        self.inner.owner()
    }

    fn value_type(&self) -> TypeKey {
        self.inner.value_type()
    }

    fn is_nullable(&self) -> bool {
        self.inner.is_nullable()
    }

    fn is_readable(&self) -> bool {
        self.inner.is_readable()
    }

    fn is_writable(&self) -> bool {
        self.inner.is_writable()
    }

    fn supports_in_place(&self) -> bool {
        self.inner.supports_in_place()
    }

    fn nested(&self) -> Option<fn() -> BeanInfo> {
        self.inner.nested()
    }

    fn get<'a>(&self, target: &'a dyn Any) -> Result<Option<MemberValue<'a>>, MapperError> {
        let target = self.link.upcast(target).ok_or_else(|| self.unreachable())?;
        self.inner.get(target)
    }

    fn get_mut<'a>(
        &self,
        target: &'a mut dyn Any,
    ) -> Result<Option<&'a mut dyn Any>, MapperError> {
        let target = self
            .link
            .upcast_mut(target)
            .ok_or_else(|| self.unreachable())?;
        self.inner.get_mut(target)
    }

    fn set(&self, target: &mut dyn Any, value: Option<Value>) -> Result<(), MapperError> {
        let target = self
            .link
            .upcast_mut(target)
            .ok_or_else(|| self.unreachable())?;
        self.inner.set(target, value)
    }

    fn clone_value(&self, value: &dyn Any) -> Result<Value, MapperError> {
        self.inner.clone_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanmap_api::ErrorKind;

    #[derive(Bean, Debug, Default, Clone, PartialEq)]
    #[bean(abstract_type)]
    struct Entity {
        pub id: u64,
        pub label: String,
    }

    #[derive(Bean, Debug, Default, Clone, PartialEq)]
    struct Tagged {
        pub tag: String,
    }

    #[derive(Bean, Debug, Default, Clone, PartialEq)]
    struct Document {
        #[bean(parent)]
        pub entity: Entity,
        pub title: String,
    }

    #[derive(Bean, Debug, Default, Clone, PartialEq)]
    struct Invoice {
        #[bean(parent)]
        pub document: Document,
        #[bean(parent)]
        pub tagged: Tagged,
        pub label: String,
        #[bean(nested)]
        pub lines: Option<Line>,
    }

    #[derive(Bean, Debug, Default, Clone, PartialEq)]
    struct Line {
        pub amount: i64,
        #[bean(nested)]
        pub next: Option<Box<Line>>,
    }

    impl Bean for Box<Line> {
        fn describe() -> BeanInfo {
            Line::describe()
        }
    }

    fn names(members: &[Arc<dyn MemberAccessor>]) -> Vec<&str> {
        members.iter().map(|m| m.name()).collect()
    }

    #[test]
    fn ancestors_are_ordered_by_distance_then_declaration() {
        let mut catalog = TypeCatalog::new();
        catalog.register_bean::<Invoice>();

        let entry = catalog.entry(TypeId::of::<Invoice>()).unwrap();
        let order: Vec<_> = entry
            .ancestors()
            .iter()
            .map(|a| (a.key(), a.distance()))
            .collect();
        assert_eq!(
            order,
            vec![
                (TypeKey::of::<Invoice>(), 0),
                (TypeKey::of::<Document>(), 1),
                (TypeKey::of::<Tagged>(), 1),
                (TypeKey::of::<Entity>(), 2),
            ]
        );
        assert!(entry.is_a(TypeKey::of::<Entity>()));
        assert!(!entry.is_a(TypeKey::of::<Line>()));
    }

    #[test]
    fn parents_and_nested_types_are_registered() {
        let mut catalog = TypeCatalog::new();
        catalog.register_bean::<Invoice>();

        for id in [
            TypeId::of::<Document>(),
            TypeId::of::<Entity>(),
            TypeId::of::<Tagged>(),
            TypeId::of::<Line>(),
        ] {
            assert!(catalog.entry(id).is_some());
        }
    }

    #[test]
    fn upcast_chains_reach_distant_ancestors() {
        let mut catalog = TypeCatalog::new();
        catalog.register_bean::<Invoice>();
        let entry = catalog.entry(TypeId::of::<Invoice>()).unwrap();

        let mut invoice = Invoice::default();
        invoice.document.entity.id = 7;

        let entity = entry.ancestor(TypeKey::of::<Entity>()).unwrap();
        let seen = entity.upcast(&invoice).unwrap();
        assert_eq!(seen.downcast_ref::<Entity>().unwrap().id, 7);

        let seen = entity.upcast_mut(&mut invoice).unwrap();
        seen.downcast_mut::<Entity>().unwrap().id = 8;
        assert_eq!(invoice.document.entity.id, 8);
    }

    #[test]
    fn own_members_shadow_inherited_ones() {
        let mut catalog = TypeCatalog::new();
        catalog.register_bean::<Invoice>();
        let entry = catalog.entry(TypeId::of::<Invoice>()).unwrap();

        assert_eq!(
            names(entry.fields()),
            vec!["label", "lines", "title", "id", "tag"]
        );

        let mut invoice = Invoice::default();
        entry
            .writable("id")
            .unwrap()
            .set(&mut invoice, Some(Box::new(42_u64)))
            .unwrap();
        entry
            .writable("label")
            .unwrap()
            .set(&mut invoice, Some(Box::new(String::from("own"))))
            .unwrap();
        assert_eq!(invoice.document.entity.id, 42);
        assert_eq!(invoice.label, "own");
        assert_eq!(invoice.document.entity.label, "");
    }

    #[test]
    fn construction_follows_the_description() {
        let mut catalog = TypeCatalog::new();
        catalog.register_bean::<Document>();

        let err = catalog
            .entry(TypeId::of::<Entity>())
            .unwrap()
            .construct()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotConstructible);

        let doc = catalog
            .entry(TypeId::of::<Document>())
            .unwrap()
            .construct()
            .unwrap();
        assert!(doc.downcast_ref::<Document>().is_some());
    }

    #[test]
    fn unregistered_types_resolve_on_the_fly() {
        let catalog = TypeCatalog::new();
        let entry = catalog.resolve::<Document>();
        assert!(entry.is_a(TypeKey::of::<Entity>()));
        assert!(catalog.is_empty());
    }
}
