use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use beanmap_api::{MapperError, MemberAccessor};

use crate::binding::{Binding, BindingKind};
use crate::catalog::CatalogEntry;
use crate::lock;

/// Policy synthesizing bindings for a type pair.
pub trait Convention: Send + Sync {
    /// Checked once when the convention is installed.
    fn validate(&self) -> Result<(), MapperError>;

    /// Bindings for `source -> destination`. Repeated calls for the same
    /// pair return the same list.
    fn bindings(
        &self,
        source: &CatalogEntry,
        destination: &CatalogEntry,
    ) -> Result<Arc<[Binding]>, MapperError>;
}

/// Options of the name-based convention.
///
/// Only the all-off combination is implemented; enabling anything else is
/// rejected by `validate` with `UnsupportedConventionOption`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConventionOptions {
    /// Match `customerName` against `customer.name`.
    pub flattening: bool,
    pub include_destination_members: Vec<String>,
    pub exclude_destination_members: Vec<String>,
    pub fail_if_not_all_destination_members_mapped: bool,
    pub fail_if_not_all_source_members_mapped: bool,
    /// Convert or map members whose types differ.
    pub cast_or_map_if_possible: bool,
}

impl ConventionOptions {
    pub fn validate(&self) -> Result<(), MapperError> {
        let enabled = [
            ("flattening", self.flattening),
            (
                "include_destination_members",
                !self.include_destination_members.is_empty(),
            ),
            (
                "exclude_destination_members",
                !self.exclude_destination_members.is_empty(),
            ),
            (
                "fail_if_not_all_destination_members_mapped",
                self.fail_if_not_all_destination_members_mapped,
            ),
            (
                "fail_if_not_all_source_members_mapped",
                self.fail_if_not_all_source_members_mapped,
            ),
            ("cast_or_map_if_possible", self.cast_or_map_if_possible),
        ];
        match enabled.iter().find(|(_, on)| *on) {
            Some((option, _)) => Err(MapperError::unsupported_convention_option(option)),
            None => Ok(()),
        }
    }
}

type PairCache = HashMap<(TypeId, TypeId), Arc<[Binding]>>;

/// Binds destination members to source members with the same name and the
/// same declared value type. A nullable source member never binds to a
/// required destination member.
///
/// Destination properties are visited first, then fields. A destination
/// property prefers a source property, a destination field a source field.
#[derive(Debug, Default)]
pub struct NameBasedConvention {
    options: ConventionOptions,
    cache: RwLock<PairCache>,
}

impl Clone for NameBasedConvention {
    fn clone(&self) -> Self {
        Self::from_options(self.options.clone())
    }
}

impl NameBasedConvention {
    /// Exact name, exact type, nothing else.
    pub fn strict_match() -> Self {
        Self::default()
    }

    /// Flattening and cast-or-map on.
    pub fn flexible_match() -> Self {
        Self::strict_match()
            .enable_flattening()
            .cast_or_map_if_possible()
    }

    pub fn from_options(options: ConventionOptions) -> Self {
        Self {
            options,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &ConventionOptions {
        &self.options
    }

    pub fn enable_flattening(mut self) -> Self {
        self.options.flattening = true;
        self
    }

    pub fn disable_flattening(mut self) -> Self {
        self.options.flattening = false;
        self
    }

    pub fn include_destination_members<I, N>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.options
            .include_destination_members
            .extend(members.into_iter().map(Into::into));
        self
    }

    pub fn exclude_destination_members<I, N>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.options
            .exclude_destination_members
            .extend(members.into_iter().map(Into::into));
        self
    }

    pub fn fail_if_not_all_destination_members_mapped(mut self) -> Self {
        self.options.fail_if_not_all_destination_members_mapped = true;
        self
    }

    pub fn fail_if_not_all_source_members_mapped(mut self) -> Self {
        self.options.fail_if_not_all_source_members_mapped = true;
        self
    }

    pub fn cast_or_map_if_possible(mut self) -> Self {
        self.options.cast_or_map_if_possible = true;
        self
    }

    pub fn map_only_same_type_members(mut self) -> Self {
        self.options.cast_or_map_if_possible = false;
        self
    }

    fn synthesize(
        &self,
        source: &CatalogEntry,
        destination: &CatalogEntry,
    ) -> Result<Vec<Binding>, MapperError> {
        let mut bindings = Vec::new();

        for member in destination.properties().iter().filter(|m| m.is_writable()) {
            let matched = find_match(source.properties(), member)
                .or_else(|| find_match(source.fields(), member));
            if let Some(source_member) = matched {
                bindings.push(plain(source_member, member)?);
            }
        }

        for member in destination.fields().iter().filter(|m| m.is_writable()) {
            let matched = find_match(source.fields(), member)
                .or_else(|| find_match(source.properties(), member));
            if let Some(source_member) = matched {
                bindings.push(plain(source_member, member)?);
            }
        }

        Ok(bindings)
    }
}

impl Convention for NameBasedConvention {
    fn validate(&self) -> Result<(), MapperError> {
        self.options.validate()
    }

    fn bindings(
        &self,
        source: &CatalogEntry,
        destination: &CatalogEntry,
    ) -> Result<Arc<[Binding]>, MapperError> {
        let key = (source.key().id(), destination.key().id());
        if let Some(cached) = lock::read(&self.cache, "convention").get(&key) {
            return Ok(cached.clone());
        }

        let computed: Arc<[Binding]> = self.synthesize(source, destination)?.into();
        tracing::debug!(
            source = %source.key(),
            destination = %destination.key(),
            bindings = computed.len(),
            "convention bindings synthesized"
        );

        // First writer wins; a concurrent duplicate is dropped.
        let mut cache = lock::write(&self.cache, "convention");
        Ok(cache.entry(key).or_insert(computed).clone())
    }
}

fn find_match<'m>(
    candidates: &'m [Arc<dyn MemberAccessor>],
    destination: &Arc<dyn MemberAccessor>,
) -> Option<&'m Arc<dyn MemberAccessor>> {
    candidates.iter().find(|m| {
        m.is_readable()
            && m.name() == destination.name()
            && m.value_type() == destination.value_type()
            && (destination.is_nullable() || !m.is_nullable())
    })
}

fn plain(
    source: &Arc<dyn MemberAccessor>,
    destination: &Arc<dyn MemberAccessor>,
) -> Result<Binding, MapperError> {
    Binding::path(vec![source.clone()], destination.clone(), BindingKind::Plain)
}
