use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use beanmap_api::MapperError;

use crate::catalog::CatalogEntry;
use crate::convention::Convention;
use crate::definition::{MapDefinition, MappingKey};
use crate::lock;

/// Coarse rank of a candidate map. Lower is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    ExactPair,
    ExactDestination,
    ExactSource,
    Inherited,
}

/// Total order over candidate maps for a runtime pair; the minimum wins.
///
/// Tier first, then source ancestor distance, then destination ancestor
/// distance, then registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    pub tier: Tier,
    pub source_distance: usize,
    pub destination_distance: usize,
    pub order: usize,
}

impl Specificity {
    pub fn new(source_distance: usize, destination_distance: usize, order: usize) -> Self {
        let tier = match (source_distance, destination_distance) {
            (0, 0) => Tier::ExactPair,
            (_, 0) => Tier::ExactDestination,
            (0, _) => Tier::ExactSource,
            _ => Tier::Inherited,
        };
        Self {
            tier,
            source_distance,
            destination_distance,
            order,
        }
    }
}

#[derive(Clone)]
enum Selection {
    Declared(usize),
    Fallback(Arc<MapDefinition>),
    Unmatched,
}

/// All map definitions of a mapper plus the any-by-convention fallbacks.
///
/// Frozen after assembly except for the selection cache.
#[derive(Default)]
pub struct MapRegistry {
    definitions: Vec<Arc<MapDefinition>>,
    by_pair: HashMap<(TypeId, TypeId), usize>,
    fallbacks: Vec<Arc<dyn Convention>>,
    selections: RwLock<HashMap<(TypeId, TypeId), Selection>>,
}

impl std::fmt::Debug for MapRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapRegistry")
            .field("definitions", &self.definitions)
            .field("fallbacks", &self.fallbacks.len())
            .finish_non_exhaustive()
    }
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `MapConfiguration` when the exact pair is already registered.
    pub(crate) fn add(&mut self, definition: MapDefinition) -> Result<(), MapperError> {
        let key = definition.key();
        let pair = (key.source.id(), key.destination.id());
        if self.by_pair.contains_key(&pair) {
            return Err(MapperError::map_configuration(format!(
                "map {key} is already registered"
            )));
        }
        self.by_pair.insert(pair, self.definitions.len());
        self.definitions.push(Arc::new(definition));
        Ok(())
    }

    pub(crate) fn add_fallback(&mut self, convention: Arc<dyn Convention>) {
        self.fallbacks.push(convention);
    }

    pub fn definitions(&self) -> &[Arc<MapDefinition>] {
        &self.definitions
    }

    pub fn get(&self, key: MappingKey) -> Option<&Arc<MapDefinition>> {
        self.by_pair
            .get(&(key.source.id(), key.destination.id()))
            .and_then(|&i| self.definitions.get(i))
    }

    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    /// Best definition for an object of type `source` mapped to `destination`.
    pub fn select(
        &self,
        source: &CatalogEntry,
        destination: &CatalogEntry,
    ) -> Result<Arc<MapDefinition>, MapperError> {
        let pair = (source.key().id(), destination.key().id());
        let cached = lock::read(&self.selections, "selection").get(&pair).cloned();
        let selection = match cached {
            Some(selection) => selection,
            None => {
                let computed = self.compute(source, destination)?;
                let mut cache = lock::write(&self.selections, "selection");
                cache.entry(pair).or_insert(computed).clone()
            }
        };

        match selection {
            Selection::Declared(index) => self.definitions.get(index).cloned().ok_or_else(|| {
                MapperError::no_matching_map(format!("map #{index} is missing"))
            }),
            Selection::Fallback(definition) => Ok(definition),
            Selection::Unmatched => Err(MapperError::no_matching_map(format!(
                "no map from {} to {}",
                source.key(),
                destination.key()
            ))),
        }
    }

    /// Most specific declared candidate as `(index, specificity)`.
    pub fn rank(&self, source: &CatalogEntry, destination: &CatalogEntry) -> Option<(usize, Specificity)> {
        let mut best: Option<(usize, Specificity)> = None;
        for s in source.ancestors() {
            for d in destination.ancestors() {
                let Some(&index) = self.by_pair.get(&(s.key().id(), d.key().id())) else {
                    continue;
                };
                let candidate = Specificity::new(s.distance(), d.distance(), index);
                if best.is_none_or(|(_, current)| candidate < current) {
                    best = Some((index, candidate));
                }
            }
        }
        best
    }

    fn compute(&self, source: &CatalogEntry, destination: &CatalogEntry) -> Result<Selection, MapperError> {
        if let Some((index, specificity)) = self.rank(source, destination) {
            tracing::debug!(
                source = %source.key(),
                destination = %destination.key(),
                selected = %self.definitions[index].key(),
                tier = ?specificity.tier,
                "map selected"
            );
            return Ok(Selection::Declared(index));
        }

        let Some(convention) = self.fallbacks.first() else {
            tracing::debug!(
                source = %source.key(),
                destination = %destination.key(),
                "no map matches"
            );
            return Ok(Selection::Unmatched);
        };

        let bindings = convention.bindings(source, destination)?;
        tracing::debug!(
            source = %source.key(),
            destination = %destination.key(),
            bindings = bindings.len(),
            "falling back to any-by-convention"
        );
        Ok(Selection::Fallback(Arc::new(MapDefinition::synthesized(
            MappingKey::new(source.key(), destination.key()),
            &bindings,
        ))))
    }
}
