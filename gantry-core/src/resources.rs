use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt::{self, Display, Formatter};

/// Quantities are kept at a resolution of 1/10000 of a unit, so that repeated
/// acquire/release cycles of fractional amounts cancel out exactly.
const RESOURCE_UNIT_SCALING: f64 = 10_000.0;

fn normalize(quantity: f64) -> f64 {
    (quantity * RESOURCE_UNIT_SCALING).round() / RESOURCE_UNIT_SCALING
}

/// Mapping from resource name (`CPU`, `memory`, custom labels, ...) to quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSet(BTreeMap<String, f64>);

impl ResourceSet {
    pub fn new() -> Self {
        ResourceSet(BTreeMap::new())
    }

    /// Quantity of `name`, or `None` when the resource is not part of the set.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Quantity of `name`, treating an absent resource as zero.
    pub fn quantity(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, quantity: f64) {
        self.0.insert(name.into(), normalize(quantity));
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True if any quantity is negative or not a finite number.
    pub fn has_invalid_quantity(&self) -> bool {
        self.0.values().any(|q| !q.is_finite() || *q < 0.0)
    }

    /// True if every resource of `self` is present in `other` with at least the same quantity.
    pub fn is_subset_of(&self, other: &ResourceSet) -> bool {
        self.0
            .iter()
            .all(|(name, quantity)| other.get(name).map_or(false, |have| have >= *quantity))
    }

    /// Drops resources absent from `cap` and keeps every quantity within `[0, cap]`.
    ///
    /// Negative and NaN quantities become zero.
    pub fn clamp_to(&mut self, cap: &ResourceSet) {
        self.0.retain(|name, _| cap.contains(name));
        for (name, quantity) in self.0.iter_mut() {
            *quantity = quantity.max(0.0).min(cap.quantity(name));
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut set = ResourceSet::new();
        for (name, quantity) in iter {
            set.set(name, quantity);
        }
        set
    }
}

impl<K: Into<String>, const N: usize> From<[(K, f64); N]> for ResourceSet {
    fn from(entries: [(K, f64); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = (&'a String, &'a f64);
    type IntoIter = btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for ResourceSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, quantity)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, quantity)?;
        }
        write!(f, "}}")
    }
}
