//! The favorite product set.
//!
//! A visitor's favorites are a plain set of product ids. The storefront keeps
//! one copy in the visitor's long-lived cache and treats the backend's
//! per-user list as the source of truth whenever someone is logged in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// A set of favorited product ids.
///
/// Serializes as a JSON array of integers, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteSet(BTreeSet<ProductId>);

impl FavoriteSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.0.contains(&id)
    }

    /// Add a product. Returns `false` if it was already a favorite.
    pub fn insert(&mut self, id: ProductId) -> bool {
        self.0.insert(id)
    }

    /// Remove a product. Returns `false` if it was not a favorite.
    pub fn remove(&mut self, id: ProductId) -> bool {
        self.0.remove(&id)
    }

    /// Replace the whole set, e.g. with the list fetched from the backend.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = ProductId>) {
        self.0 = ids.into_iter().collect();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ProductId> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = ProductId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
