//! Favorites mirror.
//!
//! The backend's per-user list is the source of truth while someone is
//! logged in. The session keeps a cache that survives logout. Mutations touch
//! the cache only after the backend acknowledged them, and a user change
//! replaces the cache wholesale with the backend's list.

use std::future::Future;

use atelier_core::{FavoriteSet, ProductId, User, UserId};
use secrecy::SecretString;
use thiserror::Error;
use tower_sessions::Session;

use crate::backend::{BackendClient, BackendError};
use crate::models::keys;

/// Errors from the favorites cache.
#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Result of an add or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The backend acknowledged and the cache was updated.
    Applied,
    /// Nobody is logged in; nothing happened.
    Unauthenticated,
    /// The backend call failed; the cache is unchanged.
    RemoteFailed,
}

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggled {
    pub outcome: MutationOutcome,
    /// Whether the product is a favorite after the call.
    pub favorite: bool,
}

/// Local storage for the favorite set.
pub trait FavoritesCache: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<FavoriteSet, FavoritesError>> + Send;

    fn save(
        &self,
        favorites: &FavoriteSet,
    ) -> impl Future<Output = Result<(), FavoritesError>> + Send;

    /// User the cache was last replaced for.
    fn synced_for(&self) -> impl Future<Output = Result<Option<UserId>, FavoritesError>> + Send;

    fn mark_synced(&self, user_id: UserId)
    -> impl Future<Output = Result<(), FavoritesError>> + Send;
}

/// The per-user favorite list on the backend.
pub trait FavoritesRemote: Send + Sync {
    fn fetch(&self, user: &User)
    -> impl Future<Output = Result<Vec<ProductId>, BackendError>> + Send;

    fn add(
        &self,
        user: &User,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn remove(
        &self,
        user: &User,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Favorites cache in the visitor's session.
#[derive(Clone)]
pub struct SessionFavoritesCache {
    session: Session,
}

impl SessionFavoritesCache {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl FavoritesCache for SessionFavoritesCache {
    async fn load(&self) -> Result<FavoriteSet, FavoritesError> {
        Ok(self
            .session
            .get::<FavoriteSet>(keys::FAVORITES)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, favorites: &FavoriteSet) -> Result<(), FavoritesError> {
        self.session.insert(keys::FAVORITES, favorites).await?;
        Ok(())
    }

    async fn synced_for(&self) -> Result<Option<UserId>, FavoritesError> {
        Ok(self.session.get(keys::FAVORITES_SYNCED_FOR).await?)
    }

    async fn mark_synced(&self, user_id: UserId) -> Result<(), FavoritesError> {
        self.session
            .insert(keys::FAVORITES_SYNCED_FOR, user_id)
            .await?;
        Ok(())
    }
}

/// Favorite list on the backend, called with the visitor's token.
pub struct BackendFavorites<'a> {
    backend: &'a BackendClient,
    token: Option<&'a SecretString>,
}

impl<'a> BackendFavorites<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient, token: Option<&'a SecretString>) -> Self {
        Self { backend, token }
    }
}

impl FavoritesRemote for BackendFavorites<'_> {
    async fn fetch(&self, user: &User) -> Result<Vec<ProductId>, BackendError> {
        let entries = self.backend.favorites(self.token, user.id).await?;
        Ok(entries.iter().filter_map(|entry| entry.product_id()).collect())
    }

    async fn add(&self, user: &User, product_id: ProductId) -> Result<(), BackendError> {
        self.backend.add_favorite(self.token, user, product_id).await
    }

    async fn remove(&self, user: &User, product_id: ProductId) -> Result<(), BackendError> {
        self.backend
            .remove_favorite(self.token, user, product_id)
            .await
    }
}

/// Keeps the cache and the backend list converging.
pub struct FavoritesMirror<C, R> {
    cache: C,
    remote: R,
}

impl<C: FavoritesCache, R: FavoritesRemote> FavoritesMirror<C, R> {
    #[must_use]
    pub const fn new(cache: C, remote: R) -> Self {
        Self { cache, remote }
    }

    /// The cached set.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read.
    pub async fn favorites(&self) -> Result<FavoriteSet, FavoritesError> {
        self.cache.load().await
    }

    /// Replace the cache with the backend list when the user changed.
    ///
    /// Without a user the cache is returned untouched. A failed fetch keeps
    /// the cache and is retried on the next call.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read or written.
    pub async fn reconcile(&self, user: Option<&User>) -> Result<FavoriteSet, FavoritesError> {
        let Some(user) = user else {
            return self.cache.load().await;
        };

        if self.cache.synced_for().await? == Some(user.id) {
            return self.cache.load().await;
        }

        match self.remote.fetch(user).await {
            Ok(ids) => {
                let favorites: FavoriteSet = ids.into_iter().collect();
                self.cache.save(&favorites).await?;
                self.cache.mark_synced(user.id).await?;
                tracing::debug!(user_id = %user.id, count = favorites.len(), "Favorites reconciled");
                Ok(favorites)
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to fetch favorites");
                self.cache.load().await
            }
        }
    }

    /// Add a favorite once the backend confirms.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read or written.
    pub async fn add(
        &self,
        user: Option<&User>,
        product_id: ProductId,
    ) -> Result<MutationOutcome, FavoritesError> {
        let Some(user) = user else {
            return Ok(MutationOutcome::Unauthenticated);
        };

        if let Err(e) = self.remote.add(user, product_id).await {
            tracing::warn!(product_id = %product_id, error = %e, "Failed to add favorite");
            return Ok(MutationOutcome::RemoteFailed);
        }

        let mut favorites = self.cache.load().await?;
        favorites.insert(product_id);
        self.cache.save(&favorites).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Remove a favorite once the backend confirms.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read or written.
    pub async fn remove(
        &self,
        user: Option<&User>,
        product_id: ProductId,
    ) -> Result<MutationOutcome, FavoritesError> {
        let Some(user) = user else {
            return Ok(MutationOutcome::Unauthenticated);
        };

        if let Err(e) = self.remote.remove(user, product_id).await {
            tracing::warn!(product_id = %product_id, error = %e, "Failed to remove favorite");
            return Ok(MutationOutcome::RemoteFailed);
        }

        let mut favorites = self.cache.load().await?;
        favorites.remove(product_id);
        self.cache.save(&favorites).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Remove when present, add otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read or written.
    pub async fn toggle(
        &self,
        user: Option<&User>,
        product_id: ProductId,
    ) -> Result<Toggled, FavoritesError> {
        let was_favorite = self.cache.load().await?.contains(product_id);

        let outcome = if was_favorite {
            self.remove(user, product_id).await?
        } else {
            self.add(user, product_id).await?
        };

        let favorite = match outcome {
            MutationOutcome::Applied => !was_favorite,
            MutationOutcome::Unauthenticated | MutationOutcome::RemoteFailed => was_favorite,
        };

        Ok(Toggled { outcome, favorite })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use atelier_core::Role;
    use tower_sessions::MemoryStore;

    use super::*;

    #[derive(Default)]
    struct FakeRemote {
        list: Mutex<Vec<ProductId>>,
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRemote {
        fn with(ids: &[i32]) -> Self {
            Self {
                list: Mutex::new(ids.iter().copied().map(ProductId::new).collect()),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(BackendError::Status {
                    status: 500,
                    message: "down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl FavoritesRemote for FakeRemote {
        async fn fetch(&self, user: &User) -> Result<Vec<ProductId>, BackendError> {
            self.record(format!("fetch {}", user.id))?;
            Ok(self.list.lock().unwrap().clone())
        }

        async fn add(&self, user: &User, product_id: ProductId) -> Result<(), BackendError> {
            self.record(format!("add {} {product_id}", user.id))?;
            self.list.lock().unwrap().push(product_id);
            Ok(())
        }

        async fn remove(&self, user: &User, product_id: ProductId) -> Result<(), BackendError> {
            self.record(format!("remove {} {product_id}", user.id))?;
            self.list.lock().unwrap().retain(|id| *id != product_id);
            Ok(())
        }
    }

    fn user(id: i32) -> User {
        User {
            id: UserId::new(id),
            firstname: "Test".to_string(),
            lastname: "User".to_string(),
            email: format!("user{id}@example.com"),
            rol: Role::Customer,
            is_active: true,
            created_at: None,
        }
    }

    fn cache() -> SessionFavoritesCache {
        SessionFavoritesCache::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    fn ids(set: &FavoriteSet) -> Vec<i32> {
        set.iter().map(|id| id.as_i32()).collect()
    }

    #[tokio::test]
    async fn test_mutations_without_user_are_noops() {
        let mirror = FavoritesMirror::new(cache(), FakeRemote::default());

        let outcome = mirror.add(None, ProductId::new(1)).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Unauthenticated);
        let toggled = mirror.toggle(None, ProductId::new(1)).await.unwrap();
        assert_eq!(toggled.outcome, MutationOutcome::Unauthenticated);
        assert!(!toggled.favorite);

        assert!(mirror.favorites().await.unwrap().is_empty());
        assert!(mirror.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_applies_after_ack() {
        let mirror = FavoritesMirror::new(cache(), FakeRemote::default());
        let user = user(1);

        let outcome = mirror.add(Some(&user), ProductId::new(5)).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        assert!(mirror.favorites().await.unwrap().contains(ProductId::new(5)));
        assert_eq!(mirror.remote.calls(), vec!["add 1 5"]);
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_cache_unchanged() {
        let cache = cache();
        cache
            .save(&[ProductId::new(2)].into_iter().collect())
            .await
            .unwrap();
        let mirror = FavoritesMirror::new(cache, FakeRemote::failing());
        let user = user(1);

        let added = mirror.add(Some(&user), ProductId::new(3)).await.unwrap();
        let removed = mirror.remove(Some(&user), ProductId::new(2)).await.unwrap();

        assert_eq!(added, MutationOutcome::RemoteFailed);
        assert_eq!(removed, MutationOutcome::RemoteFailed);
        assert_eq!(ids(&mirror.favorites().await.unwrap()), vec![2]);
    }

    #[tokio::test]
    async fn test_toggle_flips_membership() {
        let mirror = FavoritesMirror::new(cache(), FakeRemote::default());
        let user = user(1);

        let first = mirror.toggle(Some(&user), ProductId::new(9)).await.unwrap();
        assert!(first.favorite);
        let second = mirror.toggle(Some(&user), ProductId::new(9)).await.unwrap();
        assert!(!second.favorite);

        assert_eq!(mirror.remote.calls(), vec!["add 1 9", "remove 1 9"]);
        assert!(mirror.favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_replaces_cache_once_per_user() {
        let cache = cache();
        cache
            .save(&[ProductId::new(100)].into_iter().collect())
            .await
            .unwrap();
        let mirror = FavoritesMirror::new(cache, FakeRemote::with(&[1, 2]));

        let synced = mirror.reconcile(Some(&user(1))).await.unwrap();
        assert_eq!(ids(&synced), vec![1, 2]);

        // Same user again: served from the cache
        mirror.reconcile(Some(&user(1))).await.unwrap();
        assert_eq!(mirror.remote.calls(), vec!["fetch 1"]);

        // Another user: fetched again
        mirror.reconcile(Some(&user(2))).await.unwrap();
        assert_eq!(mirror.remote.calls(), vec!["fetch 1", "fetch 2"]);
    }

    #[tokio::test]
    async fn test_reconcile_without_user_keeps_cache() {
        let cache = cache();
        cache
            .save(&[ProductId::new(4)].into_iter().collect())
            .await
            .unwrap();
        let mirror = FavoritesMirror::new(cache, FakeRemote::with(&[1]));

        let favorites = mirror.reconcile(None).await.unwrap();
        assert_eq!(ids(&favorites), vec![4]);
        assert!(mirror.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reconcile_is_retried() {
        let mirror = FavoritesMirror::new(cache(), FakeRemote::failing());
        let user = user(1);

        mirror.reconcile(Some(&user)).await.unwrap();
        mirror.reconcile(Some(&user)).await.unwrap();

        assert_eq!(mirror.remote.calls(), vec!["fetch 1", "fetch 1"]);
        assert_eq!(mirror.cache.synced_for().await.unwrap(), None);
    }
}
