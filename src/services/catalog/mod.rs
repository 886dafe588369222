/// Remote catalog abstraction
///
/// The scoring pipeline reads a user's favourites, full list and per-title
/// recommendations through this trait. `AniListClient` talks to the real
/// GraphQL API; tests substitute a mock.
///
/// Every implementation must report failures with the remote taxonomy only:
/// `NotFound`, `RateLimited`, `SessionExpired` or `Protocol`.
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{Favourite, ListEntry, Title, TitleId},
};

pub mod anilist;
pub mod retry;

pub use anilist::AniListClient;
pub use retry::RetryPolicy;

/// Maximum seeds per combined recommendation request
pub const RECOMMENDATION_BATCH_SIZE: usize = 12;

/// Recommendations requested per seed
pub const RECOMMENDATIONS_PER_SEED: usize = 15;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// All favourites of `user`, in the order the catalog returns them
    ///
    /// Fails with `NotFound` when the user name does not resolve.
    async fn fetch_favourites(&self, user: &str) -> AppResult<Vec<Favourite>>;

    /// Every list entry of `user` across all status buckets
    async fn fetch_full_list(&self, user: &str) -> AppResult<Vec<ListEntry>>;

    /// Recommendations for up to `RECOMMENDATION_BATCH_SIZE` seeds in one round trip
    ///
    /// Seeds with no recommendations may be absent from the map or map to an
    /// empty list.
    async fn fetch_recommendation_batch(
        &self,
        seed_ids: &[TitleId],
    ) -> AppResult<HashMap<TitleId, Vec<Title>>>;

    /// Adds a title to the authenticated user's planning list
    async fn submit_planning_add(&self, title_id: TitleId) -> AppResult<()>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
