use anyhow::Result;
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::model::{pending_user::PendingUser, user::User};
use crate::store::{Collection, DocumentStore};

/// true  => username is TAKEN (approved or waiting for approval)
/// Only taken names are stored; a miss means "ask the store".
pub static USERNAME_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single username as taken
pub async fn mark_taken(username: &str) {
    USERNAME_CACHE.insert(User::key(username), true).await;
}

/// Forget a username after a rejected sign-up or a rename.
pub async fn release(username: &str) {
    USERNAME_CACHE.invalidate(&User::key(username)).await;
}

/// Check if username is taken
pub async fn is_taken(username: &str) -> bool {
    USERNAME_CACHE
        .get(&User::key(username))
        .await
        .unwrap_or(false)
}

/// Batch mark usernames as taken
async fn batch_mark(usernames: &[String]) {
    let futures: Vec<_> = usernames
        .iter()
        .map(|u| USERNAME_CACHE.insert(User::key(u), true))
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}

/// Load every approved and pending username into the cache, in batches.
/// Both collections are keyed by the normalized username.
pub async fn warmup_username_cache(store: &dyn DocumentStore, batch_size: usize) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let mut total_count = 0usize;

    for collection in [User::COLLECTION, PendingUser::COLLECTION] {
        let ids: Vec<String> = store
            .list(collection)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();

        for batch in ids.chunks(batch_size) {
            batch_mark(batch).await;
        }
        total_count += ids.len();
    }

    log::info!(
        "Username cache warmup complete: {} usernames",
        total_count
    );

    Ok(total_count)
}
