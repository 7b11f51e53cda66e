//! Fast username-availability path for signup.
//!
//! Layered lookup: cuckoo filter for cheap negatives, moka cache for cheap
//! positives, database as the authority. Both in-memory layers are warmed at
//! startup and kept current on every successful registration.

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::time::Duration;

/// Sized for a municipal deployment: a few thousand staff and citizen
/// accounts, with plenty of headroom.
const FILTER_CAPACITY: usize = 50_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Only taken usernames are stored; a miss means "unknown", not "available".
static TAKEN_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

#[inline]
fn normalize(username: &str) -> String {
    username.to_lowercase()
}

/// Record a freshly registered username in both in-memory layers.
pub async fn mark_registered(username: &str) {
    let username = normalize(username);
    USERNAME_FILTER
        .write()
        .expect("username filter poisoned")
        .add(&username);
    TAKEN_CACHE.insert(username, true).await;
}

/// true  => username AVAILABLE
/// false => username TAKEN
pub async fn is_available(username: &str, pool: &MySqlPool) -> bool {
    let username = normalize(username);

    // Cuckoo filter: a definite "no such username" skips the database.
    let might_exist = USERNAME_FILTER
        .read()
        .expect("username filter poisoned")
        .contains(&username);
    if !might_exist {
        return true;
    }

    // Cache: a known-taken username also skips the database.
    if TAKEN_CACHE.get(&username).await.unwrap_or(false) {
        return false;
    }

    // Database fallback; on error assume taken rather than allow a duplicate.
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(&username)
    .fetch_one(pool)
    .await
    .unwrap_or(true);

    !exists
}

/// Stream every username into the filter, and recently active ones into the
/// cache, in batches.
pub async fn warmup(pool: &MySqlPool, recent_days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        batch.push(normalize(&username));
        total += 1;

        if batch.len() >= batch_size {
            insert_filter_batch(&batch);
            batch.clear();
        }
    }
    if !batch.is_empty() {
        insert_filter_batch(&batch);
    }

    let mut recent = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT username
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(recent_days)
    .fetch(pool);

    let mut cached = 0usize;
    while let Some(row) = recent.next().await {
        let (username,) = row?;
        TAKEN_CACHE.insert(normalize(&username), true).await;
        cached += 1;
    }

    log::info!(
        "Username lookup warmup complete: {} accounts in filter, {} recent in cache",
        total,
        cached
    );
    Ok(())
}

fn insert_filter_batch(usernames: &[String]) {
    let mut filter = USERNAME_FILTER.write().expect("username filter poisoned");
    for username in usernames {
        filter.add(username);
    }
}
