/// Read-through caching around a fallible async computation.
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block` (which must yield an `AppResult`), queues the value for storage
/// with `$ttl` seconds to live, and returns it. Errors from `$block`
/// propagate with `?` and are never cached.
///
/// # Example
/// ```rust,ignore
/// let details: serde_json::Value = cached!(
///     self.cache,
///     CacheKey::Details(kind, id),
///     DETAILS_CACHE_TTL,
///     async move { self.fetch_details(kind, id).await }
/// )?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(hit) = $cache.lookup(&key).await {
            Ok(hit)
        } else {
            let value = $block.await?;
            $cache.store(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
