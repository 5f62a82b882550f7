pub mod memory_store;
pub mod pg_store;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory_store::InMemoryUserStore;
pub use pg_store::PgUserStore;
pub use postgres::create_pool;
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;
pub use store::UserStore;
