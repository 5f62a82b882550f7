use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{NewUser, Preferences, Rating, SessionRecord, User, WatchlistItem},
};

/// Persistence for accounts, sessions and per-user libraries
///
/// Lookups by email and username expect the lowercased value. Watchlist
/// entries and ratings are keyed by `(user_id, tmdb_id, content_type)`;
/// writing the same key again replaces the previous entry.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Inserts a user. A taken email or username yields `AppError::Conflict`.
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;

    /// Replaces a user's preferences, returns false when the user is unknown
    async fn update_preferences(&self, user_id: Uuid, preferences: &Preferences)
        -> AppResult<bool>;

    async fn create_session(&self, session: &SessionRecord) -> AppResult<()>;

    /// Returns the session only while it has not expired at `now`. An
    /// expired session found this way is deleted.
    async fn find_session(&self, token: &str, now: DateTime<Utc>)
        -> AppResult<Option<SessionRecord>>;

    async fn delete_session(&self, token: &str) -> AppResult<()>;

    /// Deletes every session expired at `now`, returns how many went
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> AppResult<u64>;

    async fn upsert_watchlist_item(&self, item: &WatchlistItem) -> AppResult<()>;

    /// Returns true when an entry was removed
    async fn remove_watchlist_item(
        &self,
        user_id: Uuid,
        tmdb_id: i64,
        content_type: &str,
    ) -> AppResult<bool>;

    /// Newest first
    async fn list_watchlist(&self, user_id: Uuid) -> AppResult<Vec<WatchlistItem>>;

    async fn upsert_rating(&self, rating: &Rating) -> AppResult<()>;

    async fn find_rating(
        &self,
        user_id: Uuid,
        tmdb_id: i64,
        content_type: &str,
    ) -> AppResult<Option<Rating>>;

    /// Newest first
    async fn list_ratings(&self, user_id: Uuid) -> AppResult<Vec<Rating>>;
}
