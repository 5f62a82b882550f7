use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{NewUser, Preferences, Rating, SessionRecord, User, WatchlistItem},
};

type LibraryKey = (Uuid, i64, String);

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, SessionRecord>,
    watchlist: HashMap<LibraryKey, WatchlistItem>,
    ratings: HashMap<LibraryKey, Rating>,
}

/// Process-local [`UserStore`]; everything is lost on restart
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored sessions, expired ones included
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

fn library_key(user_id: Uuid, tmdb_id: i64, content_type: &str) -> LibraryKey {
    (user_id, tmdb_id, content_type.to_string())
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let username = username.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let user = User::from_new(new_user);
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: &Preferences,
    ) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.preferences = Json(preferences.clone());
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_session(&self, session: &SessionRecord) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<SessionRecord>> {
        let mut inner = self.inner.write().await;
        let Some(session) = inner.sessions.get(token).cloned() else {
            return Ok(None);
        };
        if session.is_expired(now) {
            inner.sessions.remove(token);
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn delete_session(&self, token: &str) -> AppResult<()> {
        self.inner.write().await.sessions.remove(token);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn upsert_watchlist_item(&self, item: &WatchlistItem) -> AppResult<()> {
        let key = library_key(item.user_id, item.tmdb_id, &item.content_type);
        self.inner.write().await.watchlist.insert(key, item.clone());
        Ok(())
    }

    async fn remove_watchlist_item(
        &self,
        user_id: Uuid,
        tmdb_id: i64,
        content_type: &str,
    ) -> AppResult<bool> {
        let key = library_key(user_id, tmdb_id, content_type);
        Ok(self.inner.write().await.watchlist.remove(&key).is_some())
    }

    async fn list_watchlist(&self, user_id: Uuid) -> AppResult<Vec<WatchlistItem>> {
        let inner = self.inner.read().await;
        let mut items: Vec<WatchlistItem> = inner
            .watchlist
            .values()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.added_date.cmp(&a.added_date));
        Ok(items)
    }

    async fn upsert_rating(&self, rating: &Rating) -> AppResult<()> {
        let key = library_key(rating.user_id, rating.tmdb_id, &rating.content_type);
        self.inner.write().await.ratings.insert(key, rating.clone());
        Ok(())
    }

    async fn find_rating(
        &self,
        user_id: Uuid,
        tmdb_id: i64,
        content_type: &str,
    ) -> AppResult<Option<Rating>> {
        let key = library_key(user_id, tmdb_id, content_type);
        Ok(self.inner.read().await.ratings.get(&key).cloned())
    }

    async fn list_ratings(&self, user_id: Uuid) -> AppResult<Vec<Rating>> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<Rating> = inner
            .ratings
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        Ok(ratings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            preferences: Preferences::default(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = InMemoryUserStore::new();
        let user = store.create_user(new_user("Neo", "neo@matrix.io")).await.unwrap();

        assert_eq!(store.find_user_by_email("NEO@matrix.io").await.unwrap(), Some(user.clone()));
        assert_eq!(store.find_user_by_username("neo").await.unwrap(), Some(user.clone()));
        assert_eq!(store.find_user_by_id(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username_conflict() {
        let store = InMemoryUserStore::new();
        store.create_user(new_user("neo", "neo@matrix.io")).await.unwrap();

        let err = store.create_user(new_user("other", "NEO@matrix.io")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Email already registered"));

        let err = store.create_user(new_user("Neo", "other@matrix.io")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Username already taken"));
    }

    #[tokio::test]
    async fn test_update_preferences_unknown_user() {
        let store = InMemoryUserStore::new();
        let updated = store
            .update_preferences(Uuid::new_v4(), &Preferences::default())
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_expired_session_not_found() {
        let store = InMemoryUserStore::new();
        let now = Utc::now();
        let session = SessionRecord {
            token: "abc".to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + Duration::seconds(60),
        };
        store.create_session(&session).await.unwrap();

        assert!(store.find_session("abc", now).await.unwrap().is_some());
        assert!(store
            .find_session("abc", now + Duration::seconds(61))
            .await
            .unwrap()
            .is_none());

        store.delete_session("abc").await.unwrap();
        assert!(store.find_session("abc", now).await.unwrap().is_none());
    }

    fn session(token: &str, expires_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            token: token.to_string(),
            user_id: Uuid::new_v4(),
            created_at: expires_at - Duration::hours(1),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_removed_on_lookup() {
        let store = InMemoryUserStore::new();
        let now = Utc::now();
        store.create_session(&session("old", now)).await.unwrap();
        assert_eq!(store.session_count().await, 1);

        assert!(store.find_session("old", now).await.unwrap().is_none());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let store = InMemoryUserStore::new();
        let now = Utc::now();
        store.create_session(&session("a", now - Duration::minutes(5))).await.unwrap();
        store.create_session(&session("b", now)).await.unwrap();
        store.create_session(&session("c", now + Duration::minutes(5))).await.unwrap();

        assert_eq!(store.purge_expired_sessions(now).await.unwrap(), 2);
        assert_eq!(store.session_count().await, 1);
        assert!(store.find_session("c", now).await.unwrap().is_some());
        assert_eq!(store.purge_expired_sessions(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_watchlist_upsert_list_and_remove() {
        let store = InMemoryUserStore::new();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let older = WatchlistItem {
            user_id,
            tmdb_id: 603,
            content_type: "movie".to_string(),
            title: "The Matrix".to_string(),
            poster_path: String::new(),
            added_date: now - Duration::minutes(5),
        };
        let newer = WatchlistItem {
            tmdb_id: 1399,
            content_type: "tv".to_string(),
            title: "Game of Thrones".to_string(),
            added_date: now,
            ..older.clone()
        };

        store.upsert_watchlist_item(&older).await.unwrap();
        store.upsert_watchlist_item(&newer).await.unwrap();
        store.upsert_watchlist_item(&older).await.unwrap();

        let items = store.list_watchlist(user_id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].tmdb_id, 1399);

        assert!(store.remove_watchlist_item(user_id, 603, "movie").await.unwrap());
        assert!(!store.remove_watchlist_item(user_id, 603, "movie").await.unwrap());
        assert!(store.list_watchlist(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rating_upsert_replaces() {
        let store = InMemoryUserStore::new();
        let user_id = Uuid::new_v4();
        let mut rating = Rating {
            user_id,
            tmdb_id: 603,
            content_type: "movie".to_string(),
            rating: 7.0,
            review: String::new(),
            created_date: Utc::now(),
        };

        store.upsert_rating(&rating).await.unwrap();
        rating.rating = 9.0;
        rating.review = "Better on rewatch".to_string();
        store.upsert_rating(&rating).await.unwrap();

        let found = store.find_rating(user_id, 603, "movie").await.unwrap().unwrap();
        assert_eq!(found.rating, 9.0);
        assert_eq!(store.list_ratings(user_id).await.unwrap().len(), 1);
        assert!(store.find_rating(user_id, 603, "tv").await.unwrap().is_none());
    }
}
