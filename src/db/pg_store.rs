use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{NewUser, Preferences, Rating, SessionRecord, User, WatchlistItem},
};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, preferences, created_at, updated_at";

/// PostgreSQL-backed [`UserStore`]
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user_where(&self, column: &str, value: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

/// Turns unique-constraint violations on `users` into user-facing conflicts
fn map_user_insert_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("users_email_key") => "Email already registered",
                Some("users_username_key") => "Username already taken",
                _ => "Account already exists",
            };
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(err)
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.find_user_where("email", email).await
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.find_user_where("username", username).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let user = User::from_new(new_user);

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, preferences, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.preferences)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_user_insert_error)?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: &Preferences,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET preferences = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(Json(preferences.clone()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_session(&self, session: &SessionRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match session {
            Some(session) if session.is_expired(now) => {
                self.delete_session(token).await?;
                Ok(None)
            }
            session => Ok(session),
        }
    }

    async fn delete_session(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn upsert_watchlist_item(&self, item: &WatchlistItem) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO watchlist (user_id, tmdb_id, content_type, title, poster_path, added_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, tmdb_id, content_type)
            DO UPDATE SET title = EXCLUDED.title,
                          poster_path = EXCLUDED.poster_path,
                          added_date = EXCLUDED.added_date
            "#,
        )
        .bind(item.user_id)
        .bind(item.tmdb_id)
        .bind(&item.content_type)
        .bind(&item.title)
        .bind(&item.poster_path)
        .bind(item.added_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_watchlist_item(
        &self,
        user_id: Uuid,
        tmdb_id: i64,
        content_type: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM watchlist WHERE user_id = $1 AND tmdb_id = $2 AND content_type = $3",
        )
        .bind(user_id)
        .bind(tmdb_id)
        .bind(content_type)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_watchlist(&self, user_id: Uuid) -> AppResult<Vec<WatchlistItem>> {
        let items = sqlx::query_as::<_, WatchlistItem>(
            r#"
            SELECT user_id, tmdb_id, content_type, title, poster_path, added_date
            FROM watchlist
            WHERE user_id = $1
            ORDER BY added_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn upsert_rating(&self, rating: &Rating) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, tmdb_id, content_type, rating, review, created_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, tmdb_id, content_type)
            DO UPDATE SET rating = EXCLUDED.rating,
                          review = EXCLUDED.review,
                          created_date = EXCLUDED.created_date
            "#,
        )
        .bind(rating.user_id)
        .bind(rating.tmdb_id)
        .bind(&rating.content_type)
        .bind(rating.rating)
        .bind(&rating.review)
        .bind(rating.created_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_rating(
        &self,
        user_id: Uuid,
        tmdb_id: i64,
        content_type: &str,
    ) -> AppResult<Option<Rating>> {
        let rating = sqlx::query_as::<_, Rating>(
            r#"
            SELECT user_id, tmdb_id, content_type, rating, review, created_date
            FROM ratings
            WHERE user_id = $1 AND tmdb_id = $2 AND content_type = $3
            "#,
        )
        .bind(user_id)
        .bind(tmdb_id)
        .bind(content_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn list_ratings(&self, user_id: Uuid) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            r#"
            SELECT user_id, tmdb_id, content_type, rating, review, created_date
            FROM ratings
            WHERE user_id = $1
            ORDER BY created_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }
}
