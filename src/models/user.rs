use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use super::Preferences;

/// A registered account
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    /// Stored lowercased
    pub username: String,
    /// Stored lowercased
    pub email: String,
    pub password_hash: String,
    pub preferences: Json<Preferences>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub preferences: Preferences,
}

impl User {
    pub fn from_new(new_user: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: new_user.username.to_lowercase(),
            email: new_user.email.to_lowercase(),
            password_hash: new_user.password_hash,
            preferences: Json(new_user.preferences),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Public view of a user, never carries the password hash
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
}

impl UserProfile {
    pub fn without_preferences(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            preferences: None,
        }
    }
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            preferences: Some(user.preferences.0.clone()),
        }
    }
}

/// Server-side record of a signed-in browser
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A title a user saved for later
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct WatchlistItem {
    pub user_id: Uuid,
    pub tmdb_id: i64,
    pub content_type: String,
    pub title: String,
    pub poster_path: String,
    pub added_date: DateTime<Utc>,
}

/// A user's score (1-10) and optional review for one title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Rating {
    pub user_id: Uuid,
    pub tmdb_id: i64,
    pub content_type: String,
    pub rating: f64,
    pub review: String,
    pub created_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_new_lowercases_identity() {
        let user = User::from_new(NewUser {
            username: "Neo".to_string(),
            email: "Neo@Matrix.IO".to_string(),
            password_hash: "hash".to_string(),
            preferences: Preferences::default(),
        });

        assert_eq!(user.username, "neo");
        assert_eq!(user.email, "neo@matrix.io");
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_profile_hides_password_hash() {
        let user = User::from_new(NewUser {
            username: "trinity".to_string(),
            email: "trinity@matrix.io".to_string(),
            password_hash: "secret-hash".to_string(),
            preferences: Preferences::default(),
        });

        let json = serde_json::to_string(&UserProfile::from(&user)).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("preferences"));

        let json = serde_json::to_string(&UserProfile::without_preferences(&user)).unwrap();
        assert!(!json.contains("preferences"));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = SessionRecord {
            token: "t".to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + chrono::Duration::seconds(10),
        };

        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + chrono::Duration::seconds(10)));
    }
}
