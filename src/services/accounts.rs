//! Sign-up, sign-in and server-side sessions

use std::sync::Arc;
use std::time::Duration as StdDuration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{NewUser, Preferences, SessionRecord, User},
};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const SESSION_TOKEN_LEN: usize = 64;
/// Upper bound on configured session lifetimes (ten years)
pub const MAX_SESSION_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;
/// How often the background sweeper deletes expired sessions
pub const SESSION_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(15 * 60);

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn generate_session_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// False for a wrong password and for a hash we can't parse
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

/// Sign-up form after trimming and lowercasing
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    pub username: String,
    pub email: String,
    pub password: String,
    pub preferences: Preferences,
}

impl SignUp {
    /// Normalizes and validates a raw sign-up form
    pub fn parse(
        username: &str,
        email: &str,
        password: &str,
        preferences: Option<Preferences>,
    ) -> AppResult<Self> {
        let username = username.trim();
        let email = email.trim().to_lowercase();

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::InvalidInput("All fields are required".to_string()));
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(AppError::InvalidInput(format!(
                "Username must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        Ok(Self {
            username: username.to_lowercase(),
            email,
            password: password.to_string(),
            preferences: preferences.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, session_ttl_secs: u64) -> Self {
        Self {
            store,
            session_ttl: Duration::seconds(session_ttl_secs.min(MAX_SESSION_TTL_SECS) as i64),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    async fn open_session(&self, user: &User) -> AppResult<SessionRecord> {
        let now = Utc::now();
        let session = SessionRecord {
            token: generate_session_token(),
            user_id: user.id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.store.create_session(&session).await?;
        Ok(session)
    }

    /// Creates the account and signs it in
    pub async fn sign_up(&self, form: SignUp) -> AppResult<(User, SessionRecord)> {
        if self.store.find_user_by_email(&form.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self.store.find_user_by_username(&form.username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = hash_password(&form.password)?;
        let user = self
            .store
            .create_user(NewUser {
                username: form.username,
                email: form.email,
                password_hash,
                preferences: form.preferences,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Account created");
        let session = self.open_session(&user).await?;
        Ok((user, session))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<(User, SessionRecord)> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }

        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                tracing::info!(email = %email, "Rejected sign-in");
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let session = self.open_session(&user).await?;
        tracing::info!(user_id = %user.id, "Signed in");
        Ok((user, session))
    }

    pub async fn sign_out(&self, token: &str) -> AppResult<()> {
        self.store.delete_session(token).await
    }

    /// Resolves a session token to its live session record
    pub async fn session(&self, token: &str) -> AppResult<Option<SessionRecord>> {
        self.store.find_session(token, Utc::now()).await
    }

    pub async fn purge_expired_sessions(&self) -> AppResult<u64> {
        let purged = self.store.purge_expired_sessions(Utc::now()).await?;
        if purged > 0 {
            tracing::info!(purged, "Expired sessions purged");
        }
        Ok(purged)
    }

    /// Purges expired sessions every `period` until the returned task is aborted
    pub fn spawn_session_sweeper(&self, period: StdDuration) -> JoinHandle<()> {
        let accounts = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = accounts.purge_expired_sessions().await {
                    tracing::warn!(error = %e, "Session purge failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryUserStore;

    fn service() -> AccountService {
        AccountService::new(Arc::new(InMemoryUserStore::new()), 3600)
    }

    fn form(username: &str, email: &str, password: &str) -> AppResult<SignUp> {
        SignUp::parse(username, email, password, None)
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::InvalidInput(m) | AppError::Conflict(m) | AppError::Unauthorized(m) => m,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_session_token_shape() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn test_signup_validation_messages() {
        assert_eq!(message(form("", "a@b.c", "secret").unwrap_err()), "All fields are required");
        assert_eq!(
            message(form("  ab ", "a@b.c", "secret").unwrap_err()),
            "Username must be at least 3 characters"
        );
        assert_eq!(
            message(form("neo", "a@b.c", "12345").unwrap_err()),
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn test_signup_normalizes() {
        let parsed = form(" Neo ", " Neo@Matrix.IO ", "secret").unwrap();
        assert_eq!(parsed.username, "neo");
        assert_eq!(parsed.email, "neo@matrix.io");
        assert_eq!(parsed.preferences, Preferences::default());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let service = service();
        let (user, session) = service
            .sign_up(form("Neo", "neo@matrix.io", "followthewhiterabbit").unwrap())
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(service.session(&session.token).await.unwrap().is_some());

        let (again, second) = service
            .sign_in("NEO@matrix.io ", "followthewhiterabbit")
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
        assert_ne!(second.token, session.token);

        service.sign_out(&session.token).await.unwrap();
        assert!(service.session(&session.token).await.unwrap().is_none());
        assert!(service.session(&second.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_accounts_rejected() {
        let service = service();
        service
            .sign_up(form("neo", "neo@matrix.io", "secret").unwrap())
            .await
            .unwrap();

        let err = service
            .sign_up(form("other", "NEO@matrix.io", "secret").unwrap())
            .await
            .unwrap_err();
        assert_eq!(message(err), "Email already registered");

        let err = service
            .sign_up(form("NEO", "other@matrix.io", "secret").unwrap())
            .await
            .unwrap_err();
        assert_eq!(message(err), "Username already taken");
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let service = service();
        service
            .sign_up(form("neo", "neo@matrix.io", "secret").unwrap())
            .await
            .unwrap();

        let err = service.sign_in("neo@matrix.io", "wrong!").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid email or password"));

        let err = service.sign_in("nobody@matrix.io", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = service.sign_in("", "secret").await.unwrap_err();
        assert_eq!(message(err), "Email and password are required");
    }

    #[tokio::test]
    async fn test_expired_sessions_are_purged() {
        let store = Arc::new(InMemoryUserStore::new());
        // zero lifetime: every session is expired as soon as it is stored
        let service = AccountService::new(store.clone(), 0);
        service
            .sign_up(form("neo", "neo@matrix.io", "secret").unwrap())
            .await
            .unwrap();
        service.sign_in("neo@matrix.io", "secret").await.unwrap();
        assert_eq!(store.session_count().await, 2);

        assert_eq!(service.purge_expired_sessions().await.unwrap(), 2);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_session_sweeper_runs_in_background() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = AccountService::new(store.clone(), 0);
        service
            .sign_up(form("neo", "neo@matrix.io", "secret").unwrap())
            .await
            .unwrap();

        let sweeper = service.spawn_session_sweeper(StdDuration::from_millis(10));
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        sweeper.abort();

        assert_eq!(store.session_count().await, 0);
    }
}
