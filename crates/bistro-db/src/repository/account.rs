//! # Account Repository
//!
//! Accounts, auth tokens, and the per-account Profile and Settings rows.
//!
//! ## Registration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register(new_account)                                                  │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  INSERT accounts        ── UNIQUE(username), UNIQUE(email) → Conflict   │
//! │  INSERT profiles        ── avatar initials, restaurant name             │
//! │  INSERT settings        ── schema defaults (tax 0, tip 15%, footer)     │
//! │       │                                                                 │
//! │       ▼  COMMIT (or nothing at all)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tokens
//! One opaque 40-hex-character token per account. Login reuses it, logout
//! deletes it, and a password change replaces it in the same transaction
//! that stores the new hash.

use bistro_core::{
    avatar_initials, Account, AccountScope, Profile, Settings, DEFAULT_LOW_STOCK_THRESHOLD,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const ACCOUNT_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, is_active, created_at";

/// Data needed to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Already-hashed password (PHC string).
    pub password_hash: String,

    /// Stored on the profile; the schema default applies when `None`.
    pub restaurant_name: Option<String>,
}

/// Repository for accounts and everything hanging off them one-to-one.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Creates an account with its profile and settings in one transaction.
    ///
    /// ## Returns
    /// * `Ok(Account)` - The stored account
    /// * `Err(DbError::UniqueViolation)` - Username or email already taken
    pub async fn register(&self, new: &NewAccount) -> DbResult<Account> {
        debug!(username = %new.username, "Registering account");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (username, email, first_name, last_name, password_hash, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, 1, ?)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let initials = avatar_initials(&new.first_name, &new.last_name, &new.username);

        sqlx::query(
            "INSERT INTO profiles
                (account_id, restaurant_name, avatar_initials, low_stock_threshold,
                 created_at, updated_at)
             VALUES (?, COALESCE(?, 'My Restaurant'), ?, ?, ?, ?)",
        )
        .bind(account.id)
        .bind(new.restaurant_name.as_deref())
        .bind(&initials)
        .bind(DEFAULT_LOW_STOCK_THRESHOLD)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO settings (account_id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(account.id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(account_id = account.id, username = %account.username, "Account registered");
        Ok(account)
    }

    /// Gets an account by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Finds the account a login identifier refers to.
    ///
    /// The identifier may be the username or the email address; an exact
    /// username match wins over an email match.
    pub async fn find_by_login(&self, identifier: &str) -> DbResult<Option<Account>> {
        let identifier = identifier.trim();
        debug!(identifier = %identifier, "Looking up account for login");

        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE username = ?1 OR email = ?1
             ORDER BY (username = ?1) DESC
             LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// True if the username is taken.
    pub async fn username_exists(&self, username: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?)")
                .bind(username.trim())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// True if the email is used by any account other than `except`.
    ///
    /// Comparison is case-insensitive.
    pub async fn email_exists(&self, email: &str, except: Option<i64>) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ? AND id != COALESCE(?, -1))",
        )
        .bind(email.trim())
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Enables or disables an account.
    pub async fn set_active(&self, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE accounts SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        info!(account_id = id, active, "Account active flag changed");
        Ok(())
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Returns the account's token, creating one if it has none.
    pub async fn issue_token(&self, account_id: i64) -> DbResult<String> {
        sqlx::query(
            "INSERT INTO auth_tokens (token, account_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT(account_id) DO NOTHING",
        )
        .bind(generate_token())
        .bind(account_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let token: String =
            sqlx::query_scalar("SELECT token FROM auth_tokens WHERE account_id = ?")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(token)
    }

    /// Resolves a token to its account (active or not).
    pub async fn account_for_token(&self, token: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT a.id, a.username, a.email, a.first_name, a.last_name,
                    a.password_hash, a.is_active, a.created_at
             FROM auth_tokens t
             INNER JOIN accounts a ON a.id = t.account_id
             WHERE t.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Deletes every token of the account (logout).
    pub async fn revoke_tokens(&self, scope: AccountScope) -> DbResult<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE account_id = ?")
            .bind(scope.account_id())
            .execute(&self.pool)
            .await?;

        debug!(account_id = scope.account_id(), "Tokens revoked");
        Ok(())
    }

    /// Stores a new password hash and rotates the token in one transaction.
    ///
    /// ## Returns
    /// The new token; the old one stops working immediately.
    pub async fn change_password(&self, scope: AccountScope, password_hash: &str) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE accounts SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(scope.account_id())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", scope.account_id()));
        }

        sqlx::query("DELETE FROM auth_tokens WHERE account_id = ?")
            .bind(scope.account_id())
            .execute(&mut *tx)
            .await?;

        let token = generate_token();
        sqlx::query("INSERT INTO auth_tokens (token, account_id, created_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(scope.account_id())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(account_id = scope.account_id(), "Password changed, token rotated");
        Ok(token)
    }

    // =========================================================================
    // Profile & Settings
    // =========================================================================

    /// Loads the account's profile.
    pub async fn profile(&self, scope: AccountScope) -> DbResult<Profile> {
        sqlx::query_as::<_, Profile>(
            "SELECT account_id, restaurant_name, phone, role, avatar_initials, theme,
                    currency, language, notifications_enabled, low_stock_threshold,
                    ai_model, ai_api_key, created_at, updated_at
             FROM profiles WHERE account_id = ?",
        )
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Profile", scope.account_id()))
    }

    /// Saves account identity fields and the profile together.
    ///
    /// Avatar initials are recomputed from the saved names.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - The new email belongs to another account
    pub async fn update_profile(
        &self,
        scope: AccountScope,
        account: &Account,
        profile: &Profile,
    ) -> DbResult<(Account, Profile)> {
        debug!(account_id = scope.account_id(), "Updating profile");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts SET first_name = ?, last_name = ?, email = ?
             WHERE id = ?
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(scope.account_id())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Account", scope.account_id()))?;

        let profile = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET
                restaurant_name = ?, phone = ?, role = ?, avatar_initials = ?,
                theme = ?, currency = ?, language = ?, notifications_enabled = ?,
                low_stock_threshold = ?, ai_model = ?, ai_api_key = ?, updated_at = ?
             WHERE account_id = ?
             RETURNING account_id, restaurant_name, phone, role, avatar_initials, theme,
                       currency, language, notifications_enabled, low_stock_threshold,
                       ai_model, ai_api_key, created_at, updated_at",
        )
        .bind(&profile.restaurant_name)
        .bind(&profile.phone)
        .bind(profile.role)
        .bind(account.avatar_initials())
        .bind(&profile.theme)
        .bind(&profile.currency)
        .bind(&profile.language)
        .bind(profile.notifications_enabled)
        .bind(profile.low_stock_threshold)
        .bind(&profile.ai_model)
        .bind(&profile.ai_api_key)
        .bind(now)
        .bind(scope.account_id())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Profile", scope.account_id()))?;

        tx.commit().await?;
        Ok((account, profile))
    }

    /// Loads the account's settings.
    pub async fn settings(&self, scope: AccountScope) -> DbResult<Settings> {
        sqlx::query_as::<_, Settings>(
            "SELECT account_id, restaurant_address, restaurant_phone, restaurant_email,
                    business_hours, tax_rate_bps, default_tip_bps, receipt_footer,
                    created_at, updated_at
             FROM settings WHERE account_id = ?",
        )
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Settings", scope.account_id()))
    }

    /// Saves the account's settings.
    pub async fn update_settings(&self, scope: AccountScope, settings: &Settings) -> DbResult<Settings> {
        debug!(account_id = scope.account_id(), "Updating settings");

        sqlx::query_as::<_, Settings>(
            "UPDATE settings SET
                restaurant_address = ?, restaurant_phone = ?, restaurant_email = ?,
                business_hours = ?, tax_rate_bps = ?, default_tip_bps = ?,
                receipt_footer = ?, updated_at = ?
             WHERE account_id = ?
             RETURNING account_id, restaurant_address, restaurant_phone, restaurant_email,
                       business_hours, tax_rate_bps, default_tip_bps, receipt_footer,
                       created_at, updated_at",
        )
        .bind(&settings.restaurant_address)
        .bind(&settings.restaurant_phone)
        .bind(&settings.restaurant_email)
        .bind(&settings.business_hours)
        .bind(settings.tax_rate_bps)
        .bind(settings.default_tip_bps)
        .bind(&settings.receipt_footer)
        .bind(Utc::now())
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Settings", scope.account_id()))
    }
}

/// Generates an opaque token: 40 lowercase hex characters.
pub fn generate_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.push_str(&Uuid::new_v4().simple().to_string()[..8]);
    token
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{test_account, test_db};
    use bistro_core::Role;

    fn new_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Baker".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            restaurant_name: Some("Alice's Diner".to_string()),
        }
    }

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn test_register_creates_profile_and_settings() {
        let db = test_db().await;
        let repo = db.accounts();

        let account = repo
            .register(&new_account("alice", "alice@example.com"))
            .await
            .unwrap();
        let scope = AccountScope::new(account.id);

        let profile = repo.profile(scope).await.unwrap();
        assert_eq!(profile.restaurant_name, "Alice's Diner");
        assert_eq!(profile.avatar_initials, "AB");
        assert_eq!(profile.role, Role::Staff);
        assert_eq!(profile.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(profile.ai_model, "gemini-2.0-flash");

        let settings = repo.settings(scope).await.unwrap();
        assert_eq!(settings.tax_rate_bps, 0);
        assert_eq!(settings.default_tip_bps, 1500);
        assert_eq!(settings.receipt_footer, "Thank you for your business!");
    }

    #[tokio::test]
    async fn test_register_duplicates_conflict() {
        let db = test_db().await;
        let repo = db.accounts();
        repo.register(&new_account("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = repo
            .register(&new_account("alice2", "ALICE@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));

        let err = repo
            .register(&new_account("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "username"));

        // The failed registration left nothing behind.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_find_by_login_username_or_email() {
        let db = test_db().await;
        let repo = db.accounts();
        let account = repo
            .register(&new_account("alice", "alice@example.com"))
            .await
            .unwrap();

        let by_name = repo.find_by_login("alice").await.unwrap().unwrap();
        let by_email = repo.find_by_login("Alice@Example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, account.id);
        assert_eq!(by_email.id, account.id);
        assert!(repo.find_by_login("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_availability_checks() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.accounts();

        assert!(repo.username_exists("alice").await.unwrap());
        assert!(!repo.username_exists("bob").await.unwrap());
        assert!(repo.email_exists("alice@example.com", None).await.unwrap());
        assert!(!repo
            .email_exists("alice@example.com", Some(scope.account_id()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.accounts();

        let token = repo.issue_token(scope.account_id()).await.unwrap();
        assert_eq!(repo.issue_token(scope.account_id()).await.unwrap(), token);

        let account = repo.account_for_token(&token).await.unwrap().unwrap();
        assert_eq!(account.id, scope.account_id());

        let rotated = repo.change_password(scope, "$argon2id$new").await.unwrap();
        assert_ne!(rotated, token);
        assert!(repo.account_for_token(&token).await.unwrap().is_none());
        assert!(repo.account_for_token(&rotated).await.unwrap().is_some());

        repo.revoke_tokens(scope).await.unwrap();
        assert!(repo.account_for_token(&rotated).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_recomputes_initials() {
        let db = test_db().await;
        let scope = test_account(&db, "zoe").await;
        let repo = db.accounts();

        let mut account = repo.get(scope.account_id()).await.unwrap().unwrap();
        let mut profile = repo.profile(scope).await.unwrap();
        assert_eq!(profile.avatar_initials, "ZO");

        account.first_name = "Zoe".to_string();
        account.last_name = "Quinn".to_string();
        profile.low_stock_threshold = 10;
        profile.theme = "dark".to_string();

        let (account, profile) = repo.update_profile(scope, &account, &profile).await.unwrap();
        assert_eq!(account.first_name, "Zoe");
        assert_eq!(profile.avatar_initials, "ZQ");
        assert_eq!(profile.low_stock_threshold, 10);
        assert_eq!(profile.theme, "dark");
    }

    #[tokio::test]
    async fn test_update_settings() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.accounts();

        let mut settings = repo.settings(scope).await.unwrap();
        settings.tax_rate_bps = 825;
        settings.receipt_footer = "Come again".to_string();

        let saved = repo.update_settings(scope, &settings).await.unwrap();
        assert_eq!(saved.tax_rate().bps(), 825);
        assert_eq!(saved.receipt_footer, "Come again");
    }

    #[tokio::test]
    async fn test_set_active() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.accounts();

        repo.set_active(scope.account_id(), false).await.unwrap();
        let account = repo.get(scope.account_id()).await.unwrap().unwrap();
        assert!(!account.is_active);

        assert!(matches!(
            repo.set_active(999, true).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
