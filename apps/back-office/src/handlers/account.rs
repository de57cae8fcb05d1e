//! # Account Handlers
//!
//! Registration, login/logout, profile, settings and password management.
//!
//! Only `register`, `login` and the availability checks are reachable
//! without a token.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use bistro_core::money::percent;
use bistro_core::validation::{
    validate_email, validate_low_stock_threshold, validate_name, validate_optional_text,
    validate_password, validate_password_pair, validate_rate, validate_text, validate_theme,
    validate_username,
};
use bistro_core::{Account, Profile, Rate, Role, Settings};
use bistro_db::{Database, NewAccount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_dummy_password, verify_password, AuthAccount};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{Json, Query};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(get_profile))
        .route("/profile/update", put(update_profile).patch(update_profile))
        .route(
            "/settings",
            get(get_settings).put(update_settings).patch(update_settings),
        )
        .route("/change-password", post(change_password))
        .route("/check-username", get(check_username))
        .route("/check-email", get(check_email))
}

// =============================================================================
// DTOs
// =============================================================================

/// Profile as sent to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDto {
    pub restaurant_name: String,
    pub phone: String,
    pub role: Role,
    pub avatar_initials: String,
    pub theme: String,
    pub currency: String,
    pub language: String,
    pub notifications_enabled: bool,
    pub low_stock_threshold: i64,
    pub ai_model: String,
    pub gemini_api_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        ProfileDto {
            restaurant_name: p.restaurant_name,
            phone: p.phone,
            role: p.role,
            avatar_initials: p.avatar_initials,
            theme: p.theme,
            currency: p.currency,
            language: p.language,
            notifications_enabled: p.notifications_enabled,
            low_stock_threshold: p.low_stock_threshold,
            ai_model: p.ai_model,
            gemini_api_key: p.ai_api_key,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Settings as sent to the dashboard; rates are percentages.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsDto {
    pub restaurant_address: String,
    pub restaurant_phone: String,
    pub restaurant_email: String,
    pub business_hours: String,
    #[serde(with = "percent")]
    pub tax_rate: Rate,
    #[serde(with = "percent")]
    pub default_tip_percentage: Rate,
    pub receipt_footer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Settings> for SettingsDto {
    fn from(s: Settings) -> Self {
        SettingsDto {
            tax_rate: s.tax_rate(),
            default_tip_percentage: s.default_tip(),
            restaurant_address: s.restaurant_address,
            restaurant_phone: s.restaurant_phone,
            restaurant_email: s.restaurant_email,
            business_hours: s.business_hours,
            receipt_footer: s.receipt_footer,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Account with its profile and settings.
#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile: ProfileDto,
    pub app_settings: SettingsDto,
}

impl UserDto {
    async fn load(db: &Database, account: Account) -> ApiResult<Self> {
        let scope = bistro_core::AccountScope::new(account.id);
        let profile = db.accounts().profile(scope).await?;
        let settings = db.accounts().settings(scope).await?;

        Ok(UserDto {
            id: account.id,
            username: account.username,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            profile: profile.into(),
            app_settings: settings.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub message: &'static str,
    pub settings: SettingsDto,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub message: &'static str,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
    pub restaurant_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Username or email
    pub username: String,
    pub password: String,
}

/// Every field optional; absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub restaurant_name: Option<String>,
    pub phone: Option<String>,
    pub theme: Option<String>,
    pub currency: Option<String>,
    pub language: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub low_stock_threshold: Option<i64>,
    pub ai_model: Option<String>,
    #[serde(alias = "ai_api_key")]
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateSettingsRequest {
    pub restaurant_address: Option<String>,
    pub restaurant_phone: Option<String>,
    pub restaurant_email: Option<String>,
    pub business_hours: Option<String>,
    #[serde(with = "percent::option")]
    pub tax_rate: Option<Rate>,
    #[serde(with = "percent::option")]
    pub default_tip_percentage: Option<Rate>,
    pub receipt_footer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AvailabilityQuery {
    pub username: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /users/register`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let mut errors = FieldErrors::default();
    let username = errors.check(validate_username(&req.username)).unwrap_or_default();
    let email = errors.check(validate_email(&req.email)).unwrap_or_default();
    errors.check(validate_password_pair(&req.password, &req.password2));
    let first_name = errors
        .check(validate_text("first_name", &req.first_name, 150))
        .unwrap_or_default();
    let last_name = errors
        .check(validate_text("last_name", &req.last_name, 150))
        .unwrap_or_default();
    let restaurant_name = errors
        .check(validate_optional_text(
            "restaurant_name",
            req.restaurant_name.as_deref(),
            200,
        ))
        .flatten();
    errors.into_result()?;

    let password_hash = hash_password(&req.password)?;

    let account = state
        .db
        .accounts()
        .register(&NewAccount {
            username,
            email,
            first_name,
            last_name,
            password_hash,
            restaurant_name,
        })
        .await?;
    let token = state.db.accounts().issue_token(account.id).await?;

    info!(account_id = account.id, "User registered");
    let user = UserDto::load(&state.db, account).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user,
        }),
    ))
}

/// `POST /users/login`
///
/// Accepts the username or the email address as `username`.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let mut errors = FieldErrors::default();
    if req.username.trim().is_empty() {
        errors.push("username", "This field is required.");
    }
    if req.password.is_empty() {
        errors.push("password", "This field is required.");
    }
    errors.into_result()?;

    let account = match state.db.accounts().find_by_login(&req.username).await? {
        Some(account) if verify_password(&req.password, &account.password_hash) => account,
        found => {
            if found.is_none() {
                verify_dummy_password(&req.password);
            }
            warn!(identifier = %req.username.trim(), "Failed login attempt");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if !account.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    let token = state.db.accounts().issue_token(account.id).await?;
    info!(account_id = account.id, "User logged in");
    let user = UserDto::load(&state.db, account).await?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user,
    }))
}

/// `POST /users/logout`
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ApiResult<Json<MessageResponse>> {
    state.db.accounts().revoke_tokens(auth.scope()).await?;
    info!(account_id = auth.account.id, "User logged out");

    Ok(Json(MessageResponse {
        message: "Logout successful",
    }))
}

/// `GET /users/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ApiResult<Json<UserDto>> {
    Ok(Json(UserDto::load(&state.db, auth.account).await?))
}

/// `PUT|PATCH /users/profile/update`
///
/// The role is not editable here.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    let scope = auth.scope();
    let mut account = auth.account;
    let mut profile = state.db.accounts().profile(scope).await?;
    let mut errors = FieldErrors::default();

    if let Some(first_name) = &req.first_name {
        if let Some(v) = errors.check(validate_text("first_name", first_name, 150)) {
            account.first_name = v;
        }
    }
    if let Some(last_name) = &req.last_name {
        if let Some(v) = errors.check(validate_text("last_name", last_name, 150)) {
            account.last_name = v;
        }
    }
    let new_email = req
        .email
        .as_deref()
        .and_then(|email| errors.check(validate_email(email)));

    if let Some(name) = &req.restaurant_name {
        if let Some(v) = errors.check(validate_name("restaurant_name", name, 200)) {
            profile.restaurant_name = v;
        }
    }
    if let Some(phone) = &req.phone {
        if let Some(v) = errors.check(validate_text("phone", phone, 20)) {
            profile.phone = v;
        }
    }
    if let Some(theme) = &req.theme {
        if let Some(v) = errors.check(validate_theme(theme)) {
            profile.theme = v;
        }
    }
    if let Some(currency) = &req.currency {
        if let Some(v) = errors.check(validate_name("currency", currency, 10)) {
            profile.currency = v;
        }
    }
    if let Some(language) = &req.language {
        if let Some(v) = errors.check(validate_name("language", language, 10)) {
            profile.language = v;
        }
    }
    if let Some(enabled) = req.notifications_enabled {
        profile.notifications_enabled = enabled;
    }
    if let Some(threshold) = req.low_stock_threshold {
        if errors.check(validate_low_stock_threshold(threshold)).is_some() {
            profile.low_stock_threshold = threshold;
        }
    }
    if let Some(model) = &req.ai_model {
        if let Some(v) = errors.check(validate_text("ai_model", model, 50)) {
            profile.ai_model = v;
        }
    }
    if let Some(key) = &req.gemini_api_key {
        if let Some(v) = errors.check(validate_text("gemini_api_key", key, 255)) {
            profile.ai_api_key = v;
        }
    }
    errors.into_result()?;

    if let Some(email) = new_email {
        if state.db.accounts().email_exists(&email, Some(account.id)).await? {
            return Err(ApiError::invalid_input("Email already in use"));
        }
        account.email = email;
    }

    let (account, _) = state
        .db
        .accounts()
        .update_profile(scope, &account, &profile)
        .await?;
    info!(account_id = account.id, "Profile updated");

    Ok(Json(UserResponse {
        message: "Profile updated successfully",
        user: UserDto::load(&state.db, account).await?,
    }))
}

/// `GET /users/settings`
pub async fn get_settings(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ApiResult<Json<SettingsDto>> {
    let settings = state.db.accounts().settings(auth.scope()).await?;
    Ok(Json(settings.into()))
}

/// `PUT|PATCH /users/settings`
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    let scope = auth.scope();
    let mut settings = state.db.accounts().settings(scope).await?;
    let mut errors = FieldErrors::default();

    if let Some(address) = &req.restaurant_address {
        if let Some(v) = errors.check(validate_text("restaurant_address", address, 500)) {
            settings.restaurant_address = v;
        }
    }
    if let Some(phone) = &req.restaurant_phone {
        if let Some(v) = errors.check(validate_text("restaurant_phone", phone, 20)) {
            settings.restaurant_phone = v;
        }
    }
    if let Some(email) = &req.restaurant_email {
        if email.trim().is_empty() {
            settings.restaurant_email = String::new();
        } else if let Some(v) = errors.check(validate_email(email)) {
            settings.restaurant_email = v;
        }
    }
    if let Some(hours) = &req.business_hours {
        if let Some(v) = errors.check(validate_text("business_hours", hours, 500)) {
            settings.business_hours = v;
        }
    }
    if let Some(rate) = req.tax_rate {
        if errors.check(validate_rate("tax_rate", rate)).is_some() {
            settings.tax_rate_bps = i64::from(rate.bps());
        }
    }
    if let Some(rate) = req.default_tip_percentage {
        if errors.check(validate_rate("default_tip_percentage", rate)).is_some() {
            settings.default_tip_bps = i64::from(rate.bps());
        }
    }
    if let Some(footer) = &req.receipt_footer {
        if let Some(v) = errors.check(validate_text("receipt_footer", footer, 1000)) {
            settings.receipt_footer = v;
        }
    }
    errors.into_result()?;

    let settings = state.db.accounts().update_settings(scope, &settings).await?;
    info!(account_id = scope.account_id(), "Settings updated");

    Ok(Json(SettingsResponse {
        message: "Settings updated successfully",
        settings: settings.into(),
    }))
}

/// `POST /users/change-password`
///
/// Rotates the token; the caller must switch to the returned one.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let mut errors = FieldErrors::default();
    if req.old_password.is_empty() {
        errors.push("old_password", "This field is required.");
    }
    if let Err(err) = validate_password(&req.new_password) {
        errors.push("new_password", err.to_string());
    }
    errors.into_result()?;

    if !verify_password(&req.old_password, &auth.account.password_hash) {
        return Err(ApiError::invalid_input("Current password is incorrect"));
    }

    let password_hash = hash_password(&req.new_password)?;
    let token = state
        .db
        .accounts()
        .change_password(auth.scope(), &password_hash)
        .await?;
    info!(account_id = auth.account.id, "Password changed");

    Ok(Json(TokenResponse {
        message: "Password changed successfully",
        token,
    }))
}

/// `GET /users/check-username?username=`
pub async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let username = query.username.unwrap_or_default();
    if username.trim().is_empty() {
        return Err(ApiError::invalid_input("Username is required"));
    }

    let exists = state.db.accounts().username_exists(&username).await?;
    Ok(Json(AvailabilityResponse { available: !exists }))
}

/// `GET /users/check-email?email=`
pub async fn check_email(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let email = query.email.unwrap_or_default();
    if email.trim().is_empty() {
        return Err(ApiError::invalid_input("Email is required"));
    }

    let exists = state.db.accounts().email_exists(&email, None).await?;
    Ok(Json(AvailabilityResponse { available: !exists }))
}
