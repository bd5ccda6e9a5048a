use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{bearer_token, require_account};
use crate::models::{Account, AccountKind, Company, Customer};
use crate::services::auth;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub kind: AccountKind,
    pub profile: serde_json::Value,
}

fn load_profile(conn: &Connection, account: &Account) -> Result<serde_json::Value, AppError> {
    let profile = match account.kind {
        AccountKind::Company => {
            let company = queries::get_company(conn, &account.id)?
                .ok_or_else(|| AppError::NotFound("profile not found".to_string()))?;
            serde_json::to_value(company).unwrap_or_default()
        }
        AccountKind::Customer => {
            let customer = queries::get_customer(conn, &account.id)?
                .ok_or_else(|| AppError::NotFound("profile not found".to_string()))?;
            serde_json::to_value(customer).unwrap_or_default()
        }
    };
    Ok(profile)
}

// POST /api/auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub kind: AccountKind,
    // companies
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    // customers
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = body.email.trim().to_lowercase();

    if !auth::is_valid_email(&email) {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    auth::validate_password(&body.password)
        .map_err(|msg| AppError::Validation(msg.to_string()))?;

    match body.kind {
        AccountKind::Company => {
            if body.company_name.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(AppError::Validation("company name is required".to_string()));
            }
        }
        AccountKind::Customer => {
            let first = body.first_name.as_deref().map(str::trim).unwrap_or("");
            let last = body.last_name.as_deref().map(str::trim).unwrap_or("");
            if first.is_empty() || last.is_empty() {
                return Err(AppError::Validation(
                    "first and last name are required".to_string(),
                ));
            }
        }
    }

    // Hash before taking the connection lock.
    let password_hash = auth::hash_password(&body.password)?;

    let db = state.db.lock().unwrap();

    if queries::get_account_by_email(&db, &email)?.is_some() {
        return Err(AppError::Conflict("email already registered".to_string()));
    }

    let account = Account {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash,
        kind: body.kind,
    };
    queries::create_account(&db, &account)?;

    let now = queries::now_ts();
    match body.kind {
        AccountKind::Company => {
            let company = Company {
                id: account.id.clone(),
                name: body.company_name.unwrap_or_default().trim().to_string(),
                email,
                phone: body.phone,
                address: body.address,
                logo_url: None,
                avatar_type: "default".to_string(),
                qr_code: auth::generate_qr_token("COMP"),
                created_at: now.clone(),
                updated_at: now,
            };
            queries::create_company(&db, &company)?;
        }
        AccountKind::Customer => {
            let customer = Customer {
                id: account.id.clone(),
                first_name: body.first_name.unwrap_or_default().trim().to_string(),
                last_name: body.last_name.unwrap_or_default().trim().to_string(),
                email: Some(email),
                phone: body.phone,
                avatar_type: "default".to_string(),
                qr_code: auth::generate_qr_token("USER"),
                created_at: now.clone(),
                updated_at: now,
            };
            queries::create_customer(&db, &customer)?;
        }
    }

    let session = auth::create_session(&db, &account.id, state.config.session_ttl_hours)?;
    let profile = load_profile(&db, &account)?;

    tracing::info!(kind = account.kind.as_str(), "registered new account");

    Ok(Json(SessionResponse {
        token: session.token,
        kind: account.kind,
        profile,
    }))
}

// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = body.email.trim().to_lowercase();

    let db = state.db.lock().unwrap();

    let account = queries::get_account_by_email(&db, &email)?.ok_or(AppError::Unauthorized)?;
    if !auth::verify_password(&account.password_hash, &body.password) {
        return Err(AppError::Unauthorized);
    }

    let session = auth::create_session(&db, &account.id, state.config.session_ttl_hours)?;
    let profile = load_profile(&db, &account)?;

    Ok(Json(SessionResponse {
        token: session.token,
        kind: account.kind,
        profile,
    }))
}

// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;

    let removed = {
        let db = state.db.lock().unwrap();
        queries::delete_session(&db, token)?
    };

    if !removed {
        return Err(AppError::Unauthorized);
    }
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/auth/me
#[derive(Serialize)]
pub struct MeResponse {
    pub kind: AccountKind,
    pub profile: serde_json::Value,
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let account = require_account(&state, &headers)?;

    let profile = {
        let db = state.db.lock().unwrap();
        load_profile(&db, &account)?
    };

    Ok(Json(MeResponse {
        kind: account.kind,
        profile,
    }))
}
