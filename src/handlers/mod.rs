pub mod auth;
pub mod company;
pub mod customer;
pub mod events;
pub mod health;
pub mod public;

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Account, AccountKind, Company, Customer};
use crate::state::AppState;

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok())?;
    auth.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}

pub(crate) fn require_account(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<Account, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;

    let db = state.db.lock().unwrap();
    let session = queries::get_session(&db, token)?.ok_or(AppError::Unauthorized)?;
    queries::get_account(&db, &session.account_id)?.ok_or(AppError::Unauthorized)
}

pub(crate) fn require_company(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<Company, AppError> {
    let account = require_account(state, headers)?;
    if account.kind != AccountKind::Company {
        return Err(AppError::Forbidden);
    }

    let db = state.db.lock().unwrap();
    queries::get_company(&db, &account.id)?.ok_or(AppError::Unauthorized)
}

pub(crate) fn require_customer(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<Customer, AppError> {
    let account = require_account(state, headers)?;
    if account.kind != AccountKind::Customer {
        return Err(AppError::Forbidden);
    }

    let db = state.db.lock().unwrap();
    queries::get_customer(&db, &account.id)?.ok_or(AppError::Unauthorized)
}
