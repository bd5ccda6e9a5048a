use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::require_customer;
use crate::models::{EntryStatus, QueueEntry};
use crate::services::events::record_queue_event;
use crate::services::ledger;
use crate::state::AppState;

#[derive(Serialize)]
pub struct JoinedEntryResponse {
    pub id: String,
    pub queue_id: String,
    pub position: i64,
    pub status: EntryStatus,
    pub people_ahead: i64,
    pub estimated_wait_time: Option<i64>,
    pub joined_at: String,
}

// POST /api/queues/:id/join
pub async fn join_queue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(queue_id): Path<String>,
) -> Result<Json<JoinedEntryResponse>, AppError> {
    let customer = require_customer(&state, &headers)?;

    let (entry, queue, people_ahead) = {
        let db = state.db.lock().unwrap();
        let entry = ledger::join_queue(
            &db,
            &queue_id,
            ledger::NewEntry {
                customer_id: Some(customer.id.clone()),
                ..ledger::NewEntry::default()
            },
        )?;
        let queue = queries::get_queue(&db, &queue_id)?
            .ok_or_else(|| AppError::NotFound("queue not found".to_string()))?;
        let ahead = queries::people_ahead(&db, &queue_id, entry.position)?;
        (entry, queue, ahead)
    };

    record_queue_event(&state, &queue, Some(&entry), "entry_joined");

    Ok(Json(JoinedEntryResponse {
        id: entry.id,
        queue_id: entry.queue_id,
        position: entry.position,
        status: entry.status,
        people_ahead,
        estimated_wait_time: entry.estimated_wait_time,
        joined_at: entry.joined_at,
    }))
}

// POST /api/entries/:id/leave
pub async fn leave_queue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(entry_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let customer = require_customer(&state, &headers)?;

    let (entry, queue) = {
        let db = state.db.lock().unwrap();
        let entry = queries::get_entry(&db, &entry_id)?
            .ok_or_else(|| AppError::NotFound("entry not found".to_string()))?;
        if entry.customer_id.as_deref() != Some(customer.id.as_str()) {
            return Err(AppError::Forbidden);
        }
        let entry = ledger::transition(&db, &entry_id, EntryStatus::Cancelled)?;
        let queue = queries::get_queue(&db, &entry.queue_id)?
            .ok_or_else(|| AppError::NotFound("queue not found".to_string()))?;
        (entry, queue)
    };

    record_queue_event(&state, &queue, Some(&entry), "entry_cancelled");

    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/customer/dashboard
#[derive(Serialize)]
pub struct CustomerDashboardResponse {
    pub profile: serde_json::Value,
    pub stats: CustomerStatsResponse,
    pub current_entries: Vec<CurrentEntryResponse>,
    pub recent_history: Vec<HistoryEntryResponse>,
}

#[derive(Serialize)]
pub struct CustomerStatsResponse {
    pub current_queues: i64,
    pub total_visits: i64,
    pub average_wait_time: i64,
    pub companies_visited: i64,
}

#[derive(Serialize)]
pub struct CurrentEntryResponse {
    pub id: String,
    pub queue_id: String,
    pub queue_name: String,
    pub company_id: String,
    pub company_name: String,
    pub position: i64,
    pub status: EntryStatus,
    pub people_ahead: i64,
    pub estimated_wait_time: i64,
    pub joined_at: String,
    pub called_at: Option<String>,
}

#[derive(Serialize)]
pub struct HistoryEntryResponse {
    pub id: String,
    pub queue_name: String,
    pub company_name: String,
    pub status: EntryStatus,
    pub joined_at: String,
    pub served_at: Option<String>,
}

fn current_entry_response(
    db: &rusqlite::Connection,
    ctx: queries::EntryWithContext,
) -> Result<CurrentEntryResponse, AppError> {
    let entry: QueueEntry = ctx.entry;
    let ahead = if entry.status == EntryStatus::Waiting {
        queries::people_ahead(db, &entry.queue_id, entry.position)?
    } else {
        0
    };
    let estimated_wait_time = if entry.status == EntryStatus::Waiting {
        ledger::estimate_wait(db, &ctx.queue, ahead)?
    } else {
        0
    };

    Ok(CurrentEntryResponse {
        id: entry.id,
        queue_id: entry.queue_id,
        queue_name: ctx.queue.name,
        company_id: ctx.company.id,
        company_name: ctx.company.name,
        position: entry.position,
        status: entry.status,
        people_ahead: ahead,
        estimated_wait_time,
        joined_at: entry.joined_at,
        called_at: entry.called_at,
    })
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CustomerDashboardResponse>, AppError> {
    let customer = require_customer(&state, &headers)?;

    let db = state.db.lock().unwrap();

    let current = queries::get_current_entries_for_customer(&db, &customer.id)?;
    let current_queues = current.len() as i64;

    let mut current_entries = vec![];
    for ctx in current {
        current_entries.push(current_entry_response(&db, ctx)?);
    }

    let recent_history = queries::get_history_for_customer(&db, &customer.id, 5)?
        .into_iter()
        .map(|ctx| HistoryEntryResponse {
            id: ctx.entry.id,
            queue_name: ctx.queue.name,
            company_name: ctx.company.name,
            status: ctx.entry.status,
            joined_at: ctx.entry.joined_at,
            served_at: ctx.entry.served_at,
        })
        .collect();

    let stats = queries::get_customer_stats(&db, &customer.id)?;

    Ok(Json(CustomerDashboardResponse {
        profile: serde_json::to_value(&customer).unwrap_or_default(),
        stats: CustomerStatsResponse {
            current_queues,
            total_visits: stats.total_visits,
            average_wait_time: stats.average_wait_time,
            companies_visited: stats.companies_visited,
        },
        current_entries,
        recent_history,
    }))
}

// GET /api/customer/history
#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntryResponse>>, AppError> {
    let customer = require_customer(&state, &headers)?;
    let limit = query.limit.unwrap_or(50);

    let db = state.db.lock().unwrap();

    let history = queries::get_history_for_customer(&db, &customer.id, limit)?
        .into_iter()
        .map(|ctx| HistoryEntryResponse {
            id: ctx.entry.id,
            queue_name: ctx.queue.name,
            company_name: ctx.company.name,
            status: ctx.entry.status,
            joined_at: ctx.entry.joined_at,
            served_at: ctx.entry.served_at,
        })
        .collect();

    Ok(Json(history))
}

// POST /api/customer/profile
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_type: Option<String>,
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut customer = require_customer(&state, &headers)?;

    if let Some(first_name) = body.first_name {
        if first_name.trim().is_empty() {
            return Err(AppError::Validation("first name cannot be empty".to_string()));
        }
        customer.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = body.last_name {
        if last_name.trim().is_empty() {
            return Err(AppError::Validation("last name cannot be empty".to_string()));
        }
        customer.last_name = last_name.trim().to_string();
    }
    if let Some(phone) = body.phone {
        customer.phone = Some(phone);
    }
    if let Some(avatar_type) = body.avatar_type {
        customer.avatar_type = avatar_type;
    }

    {
        let db = state.db.lock().unwrap();
        queries::update_customer(&db, &customer)?;
    }

    Ok(Json(serde_json::json!({"ok": true})))
}
