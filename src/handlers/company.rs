use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::require_company;
use crate::models::{EntryStatus, Queue, QueueEntry};
use crate::services::events::record_queue_event;
use crate::services::ledger;
use crate::state::AppState;

fn owned_queue(conn: &Connection, company_id: &str, queue_id: &str) -> Result<Queue, AppError> {
    let queue = queries::get_queue(conn, queue_id)?
        .ok_or_else(|| AppError::NotFound("queue not found".to_string()))?;
    if queue.company_id != company_id {
        return Err(AppError::Forbidden);
    }
    Ok(queue)
}

fn owned_entry(
    conn: &Connection,
    company_id: &str,
    entry_id: &str,
) -> Result<(QueueEntry, Queue), AppError> {
    let entry = queries::get_entry(conn, entry_id)?
        .ok_or_else(|| AppError::NotFound("entry not found".to_string()))?;
    let queue = owned_queue(conn, company_id, &entry.queue_id)?;
    Ok((entry, queue))
}

#[derive(Serialize)]
pub struct QueueResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub average_wait_time: i64,
    pub is_active: bool,
    pub is_paused: bool,
    pub max_capacity: i64,
    pub waiting_count: i64,
    pub called_count: i64,
    pub served_today: i64,
    pub created_at: String,
}

fn queue_response(conn: &Connection, queue: Queue) -> Result<QueueResponse, AppError> {
    let stats = queries::get_queue_stats(conn, &queue.id)?;
    Ok(QueueResponse {
        id: queue.id,
        name: queue.name,
        description: queue.description,
        average_wait_time: queue.average_wait_time,
        is_active: queue.is_active,
        is_paused: queue.is_paused,
        max_capacity: queue.max_capacity,
        waiting_count: stats.waiting_count,
        called_count: stats.called_count,
        served_today: stats.served_today,
        created_at: queue.created_at,
    })
}

// GET /api/company/dashboard
#[derive(Serialize)]
pub struct CompanyDashboardResponse {
    pub profile: serde_json::Value,
    pub total_queues: i64,
    pub total_waiting: i64,
    pub served_today: i64,
    pub average_wait_time: i64,
    pub queues: Vec<QueueResponse>,
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CompanyDashboardResponse>, AppError> {
    let company = require_company(&state, &headers)?;

    let db = state.db.lock().unwrap();

    let mut queues = vec![];
    for queue in queries::get_active_queues_for_company(&db, &company.id)? {
        queues.push(queue_response(&db, queue)?);
    }

    let total_queues = queues.len() as i64;
    let total_waiting: i64 = queues.iter().map(|q| q.waiting_count).sum();
    let served_today: i64 = queues.iter().map(|q| q.served_today).sum();
    let average_wait_time = if queues.is_empty() {
        0
    } else {
        let sum: i64 = queues.iter().map(|q| q.average_wait_time).sum();
        (sum as f64 / queues.len() as f64).round() as i64
    };

    Ok(Json(CompanyDashboardResponse {
        profile: serde_json::to_value(&company).unwrap_or_default(),
        total_queues,
        total_waiting,
        served_today,
        average_wait_time,
        queues,
    }))
}

// GET /api/company/queues
pub async fn list_queues(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<QueueResponse>>, AppError> {
    let company = require_company(&state, &headers)?;

    let db = state.db.lock().unwrap();

    let mut queues = vec![];
    for queue in queries::get_queues_for_company(&db, &company.id)? {
        queues.push(queue_response(&db, queue)?);
    }
    Ok(Json(queues))
}

// POST /api/company/queues
#[derive(Deserialize)]
pub struct CreateQueueRequest {
    pub name: String,
    pub description: Option<String>,
    pub average_wait_time: Option<i64>,
    pub max_capacity: Option<i64>,
}

pub async fn create_queue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateQueueRequest>,
) -> Result<Json<QueueResponse>, AppError> {
    let company = require_company(&state, &headers)?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("queue name is required".to_string()));
    }
    let average_wait_time = body.average_wait_time.unwrap_or(5);
    let max_capacity = body.max_capacity.unwrap_or(50);
    if average_wait_time <= 0 || max_capacity <= 0 {
        return Err(AppError::Validation(
            "average wait time and capacity must be positive".to_string(),
        ));
    }

    let now = queries::now_ts();
    let queue = Queue {
        id: Uuid::new_v4().to_string(),
        company_id: company.id.clone(),
        name,
        description: body.description,
        average_wait_time,
        is_active: true,
        is_paused: false,
        max_capacity,
        created_at: now.clone(),
        updated_at: now,
    };

    let db = state.db.lock().unwrap();
    queries::create_queue(&db, &queue)?;

    tracing::info!(queue = %queue.id, company = %company.id, "created queue");

    Ok(Json(queue_response(&db, queue)?))
}

// GET /api/company/queues/:id
#[derive(Deserialize)]
pub struct QueueDetailQuery {
    pub all: Option<bool>,
}

#[derive(Serialize)]
pub struct QueueDetailResponse {
    #[serde(flatten)]
    pub queue: QueueResponse,
    pub entries: Vec<EntryResponse>,
}

#[derive(Serialize)]
pub struct EntryResponse {
    pub id: String,
    pub customer_id: Option<String>,
    pub display_name: String,
    pub position: i64,
    pub status: EntryStatus,
    pub estimated_wait_time: Option<i64>,
    pub joined_at: String,
    pub called_at: Option<String>,
    pub served_at: Option<String>,
}

fn entry_response(conn: &Connection, entry: QueueEntry) -> Result<EntryResponse, AppError> {
    let display_name = match entry.customer_id.as_deref() {
        Some(customer_id) => match queries::get_customer(conn, customer_id)? {
            Some(c) => format!("{} {}", c.first_name, c.last_name),
            None => "Unknown".to_string(),
        },
        None => entry.guest_name.clone().unwrap_or_else(|| "Guest".to_string()),
    };

    Ok(EntryResponse {
        id: entry.id,
        customer_id: entry.customer_id,
        display_name,
        position: entry.position,
        status: entry.status,
        estimated_wait_time: entry.estimated_wait_time,
        joined_at: entry.joined_at,
        called_at: entry.called_at,
        served_at: entry.served_at,
    })
}

pub async fn queue_detail(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(queue_id): Path<String>,
    Query(query): Query<QueueDetailQuery>,
) -> Result<Json<QueueDetailResponse>, AppError> {
    let company = require_company(&state, &headers)?;

    let db = state.db.lock().unwrap();
    let queue = owned_queue(&db, &company.id, &queue_id)?;

    let active_only = !query.all.unwrap_or(false);
    let mut entries = vec![];
    for entry in queries::get_entries_for_queue(&db, &queue_id, active_only)? {
        entries.push(entry_response(&db, entry)?);
    }

    Ok(Json(QueueDetailResponse {
        queue: queue_response(&db, queue)?,
        entries,
    }))
}

// POST /api/company/queues/:id/settings
#[derive(Deserialize)]
pub struct UpdateQueueRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub average_wait_time: Option<i64>,
    pub max_capacity: Option<i64>,
}

pub async fn update_queue_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(queue_id): Path<String>,
    Json(body): Json<UpdateQueueRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let company = require_company(&state, &headers)?;

    let db = state.db.lock().unwrap();
    let mut queue = owned_queue(&db, &company.id, &queue_id)?;

    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("queue name cannot be empty".to_string()));
        }
        queue.name = name.trim().to_string();
    }
    if let Some(description) = body.description {
        queue.description = Some(description);
    }
    if let Some(average_wait_time) = body.average_wait_time {
        if average_wait_time <= 0 {
            return Err(AppError::Validation(
                "average wait time must be positive".to_string(),
            ));
        }
        queue.average_wait_time = average_wait_time;
    }
    if let Some(max_capacity) = body.max_capacity {
        if max_capacity <= 0 {
            return Err(AppError::Validation("capacity must be positive".to_string()));
        }
        queue.max_capacity = max_capacity;
    }

    queries::update_queue(&db, &queue)?;

    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/company/queues/:id/pause
pub async fn pause_queue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(queue_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    set_paused(state, headers, queue_id, true).await
}

// POST /api/company/queues/:id/resume
pub async fn resume_queue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(queue_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    set_paused(state, headers, queue_id, false).await
}

async fn set_paused(
    state: Arc<AppState>,
    headers: HeaderMap,
    queue_id: String,
    paused: bool,
) -> Result<Json<serde_json::Value>, AppError> {
    let company = require_company(&state, &headers)?;

    let changed = {
        let db = state.db.lock().unwrap();
        let mut queue = owned_queue(&db, &company.id, &queue_id)?;
        if queue.is_paused == paused {
            None
        } else {
            queue.is_paused = paused;
            queries::update_queue(&db, &queue)?;
            Some(queue)
        }
    };

    if let Some(queue) = changed {
        let kind = if paused { "queue_paused" } else { "queue_resumed" };
        record_queue_event(&state, &queue, None, kind);
    }

    Ok(Json(serde_json::json!({"ok": true, "is_paused": paused})))
}

// POST /api/company/queues/:id/deactivate
pub async fn deactivate_queue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(queue_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let company = require_company(&state, &headers)?;

    let queue = {
        let db = state.db.lock().unwrap();
        let mut queue = owned_queue(&db, &company.id, &queue_id)?;
        queue.is_active = false;
        queries::update_queue(&db, &queue)?;
        queue
    };

    record_queue_event(&state, &queue, None, "queue_deactivated");

    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/company/queues/:id/call-next
pub async fn call_next(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(queue_id): Path<String>,
) -> Result<Json<EntryResponse>, AppError> {
    let company = require_company(&state, &headers)?;

    let (entry, queue, response) = {
        let db = state.db.lock().unwrap();
        let queue = owned_queue(&db, &company.id, &queue_id)?;
        let entry = ledger::call_next(&db, &queue.id)?;
        let response = entry_response(&db, entry.clone())?;
        (entry, queue, response)
    };

    record_queue_event(&state, &queue, Some(&entry), "entry_called");

    Ok(Json(response))
}

// POST /api/company/entries/:id/served
pub async fn mark_served(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(entry_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let company = require_company(&state, &headers)?;

    let (entry, queue) = {
        let db = state.db.lock().unwrap();
        let (_, queue) = owned_entry(&db, &company.id, &entry_id)?;
        let entry = ledger::transition(&db, &entry_id, EntryStatus::Served)?;
        (entry, queue)
    };

    record_queue_event(&state, &queue, Some(&entry), "entry_served");

    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/company/entries/:id/cancel
pub async fn cancel_entry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(entry_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let company = require_company(&state, &headers)?;

    let (entry, queue) = {
        let db = state.db.lock().unwrap();
        let (_, queue) = owned_entry(&db, &company.id, &entry_id)?;
        let entry = ledger::transition(&db, &entry_id, EntryStatus::Cancelled)?;
        (entry, queue)
    };

    record_queue_event(&state, &queue, Some(&entry), "entry_cancelled");

    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/company/queues/:id/walk-in
//
// Adds a guest, or a registered customer identified by their USER_* QR
// token scanned at the counter.
#[derive(Deserialize)]
pub struct WalkInRequest {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub customer_qr: Option<String>,
}

pub async fn walk_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(queue_id): Path<String>,
    Json(body): Json<WalkInRequest>,
) -> Result<Json<EntryResponse>, AppError> {
    let company = require_company(&state, &headers)?;

    let (entry, queue, response) = {
        let db = state.db.lock().unwrap();
        let queue = owned_queue(&db, &company.id, &queue_id)?;

        let who = match body.customer_qr.as_deref() {
            Some(qr_code) => {
                let customer = queries::get_customer_by_qr(&db, qr_code)?
                    .ok_or_else(|| AppError::NotFound("customer not found".to_string()))?;
                ledger::NewEntry {
                    customer_id: Some(customer.id),
                    ..ledger::NewEntry::default()
                }
            }
            None => {
                let guest_name = body.guest_name.as_deref().map(str::trim).unwrap_or("");
                if guest_name.is_empty() {
                    return Err(AppError::Validation(
                        "guest name or customer QR token is required".to_string(),
                    ));
                }
                ledger::NewEntry {
                    customer_id: None,
                    guest_name: Some(guest_name.to_string()),
                    guest_email: body.guest_email,
                    guest_phone: body.guest_phone,
                }
            }
        };

        let entry = ledger::join_queue(&db, &queue.id, who)?;
        let response = entry_response(&db, entry.clone())?;
        (entry, queue, response)
    };

    record_queue_event(&state, &queue, Some(&entry), "entry_joined");

    Ok(Json(response))
}

// POST /api/company/profile
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub avatar_type: Option<String>,
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut company = require_company(&state, &headers)?;

    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("company name cannot be empty".to_string()));
        }
        company.name = name.trim().to_string();
    }
    if let Some(phone) = body.phone {
        company.phone = Some(phone);
    }
    if let Some(address) = body.address {
        company.address = Some(address);
    }
    if let Some(logo_url) = body.logo_url {
        company.logo_url = Some(logo_url);
    }
    if let Some(avatar_type) = body.avatar_type {
        company.avatar_type = avatar_type;
    }

    {
        let db = state.db.lock().unwrap();
        queries::update_company(&db, &company)?;
    }

    Ok(Json(serde_json::json!({"ok": true})))
}
