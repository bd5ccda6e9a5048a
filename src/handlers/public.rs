use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::EntryStatus;
use crate::services::ledger;
use crate::state::AppState;

// GET /api/companies/:qr_code — scan-to-join entry point
#[derive(Serialize)]
pub struct PublicCompanyResponse {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub avatar_type: String,
    pub queues: Vec<PublicQueue>,
}

#[derive(Serialize)]
pub struct PublicQueue {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_paused: bool,
    pub max_capacity: i64,
    pub waiting_count: i64,
    pub estimated_wait_time: i64,
}

pub async fn company_by_qr(
    State(state): State<Arc<AppState>>,
    Path(qr_code): Path<String>,
) -> Result<Json<PublicCompanyResponse>, AppError> {
    let db = state.db.lock().unwrap();

    let company = queries::get_company_by_qr(&db, &qr_code)?
        .ok_or_else(|| AppError::NotFound("company not found".to_string()))?;

    let mut queues = vec![];
    for queue in queries::get_active_queues_for_company(&db, &company.id)? {
        let stats = queries::get_queue_stats(&db, &queue.id)?;
        let estimated_wait_time = ledger::estimate_wait(&db, &queue, stats.waiting_count)?;
        queues.push(PublicQueue {
            id: queue.id,
            name: queue.name,
            description: queue.description,
            is_paused: queue.is_paused,
            max_capacity: queue.max_capacity,
            waiting_count: stats.waiting_count,
            estimated_wait_time,
        });
    }

    Ok(Json(PublicCompanyResponse {
        id: company.id,
        name: company.name,
        address: company.address,
        logo_url: company.logo_url,
        avatar_type: company.avatar_type,
        queues,
    }))
}

// GET /api/entries/:id — entry ids are unguessable, this is how guests track
#[derive(Serialize)]
pub struct EntryStatusResponse {
    pub id: String,
    pub queue_id: String,
    pub position: i64,
    pub status: EntryStatus,
    pub people_ahead: i64,
    pub estimated_wait_time: i64,
    pub joined_at: String,
    pub called_at: Option<String>,
    pub served_at: Option<String>,
}

pub async fn entry_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EntryStatusResponse>, AppError> {
    let db = state.db.lock().unwrap();

    let entry = queries::get_entry(&db, &id)?
        .ok_or_else(|| AppError::NotFound("entry not found".to_string()))?;

    let (people_ahead, estimated_wait_time) = if entry.status == EntryStatus::Waiting {
        let queue = queries::get_queue(&db, &entry.queue_id)?
            .ok_or_else(|| AppError::NotFound("queue not found".to_string()))?;
        let ahead = queries::people_ahead(&db, &entry.queue_id, entry.position)?;
        (ahead, ledger::estimate_wait(&db, &queue, ahead)?)
    } else {
        (0, 0)
    };

    Ok(Json(EntryStatusResponse {
        id: entry.id,
        queue_id: entry.queue_id,
        position: entry.position,
        status: entry.status,
        people_ahead,
        estimated_wait_time,
        joined_at: entry.joined_at,
        called_at: entry.called_at,
        served_at: entry.served_at,
    }))
}
