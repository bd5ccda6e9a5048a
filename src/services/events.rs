use std::sync::Arc;

use crate::db::queries;
use crate::models::{Queue, QueueEntry, QueueEvent};
use crate::state::AppState;

/// Append a queue event to the log and broadcast it to SSE subscribers.
pub fn record_queue_event(
    state: &Arc<AppState>,
    queue: &Queue,
    entry: Option<&QueueEntry>,
    kind: &str,
) {
    let customer_id = entry.and_then(|e| e.customer_id.clone());
    let entry_id = entry.map(|e| e.id.clone());

    let event_id = {
        let db = state.db.lock().unwrap();
        queries::insert_event(
            &db,
            &queue.id,
            &queue.company_id,
            customer_id.as_deref(),
            entry_id.as_deref(),
            kind,
        )
    };

    match event_id {
        Ok(id) => {
            let event = QueueEvent {
                id,
                queue_id: queue.id.clone(),
                company_id: queue.company_id.clone(),
                customer_id,
                entry_id,
                kind: kind.to_string(),
                created_at: queries::now_ts(),
            };
            // Broadcast to SSE subscribers; ignore if no receivers
            let _ = state.events_tx.send(event);
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to record queue event");
        }
    }
}
