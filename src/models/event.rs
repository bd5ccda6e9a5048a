use serde::{Deserialize, Serialize};

/// One row of the queue event log, also broadcast to SSE subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueEvent {
    pub id: i64,
    pub queue_id: String,
    pub company_id: String,
    pub customer_id: Option<String>,
    pub entry_id: Option<String>,
    pub kind: String,
    pub created_at: String,
}
