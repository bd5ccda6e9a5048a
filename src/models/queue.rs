use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Configured minutes per person, used when there is no service history.
    pub average_wait_time: i64,
    pub is_active: bool,
    pub is_paused: bool,
    pub max_capacity: i64,
    pub created_at: String,
    pub updated_at: String,
}
