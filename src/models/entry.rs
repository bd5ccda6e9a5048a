use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub queue_id: String,
    pub customer_id: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub position: i64,
    pub status: EntryStatus,
    pub estimated_wait_time: Option<i64>,
    pub joined_at: String,
    pub called_at: Option<String>,
    pub served_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Waiting,
    Called,
    Served,
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::Called => "called",
            EntryStatus::Served => "served",
            EntryStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "called" => EntryStatus::Called,
            "served" => EntryStatus::Served,
            "cancelled" => EntryStatus::Cancelled,
            _ => EntryStatus::Waiting,
        }
    }

    /// served and cancelled are terminal.
    pub fn can_become(&self, next: EntryStatus) -> bool {
        match self {
            EntryStatus::Waiting => matches!(
                next,
                EntryStatus::Called | EntryStatus::Served | EntryStatus::Cancelled
            ),
            EntryStatus::Called => matches!(next, EntryStatus::Served | EntryStatus::Cancelled),
            EntryStatus::Served | EntryStatus::Cancelled => false,
        }
    }
}
