use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Account, AccountKind, QueueEvent};
use crate::state::AppState;

/// Companies see events for their own queues; customers see events for
/// their own entries.
fn visible_to(account: &Account, event: &QueueEvent) -> bool {
    match account.kind {
        AccountKind::Company => event.company_id == account.id,
        AccountKind::Customer => event.customer_id.as_deref() == Some(account.id.as_str()),
    }
}

// GET /api/events — SSE stream
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Auth via query param (EventSource can't set headers)
    let token = query.token.as_deref().unwrap_or("");

    let account = {
        let db = state.db.lock().unwrap();
        let session = queries::get_session(&db, token)?.ok_or(AppError::Unauthorized)?;
        queries::get_account(&db, &session.account_id)?.ok_or(AppError::Unauthorized)?
    };

    let last_id = query.last_id.unwrap_or(0);

    // Subscribe before reading the log so an event recorded in between
    // still reaches the viewer; anything the log replay already covered
    // is dropped from the live side by id.
    let rx = state.events_tx.subscribe();

    let logged = {
        let db = state.db.lock().unwrap();
        queries::get_events_since(&db, last_id)?
    };
    let replayed_up_to = logged.last().map(|event| event.id).unwrap_or(last_id);

    let catchup_events: Vec<QueueEvent> = logged
        .into_iter()
        .filter(|event| visible_to(&account, event))
        .collect();

    let catchup_stream = tokio_stream::iter(catchup_events.into_iter().map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().data(data).event("queue_event"))
    }));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.id > replayed_up_to && visible_to(&account, &event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().data(data).event("queue_event")))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = catchup_stream.chain(live_stream);
    let merged = StreamExt::merge(combined, keepalive_stream);

    Ok(Sse::new(merged))
}
