//! SSE feed for batch progress.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use phonescout_shared::{BatchId, BatchStatus};

use crate::api::{ApiError, AppState};
use crate::registry::done_event;

/// GET /api/batches/{id}/events
///
/// Streams `progress`, `result`, and `done` events for one run. A run that
/// is already terminal replays its `done` event so late subscribers are not
/// left hanging on keep-alives.
pub async fn batch_events(
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let handle = state
        .registry
        .get(&id)
        .ok_or_else(|| ApiError::not_found(format!("no batch {id}")))?;

    // Subscribe before snapshotting; a run finishing in between duplicates
    // the done event rather than dropping it.
    let rx = handle.subscribe();
    let snapshot = handle.snapshot();

    let mut replay = Vec::new();
    if snapshot.status != BatchStatus::Running {
        if let Some(event) = sse_event(done_event(&snapshot)) {
            replay.push(Ok(event));
        }
    }

    let live = BroadcastStream::new(rx).filter_map(|incoming| match incoming {
        Ok(value) => sse_event(value).map(Ok),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            sse_event(serde_json::json!({ "type": "lagged", "missed": missed })).map(Ok)
        }
    });

    let stream = tokio_stream::iter(replay).chain(live);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Build an SSE event named after the payload's `type` field.
fn sse_event(value: serde_json::Value) -> Option<Event> {
    let name = value
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("message")
        .to_string();
    Event::default().event(name).json_data(&value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_event_takes_its_name_from_the_payload() {
        let event = sse_event(serde_json::json!({ "type": "progress", "completed": 1 }));
        assert!(event.is_some());

        let unnamed = sse_event(serde_json::json!({ "completed": 1 }));
        assert!(unnamed.is_some());
    }
}
