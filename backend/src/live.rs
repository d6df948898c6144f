//! Server-sent event streams for the admin console.
//!
//! `/dashboard/live` pushes a full [`DashboardSnapshot`] whenever one of the
//! three tables changes; `/changes` forwards the raw change notifications.
//! Each connection owns its subscription and drops it on disconnect.

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use capryos_shared::{live::LiveView, DashboardSnapshot, Table};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub async fn dashboard_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let site = state.site.clone();
    let mut view = LiveView::spawn(state.site.changes(), &Table::ALL, move || {
        let site = site.clone();
        async move { site.dashboard().await }
    });

    let stream = async_stream::stream! {
        while let Some(snapshot) = view.changed().await {
            if let Some(event) = snapshot_event(&snapshot) {
                yield Ok(event);
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

pub async fn change_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.site.changes()).filter_map(|change| async move {
        match change {
            Ok(change) => Event::default()
                .event(change.table.as_str())
                .json_data(&change)
                .map_err(|err| tracing::warn!(error = %err, "failed to encode change event"))
                .ok()
                .map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "change stream lagged");
                Some(Ok(Event::default().event("lagged").data(skipped.to_string())))
            },
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn snapshot_event(snapshot: &DashboardSnapshot) -> Option<Event> {
    Event::default()
        .event("dashboard")
        .json_data(snapshot)
        .map_err(|err| tracing::warn!(error = %err, "failed to encode dashboard snapshot"))
        .ok()
}
