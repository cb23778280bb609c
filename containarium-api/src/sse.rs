use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use containarium_core::ResourceKind;
use containarium_events::SubscriptionFilter;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    token: Option<String>,
    #[serde(default)]
    metrics: bool,
    metrics_interval: Option<u64>,
}

/// The SSE surface of §4.H/§4.G. Token is accepted as a query parameter
/// since `EventSource` can't set custom headers. Heartbeats are
/// synthesised by axum's `KeepAlive`, matching §4.G's "heartbeats are
/// synthesised at the consumer boundary".
pub async fn stream_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>>, crate::error::ApiErrorResponse>
{
    let token = query
        .token
        .ok_or_else(|| crate::error::ApiErrorResponse(containarium_core::ApiError::validation("missing token")))?;
    state
        .jwt
        .validate(&token)
        .map_err(|e| crate::error::ApiErrorResponse(containarium_core::ApiError::validation(e.to_string())))?;

    let mut filter = SubscriptionFilter::default().with_resource_kinds([
        ResourceKind::Container,
        ResourceKind::Route,
        ResourceKind::PassthroughRoute,
        ResourceKind::Collaborator,
        ResourceKind::App,
    ]);
    if query.metrics {
        filter = filter.with_metrics(query.metrics_interval.unwrap_or(5));
    }

    let mut subscription = state.events.subscribe(filter);
    let (tx, rx) = tokio::sync::mpsc::channel(64);
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let payload = serde_json::to_string(&event.payload).unwrap_or_default();
            let kind = format!("{:?}", event.resource_kind()).to_lowercase();
            if tx.send(Ok(SseEvent::default().event(kind).data(payload))).await.is_err() {
                break;
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(|item| item);
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
