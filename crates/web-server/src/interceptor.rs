use crate::AppState;
use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use core_types::{MAX_TEXT_BYTES, NewQueryEvent, QueryCategory, QuerySource};
use database::SharedStore;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

pub const SOURCE_HEADER: &str = "x-query-source";
pub const USER_HEADER: &str = "x-user-id";
pub const SESSION_HEADER: &str = "x-session-id";

/// Logs every read request as a `QueryEvent`.
///
/// Ingestion pushes are records already and pass through untouched. The guard records
/// the event on every exit path, including a handler that panics or a request that is
/// cancelled mid-flight.
pub async fn intercept(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let guard = InterceptGuard::new(state.store.clone(), state.records.clone(), event_for(&request));
    let response = next.run(request).await;

    // The body is buffered so the response text can be logged alongside the query.
    let (parts, body) = response.into_parts();
    let (text, body) = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => (truncate(&String::from_utf8_lossy(&bytes)), Body::from(bytes)),
        Err(e) => {
            warn!(error = %e, "Could not buffer the response body for logging.");
            (String::new(), Body::empty())
        }
    };
    guard.complete(parts.status, text);
    Response::from_parts(parts, body)
}

/// The event for an incoming request, before the handler has run.
fn event_for(request: &Request) -> NewQueryEvent {
    let headers = request.headers();
    let path = request.uri().path();
    let query = match request.uri().query() {
        Some(q) => format!("{} {path}?{q}", request.method()),
        None => format!("{} {path}", request.method()),
    };

    let mut event = NewQueryEvent::new(query, source_from(headers), path);
    event.method = request.method().as_str().to_string();
    event.category = category_for(path);
    event.user_id = header(headers, USER_HEADER);
    event.session_id = header(headers, SESSION_HEADER);
    if let Err(e) = event.metadata.insert("request_id", Uuid::new_v4().to_string()) {
        debug!(error = %e, "Request id not attached.");
    }
    event
}

fn source_from(headers: &HeaderMap) -> QuerySource {
    header(headers, SOURCE_HEADER)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The category an endpoint belongs to, derived from its route.
pub fn category_for(path: &str) -> QueryCategory {
    if path.starts_with("/api/signals") || path.starts_with("/api/analytics/signals") {
        QueryCategory::Signal
    } else if path.starts_with("/api/analytics") {
        QueryCategory::Analysis
    } else if path.starts_with("/api/chart") {
        QueryCategory::Chart
    } else {
        QueryCategory::Other
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_TEXT_BYTES {
        return text.to_string();
    }
    let mut end = MAX_TEXT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Owns a pending query event until it is recorded.
///
/// `complete` records the outcome of a finished request. If the guard is dropped first,
/// the request never finished and the event is recorded as a failed, aborted request.
pub struct InterceptGuard {
    store: SharedStore,
    records: RecordTasks,
    event: Option<NewQueryEvent>,
    started: Instant,
}

impl InterceptGuard {
    pub fn new(store: SharedStore, records: RecordTasks, event: NewQueryEvent) -> Self {
        Self {
            store,
            records,
            event: Some(event),
            started: Instant::now(),
        }
    }

    pub fn complete(mut self, status: StatusCode, response: String) {
        if let Some(mut event) = self.event.take() {
            event.duration_ms = self.elapsed_ms();
            event.status_code = status.as_u16();
            event.success = !(status.is_client_error() || status.is_server_error());
            event.response = response;
            self.records.record(self.store.clone(), event);
        }
    }

    fn elapsed_ms(&self) -> i64 {
        i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

impl Drop for InterceptGuard {
    fn drop(&mut self) {
        if let Some(mut event) = self.event.take() {
            event.duration_ms = self.elapsed_ms();
            event.status_code = StatusCode::INTERNAL_SERVER_ERROR.as_u16();
            event.success = false;
            event.response = "request aborted before a response was produced".to_string();
            self.records.record(self.store.clone(), event);
        }
    }
}

/// The background appends started by the interceptor.
///
/// Appends run detached so logging never delays the response. `drain` waits for the ones
/// still in flight, so shutdown can close the pool without losing the last events.
/// Dropping the last handle aborts whatever is still running.
#[derive(Clone, Default)]
pub struct RecordTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl RecordTasks {
    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        // A poisoned set still holds valid handles.
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends the event in the background.
    pub fn record(&self, store: SharedStore, event: NewQueryEvent) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            // Only reachable when a guard outlives the runtime during shutdown.
            Err(_) => {
                warn!(endpoint = %event.endpoint, "No runtime to record query event; dropped.");
                return;
            }
        };
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(
            async move {
                let endpoint = event.endpoint.clone();
                if let Err(e) = store.append(event).await {
                    warn!(error = %e, endpoint = %endpoint, "Failed to record query event.");
                }
            },
            &handle,
        );
    }

    /// Appends not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Waits up to `grace` for every in-flight append. Returns how many were awaited.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut tasks = std::mem::take(&mut *self.lock());
        let in_flight = tasks.len();
        let finished = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if finished.is_err() {
            warn!(remaining = tasks.len(), "Gave up waiting for query event appends.");
        }
        in_flight
    }
}
