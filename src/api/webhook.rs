//! Webhook handler for push notifications

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, Method, StatusCode},
};
use tracing::{debug, error, info, warn};

use crate::SharedState;
use crate::error::DiffError;
use crate::signature::verify_signature;
use crate::task::Task;
use crate::webhook::PushEvent;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

pub const GET_BANNER: &str =
    "You've found the decompiler diff machine! However, I don't allow GET requests!";
pub const UNKNOWN_METHOD: &str = "I have no idea who you are, I cannot acknowledge";
pub const UNAUTHORIZED: &str = "You're not authorized!";
pub const MALFORMED: &str = "Malformed request!";
pub const NOT_A_PUSH: &str = "Ack, but not a push";
pub const ACCEPTED: &str = "Processing your request!";
pub const UNAVAILABLE: &str = "Pipeline worker is not running";

/// Validate, parse and enqueue. Never waits on the pipeline.
pub async fn handle_request(
    AxumState(state): AxumState<SharedState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if method == Method::GET {
        debug!("GET request; sending banner");
        return (StatusCode::OK, GET_BANNER);
    }
    if method != Method::POST {
        warn!("Rejecting {} request", method);
        return (StatusCode::FORBIDDEN, UNKNOWN_METHOD);
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    let Some(signature) = signature else {
        warn!("Request without {} header", SIGNATURE_HEADER);
        return (StatusCode::FORBIDDEN, UNAUTHORIZED);
    };
    if !verify_signature(&state.secret, &body, signature) {
        warn!("Signature verification failed");
        return (StatusCode::FORBIDDEN, UNAUTHORIZED);
    }

    let event = match PushEvent::parse(&body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            info!("Signed payload is not a push; acknowledging only");
            return (StatusCode::OK, NOT_A_PUSH);
        }
        Err(e) => {
            warn!("Malformed request: {}", e);
            return (StatusCode::BAD_REQUEST, MALFORMED);
        }
    };

    let task = Task::new(event);
    let task_id = task.id.clone();
    match state.tasks.enqueue(task) {
        Ok(waiting) => {
            info!("Queued task {} ({} waiting)", task_id, waiting);
            (StatusCode::OK, ACCEPTED)
        }
        Err(DiffError::QueueClosed) => {
            error!("Task {} dropped: pipeline worker has stopped", task_id);
            (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE)
        }
        Err(e) => {
            error!("Task {} could not be queued: {}", task_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, UNAVAILABLE)
        }
    }
}
