//! Background thread that owns the worklist backend for its lifetime.
//!
//! The backend is connected inside the thread on a current-thread runtime, so
//! the UI loop never awaits network or SQLite I/O. All communication is via
//! channels: `ApiRequest` in, `AppEvent::Api` out.

use crossbeam_channel::{Receiver, Sender};
use proofdesk_core::{
    ApiError, Backend, SaveAck, SaveDecisionsRequest, WorklistApi, WorklistId, WorklistItem,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

use crate::event::AppEvent;

/// Work the UI hands to the backend thread.
#[derive(Debug, Clone)]
pub enum ApiRequest {
    /// Fetch the worklist item. `refresh` marks a refetch after invalidation.
    Load { worklist_id: WorklistId, refresh: bool },
    Save { worklist_id: WorklistId, request: SaveDecisionsRequest },
}

/// Completed backend work, delivered as `AppEvent::Api`.
#[derive(Debug)]
pub enum ApiResult {
    Loaded { result: Result<WorklistItem, ApiError>, refresh: bool },
    Saved(Result<SaveAck, ApiError>),
}

/// Spawns the backend thread and returns its request sender.
///
/// Dropping the sender ends the thread after the request in progress.
pub fn spawn_api_worker(
    backend: Backend,
    event_tx: UnboundedSender<AppEvent>,
) -> std::io::Result<Sender<ApiRequest>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("proofdesk-api".to_owned())
        .spawn(move || api_worker_loop(backend, rx, event_tx))?;
    Ok(tx)
}

/// Connects to `backend` and serves requests until the channel closes.
///
/// A failed connection is not fatal: every request is answered with the
/// connection error so the session shows it in its error state.
fn api_worker_loop(
    backend: Backend,
    rx: Receiver<ApiRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "cannot start backend runtime");
            let failure = ApiError::Configuration(format!("backend runtime: {err}"));
            for request in rx {
                let _ = event_tx.send(AppEvent::Api(Box::new(failed(request, failure.clone()))));
            }
            return;
        }
    };

    let api = runtime.block_on(backend.connect());
    match &api {
        Ok(_) => info!(backend = %backend.describe(), "backend connected"),
        Err(err) => error!(backend = %backend.describe(), %err, "backend unavailable"),
    }

    for request in rx {
        debug!(?request, "backend request");
        let result = match &api {
            Ok(api) => runtime.block_on(handle_request(api.as_ref(), request)),
            Err(err) => failed(request, err.clone()),
        };
        if event_tx.send(AppEvent::Api(Box::new(result))).is_err() {
            break;
        }
    }
}

async fn handle_request(api: &dyn WorklistApi, request: ApiRequest) -> ApiResult {
    match request {
        ApiRequest::Load { worklist_id, refresh } => {
            ApiResult::Loaded { result: api.fetch_item(worklist_id).await, refresh }
        }
        ApiRequest::Save { worklist_id, request } => {
            ApiResult::Saved(api.save_decisions(worklist_id, &request).await)
        }
    }
}

fn failed(request: ApiRequest, error: ApiError) -> ApiResult {
    match request {
        ApiRequest::Load { refresh, .. } => ApiResult::Loaded { result: Err(error), refresh },
        ApiRequest::Save { .. } => ApiResult::Saved(Err(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_backend_answers_every_request() {
        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
        let backend = Backend::Http { base_url: String::new(), token: None };
        let tx = spawn_api_worker(backend, event_tx).unwrap();

        tx.send(ApiRequest::Load { worklist_id: 1, refresh: false }).unwrap();
        tx.send(ApiRequest::Save {
            worklist_id: 1,
            request: SaveDecisionsRequest {
                decisions: Vec::new(),
                review_notes: None,
                transition_to: None,
            },
        })
        .unwrap();
        drop(tx);

        let first = event_rx.blocking_recv().unwrap();
        assert!(matches!(
            first,
            AppEvent::Api(result) if matches!(*result, ApiResult::Loaded { result: Err(_), refresh: false })
        ));
        let second = event_rx.blocking_recv().unwrap();
        assert!(matches!(
            second,
            AppEvent::Api(result) if matches!(*result, ApiResult::Saved(Err(_)))
        ));
    }
}
