//! Provider event listener and watchdog.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::SessionManager;
use crate::provider::{same_provider, ProviderEvent, WalletProvider};

/// Handle to the background listener. Dropping it stops the task.
pub struct SessionListener {
    manager: Arc<SessionManager>,
    task: Option<JoinHandle<()>>,
}

impl SessionListener {
    /// Subscribe to the installed provider, then run the loop in the
    /// background. Events emitted after this returns are not missed.
    pub(super) async fn spawn(manager: Arc<SessionManager>) -> Self {
        let watched = manager.slot().current().await;
        let events = subscribe(&watched);
        let task = tokio::spawn(run_listener(Arc::clone(&manager), watched, events));
        Self {
            manager,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SessionListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.manager.release_listener();
    }
}

impl std::fmt::Debug for SessionListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionListener")
            .field("running", &self.is_running())
            .finish()
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_listener(
    manager: Arc<SessionManager>,
    mut watched: Option<Arc<dyn WalletProvider>>,
    mut events: Option<broadcast::Receiver<ProviderEvent>>,
) {
    let mut watchdog = tokio::time::interval(manager.watchdog_interval());
    watchdog.reset(); // skip immediate first tick

    loop {
        tokio::select! {
            // ── a) Provider notification ─────────────────────────────────
            event = next_event(&mut events) => match event {
                Some(event) => manager.handle_event(event).await,
                None => {
                    tracing::debug!("provider event stream closed");
                    events = None;
                }
            },

            // ── b) Watchdog ──────────────────────────────────────────────
            _ = watchdog.tick() => {
                let current = manager.slot().current().await;
                if !same_provider(&watched, &current) {
                    tracing::info!("wallet provider changed, reconnecting");
                    events = subscribe(&current);
                    watched = current;
                    manager.handle_event(ProviderEvent::ProviderChanged).await;
                }
            }
        }
    }
}

fn subscribe(
    provider: &Option<Arc<dyn WalletProvider>>,
) -> Option<broadcast::Receiver<ProviderEvent>> {
    provider.as_ref().map(|p| p.subscribe())
}

/// Next event, or pending forever when there is nothing to listen to.
async fn next_event(
    events: &mut Option<broadcast::Receiver<ProviderEvent>>,
) -> Option<ProviderEvent> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "provider event stream lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
