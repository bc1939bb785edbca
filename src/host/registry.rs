//! Running sessions, keyed by bot id.
//!
//! Each entry is an opaque [`SessionHandle`]: enough to stop the session and
//! observe its state, nothing that reaches into the engine itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::info;

use super::protocol::{Control, Response};
use crate::engine::StopHandle;
use crate::error::EngineError;
use crate::session::BotDescriptor;
use crate::state_machine::AutomationState;

#[derive(Debug, Clone)]
pub struct SessionHandle {
    stop: StopHandle,
    state: watch::Receiver<AutomationState>,
}

impl SessionHandle {
    pub fn new(stop: StopHandle, state: watch::Receiver<AutomationState>) -> Self {
        Self { stop, state }
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn state(&self) -> AutomationState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutomationState> {
        self.state.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a running session. A second session for the same bot is refused.
    pub fn register(&self, bot_id: &str, handle: SessionHandle) -> Result<(), EngineError> {
        let mut sessions = self.lock();
        if sessions.contains_key(bot_id) {
            return Err(EngineError::SessionExists(bot_id.to_string()));
        }
        sessions.insert(bot_id.to_string(), handle);
        info!(bot_id, "session registered");
        Ok(())
    }

    /// Stop and forget a session. Returns false if none was running.
    pub fn stop(&self, bot_id: &str) -> bool {
        match self.lock().remove(bot_id) {
            Some(handle) => {
                handle.stop();
                info!(bot_id, "session stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) -> usize {
        let drained: Vec<(String, SessionHandle)> = self.lock().drain().collect();
        for (bot_id, handle) in &drained {
            handle.stop();
            info!(bot_id = %bot_id, "session stopped");
        }
        drained.len()
    }

    pub fn state(&self, bot_id: &str) -> Option<AutomationState> {
        self.lock().get(bot_id).map(SessionHandle::state)
    }

    pub fn is_running(&self, bot_id: &str) -> bool {
        self.lock().contains_key(bot_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop entries whose session has reached a terminal state.
    pub fn prune(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, handle| !handle.state().is_terminal());
        before - sessions.len()
    }

    /// Apply a control message. `launch` creates and starts the engine for a
    /// new session; it is not called when the bot already has one.
    pub fn apply<F>(&self, control: Control, launch: F) -> Response
    where
        F: FnOnce(&BotDescriptor) -> Result<SessionHandle, EngineError>,
    {
        match control {
            Control::StartSession { bot } => {
                if self.is_running(&bot.id) {
                    return Response::Error {
                        message: EngineError::SessionExists(bot.id).to_string(),
                    };
                }
                match launch(&bot).and_then(|handle| self.register(&bot.id, handle)) {
                    Ok(()) => Response::Ack,
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                }
            }
            Control::StopSession { bot_id } => {
                if self.stop(&bot_id) {
                    Response::Ack
                } else {
                    Response::NotFound
                }
            }
        }
    }
}
