// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Monitor - registry of independent monitoring sessions (one per camera)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use super::{EventBus, Session, SessionHandle, SessionStatus};

pub struct Monitor {
    pub config: Arc<Config>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
    event_bus: Arc<EventBus>,
    start_time: Instant,
}

impl Monitor {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            sessions: RwLock::new(HashMap::new()),
            event_bus: Arc::new(EventBus::default()),
            start_time: Instant::now(),
        })
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    /// Start monitoring a subject; opening an existing id returns its handle
    pub async fn open_session(&self, id: &str) -> SessionHandle {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(id) {
            debug!("Session '{}' already open", id);
            return handle.clone();
        }

        let handle = SessionHandle::new(Session::new(id, self.config.clone()), self.event_bus.clone());
        sessions.insert(id.to_string(), handle.clone());
        self.event_bus.publish_session_opened(id);
        info!("Opened session '{}'", id);
        handle
    }

    pub async fn session(&self, id: &str) -> Result<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownSession(id.to_string()))
    }

    /// End a session and discard its buffers.
    ///
    /// Handles still held elsewhere keep working but are no longer registered.
    pub async fn close_session(&self, id: &str) -> Result<SessionStatus> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| PipelineError::UnknownSession(id.to_string()))?;

        let status = handle.status();
        handle.reset();
        self.event_bus.publish_session_closed(id);
        info!(
            "Closed session '{}' after {} frames, {} alerts",
            id, status.frames_processed, status.alerts_emitted
        );
        Ok(status)
    }

    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Status of every open session, sorted by id
    pub async fn statuses(&self) -> Vec<SessionStatus> {
        let mut statuses: Vec<SessionStatus> =
            self.sessions.read().await.values().map(|h| h.status()).collect();
        statuses.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        statuses
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
