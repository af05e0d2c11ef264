// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Event bus for the notification, logging and dashboard collaborators

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::detection::AlertEvent;
use super::SessionStatus;

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Alert(AlertEvent),
    SessionOpened { session_id: String },
    SessionClosed { session_id: String },
}

/// Central event bus for pub/sub communication.
///
/// Sends never block; with no subscribers events are dropped.
pub struct EventBus {
    alert_tx: broadcast::Sender<AlertEvent>,
    status_tx: broadcast::Sender<SessionStatus>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (alert_tx, _) = broadcast::channel(capacity);
        let (status_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            alert_tx,
            status_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_alert(&self, alert: AlertEvent) {
        let _ = self.alert_tx.send(alert.clone());
        self.publish_event(EventPayload::Alert(alert));
    }

    /// Per-frame status; high volume, so it is not mirrored onto the event stream
    pub fn publish_status(&self, status: SessionStatus) {
        let _ = self.status_tx.send(status);
    }

    pub fn publish_session_opened(&self, session_id: &str) {
        self.publish_event(EventPayload::SessionOpened {
            session_id: session_id.to_string(),
        });
    }

    pub fn publish_session_closed(&self, session_id: &str) {
        self.publish_event(EventPayload::SessionClosed {
            session_id: session_id.to_string(),
        });
    }

    fn publish_event(&self, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertEvent> {
        self.alert_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
