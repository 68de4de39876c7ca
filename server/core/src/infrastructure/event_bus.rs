// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Application Events
//
// In-memory fan-out over a tokio broadcast channel. Events drained from the
// aggregate are published here after the repository commits them; nothing is
// persisted, and slow subscribers lose the oldest events.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::ApplicationEvent;
use crate::domain::shared::ApplicationName;

const DEFAULT_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ApplicationEvent>,
}

impl EventBus {
    /// Capacity is the number of events buffered per subscriber before the
    /// oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    pub fn publish(&self, event: ApplicationEvent) {
        debug!(
            event_type = event.event_type(),
            aggregate_id = event.aggregate_id(),
            "publishing application event"
        );
        if self.sender.send(event).is_err() {
            debug!("no subscribers listening to event");
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ApplicationEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver { receiver: self.sender.subscribe() }
    }

    /// Subscribe to the events of one application only.
    pub fn subscribe_application(&self, name: ApplicationName) -> ApplicationEventReceiver {
        ApplicationEventReceiver { receiver: self.sender.subscribe(), name }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<ApplicationEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<ApplicationEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<ApplicationEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

pub struct ApplicationEventReceiver {
    receiver: broadcast::Receiver<ApplicationEvent>,
    name: ApplicationName,
}

impl ApplicationEventReceiver {
    /// Next event whose aggregate is this receiver's application.
    pub async fn recv(&mut self) -> Result<ApplicationEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.aggregate_id() == self.name.value() {
                return Ok(event);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::application::Application;

    fn created(name: &str) -> ApplicationEvent {
        Application::create(name).unwrap().drain_events().remove(0)
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        bus.publish(created("web-1"));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "application_created");
        assert_eq!(event.aggregate_id(), "web-1");
    }

    #[tokio::test]
    async fn test_application_filter_skips_other_apps() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe_application(ApplicationName::new("api").unwrap());

        bus.publish_all([created("web-1"), created("api")]);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.aggregate_id(), "api");
    }

    #[test]
    fn test_publish_without_subscribers_and_lag() {
        let bus = EventBus::new(2);
        bus.publish(created("web-1"));
        assert_eq!(bus.subscriber_count(), 0);

        let mut receiver = bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
        for _ in 0..3 {
            bus.publish(created("web-1"));
        }
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Lagged(1))));
    }
}
