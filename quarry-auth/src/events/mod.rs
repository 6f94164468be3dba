//! Domain mutation events and the bus that carries them.
//!
//! The bus is an explicit subscription list handed to interested components
//! at construction, not a global. Publishers emit events after the mutation
//! has been committed; `Before` events exist for collaborators that need
//! them but are ignored by all authorization logic in this crate.

use crate::models::{AssignedPermission, Group, Principal, Repository};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

pub mod producer;

pub use producer::{AuthorizationChange, AuthorizationChangeListener, AuthorizationChangedEventProducer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// Fired before the mutation is persisted.
    Before,
    /// Fired after the mutation has been committed.
    Committed,
}

/// A single mutation of a domain object.
#[derive(Debug, Clone)]
pub enum Change<T> {
    Created(T),
    Modified { current: T, before: T },
    Deleted(T),
}

impl<T> Change<T> {
    /// The item the change refers to; the current state for modifications.
    pub fn item(&self) -> &T {
        match self {
            Change::Created(item) | Change::Deleted(item) => item,
            Change::Modified { current, .. } => current,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DomainEvent {
    Principal {
        phase: EventPhase,
        change: Change<Principal>,
    },
    Group {
        phase: EventPhase,
        change: Change<Group>,
    },
    Repository {
        phase: EventPhase,
        change: Change<Repository>,
    },
    Grant {
        phase: EventPhase,
        change: Change<AssignedPermission>,
    },
}

impl DomainEvent {
    pub fn phase(&self) -> EventPhase {
        match self {
            DomainEvent::Principal { phase, .. }
            | DomainEvent::Group { phase, .. }
            | DomainEvent::Repository { phase, .. }
            | DomainEvent::Grant { phase, .. } => *phase,
        }
    }

    pub fn committed(&self) -> bool {
        self.phase() == EventPhase::Committed
    }
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn on_event(&self, event: &DomainEvent);
}

/// Publish/subscribe dispatch for [`DomainEvent`]s.
///
/// Subscribers are invoked in registration order on the publisher's task, so
/// any cache eviction they perform is visible before `publish` returns.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Arc<dyn EventSubscriber>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers
            .write()
            .expect("event subscriber list lock poisoned")
            .push(subscriber);
    }

    pub async fn publish(&self, event: &DomainEvent) {
        // snapshot the list so a subscriber may publish follow-up events
        let subscribers: Vec<Arc<dyn EventSubscriber>> = self
            .subscribers
            .read()
            .expect("event subscriber list lock poisoned")
            .clone();

        for subscriber in subscribers {
            subscriber.on_event(event).await;
        }
    }
}
