//! Event system for social profile activity.
//!
//! The flow controller publishes a [`DomainEvent`] whenever a profile is connected or
//! disconnected, a user is logged in through a provider, or an inactive user is activated.
//!
//! - **DomainEvent**: the events a flow can emit
//! - **EventHandler**: trait for implementing event handlers
//! - **EventPublisher**: publishes events to registered handlers
//!
//! A publisher without handlers is a no-op. This crate has no dependencies on internal
//! crates, so the provider is carried by its lowercased service name.

use async_trait::async_trait;
use log::info;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Matches the entity crate's id type.
pub type Id = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A provider profile was linked to the user.
    ProfileConnected { user_id: Id, provider: String },
    /// The user removed the link to a provider profile.
    ProfileDisconnected { user_id: Id, provider: String },
    /// The user was logged in with provider credentials.
    UserLoggedIn { user_id: Id, provider: String },
    /// An already registered but inactive user was activated by a provider login.
    UserActivated { user_id: Id, provider: String },
}

impl DomainEvent {
    pub fn user_id(&self) -> Id {
        match self {
            Self::ProfileConnected { user_id, .. }
            | Self::ProfileDisconnected { user_id, .. }
            | Self::UserLoggedIn { user_id, .. }
            | Self::UserActivated { user_id, .. } => *user_id,
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::ProfileConnected { provider, .. }
            | Self::ProfileDisconnected { provider, .. }
            | Self::UserLoggedIn { provider, .. }
            | Self::UserActivated { provider, .. } => provider,
        }
    }

    /// Short name of the event, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProfileConnected { .. } => "connect",
            Self::ProfileDisconnected { .. } => "disconnect",
            Self::UserLoggedIn { .. } => "login",
            Self::UserActivated { .. } => "activation",
        }
    }
}

/// Trait for handling domain events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// This creates a new publisher instance with the additional handler.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes every event to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventHandler;

#[async_trait]
impl EventHandler for LogEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        info!(
            "social {} event for user {} via {}",
            event.name(),
            event.user_id(),
            event.provider()
        );
    }
}
