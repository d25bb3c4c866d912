//! Event queue backed by an unbounded `tokio::sync::mpsc` channel.
//!
//! Producers (HTTP handlers, job listeners, resources) hold cheap clones of
//! [`EventQueue`]. A single task drains the receiver with
//! [`EventQueue::run`], so events are handled one at a time and in the
//! order they were added.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

/// Consumer of dispatched events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event);
}

/// Non-blocking producer handle.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: mpsc::UnboundedSender<Event>,
}

impl EventQueue {
    /// Create a queue and the receiver to pass to [`EventQueue::run`].
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueue an event. Never blocks; after shutdown the event is dropped.
    pub fn add(&self, event: impl Into<Event>) {
        if let Err(e) = self.sender.send(event.into()) {
            tracing::warn!(event = ?e.0, "Event queue closed, dropping event");
        }
    }

    /// Dispatch loop. Returns when the token is cancelled or every
    /// producer handle has been dropped.
    pub async fn run(
        mut receiver: mpsc::UnboundedReceiver<Event>,
        handler: Arc<dyn EventHandler>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Event dispatcher started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event dispatcher stopping");
                    break;
                }
                next = receiver.recv() => match next {
                    Some(event) => handler.handle(event).await,
                    None => {
                        tracing::info!("Event queue closed, dispatcher shutting down");
                        break;
                    }
                },
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
