use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Domain events published after a return order write has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnOrderEvent {
    OrderCreated {
        order_no: String,
        create_by: String,
        line_count: usize,
    },
    OrderUpdated {
        order_no: String,
        update_by: String,
        changed_fields: Vec<String>,
    },
    OrderConfirmed {
        order_no: String,
        confirm_by: String,
        confirmed_at: DateTime<Utc>,
    },
    OrderCancelled {
        order_no: String,
        cancel_id: i32,
        cancel_by: String,
        cancelled_at: DateTime<Utc>,
    },
    OrderDeleted {
        order_no: String,
    },
}

impl ReturnOrderEvent {
    pub fn order_no(&self) -> &str {
        match self {
            Self::OrderCreated { order_no, .. }
            | Self::OrderUpdated { order_no, .. }
            | Self::OrderConfirmed { order_no, .. }
            | Self::OrderCancelled { order_no, .. }
            | Self::OrderDeleted { order_no } => order_no,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderUpdated { .. } => "order_updated",
            Self::OrderConfirmed { .. } => "order_confirmed",
            Self::OrderCancelled { .. } => "order_cancelled",
            Self::OrderDeleted { .. } => "order_deleted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<ReturnOrderEvent>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<ReturnOrderEvent>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: ReturnOrderEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<ReturnOrderEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &ReturnOrderEvent) -> Result<(), String>;
}

/// Drains `rx`, handing every event to each handler in turn. A failing handler
/// is logged and does not stop the loop. Returns once all senders are dropped.
pub async fn process_events(
    mut rx: mpsc::Receiver<ReturnOrderEvent>,
    handlers: Vec<Arc<dyn EventHandler>>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(event = event.name(), order_no = %event.order_no(), "Received event");

        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(
                    event = event.name(),
                    order_no = %event.order_no(),
                    error = %e,
                    "Event handler failed"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &ReturnOrderEvent) -> Result<(), String> {
            self.seen.lock().unwrap().push(event.name().to_string());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle_event(&self, _event: &ReturnOrderEvent) -> Result<(), String> {
            Err("boom".into())
        }
    }

    #[tokio::test]
    async fn events_reach_every_handler_in_order() {
        let (sender, rx) = channel(8);
        let recorder = Arc::new(Recorder::default());
        let handlers: Vec<Arc<dyn EventHandler>> = vec![Arc::new(Failing), recorder.clone()];

        sender
            .send(ReturnOrderEvent::OrderCreated {
                order_no: "AB0001".into(),
                create_by: "alice".into(),
                line_count: 1,
            })
            .await
            .unwrap();
        sender
            .send(ReturnOrderEvent::OrderDeleted {
                order_no: "AB0001".into(),
            })
            .await
            .unwrap();
        drop(sender);

        process_events(rx, handlers).await;

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["order_created".to_string(), "order_deleted".to_string()]
        );
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (sender, rx) = channel(1);
        drop(rx);
        let err = sender
            .send(ReturnOrderEvent::OrderDeleted {
                order_no: "AB0001".into(),
            })
            .await
            .unwrap_err();
        assert!(err.starts_with("Failed to send event"));
    }
}
