use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Domain events emitted by the services after a successful write.
///
/// Consumers are in-process only; delivery is best effort and must never
/// block or fail the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: String,
        user_email: String,
        total: i64,
    },
    OrderPaid {
        order_id: String,
    },
    CouponGranted {
        user_id: String,
        code: String,
        amount: i64,
    },
    CouponRedeemed {
        user_id: String,
        code: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. A full or closed channel is reported
    /// but never propagated to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event as structured telemetry.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                user_email,
                total,
            } => {
                info!(order_id = %order_id, user_email = %user_email, total = total, "order created");
            }
            Event::OrderPaid { order_id } => {
                info!(order_id = %order_id, "order paid");
            }
            Event::CouponGranted {
                user_id,
                code,
                amount,
            } => {
                info!(user_id = %user_id, code = %code, amount = amount, "coupon granted");
            }
            Event::CouponRedeemed { user_id, code } => {
                info!(user_id = %user_id, code = %code, "coupon redeemed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::OrderPaid {
                order_id: "ORD1".into(),
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::OrderPaid { order_id }) => assert_eq!(order_id, "ORD1"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let err = sender
            .send(Event::OrderPaid {
                order_id: "ORD1".into(),
            })
            .await
            .unwrap_err();
        assert!(err.contains("Failed to send event"));
    }
}
