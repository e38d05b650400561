use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::client::bark::BarkNotifier;
use crate::core::types::Token;

const ALERT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub tokens: Vec<Token>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    /// First batch absorbed; carries recent tokens or the latest preview
    Startup,
    /// Tokens reported by a steady-state batch
    NewTokens,
}

impl Alert {
    pub fn new(kind: AlertKind, tokens: Vec<Token>) -> Self {
        Self {
            kind,
            tokens,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<Alert>,
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(ALERT_BUS_CAPACITY);
        debug!(capacity = ALERT_BUS_CAPACITY, "AlertBus initialized");
        Self { tx }
    }

    /// Best effort: returns the number of subscribers reached, 0 when nobody listens
    #[instrument(skip(self, alert), fields(kind = ?alert.kind, tokens = alert.tokens.len()))]
    pub fn publish(&self, alert: Alert) -> usize {
        match self.tx.send(alert) {
            Ok(subscriber_count) => {
                debug!(subscriber_count, "Published alert");
                subscriber_count
            }
            Err(_) => {
                debug!("No alert subscribers, dropping alert");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        debug!("New subscriber added to alert bus");
        self.tx.subscribe()
    }
}

/// Delivers alerts to Bark until `shutdown` fires or the bus closes
pub async fn run_notifier(
    notifier: BarkNotifier,
    mut alerts: broadcast::Receiver<Alert>,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!(endpoint = %notifier.endpoint(), "📱 Bark notifier worker started");

    loop {
        tokio::select! {
            received = alerts.recv() => match received {
                Ok(alert) => deliver(&notifier, &alert).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notifier fell behind, alerts dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.recv() => break,
        }
    }

    info!("🛑 Bark notifier worker stopped");
}

async fn deliver(notifier: &BarkNotifier, alert: &Alert) {
    match alert.kind {
        AlertKind::Startup => {
            if let Err(e) = notifier.send_startup_message(&alert.tokens).await {
                warn!(error = %e, "⚠️ Startup notification failed");
            }
        }
        AlertKind::NewTokens => match notifier.send_new_token_message(&alert.tokens).await {
            Ok(true) => {}
            Ok(false) => warn!(tokens = alert.tokens.len(), "⚠️ New token notification failed"),
            Err(e) => warn!(error = %e, "❌ New token notification error"),
        },
    }
}
