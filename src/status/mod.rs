//! Remote network status polling
//!
//! Polls a status endpoint on a fixed interval and publishes the latest
//! observation through a watch channel, so any number of consumers can read
//! the current value without coordinating with the poller. A failed poll
//! keeps the previous observation; it never publishes a torn update.

use crate::config::StatusConfig;
use crate::error::{PrepError, PrepResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Remote network health as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkHealth {
    Ok,
    Degraded,
    Down,
}

/// Wire format of the status document.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusDocument {
    pub status: NetworkHealth,
    #[serde(default)]
    pub message: Option<String>,
}

/// Latest observation, as seen by consumers of the watch channel.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkStatus {
    /// None until the first successful poll.
    pub health: Option<NetworkHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl NetworkStatus {
    fn unknown() -> Self {
        Self {
            health: None,
            message: None,
            checked_at: None,
            consecutive_failures: 0,
        }
    }
}

/// Polls the status endpoint and owns the sending half of the channel.
pub struct StatusMonitor {
    client: reqwest::Client,
    url: String,
    interval: Duration,
    sender: watch::Sender<NetworkStatus>,
}

impl StatusMonitor {
    /// Build a monitor and the receiver consumers subscribe through.
    pub fn new(config: &StatusConfig) -> PrepResult<(Self, watch::Receiver<NetworkStatus>)> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PrepError::Status(e.to_string()))?;

        let (sender, receiver) = watch::channel(NetworkStatus::unknown());

        Ok((
            Self {
                client,
                url: config.url.clone(),
                interval: Duration::from_secs(config.poll_interval_secs),
                sender,
            },
            receiver,
        ))
    }

    /// One poll of the status endpoint.
    pub async fn check(&self) -> PrepResult<StatusDocument> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PrepError::Status(e.to_string()))?
            .error_for_status()
            .map_err(|e| PrepError::Status(e.to_string()))?;

        response
            .json::<StatusDocument>()
            .await
            .map_err(|e| PrepError::Status(format!("malformed status document: {}", e)))
    }

    /// Poll until every receiver is gone. The first poll fires immediately.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.sender.is_closed() {
                break;
            }

            match self.check().await {
                Ok(document) => {
                    if document.status != NetworkHealth::Ok {
                        warn!(status = ?document.status, "network status is not ok");
                    } else {
                        debug!("network status ok");
                    }
                    crate::metrics::record_status_poll(true);
                    crate::metrics::record_network_status(document.status);
                    self.sender.send_modify(|current| {
                        current.health = Some(document.status);
                        current.message = document.message.clone();
                        current.checked_at = Some(Utc::now());
                        current.consecutive_failures = 0;
                    });
                }
                Err(e) => {
                    warn!("status poll failed: {}", e);
                    crate::metrics::record_status_poll(false);
                    // keep the previous observation
                    self.sender.send_modify(|current| {
                        current.consecutive_failures =
                            current.consecutive_failures.saturating_add(1);
                    });
                }
            }
        }
        debug!("status monitor stopped, no receivers left");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_the_remote_document() {
        let doc: StatusDocument =
            serde_json::from_str(r#"{"status": "ok", "region": "us-east-1"}"#).unwrap();
        assert_eq!(doc.status, NetworkHealth::Ok);
        assert_eq!(doc.message, None);

        let doc: StatusDocument =
            serde_json::from_str(r#"{"status": "degraded", "message": "elevated latency"}"#)
                .unwrap();
        assert_eq!(doc.status, NetworkHealth::Degraded);
        assert_eq!(doc.message.as_deref(), Some("elevated latency"));
    }

    #[test]
    fn rejects_unknown_health_values() {
        assert!(serde_json::from_str::<StatusDocument>(r#"{"status": "sideways"}"#).is_err());
    }

    #[test]
    fn initial_observation_is_unknown() {
        let status = NetworkStatus::unknown();
        assert_eq!(status.health, None);
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn failed_polls_preserve_the_last_observation() {
        let config = StatusConfig {
            // nothing listens here; every poll fails
            url: "http://127.0.0.1:1/status".to_string(),
            poll_interval_secs: 300,
            request_timeout_secs: 1,
        };
        let (monitor, receiver) = StatusMonitor::new(&config).unwrap();

        monitor.sender.send_modify(|current| {
            current.health = Some(NetworkHealth::Ok);
        });
        assert!(monitor.check().await.is_err());

        monitor.sender.send_modify(|current| {
            current.consecutive_failures += 1;
        });
        let observed = receiver.borrow();
        assert_eq!(observed.health, Some(NetworkHealth::Ok));
        assert_eq!(observed.consecutive_failures, 1);
    }
}
