//! Emulator connection status
//!
//! [`ServiceConnections`] is owned by the application context and tracks
//! whether each emulator answers. Checks are plain HTTP GETs bounded by the
//! health check timeout. Monitoring runs on an interval task that stops when
//! [`stop_monitoring`](ServiceConnections::stop_monitoring) is called or the
//! last handle is dropped.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::Stream;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AdminError;
use crate::settings::{EmulatorSettings, Service};

/// Reachability of one emulator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not checked yet
    #[default]
    Unknown,
    /// Last check got a success response
    Connected,
    /// Last check failed
    Disconnected {
        /// What went wrong
        reason: String,
    },
}

impl ConnectionStatus {
    /// Whether the emulator answered the last check
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// Status of one emulator with the time it was determined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Result of the last check
    pub status: ConnectionStatus,
    /// When the last check finished
    pub last_checked: Option<DateTime<Utc>>,
}

/// Emitted when a service's status changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Service whose status changed
    pub service: Service,
    /// Status before the check
    pub previous: ConnectionStatus,
    /// Status after the check
    pub current: ConnectionStatus,
}

/// Connection status of all emulators
///
/// Cheap to clone; clones share statuses and the monitoring task.
#[derive(Clone)]
pub struct ServiceConnections {
    inner: Arc<ConnectionsInner>,
}

struct ConnectionsInner {
    settings: EmulatorSettings,
    http_client: reqwest::Client,
    statuses: RwLock<HashMap<Service, ServiceStatus>>,
    /// Broadcast channel for status changes
    change_tx: broadcast::Sender<StatusChange>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ConnectionsInner {
    fn drop(&mut self) {
        if let Ok(mut monitor) = self.monitor.lock() {
            if let Some(handle) = monitor.take() {
                handle.abort();
            }
        }
    }
}

impl ServiceConnections {
    /// Create a tracker with every service `Unknown`
    pub fn new(settings: EmulatorSettings) -> Result<Self, AdminError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.health_check_timeout)
            .build()
            .map_err(|e| AdminError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        // Create broadcast channel for status changes (capacity: 16)
        let (change_tx, _) = broadcast::channel(16);

        Ok(Self {
            inner: Arc::new(ConnectionsInner {
                settings,
                http_client,
                statuses: RwLock::new(HashMap::new()),
                change_tx,
                monitor: Mutex::new(None),
            }),
        })
    }

    /// Settings the checks use
    pub fn settings(&self) -> &EmulatorSettings {
        &self.inner.settings
    }

    /// Last known status of a service
    pub async fn status(&self, service: Service) -> ServiceStatus {
        self.inner
            .statuses
            .read()
            .await
            .get(&service)
            .cloned()
            .unwrap_or_default()
    }

    /// Last known status of every service
    pub async fn statuses(&self) -> HashMap<Service, ServiceStatus> {
        let known = self.inner.statuses.read().await;
        Service::ALL
            .iter()
            .map(|service| (*service, known.get(service).cloned().unwrap_or_default()))
            .collect()
    }

    /// Whether the last check of a service succeeded
    pub async fn is_connected(&self, service: Service) -> bool {
        self.status(service).await.status.is_connected()
    }

    /// Check one service now and record the result
    pub async fn check(&self, service: Service) -> ConnectionStatus {
        let url = format!(
            "{}{}",
            self.inner.settings.base_url(service),
            service.health_path()
        );
        debug!(service = service.name(), url = %url, "Checking emulator");

        let current = match self.inner.http_client.get(&url).send().await {
            Ok(response) if response.status().is_success() => ConnectionStatus::Connected,
            Ok(response) => ConnectionStatus::Disconnected {
                reason: format!("HTTP {}", response.status().as_u16()),
            },
            Err(e) if e.is_timeout() => ConnectionStatus::Disconnected {
                reason: format!(
                    "Timed out after {}s",
                    self.inner.settings.health_check_timeout.as_secs()
                ),
            },
            Err(e) => ConnectionStatus::Disconnected {
                reason: e.to_string(),
            },
        };

        self.record(service, current.clone()).await;
        current
    }

    /// Check every service concurrently
    pub async fn check_all(&self) -> Vec<(Service, ConnectionStatus)> {
        let checks = Service::ALL.iter().map(|service| async move {
            (*service, self.check(*service).await)
        });
        join_all(checks).await
    }

    async fn record(&self, service: Service, current: ConnectionStatus) {
        let previous = {
            let mut statuses = self.inner.statuses.write().await;
            let entry = statuses.entry(service).or_default();
            let previous = std::mem::replace(&mut entry.status, current.clone());
            entry.last_checked = Some(Utc::now());
            previous
        };

        if previous == current {
            return;
        }
        match &current {
            ConnectionStatus::Connected => info!(service = service.name(), "Emulator connected"),
            ConnectionStatus::Disconnected { reason } => {
                warn!(service = service.name(), reason = %reason, "Emulator unreachable")
            }
            ConnectionStatus::Unknown => {}
        }

        // Broadcast the change (ignore if no receivers)
        let _ = self.inner.change_tx.send(StatusChange {
            service,
            previous,
            current,
        });
    }

    /// Check all services now and then on every health check interval
    ///
    /// Does nothing if monitoring is already running. Must be called from
    /// within a tokio runtime.
    pub fn start_monitoring(&self) {
        let Ok(mut monitor) = self.inner.monitor.lock() else {
            return;
        };
        if monitor.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let weak: Weak<ConnectionsInner> = Arc::downgrade(&self.inner);
        let period = self.inner.settings.health_check_interval;
        info!(interval_secs = period.as_secs(), "Starting emulator monitoring");

        *monitor = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                ServiceConnections { inner }.check_all().await;
            }
        }));
    }

    /// Stop periodic checks; in-flight checks are cancelled
    pub fn stop_monitoring(&self) {
        let Ok(mut monitor) = self.inner.monitor.lock() else {
            return;
        };
        if let Some(handle) = monitor.take() {
            handle.abort();
            info!("Stopped emulator monitoring");
        }
    }

    /// Whether the monitoring task is running
    pub fn is_monitoring(&self) -> bool {
        self.inner
            .monitor
            .lock()
            .map(|monitor| monitor.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Stream of status changes
    ///
    /// Only changes recorded after the call are yielded. A slow consumer
    /// that falls behind skips the changes it missed.
    pub fn status_changes(&self) -> Pin<Box<dyn Stream<Item = StatusChange> + Send>> {
        let mut rx = self.inner.change_tx.subscribe();

        Box::pin(stream! {
            loop {
                let change = match rx.recv().await {
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Ok(change) => change,
                };
                yield change;
            }
        })
    }
}
