//! Pub/Sub message metrics
//!
//! Counts of published, received and acknowledged messages per topic and
//! subscription, persisted under `emulator-ui-metrics` as
//! `{"topics": [[name, metrics]...], "subscriptions": [[name, metrics]...]}`
//! with ISO-8601 timestamps.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AdminError;
use crate::storage::KeyValueStore;

/// Storage key of the metrics document
pub const METRICS_KEY: &str = "emulator-ui-metrics";

/// Counters of one topic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicMetrics {
    /// Messages published
    pub published: u64,
    /// Time of the last publish
    pub last_published: Option<DateTime<Utc>>,
}

/// Counters of one subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionMetrics {
    /// Messages pulled
    pub received: u64,
    /// Messages acknowledged
    pub acknowledged: u64,
    /// Time of the last pull that returned messages
    pub last_received: Option<DateTime<Utc>>,
    /// Time of the last acknowledgement
    pub last_acknowledged: Option<DateTime<Utc>>,
}

/// All recorded metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Per-topic counters
    #[serde(default, with = "entries")]
    pub topics: BTreeMap<String, TopicMetrics>,
    /// Per-subscription counters
    #[serde(default, with = "entries")]
    pub subscriptions: BTreeMap<String, SubscriptionMetrics>,
}

/// Maps stored as arrays of `[key, value]` pairs
mod entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(
        map: &BTreeMap<String, T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, T>, D::Error> {
        let pairs = Vec::<(String, T)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

/// Records message metrics and persists them after every change
pub struct MetricsTracker<S> {
    store: S,
    metrics: Mutex<Metrics>,
}

impl<S: KeyValueStore> MetricsTracker<S> {
    /// Load metrics from `store`; malformed data starts from zero
    pub fn new(store: S) -> Self {
        let metrics = store
            .get(METRICS_KEY)
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    warn!(error = %e, "Malformed stored metrics, starting fresh");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            store,
            metrics: Mutex::new(metrics),
        }
    }

    /// Copy of all metrics
    pub fn snapshot(&self) -> Metrics {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    /// Counters of a topic (zero if never recorded)
    pub fn topic(&self, topic: &str) -> TopicMetrics {
        self.snapshot().topics.remove(topic).unwrap_or_default()
    }

    /// Counters of a subscription (zero if never recorded)
    pub fn subscription(&self, subscription: &str) -> SubscriptionMetrics {
        self.snapshot()
            .subscriptions
            .remove(subscription)
            .unwrap_or_default()
    }

    /// Record `count` messages published to `topic`
    pub fn record_published(&self, topic: &str, count: u64) -> Result<(), AdminError> {
        self.update(|metrics| {
            let entry = metrics.topics.entry(topic.to_string()).or_default();
            entry.published += count;
            entry.last_published = Some(Utc::now());
        })
    }

    /// Record `count` messages pulled from `subscription`
    pub fn record_received(&self, subscription: &str, count: u64) -> Result<(), AdminError> {
        self.update(|metrics| {
            let entry = metrics.subscriptions.entry(subscription.to_string()).or_default();
            entry.received += count;
            entry.last_received = Some(Utc::now());
        })
    }

    /// Record `count` messages acknowledged on `subscription`
    pub fn record_acknowledged(&self, subscription: &str, count: u64) -> Result<(), AdminError> {
        self.update(|metrics| {
            let entry = metrics.subscriptions.entry(subscription.to_string()).or_default();
            entry.acknowledged += count;
            entry.last_acknowledged = Some(Utc::now());
        })
    }

    /// Forget a deleted topic
    pub fn remove_topic(&self, topic: &str) -> Result<(), AdminError> {
        self.update(|metrics| {
            metrics.topics.remove(topic);
        })
    }

    /// Forget a deleted subscription
    pub fn remove_subscription(&self, subscription: &str) -> Result<(), AdminError> {
        self.update(|metrics| {
            metrics.subscriptions.remove(subscription);
        })
    }

    /// Clear all metrics
    pub fn reset(&self) -> Result<(), AdminError> {
        self.update(|metrics| *metrics = Metrics::default())
    }

    fn update(&self, change: impl FnOnce(&mut Metrics)) -> Result<(), AdminError> {
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| AdminError::internal("metrics lock poisoned"))?;
        let mut updated = metrics.clone();
        change(&mut updated);
        self.store.set(METRICS_KEY, &serde_json::to_string(&updated)?)?;
        *metrics = updated;
        Ok(())
    }
}
