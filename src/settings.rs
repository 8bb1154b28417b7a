//! Emulator connection settings

use std::time::Duration;

/// Google Cloud emulator service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    /// Pub/Sub emulator
    PubSub,
    /// Cloud Storage emulator
    Storage,
    /// Firestore emulator
    Firestore,
    /// Datastore emulator
    Datastore,
}

impl Service {
    /// All services, in display order
    pub const ALL: [Service; 4] = [
        Service::PubSub,
        Service::Storage,
        Service::Firestore,
        Service::Datastore,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Service::PubSub => "Pub/Sub",
            Service::Storage => "Storage",
            Service::Firestore => "Firestore",
            Service::Datastore => "Datastore",
        }
    }

    /// Environment variable conventionally holding the emulator host
    pub fn host_env_var(&self) -> &'static str {
        match self {
            Service::PubSub => "PUBSUB_EMULATOR_HOST",
            Service::Storage => "STORAGE_EMULATOR_HOST",
            Service::Firestore => "FIRESTORE_EMULATOR_HOST",
            Service::Datastore => "DATASTORE_EMULATOR_HOST",
        }
    }

    /// Path requested by the health check
    ///
    /// The Pub/Sub, Firestore and Datastore emulators answer `Ok` on `/`;
    /// the Storage emulator is probed through its bucket listing.
    pub fn health_path(&self) -> &'static str {
        match self {
            Service::Storage => "/storage/v1/b",
            _ => "/",
        }
    }
}

/// Settings for reaching the emulators
///
/// Configure hosts, project and timeouts. Defaults match the ports the
/// emulators listen on when started without flags.
#[derive(Debug, Clone)]
pub struct EmulatorSettings {
    /// Project ID used in resource paths
    ///
    /// Default: "demo-project"
    pub project_id: String,

    /// Firestore database ID
    ///
    /// Default: "(default)"
    pub database_id: String,

    /// Pub/Sub emulator host
    ///
    /// Default: "localhost:8085"
    pub pubsub_host: String,

    /// Storage emulator host
    ///
    /// Default: "localhost:4443"
    pub storage_host: String,

    /// Firestore emulator host
    ///
    /// Default: "localhost:8080"
    pub firestore_host: String,

    /// Datastore emulator host
    ///
    /// Default: "localhost:8081"
    pub datastore_host: String,

    /// Whether to use SSL for communication
    ///
    /// Default: false
    pub ssl_enabled: bool,

    /// Timeout for regular API requests
    ///
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Timeout for a single health check request
    ///
    /// Default: 3 seconds
    pub health_check_timeout: Duration,

    /// Interval between periodic health checks
    ///
    /// Default: 10 seconds
    pub health_check_interval: Duration,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            project_id: "demo-project".to_string(),
            database_id: Self::DEFAULT_DATABASE.to_string(),
            pubsub_host: "localhost:8085".to_string(),
            storage_host: "localhost:4443".to_string(),
            firestore_host: "localhost:8080".to_string(),
            datastore_host: "localhost:8081".to_string(),
            ssl_enabled: false,
            request_timeout: Duration::from_secs(30),
            health_check_timeout: Duration::from_secs(3),
            health_check_interval: Duration::from_secs(10),
        }
    }
}

impl EmulatorSettings {
    /// ID of the database every Firestore project starts with
    pub const DEFAULT_DATABASE: &'static str = "(default)";

    /// Creates default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings overridden by the standard emulator variables
    ///
    /// Reads `GOOGLE_CLOUD_PROJECT` (or `GCLOUD_PROJECT`) and the
    /// `*_EMULATOR_HOST` variable of each service.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(project) = non_empty("GOOGLE_CLOUD_PROJECT").or_else(|| non_empty("GCLOUD_PROJECT")) {
            settings.project_id = project;
        }
        for service in Service::ALL {
            if let Some(host) = non_empty(service.host_env_var()) {
                *settings.host_mut(service) = host;
            }
        }
        settings
    }

    /// Host (`host:port`) configured for a service
    pub fn host(&self, service: Service) -> &str {
        match service {
            Service::PubSub => &self.pubsub_host,
            Service::Storage => &self.storage_host,
            Service::Firestore => &self.firestore_host,
            Service::Datastore => &self.datastore_host,
        }
    }

    fn host_mut(&mut self, service: Service) -> &mut String {
        match service {
            Service::PubSub => &mut self.pubsub_host,
            Service::Storage => &mut self.storage_host,
            Service::Firestore => &mut self.firestore_host,
            Service::Datastore => &mut self.datastore_host,
        }
    }

    /// Base URL of a service, e.g. `http://localhost:8080`
    ///
    /// Hosts that already carry a scheme are used as given.
    pub fn base_url(&self, service: Service) -> String {
        let host = self.host(service).trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            return host.to_string();
        }
        let scheme = if self.ssl_enabled { "https" } else { "http" };
        format!("{}://{}", scheme, host)
    }
}
