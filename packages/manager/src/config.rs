//! Manager configuration.

use std::collections::BTreeMap;
use std::path::Path;

use queue_core::{JobName, QueueConfigMap, QueueName, QueueOptions, QueueSetting};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::router::JobRouter;

/// Environment variable holding the path of a JSON manager configuration.
pub const CONFIG_ENV: &str = "QUEUE_MANAGER_CONFIG";

/// Manager-level options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerOptions {
    /// Name used in error messages and log fields.
    pub label: String,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            label: "QueueManager".to_string(),
        }
    }
}

impl ManagerOptions {
    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// Everything needed to build a manager, loadable from JSON.
///
/// ```json
/// {
///   "queues": { "Queue1": { "defaultJobOptions": { "attempts": 5 } }, "Queue2": true },
///   "defaults": { "defaultJobOptions": { "attempts": 0 } },
///   "routes": { "Job1": "Queue1", "Job2": "Queue2" },
///   "options": { "label": "mailer" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "J: Serialize, Q: Serialize",
    deserialize = "J: Ord + Deserialize<'de>, Q: Ord + Deserialize<'de>"
))]
pub struct ManagerConfig<J, Q> {
    /// Queue name to enabled flag or options; `null` counts as disabled.
    #[serde(default, deserialize_with = "deserialize_queue_map")]
    pub queues: QueueConfigMap<Q>,
    /// Options every queue starts from.
    #[serde(default)]
    pub defaults: QueueOptions,
    /// Job kind to queue name.
    #[serde(default)]
    pub routes: JobRouter<J, Q>,
    #[serde(default)]
    pub options: ManagerOptions,
}

impl<J, Q> Default for ManagerConfig<J, Q> {
    fn default() -> Self {
        Self {
            queues: BTreeMap::new(),
            defaults: QueueOptions::default(),
            routes: JobRouter::default(),
            options: ManagerOptions::default(),
        }
    }
}

impl<J: JobName, Q: QueueName> ManagerConfig<J, Q> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a queue entry.
    pub fn with_queue(mut self, name: Q, setting: impl Into<QueueSetting>) -> Self {
        self.queues.insert(name, setting.into());
        self
    }

    /// Set the options every queue starts from.
    pub fn with_defaults(mut self, defaults: QueueOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Route a job kind to a queue.
    pub fn with_route(mut self, kind: J, queue: Q) -> Self {
        self.routes.insert(kind, queue);
        self
    }

    /// Set the manager label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.options.label = label.into();
        self
    }
}

impl<J, Q> ManagerConfig<J, Q>
where
    J: JobName + for<'de> Deserialize<'de>,
    Q: QueueName + for<'de> Deserialize<'de>,
{
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        tracing::debug!("Loaded manager config from {:?}", path);
        Self::from_json_str(&json)
    }

    /// Read the file named by `QUEUE_MANAGER_CONFIG`.
    pub async fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_value(std::env::var(CONFIG_ENV).ok()).await
    }

    /// Load from the value read out of `QUEUE_MANAGER_CONFIG`, if any.
    async fn from_env_value(path: Option<String>) -> Result<Self, ConfigError> {
        let path = path.ok_or(ConfigError::MissingEnv(CONFIG_ENV))?;
        Self::from_file(path).await
    }
}

fn deserialize_queue_map<'de, D, Q>(deserializer: D) -> Result<QueueConfigMap<Q>, D::Error>
where
    D: Deserializer<'de>,
    Q: Ord + Deserialize<'de>,
{
    let raw = BTreeMap::<Q, Option<QueueSetting>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, setting)| (name, setting.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_core::JobOptions;

    const CONFIG: &str = r#"{
        "queues": {
            "Queue1": { "defaultJobOptions": { "attempts": 5 } },
            "Queue2": true,
            "Queue3": false,
            "Queue4": null
        },
        "defaults": {
            "streams": { "eventsMaxLen": 0 },
            "defaultJobOptions": { "attempts": 0 }
        },
        "routes": { "Job1": "Queue1", "Job2": "Queue2" }
    }"#;

    #[test]
    fn parses_full_document() {
        let config = ManagerConfig::<String, String>::from_json_str(CONFIG).unwrap();

        assert_eq!(config.queues.len(), 4);
        assert!(config.queues["Queue1"].is_enabled());
        assert!(config.queues["Queue2"].is_enabled());
        assert!(!config.queues["Queue3"].is_enabled());
        assert!(!config.queues["Queue4"].is_enabled());
        assert_eq!(
            config.defaults.effective_job_options().attempts,
            Some(0)
        );
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.options, ManagerOptions::default());
    }

    #[test]
    fn builder_matches_parsed_document() {
        let built = ManagerConfig::<String, String>::new()
            .with_queue(
                "Queue1".into(),
                QueueOptions::default().with_default_job_options(JobOptions::with_attempts(5)),
            )
            .with_queue("Queue2".into(), true)
            .with_route("Job1".into(), "Queue1".into())
            .with_label("mailer");

        assert_eq!(built.options.label, "mailer");
        assert_eq!(built.routes.resolve(&"Job1".to_string()), Ok(&"Queue1".to_string()));
        assert_eq!(built.queues["Queue2"], QueueSetting::Enabled(true));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = ManagerConfig::<String, String>::from_json_str("{}").unwrap();
        assert!(config.queues.is_empty());
        assert!(config.routes.is_empty());
        assert_eq!(config.options.label, "QueueManager");
    }

    #[tokio::test]
    async fn missing_env_is_reported() {
        let err = ManagerConfig::<String, String>::from_env_value(None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(CONFIG_ENV)));
    }

    #[tokio::test]
    async fn env_value_names_the_file() {
        let path =
            std::env::temp_dir().join(format!("manager-config-{}.json", std::process::id()));
        tokio::fs::write(&path, CONFIG).await.unwrap();

        let config = ManagerConfig::<String, String>::from_env_value(Some(
            path.to_string_lossy().into_owned(),
        ))
        .await
        .unwrap();
        assert_eq!(config.routes.len(), 2);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
