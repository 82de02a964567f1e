//! Queue configuration types.

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::JobOptions;

/// Marker for the names of a queue catalog.
pub trait QueueName: Clone + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> QueueName for T where
    T: Clone + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static
{
}

/// Event stream settings for a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamOptions {
    /// Upper bound on retained events; `0` keeps none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_max_len: Option<u64>,
}

/// Options a queue handle is created with.
///
/// Unset fields mean "engine default". Manager-wide defaults and per-queue
/// overrides share this type and are combined with [`QueueOptions::merged`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueueOptions {
    /// Key prefix inside the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Job options applied to every job added to the queue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_job_options: Option<JobOptions>,
    /// Event stream settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streams: Option<StreamOptions>,
    /// Opaque connection label passed through to the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
}

impl QueueOptions {
    /// Set the default job options.
    pub fn with_default_job_options(mut self, options: JobOptions) -> Self {
        self.default_job_options = Some(options);
        self
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the stream settings.
    pub fn with_streams(mut self, streams: StreamOptions) -> Self {
        self.streams = Some(streams);
        self
    }

    /// Shallow merge: each top-level field set on `overrides` replaces the
    /// one in `self`.
    pub fn merged(&self, overrides: &QueueOptions) -> QueueOptions {
        QueueOptions {
            prefix: overrides.prefix.clone().or_else(|| self.prefix.clone()),
            default_job_options: overrides
                .default_job_options
                .clone()
                .or_else(|| self.default_job_options.clone()),
            streams: overrides.streams.clone().or_else(|| self.streams.clone()),
            connection: overrides
                .connection
                .clone()
                .or_else(|| self.connection.clone()),
        }
    }

    /// Default job options, or empty options when none are configured.
    pub fn effective_job_options(&self) -> JobOptions {
        self.default_job_options.clone().unwrap_or_default()
    }
}

/// One entry of the queue configuration map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueueSetting {
    /// `true` enables the queue with manager-wide defaults, `false` disables it.
    Enabled(bool),
    /// Enables the queue with the defaults merged with these options.
    Configured(QueueOptions),
}

impl QueueSetting {
    /// Whether the entry produces a queue.
    pub fn is_enabled(&self) -> bool {
        matches!(self, QueueSetting::Enabled(true) | QueueSetting::Configured(_))
    }

    /// The options a queue is created with, or `None` when disabled.
    pub fn resolve(&self, defaults: &QueueOptions) -> Option<QueueOptions> {
        match self {
            QueueSetting::Enabled(true) => Some(defaults.clone()),
            QueueSetting::Enabled(false) => None,
            QueueSetting::Configured(overrides) => Some(defaults.merged(overrides)),
        }
    }
}

impl Default for QueueSetting {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl From<bool> for QueueSetting {
    fn from(enabled: bool) -> Self {
        Self::Enabled(enabled)
    }
}

impl From<QueueOptions> for QueueSetting {
    fn from(options: QueueOptions) -> Self {
        Self::Configured(options)
    }
}

/// Queue name to setting. A missing key is the same as a disabled entry.
pub type QueueConfigMap<Q> = BTreeMap<Q, QueueSetting>;

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> QueueOptions {
        QueueOptions::default()
            .with_prefix("bull")
            .with_streams(StreamOptions {
                events_max_len: Some(0),
            })
            .with_default_job_options(JobOptions::with_attempts(0))
    }

    #[test]
    fn enabled_entry_uses_defaults_unmodified() {
        let resolved = QueueSetting::Enabled(true).resolve(&defaults());
        assert_eq!(resolved, Some(defaults()));
        assert_eq!(
            resolved.map(|o| o.effective_job_options().attempts),
            Some(Some(0))
        );
    }

    #[test]
    fn configured_entry_overrides_per_field() {
        let setting = QueueSetting::Configured(
            QueueOptions::default().with_default_job_options(JobOptions::with_attempts(5)),
        );
        let resolved = setting.resolve(&defaults()).unwrap_or_default();
        assert_eq!(resolved.effective_job_options().attempts, Some(5));
        assert_eq!(resolved.prefix.as_deref(), Some("bull"));
        assert_eq!(resolved.streams, defaults().streams);
    }

    #[test]
    fn falsy_entries_resolve_to_nothing() {
        assert!(QueueSetting::Enabled(false).resolve(&defaults()).is_none());
        assert!(!QueueSetting::default().is_enabled());
    }

    #[test]
    fn settings_deserialize_untagged() {
        let map: BTreeMap<String, Option<QueueSetting>> = serde_json::from_str(
            r#"{"a": true, "b": false, "c": null, "d": {"defaultJobOptions": {"attempts": 5}}}"#,
        )
        .unwrap();

        assert_eq!(map["a"], Some(QueueSetting::Enabled(true)));
        assert_eq!(map["b"], Some(QueueSetting::Enabled(false)));
        assert_eq!(map["c"], None);
        match &map["d"] {
            Some(QueueSetting::Configured(options)) => {
                assert_eq!(options.effective_job_options().attempts, Some(5));
            }
            other => panic!("expected configured entry, got {other:?}"),
        }
    }
}
