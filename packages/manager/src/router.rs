//! Static job-kind to queue routing.

use std::collections::BTreeMap;

use queue_core::{JobName, QueueHandle, QueueName};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::registry::QueueRegistry;

/// Maps every job kind to the queue that receives it.
///
/// The router is checked against the registry only when a job is submitted,
/// so the two can be configured independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(
    serialize = "J: Serialize, Q: Serialize",
    deserialize = "J: Ord + Deserialize<'de>, Q: Deserialize<'de>"
))]
pub struct JobRouter<J, Q> {
    routes: BTreeMap<J, Q>,
}

impl<J, Q> Default for JobRouter<J, Q> {
    fn default() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }
}

impl<J: JobName, Q: QueueName> JobRouter<J, Q> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `kind` to `queue`.
    pub fn route(mut self, kind: J, queue: Q) -> Self {
        self.routes.insert(kind, queue);
        self
    }

    /// Route `kind` to `queue`, returning the previous destination.
    pub fn insert(&mut self, kind: J, queue: Q) -> Option<Q> {
        self.routes.insert(kind, queue)
    }

    /// Destination queue of `kind`.
    pub fn resolve(&self, kind: &J) -> Result<&Q, LookupError> {
        self.routes.get(kind).ok_or_else(|| LookupError::UnroutedJob {
            kind: kind.to_string(),
        })
    }

    /// Routed job kinds, in order.
    pub fn kinds(&self) -> impl Iterator<Item = &J> {
        self.routes.keys()
    }

    /// `(kind, queue)` pairs, in kind order.
    pub fn routes(&self) -> impl Iterator<Item = (&J, &Q)> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes whose destination is missing from `registry`.
    pub fn unresolved_against<H: QueueHandle>(
        &self,
        registry: &QueueRegistry<Q, H>,
    ) -> Vec<(&J, &Q)> {
        self.routes
            .iter()
            .filter(|(_, queue)| !registry.contains(queue))
            .collect()
    }
}

impl<J: JobName, Q: QueueName> From<BTreeMap<J, Q>> for JobRouter<J, Q> {
    fn from(routes: BTreeMap<J, Q>) -> Self {
        Self { routes }
    }
}

impl<J: JobName, Q: QueueName> FromIterator<(J, Q)> for JobRouter<J, Q> {
    fn from_iter<I: IntoIterator<Item = (J, Q)>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> JobRouter<String, String> {
        JobRouter::new()
            .route("Job1".into(), "Queue1".into())
            .route("Job2".into(), "Queue2".into())
    }

    #[test]
    fn resolves_declared_kinds() {
        let router = router();
        assert_eq!(router.resolve(&"Job1".to_string()), Ok(&"Queue1".to_string()));
        assert_eq!(router.resolve(&"Job2".to_string()), Ok(&"Queue2".to_string()));
    }

    #[test]
    fn unknown_kind_is_a_lookup_error() {
        let err = router().resolve(&"Job3".to_string()).unwrap_err();
        assert_eq!(
            err,
            LookupError::UnroutedJob {
                kind: "Job3".into()
            }
        );
    }

    #[test]
    fn later_routes_replace_earlier_ones() {
        let mut router = router();
        let previous = router.insert("Job1".into(), "Queue2".into());
        assert_eq!(previous.as_deref(), Some("Queue1"));
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn round_trips_through_json_map() {
        let router: JobRouter<String, String> =
            serde_json::from_str(r#"{"Job1": "Queue1", "Job2": "Queue2"}"#).unwrap();
        assert_eq!(router, self::router());
        assert_eq!(
            serde_json::to_string(&router).unwrap(),
            r#"{"Job1":"Queue1","Job2":"Queue2"}"#
        );
    }
}
