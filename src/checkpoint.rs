//! Checkpoints — named snapshots at designated mission points.
//!
//! The previous checkpoint threads through `record` explicitly; the
//! recorder keeps no hidden state. The first checkpoint establishes the
//! baseline, so nothing is "new" by definition.

use crate::session::{ArtifactRef, ProbeRequest, Session, SessionError};
use crate::snapshot::{self, StateSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named point-in-time snapshot of the whole mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot: StateSnapshot,
    /// Interactive-element counts by selector class, the baseline for the
    /// next checkpoint's new-element computation.
    pub element_census: BTreeMap<String, u64>,
    /// Elements that appeared since the previous checkpoint, by selector
    /// class. Empty for the first checkpoint.
    pub new_elements: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
}

/// Record a checkpoint.
///
/// Census failure degrades to an empty census; artifact failure leaves the
/// reference empty. Only a lost session propagates.
pub async fn record(
    name: &str,
    session: &dyn Session,
    previous: Option<&Checkpoint>,
) -> Result<Checkpoint, SessionError> {
    let snapshot = snapshot::capture(session).await?;

    let element_census = match session.run_probe(ProbeRequest::ElementCensus).await {
        Ok(value) => parse_census(&value),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::debug!(checkpoint = name, error = %e, "element census failed");
            BTreeMap::new()
        }
    };

    let new_elements = match previous {
        Some(prev) => new_since(&prev.element_census, &element_census),
        None => {
            tracing::debug!(checkpoint = name, "first checkpoint, establishing baseline");
            BTreeMap::new()
        }
    };

    let artifact = session
        .capture_artifact(&format!("checkpoint_{name}"))
        .await;
    if artifact.is_none() {
        tracing::debug!(checkpoint = name, "no artifact captured");
    }

    tracing::info!(checkpoint = name, "checkpoint recorded");
    Ok(Checkpoint {
        name: name.to_string(),
        timestamp: Utc::now(),
        snapshot,
        element_census,
        new_elements,
        artifact,
    })
}

fn parse_census(value: &serde_json::Value) -> BTreeMap<String, u64> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_u64().map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default()
}

/// Positive per-class growth between two censuses.
fn new_since(
    previous: &BTreeMap<String, u64>,
    current: &BTreeMap<String, u64>,
) -> BTreeMap<String, u64> {
    current
        .iter()
        .filter_map(|(selector, &count)| {
            let before = previous.get(selector).copied().unwrap_or(0);
            (count > before).then(|| (selector.clone(), count - before))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_census() {
        let census = parse_census(&json!({"button": 4, "a[href]": 20, "junk": "x"}));
        assert_eq!(census.get("button"), Some(&4));
        assert_eq!(census.get("a[href]"), Some(&20));
        assert!(!census.contains_key("junk"));
    }

    #[test]
    fn test_new_since_counts_growth_only() {
        let prev: BTreeMap<String, u64> =
            [("button".to_string(), 4), ("select".to_string(), 2)].into();
        let curr: BTreeMap<String, u64> = [
            ("button".to_string(), 9),
            ("select".to_string(), 1),
            ("[role=\"button\"]".to_string(), 3),
        ]
        .into();

        let new = new_since(&prev, &curr);
        assert_eq!(new.get("button"), Some(&5));
        assert_eq!(new.get("[role=\"button\"]"), Some(&3));
        // Shrinkage is not "new"
        assert!(!new.contains_key("select"));
    }

    #[test]
    fn test_identical_census_yields_nothing_new() {
        let census: BTreeMap<String, u64> = [("button".to_string(), 4)].into();
        assert!(new_since(&census, &census).is_empty());
    }
}
