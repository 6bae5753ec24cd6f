//! Query target as submitted by a panel

use serde::{Deserialize, Serialize};

/// Time anchor used when a target does not carry one
pub const DEFAULT_TIME_ANCHOR: &str = "${__from:date:iso}";

/// A panel's request for one topic's live data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTarget {
    /// Identity of the query inside its batch
    #[serde(rename = "refId", default)]
    pub ref_id: String,

    /// Topic to listen on (may contain template placeholders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Start of the query window as a template expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    /// Hidden targets are never run
    #[serde(default)]
    pub hide: bool,
}

impl QueryTarget {
    /// Create a target for a topic
    pub fn new(ref_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            topic: Some(topic.into()),
            start_time: None,
            hide: false,
        }
    }

    /// Set the time anchor template
    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    /// Default query a new panel starts with
    pub fn default_query() -> Self {
        Self {
            ref_id: String::new(),
            topic: Some(String::new()),
            start_time: Some(DEFAULT_TIME_ANCHOR.to_string()),
            hide: false,
        }
    }

    /// Topic text, empty if absent
    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or("")
    }

    /// Time anchor template, falling back to `default`
    pub fn start_time_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.start_time.as_deref().unwrap_or(default)
    }
}

/// Fill in empty ref ids by position (`A`, `B`, ..., `Z`, `AA`, ...)
pub fn assign_ref_ids(targets: &mut [QueryTarget]) {
    for (index, target) in targets.iter_mut().enumerate() {
        if target.ref_id.is_empty() {
            target.ref_id = ref_id_for(index);
        }
    }
}

fn ref_id_for(mut index: usize) -> String {
    let mut id = Vec::new();
    loop {
        id.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    id.reverse();
    String::from_utf8_lossy(&id).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        let query = QueryTarget::default_query();

        assert_eq!(query.topic(), "");
        assert_eq!(query.start_time.as_deref(), Some(DEFAULT_TIME_ANCHOR));
    }

    #[test]
    fn test_deserialize_panel_json() {
        let json = r#"{"refId": "A", "topic": "sensor-1", "start_time": "now-5m"}"#;
        let target: QueryTarget = serde_json::from_str(json).unwrap();

        assert_eq!(target.ref_id, "A");
        assert_eq!(target.topic(), "sensor-1");
        assert_eq!(target.start_time_or(DEFAULT_TIME_ANCHOR), "now-5m");
        assert!(!target.hide);
    }

    #[test]
    fn test_missing_fields() {
        let target: QueryTarget = serde_json::from_str(r#"{"refId": "B"}"#).unwrap();

        assert!(target.topic.is_none());
        assert_eq!(target.start_time_or(DEFAULT_TIME_ANCHOR), DEFAULT_TIME_ANCHOR);
    }

    #[test]
    fn test_assign_ref_ids() {
        let mut targets = vec![QueryTarget::default(); 28];
        targets[1].ref_id = "custom".into();
        assign_ref_ids(&mut targets);

        assert_eq!(targets[0].ref_id, "A");
        assert_eq!(targets[1].ref_id, "custom");
        assert_eq!(targets[25].ref_id, "Z");
        assert_eq!(targets[26].ref_id, "AA");
        assert_eq!(targets[27].ref_id, "AB");
    }
}
