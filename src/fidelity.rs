//! Fidelity auditing
//!
//! Checks that a spoke's preserved field set is complete: every hub field the
//! spoke's field mapper loses must be restorable from the side channel.
//! The audit runs a hub sample down and back up through the mapper alone and
//! diffs the JSON before and after.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

use crate::convert::Spoke;
use crate::error::Result;
use crate::restore::covers;
use crate::version::ApiVersion;

/// Result of auditing one spoke against a hub sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FidelityReport {
    /// Spoke that was audited
    pub version: ApiVersion,
    /// Every path that did not survive the mapper-only round trip
    pub changes: Vec<FidelityChange>,
    /// Summary of the audit
    pub summary: String,
}

impl FidelityReport {
    fn new(version: ApiVersion, changes: Vec<FidelityChange>) -> Self {
        let uncovered = changes.iter().filter(|c| !c.preserved).count();
        let summary = if changes.is_empty() {
            "Field mapping is lossless".to_string()
        } else if uncovered == 0 {
            format!("{} lossy paths, all preserved", changes.len())
        } else {
            format!("{} of {} lossy paths are not preserved", uncovered, changes.len())
        };
        Self {
            version,
            changes,
            summary,
        }
    }

    /// Whether every lossy path is restored from the side channel
    pub fn is_complete(&self) -> bool {
        self.changes.iter().all(|c| c.preserved)
    }

    /// Lossy paths that no preserved field covers
    pub fn uncovered(&self) -> impl Iterator<Item = &FidelityChange> {
        self.changes.iter().filter(|c| !c.preserved)
    }
}

/// A path whose value differs after a mapper-only round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FidelityChange {
    /// Type of change
    pub change_type: ChangeType,
    /// JSON path (e.g. "spec.image.computeGallery.name")
    pub path: String,
    /// Value in the hub sample
    pub old_value: Option<String>,
    /// Value after the round trip
    pub new_value: Option<String>,
    /// Whether a preserved field covers this path
    pub preserved: bool,
}

/// Type of fidelity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Present in the sample, gone after the round trip
    FieldLost,
    /// Absent in the sample, present after the round trip
    FieldAdded,
    /// Present in both with different values
    ValueChanged,
}

/// Audits spokes against hub samples
#[derive(Debug, Default)]
pub struct FidelityAuditor;

impl FidelityAuditor {
    pub fn new() -> Self {
        Self
    }

    /// Audit spoke `S` with `sample`.
    ///
    /// A sample with every hub field populated gives a complete answer.
    pub fn audit<S: Spoke>(&self, sample: &S::Hub) -> Result<FidelityReport> {
        let before = serde_json::to_value(sample)?;
        let after = serde_json::to_value(Self::mapper_round_trip::<S>(sample)?)?;

        let mut changes = Vec::new();
        diff_values(&before, &after, "", &mut changes);
        for change in &mut changes {
            change.preserved = covers(S::preserved_fields(), &change.path);
        }

        Ok(FidelityReport::new(S::VERSION, changes))
    }

    /// Line diff of the sample against its mapper-only round trip
    pub fn text_diff<S: Spoke>(&self, sample: &S::Hub) -> Result<String> {
        let before = serde_json::to_string_pretty(sample)?;
        let after = serde_json::to_string_pretty(&Self::mapper_round_trip::<S>(sample)?)?;

        let diff = TextDiff::from_lines(&before, &after);
        let mut out = String::new();
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => continue,
            };
            out.push_str(sign);
            out.push_str(change.value());
            if change.missing_newline() {
                out.push('\n');
            }
        }
        Ok(out)
    }

    fn mapper_round_trip<S: Spoke>(sample: &S::Hub) -> Result<S::Hub> {
        Ok(S::from_hub(sample)?.to_hub()?)
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Collect leaf-level differences between two JSON trees
fn diff_values(old: &Value, new: &Value, path: &str, changes: &mut Vec<FidelityChange>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_val) in old_map {
                let child = join(path, key);
                match new_map.get(key) {
                    Some(new_val) => diff_values(old_val, new_val, &child, changes),
                    None => changes.push(FidelityChange {
                        change_type: ChangeType::FieldLost,
                        path: child,
                        old_value: Some(old_val.to_string()),
                        new_value: None,
                        preserved: false,
                    }),
                }
            }
            for (key, new_val) in new_map {
                if !old_map.contains_key(key) {
                    changes.push(FidelityChange {
                        change_type: ChangeType::FieldAdded,
                        path: join(path, key),
                        old_value: None,
                        new_value: Some(new_val.to_string()),
                        preserved: false,
                    });
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) if old_items.len() == new_items.len() => {
            for (i, (o, n)) in old_items.iter().zip(new_items).enumerate() {
                diff_values(o, n, &format!("{}[{}]", path, i), changes);
            }
        }
        _ if old != new => changes.push(FidelityChange {
            change_type: ChangeType::ValueChanged,
            path: path.to_string(),
            old_value: Some(old.to_string()),
            new_value: Some(new.to_string()),
            preserved: false,
        }),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diff_reports_lost_and_changed() {
        let old = json!({"spec": {"a": 1, "b": {"c": "x"}, "list": [1, 2]}});
        let new = json!({"spec": {"a": 2, "list": [1, 3], "d": true}});

        let mut changes = Vec::new();
        diff_values(&old, &new, "", &mut changes);

        let find = |p: &str| changes.iter().find(|c| c.path == p).map(|c| c.change_type);
        assert_eq!(find("spec.a"), Some(ChangeType::ValueChanged));
        assert_eq!(find("spec.b"), Some(ChangeType::FieldLost));
        assert_eq!(find("spec.list[1]"), Some(ChangeType::ValueChanged));
        assert_eq!(find("spec.d"), Some(ChangeType::FieldAdded));
        assert_eq!(changes.len(), 4);
    }

    #[test]
    fn test_identical_values_have_no_changes() {
        let value = json!({"spec": {"vmSize": "Standard_B2s", "tags": ["a"]}});
        let mut changes = Vec::new();
        diff_values(&value, &value, "", &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_report_summary() {
        let report = FidelityReport::new(ApiVersion::V1Alpha4, Vec::new());
        assert!(report.is_complete());
        assert_eq!(report.summary, "Field mapping is lossless");
    }
}
