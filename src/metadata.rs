//! Object metadata and the annotation side channel

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// String-keyed storage carried alongside an object between conversion calls.
///
/// The conversion core only ever reads and writes through this trait, so any
/// host-provided annotation store can back it.
pub trait MetadataBag {
    fn get(&self, key: &str) -> Option<&str>;

    fn set(&mut self, key: &str, value: String);

    fn remove(&mut self, key: &str) -> Option<String>;
}

impl MetadataBag for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        BTreeMap::get(self, key).map(String::as_str)
    }

    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        BTreeMap::remove(self, key)
    }
}

/// Standard object metadata.
///
/// Maps are ordered so that serialized objects are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata with just a name and namespace
    pub fn named(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }
}

impl MetadataBag for ObjectMeta {
    fn get(&self, key: &str) -> Option<&str> {
        MetadataBag::get(&self.annotations, key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.annotations.set(key, value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        MetadataBag::remove(&mut self.annotations, key)
    }
}

/// List-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
}

/// An ordered collection of objects of one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct List<T> {
    #[serde(default)]
    pub metadata: ListMeta,

    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> List<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            metadata: ListMeta::default(),
            items,
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// A versioned resource object whose metadata carries the side channel
pub trait Object: Clone + Debug + PartialEq + Serialize + DeserializeOwned {
    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_meta_bag_uses_annotations() {
        let mut meta = ObjectMeta::named("machine-0", "default");
        meta.set("example.com/key", "value".to_string());
        assert_eq!(MetadataBag::get(&meta, "example.com/key"), Some("value"));
        assert_eq!(meta.annotations.len(), 1);
        assert!(meta.labels.is_empty());

        assert_eq!(MetadataBag::remove(&mut meta, "example.com/key"), Some("value".to_string()));
        assert!(meta.annotations.is_empty());
    }

    #[test]
    fn test_empty_maps_are_omitted() {
        let meta = ObjectMeta::named("machine-0", "default");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json, serde_json::json!({"name": "machine-0", "namespace": "default"}));
    }

    #[test]
    fn test_list_meta_continue_field() {
        let meta = ListMeta {
            resource_version: Some("42".to_string()),
            continue_token: Some("abc".to_string()),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["continue"], "abc");
        assert_eq!(json["resourceVersion"], "42");
    }
}
