//! Side-channel codec
//!
//! Stashes a complete copy of a hub object inside an annotation of its
//! down-converted counterpart and reads it back on up-conversion. The blob is a
//! JSON envelope:
//!
//! ```json
//! {"checksum": "<sha256 of data>", "data": { ...hub object... }, "format": "azmachine.conversion/v1"}
//! ```
//!
//! The whole hub object is stored, not only the fields a spoke is known to
//! lose, so a preserved field set can grow later without re-encoding old data.
//!
//! `up(down(X)) == X` holds for every hub object that does not itself carry
//! the reserved annotation key. A value already stored under that key is left
//! out of the blob and removed on up-conversion, so it does not survive the
//! round trip.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::checksum::Checksum;
use crate::config::SideChannelConfig;
use crate::convert::Hub;
use crate::error::{DecodeError, EncodeError};
use crate::metadata::MetadataBag;

/// Annotation key holding preserved hub data
pub const DEFAULT_ANNOTATION: &str = "cluster.x-k8s.io/conversion-data";

/// Format marker embedded in every envelope
pub const FORMAT: &str = "azmachine.conversion/v1";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    checksum: Checksum,
    data: Value,
    format: String,
}

/// Encodes hub objects into, and decodes them out of, an object's metadata bag
#[derive(Debug, Clone)]
pub struct SideChannel {
    key: String,
    enabled: bool,
}

impl SideChannel {
    /// Side channel on the default annotation key
    pub fn new() -> Self {
        Self::with_key(DEFAULT_ANNOTATION)
    }

    /// Side channel on a custom annotation key
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            enabled: true,
        }
    }

    pub fn from_config(config: &SideChannelConfig) -> Self {
        Self {
            key: config.annotation_key.clone(),
            enabled: config.preserve,
        }
    }

    /// Stop stashing hub data on down-conversion. Decoding still works.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Encode the complete hub object into a blob.
    ///
    /// The reserved annotation itself is left out so blobs never nest.
    pub fn encode<H: Hub>(&self, hub: &H) -> Result<String, EncodeError> {
        let mut copy = hub.clone();
        MetadataBag::remove(copy.metadata_mut(), &self.key);

        let data = serde_json::to_value(&copy)?;
        let envelope = Envelope {
            checksum: Checksum::from_json(&data),
            data,
            format: FORMAT.to_string(),
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Decode a blob produced by [`SideChannel::encode`]
    pub fn decode<H: Hub>(&self, blob: &str) -> Result<H, DecodeError> {
        let raw: Value = serde_json::from_str(blob)?;

        let found = raw.get("format").and_then(Value::as_str).unwrap_or("unversioned");
        if found != FORMAT {
            return Err(DecodeError::IncompatibleFormat {
                expected: FORMAT.to_string(),
                found: found.to_string(),
            });
        }

        let envelope: Envelope = serde_json::from_value(raw)?;
        if !envelope.checksum.verify_json(&envelope.data) {
            return Err(DecodeError::ChecksumMismatch {
                expected: envelope.checksum.to_string(),
                actual: Checksum::from_json(&envelope.data).to_string(),
            });
        }

        Ok(serde_json::from_value(envelope.data)?)
    }

    /// Encode `hub` and store it in `bag` under the reserved key
    pub fn attach<H: Hub>(&self, hub: &H, bag: &mut dyn MetadataBag) -> Result<(), EncodeError> {
        let blob = self.encode(hub)?;
        debug!(key = %self.key, bytes = blob.len(), "stashed hub data");
        bag.set(&self.key, blob);
        Ok(())
    }

    /// Read the hub object stored in `bag`, if any
    pub fn extract<H: Hub>(&self, bag: &dyn MetadataBag) -> Result<H, DecodeError> {
        let blob = bag.get(&self.key).ok_or_else(|| DecodeError::Missing {
            key: self.key.clone(),
        })?;
        self.decode(blob)
    }
}

impl Default for SideChannel {
    fn default() -> Self {
        Self::new()
    }
}
