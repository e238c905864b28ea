//! Error types for AzureMachine conversion

use thiserror::Error;

use crate::version::ApiVersion;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConversionError>;

/// A source object violates a structural assumption of a field mapper.
///
/// Fatal to the conversion call: the destination must be discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot map {field} for {version}: {reason}")]
pub struct MappingError {
    /// The spoke version on the non-hub side of the mapping
    pub version: ApiVersion,
    /// Dotted path of the offending field (e.g. "spec.image.sharedGalleryID")
    pub field: String,
    /// What was wrong with the data
    pub reason: String,
}

impl MappingError {
    pub fn new(version: ApiVersion, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            version,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Preserved hub data could not be read back from the side channel.
///
/// Never fatal: up-conversion continues with the mapped fields only.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no preserved data under annotation {key}")]
    Missing { key: String },

    #[error("malformed preserved data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("incompatible preserved data format: expected {expected}, got {found}")]
    IncompatibleFormat { expected: String, found: String },

    #[error("preserved data checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

impl DecodeError {
    /// Whether this is the normal state of an object that was never down-converted
    pub fn is_missing(&self) -> bool {
        matches!(self, DecodeError::Missing { .. })
    }
}

/// The hub object could not be serialized into the side channel.
///
/// Down-conversion still completes, but the result is not losslessly round-trippable.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("failed to serialize hub object: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Conversion errors surfaced to the caller
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("list item {index} failed to convert: {source}")]
    ListItem {
        index: usize,
        #[source]
        source: Box<ConversionError>,
    },

    #[error("Unsupported API version: {0}")]
    UnsupportedVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConversionError {
    /// The underlying mapping error, looking through list wrappers
    pub fn mapping_error(&self) -> Option<&MappingError> {
        match self {
            ConversionError::Mapping(e) => Some(e),
            ConversionError::ListItem { source, .. } => source.mapping_error(),
            _ => None,
        }
    }
}
