//! AzureMachine API Conversion
//!
//! Lossless conversion of `AzureMachine` objects between API versions that do
//! not share a schema.
//!
//! ## Features
//!
//! - **Hub and Spoke**: every version converts only to and from `v1beta1`
//! - **Explicit Field Mapping**: reshaped fields use named transform pairs
//! - **Side Channel**: down-conversion stashes the whole hub object in an annotation
//! - **Targeted Restore**: up-conversion restores only fields the spoke cannot express
//! - **Fidelity Audit**: checks each spoke's preserved field set against the hub
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────── down ───────────┐
//!  v1beta1 ──┤ map ─▶ spoke + annotation   │
//!   (hub)  ◀─┤ map ─▶ decode ─▶ restore    ├── v1alpha3 / v1alpha4
//!            └───────────── up ────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use azmachine_conversion::api::{v1alpha4, v1beta1};
//! use azmachine_conversion::{down, up};
//!
//! let mut hub = v1beta1::AzureMachine::default();
//! hub.spec.dns_servers = vec!["10.0.0.10".to_string()];
//!
//! let old: v1alpha4::AzureMachine = down(&hub).unwrap();
//! assert_eq!(up(&old).unwrap(), hub);
//! ```

pub mod api;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod fidelity;
pub mod metadata;
pub mod restore;
pub mod version;

pub use api::{AnyAzureMachine, AnyAzureMachineList};
pub use checksum::Checksum;
pub use codec::SideChannel;
pub use config::ConversionConfig;
pub use convert::{down, up, Converted, ConvertedList, Converter, Degradation, Hub, Spoke};
pub use error::{ConversionError, DecodeError, EncodeError, MappingError, Result};
pub use fidelity::{FidelityAuditor, FidelityReport};
pub use metadata::{List, MetadataBag, Object, ObjectMeta};
pub use restore::PreservedField;
pub use version::ApiVersion;
