//! Conversion orchestration
//!
//! Hub-and-spoke: every non-hub version implements [`Spoke`] once, mapping to
//! and from the hub. Conversions between two spokes go through the hub.
//!
//! ```text
//! down:  hub ──map──▶ spoke ──▶ encode(original hub) ──▶ spoke annotations
//! up:    spoke ──map──▶ hub ──▶ decode(spoke annotations) ──▶ restore preserved fields
//! ```

use tracing::{debug, warn};

use crate::codec::SideChannel;
use crate::error::{ConversionError, DecodeError, EncodeError, MappingError, Result};
use crate::metadata::{List, MetadataBag, Object};
use crate::restore::{restore, PreservedField};
use crate::version::ApiVersion;

/// Marker for the canonical version all conversions route through
pub trait Hub: Object {}

/// A non-hub version with an explicit field mapper pair to and from the hub
pub trait Spoke: Object {
    type Hub: Hub + 'static;

    const VERSION: ApiVersion;

    /// Map this object's fields onto a fresh hub object.
    ///
    /// Hub-only fields are left at their zero value.
    fn to_hub(&self) -> std::result::Result<Self::Hub, MappingError>;

    /// Map a hub object's fields onto a fresh spoke object, dropping what this
    /// version cannot express.
    fn from_hub(hub: &Self::Hub) -> std::result::Result<Self, MappingError>;

    /// Hub fields this version cannot express, restored from the side channel
    fn preserved_fields() -> &'static [PreservedField<Self::Hub>];
}

/// Why a conversion result is not losslessly round-trippable
#[derive(Debug)]
pub enum Degradation {
    /// Preserved data was present but unreadable; only mapped fields are set
    Decode(DecodeError),
    /// Hub data could not be stashed; a later up-conversion will lose hub-only fields
    Encode(EncodeError),
}

/// A converted object, along with any loss of fidelity along the way
#[derive(Debug)]
pub struct Converted<T> {
    pub object: T,
    pub degraded: Option<Degradation>,
}

impl<T> Converted<T> {
    fn lossless(object: T) -> Self {
        Self {
            object,
            degraded: None,
        }
    }

    pub fn is_lossless(&self) -> bool {
        self.degraded.is_none()
    }

    pub fn into_inner(self) -> T {
        self.object
    }
}

/// A converted list, along with the items that lost fidelity
#[derive(Debug)]
pub struct ConvertedList<L> {
    pub list: L,
    /// Index and degradation of every degraded item, in item order
    pub degraded: Vec<(usize, Degradation)>,
}

impl<L> ConvertedList<L> {
    pub fn is_lossless(&self) -> bool {
        self.degraded.is_empty()
    }

    pub fn into_inner(self) -> L {
        self.list
    }

    /// Indices of the degraded items
    pub fn degraded_indices(&self) -> Vec<usize> {
        self.degraded.iter().map(|(index, _)| *index).collect()
    }
}

/// Runs field mappers and the side channel for any spoke
#[derive(Debug, Clone, Default)]
pub struct Converter {
    side_channel: SideChannel,
}

impl Converter {
    pub fn new(side_channel: SideChannel) -> Self {
        Self { side_channel }
    }

    pub fn side_channel(&self) -> &SideChannel {
        &self.side_channel
    }

    /// Convert a spoke object to the hub.
    ///
    /// Only a field mapping failure is an error; unreadable preserved data is
    /// reported through [`Converted::degraded`].
    pub fn up<S: Spoke>(&self, src: &S) -> Result<Converted<S::Hub>> {
        let mut dst = src.to_hub()?;

        let degraded = match self.side_channel.extract::<S::Hub>(src.metadata()) {
            Ok(preserved) => {
                let restored = restore(&preserved, &mut dst, S::preserved_fields());
                debug!(version = %S::VERSION, ?restored, "restored hub-only fields");
                None
            }
            Err(e) if e.is_missing() => None,
            Err(e) => {
                warn!(version = %S::VERSION, error = %e, "ignoring unreadable preserved data");
                Some(Degradation::Decode(e))
            }
        };

        // The blob is consumed; it describes the hub object we just rebuilt
        MetadataBag::remove(dst.metadata_mut(), self.side_channel.key());

        Ok(Converted {
            object: dst,
            degraded,
        })
    }

    /// Convert a hub object down to a spoke, stashing the whole hub object in
    /// the result's annotations.
    pub fn down<S: Spoke>(&self, hub: &S::Hub) -> Result<Converted<S>> {
        let mut dst = S::from_hub(hub)?;

        if !self.side_channel.is_enabled() {
            MetadataBag::remove(dst.metadata_mut(), self.side_channel.key());
            return Ok(Converted::lossless(dst));
        }

        match self.side_channel.attach(hub, dst.metadata_mut()) {
            Ok(()) => Ok(Converted::lossless(dst)),
            Err(e) => {
                warn!(version = %S::VERSION, error = %e, "down-conversion is not round-trippable");
                Ok(Converted {
                    object: dst,
                    degraded: Some(Degradation::Encode(e)),
                })
            }
        }
    }

    /// Convert every item of a spoke list to the hub, in order.
    ///
    /// Fails fast: the first item that fails aborts the whole list.
    pub fn up_list<S: Spoke>(&self, src: &List<S>) -> Result<ConvertedList<List<S::Hub>>> {
        convert_items(src, |item| self.up(item))
    }

    /// Convert every item of a hub list down to a spoke, in order.
    ///
    /// Fails fast: the first item that fails aborts the whole list.
    pub fn down_list<S: Spoke>(&self, src: &List<S::Hub>) -> Result<ConvertedList<List<S>>> {
        convert_items(src, |item| self.down::<S>(item))
    }
}

fn convert_items<A, B, F>(src: &List<A>, mut convert: F) -> Result<ConvertedList<List<B>>>
where
    F: FnMut(&A) -> Result<Converted<B>>,
{
    let mut items = Vec::with_capacity(src.items.len());
    let mut degraded = Vec::new();

    for (index, item) in src.items.iter().enumerate() {
        let converted = convert(item).map_err(|e| list_item(index, e))?;
        if let Some(degradation) = converted.degraded {
            degraded.push((index, degradation));
        }
        items.push(converted.object);
    }

    Ok(ConvertedList {
        list: List {
            metadata: src.metadata.clone(),
            items,
        },
        degraded,
    })
}

fn list_item(index: usize, source: ConversionError) -> ConversionError {
    ConversionError::ListItem {
        index,
        source: Box::new(source),
    }
}

/// Convert a spoke object to the hub with the default side channel
pub fn up<S: Spoke>(src: &S) -> Result<S::Hub> {
    Converter::default().up(src).map(Converted::into_inner)
}

/// Convert a hub object down to a spoke with the default side channel
pub fn down<S: Spoke>(hub: &S::Hub) -> Result<S> {
    Converter::default().down(hub).map(Converted::into_inner)
}
