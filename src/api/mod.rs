//! Versioned AzureMachine types
//!
//! `v1beta1` is the hub. `v1alpha3` and `v1alpha4` are spokes that only ever
//! convert to and from the hub; [`AnyAzureMachine`] routes a request between
//! two spokes through it.

pub mod v1alpha3;
pub mod v1alpha4;
pub mod v1beta1;

use serde::{Deserialize, Serialize};

use crate::convert::{Converted, ConvertedList, Converter};
use crate::error::Result;
use crate::metadata::List;
use crate::version::ApiVersion;

pub const KIND: &str = "AzureMachine";
pub const LIST_KIND: &str = "AzureMachineList";

/// An AzureMachine of any supported version, tagged by `apiVersion`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "apiVersion")]
pub enum AnyAzureMachine {
    #[serde(rename = "infrastructure.cluster.x-k8s.io/v1alpha3")]
    V1Alpha3(v1alpha3::AzureMachine),
    #[serde(rename = "infrastructure.cluster.x-k8s.io/v1alpha4")]
    V1Alpha4(v1alpha4::AzureMachine),
    #[serde(rename = "infrastructure.cluster.x-k8s.io/v1beta1")]
    V1Beta1(v1beta1::AzureMachine),
}

impl AnyAzureMachine {
    pub fn version(&self) -> ApiVersion {
        match self {
            AnyAzureMachine::V1Alpha3(_) => ApiVersion::V1Alpha3,
            AnyAzureMachine::V1Alpha4(_) => ApiVersion::V1Alpha4,
            AnyAzureMachine::V1Beta1(_) => ApiVersion::V1Beta1,
        }
    }

    /// Convert to the hub version
    pub fn to_hub(&self, converter: &Converter) -> Result<Converted<v1beta1::AzureMachine>> {
        match self {
            AnyAzureMachine::V1Alpha3(m) => converter.up(m),
            AnyAzureMachine::V1Alpha4(m) => converter.up(m),
            AnyAzureMachine::V1Beta1(m) => Ok(Converted {
                object: m.clone(),
                degraded: None,
            }),
        }
    }

    /// Convert from the hub version to `target`
    pub fn from_hub(hub: &v1beta1::AzureMachine, target: ApiVersion, converter: &Converter) -> Result<Converted<Self>> {
        Ok(match target {
            ApiVersion::V1Alpha3 => wrap(converter.down::<v1alpha3::AzureMachine>(hub)?, AnyAzureMachine::V1Alpha3),
            ApiVersion::V1Alpha4 => wrap(converter.down::<v1alpha4::AzureMachine>(hub)?, AnyAzureMachine::V1Alpha4),
            ApiVersion::V1Beta1 => Converted {
                object: AnyAzureMachine::V1Beta1(hub.clone()),
                degraded: None,
            },
        })
    }

    /// Convert to any version, going through the hub.
    ///
    /// The degradation reported is the one from the last leg that had one.
    pub fn convert_to(&self, target: ApiVersion, converter: &Converter) -> Result<Converted<Self>> {
        if self.version() == target {
            return Ok(Converted {
                object: self.clone(),
                degraded: None,
            });
        }

        let up = self.to_hub(converter)?;
        let mut down = Self::from_hub(&up.object, target, converter)?;
        if down.degraded.is_none() {
            down.degraded = up.degraded;
        }
        Ok(down)
    }
}

fn wrap<S, T>(converted: Converted<S>, variant: fn(S) -> T) -> Converted<T> {
    Converted {
        object: variant(converted.object),
        degraded: converted.degraded,
    }
}

/// An AzureMachineList of any supported version, tagged by `apiVersion`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "apiVersion")]
pub enum AnyAzureMachineList {
    #[serde(rename = "infrastructure.cluster.x-k8s.io/v1alpha3")]
    V1Alpha3(v1alpha3::AzureMachineList),
    #[serde(rename = "infrastructure.cluster.x-k8s.io/v1alpha4")]
    V1Alpha4(v1alpha4::AzureMachineList),
    #[serde(rename = "infrastructure.cluster.x-k8s.io/v1beta1")]
    V1Beta1(v1beta1::AzureMachineList),
}

impl AnyAzureMachineList {
    pub fn version(&self) -> ApiVersion {
        match self {
            AnyAzureMachineList::V1Alpha3(_) => ApiVersion::V1Alpha3,
            AnyAzureMachineList::V1Alpha4(_) => ApiVersion::V1Alpha4,
            AnyAzureMachineList::V1Beta1(_) => ApiVersion::V1Beta1,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AnyAzureMachineList::V1Alpha3(l) => l.items.len(),
            AnyAzureMachineList::V1Alpha4(l) => l.items.len(),
            AnyAzureMachineList::V1Beta1(l) => l.items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every item to any version through the hub, failing on the first bad item.
    ///
    /// Degradations from both legs are reported, ordered by item index.
    pub fn convert_to(&self, target: ApiVersion, converter: &Converter) -> Result<ConvertedList<Self>> {
        if self.version() == target {
            return Ok(ConvertedList {
                list: self.clone(),
                degraded: Vec::new(),
            });
        }

        let up: ConvertedList<List<v1beta1::AzureMachine>> = match self {
            AnyAzureMachineList::V1Alpha3(l) => converter.up_list(l)?,
            AnyAzureMachineList::V1Alpha4(l) => converter.up_list(l)?,
            AnyAzureMachineList::V1Beta1(l) => ConvertedList {
                list: l.clone(),
                degraded: Vec::new(),
            },
        };
        let mut degraded = up.degraded;
        let hub = up.list;

        let list = match target {
            ApiVersion::V1Alpha3 => {
                let down = converter.down_list::<v1alpha3::AzureMachine>(&hub)?;
                degraded.extend(down.degraded);
                AnyAzureMachineList::V1Alpha3(down.list)
            }
            ApiVersion::V1Alpha4 => {
                let down = converter.down_list::<v1alpha4::AzureMachine>(&hub)?;
                degraded.extend(down.degraded);
                AnyAzureMachineList::V1Alpha4(down.list)
            }
            ApiVersion::V1Beta1 => AnyAzureMachineList::V1Beta1(hub),
        };
        degraded.sort_by_key(|(index, _)| *index);

        Ok(ConvertedList { list, degraded })
    }
}
