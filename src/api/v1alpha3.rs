//! v1alpha3 AzureMachine types and their conversion to and from the hub
//!
//! Differences from v1beta1, on top of those of v1alpha4:
//! - shared gallery images are referenced by one ARM resource ID string
//! - the deprecated `availabilityZone` block stands in for `failureDomain`
//! - no `securityProfile`, `subnetName` or `status.conditions`

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::api::v1alpha4::{
    self, restore_compute_gallery, restore_diagnostics, restore_dns_servers,
};
use crate::api::v1beta1 as hub;
use crate::convert::Spoke;
use crate::error::MappingError;
use crate::metadata::{List, Object, ObjectMeta};
use crate::restore::{restore_option, restore_vec, PreservedField};
use crate::version::ApiVersion;

// Unchanged since v1alpha3
pub use crate::api::v1alpha4::{
    AzureMarketplaceImage, DataDisk, ManagedDiskParameters, NodeAddress, OsDisk, SpotVmOptions,
    UserAssignedIdentity, VmIdentity,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureMachine {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: AzureMachineSpec,

    #[serde(default)]
    pub status: AzureMachineStatus,
}

pub type AzureMachineList = List<AzureMachine>;

impl Object for AzureMachine {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMachineSpec {
    #[serde(rename = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    #[serde(default)]
    pub vm_size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_domain: Option<String>,

    /// Deprecated: use `failureDomain`
    #[serde(default, skip_serializing_if = "AvailabilityZone::is_empty")]
    pub availability_zone: AvailabilityZone,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,

    #[serde(default)]
    pub identity: VmIdentity,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_assigned_identities: Vec<UserAssignedIdentity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_assignment_name: Option<String>,

    #[serde(default)]
    pub os_disk: OsDisk,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_disks: Vec<DataDisk>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh_public_key: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_tags: BTreeMap<String, String>,

    #[serde(rename = "allocatePublicIP", default, skip_serializing_if = "std::ops::Not::not")]
    pub allocate_public_ip: bool,

    #[serde(rename = "enableIPForwarding", default, skip_serializing_if = "std::ops::Not::not")]
    pub enable_ip_forwarding: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerated_networking: Option<bool>,

    #[serde(rename = "spotVMOptions", default, skip_serializing_if = "Option::is_none")]
    pub spot_vm_options: Option<SpotVmOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityZone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl AvailabilityZone {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.enabled.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// ARM resource ID of a shared image gallery image version
    #[serde(rename = "sharedGalleryID", default, skip_serializing_if = "Option::is_none")]
    pub shared_gallery_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<AzureMarketplaceImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMachineStatus {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<NodeAddress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

// =============================================================================
// Preserved fields
// =============================================================================

fn restore_security_profile(from: &hub::AzureMachine, to: &mut hub::AzureMachine) -> bool {
    restore_option(&from.spec.security_profile, &mut to.spec.security_profile)
}

fn restore_subnet_name(from: &hub::AzureMachine, to: &mut hub::AzureMachine) -> bool {
    restore_option(&from.spec.subnet_name, &mut to.spec.subnet_name)
}

fn restore_conditions(from: &hub::AzureMachine, to: &mut hub::AzureMachine) -> bool {
    restore_vec(&from.status.conditions, &mut to.status.conditions)
}

/// Only a reference that cannot be written as a resource ID is restored; any
/// other one came through `sharedGalleryID` and the mapped value stands.
fn restore_shared_gallery(from: &hub::AzureMachine, to: &mut hub::AzureMachine) -> bool {
    let Some(decoded) = from.spec.image.as_ref().and_then(|i| i.shared_gallery.as_ref()) else {
        return false;
    };
    if shared_gallery_to_id(decoded).is_ok() {
        return false;
    }
    match to.spec.image.as_mut() {
        Some(image) if image.shared_gallery.is_none() => {
            image.shared_gallery = Some(decoded.clone());
            true
        }
        _ => false,
    }
}

/// Hub fields that v1alpha3 cannot express
static PRESERVED: &[PreservedField<hub::AzureMachine>] = &[
    PreservedField::new("spec.image.computeGallery", restore_compute_gallery),
    PreservedField::new("spec.dnsServers", restore_dns_servers),
    PreservedField::new("spec.diagnostics", restore_diagnostics),
    PreservedField::new("spec.securityProfile", restore_security_profile),
    PreservedField::new("spec.subnetName", restore_subnet_name),
    PreservedField::new("status.conditions", restore_conditions),
    PreservedField::new("spec.image.sharedGallery", restore_shared_gallery),
];

// =============================================================================
// Field mapping
// =============================================================================

impl Spoke for AzureMachine {
    type Hub = hub::AzureMachine;

    const VERSION: ApiVersion = ApiVersion::V1Alpha3;

    fn to_hub(&self) -> Result<hub::AzureMachine, MappingError> {
        Ok(hub::AzureMachine {
            metadata: self.metadata.clone(),
            spec: spec_to_hub(&self.spec)?,
            status: status_to_hub(&self.status),
        })
    }

    fn from_hub(src: &hub::AzureMachine) -> Result<Self, MappingError> {
        Ok(Self {
            metadata: src.metadata.clone(),
            spec: spec_from_hub(&src.spec),
            status: status_from_hub(&src.status),
        })
    }

    fn preserved_fields() -> &'static [PreservedField<hub::AzureMachine>] {
        PRESERVED
    }
}

fn spec_to_hub(src: &AzureMachineSpec) -> Result<hub::AzureMachineSpec, MappingError> {
    Ok(hub::AzureMachineSpec {
        provider_id: src.provider_id.clone(),
        vm_size: src.vm_size.clone(),
        failure_domain: failure_domain_from_zone(src.failure_domain.as_deref(), &src.availability_zone),
        image: src.image.as_ref().map(image_to_hub).transpose()?,
        identity: src.identity.into(),
        user_assigned_identities: src.user_assigned_identities.iter().map(Into::into).collect(),
        role_assignment_name: src.role_assignment_name.clone(),
        os_disk: (&src.os_disk).into(),
        data_disks: src.data_disks.iter().map(Into::into).collect(),
        ssh_public_key: src.ssh_public_key.clone(),
        additional_tags: src.additional_tags.clone(),
        allocate_public_ip: src.allocate_public_ip,
        enable_ip_forwarding: src.enable_ip_forwarding,
        accelerated_networking: src.accelerated_networking,
        spot_vm_options: src.spot_vm_options.as_ref().map(Into::into),
        security_profile: None,
        subnet_name: None,
        dns_servers: Vec::new(),
        diagnostics: None,
    })
}

fn spec_from_hub(src: &hub::AzureMachineSpec) -> AzureMachineSpec {
    AzureMachineSpec {
        provider_id: src.provider_id.clone(),
        vm_size: src.vm_size.clone(),
        failure_domain: src.failure_domain.clone(),
        availability_zone: AvailabilityZone::default(),
        image: src.image.as_ref().map(image_from_hub),
        identity: src.identity.into(),
        user_assigned_identities: src.user_assigned_identities.iter().map(Into::into).collect(),
        role_assignment_name: src.role_assignment_name.clone(),
        os_disk: (&src.os_disk).into(),
        data_disks: src.data_disks.iter().map(Into::into).collect(),
        ssh_public_key: src.ssh_public_key.clone(),
        additional_tags: src.additional_tags.clone(),
        allocate_public_ip: src.allocate_public_ip,
        enable_ip_forwarding: src.enable_ip_forwarding,
        accelerated_networking: src.accelerated_networking,
        spot_vm_options: src.spot_vm_options.as_ref().map(Into::into),
    }
}

/// An explicit failure domain wins; otherwise fall back to the deprecated zone ID
pub fn failure_domain_from_zone(failure_domain: Option<&str>, zone: &AvailabilityZone) -> Option<String> {
    failure_domain.or(zone.id.as_deref()).map(str::to_string)
}

fn image_to_hub(src: &Image) -> Result<hub::Image, MappingError> {
    Ok(hub::Image {
        id: src.id.clone(),
        shared_gallery: src.shared_gallery_id.as_deref().map(shared_gallery_from_id).transpose()?,
        marketplace: src.marketplace.as_ref().map(v1alpha4::marketplace_to_hub),
        compute_gallery: None,
    })
}

/// A shared gallery reference that cannot be written as a resource ID is left
/// unset here and carried by the side channel instead.
fn image_from_hub(src: &hub::Image) -> Image {
    Image {
        id: src.id.clone(),
        shared_gallery_id: src.shared_gallery.as_ref().and_then(|g| shared_gallery_to_id(g).ok()),
        marketplace: src.marketplace.as_ref().map(v1alpha4::marketplace_from_hub),
    }
}

fn shared_gallery_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.Compute/galleries/([^/]+)/images/([^/]+)/versions/([^/]+)$",
        )
        .unwrap()
    })
}

/// Split a shared gallery image version resource ID into its parts
pub fn shared_gallery_from_id(id: &str) -> Result<hub::AzureSharedGalleryImage, MappingError> {
    let caps = shared_gallery_pattern().captures(id).ok_or_else(|| {
        MappingError::new(
            ApiVersion::V1Alpha3,
            "spec.image.sharedGalleryID",
            format!("'{}' is not a shared gallery image version resource ID", id),
        )
    })?;

    Ok(hub::AzureSharedGalleryImage {
        subscription_id: caps[1].to_string(),
        resource_group: caps[2].to_string(),
        gallery: caps[3].to_string(),
        name: caps[4].to_string(),
        version: caps[5].to_string(),
    })
}

/// Join a structured shared gallery reference into a resource ID.
///
/// Always writes the canonical segment casing, so an ID that was matched
/// case-insensitively comes back normalized.
pub fn shared_gallery_to_id(image: &hub::AzureSharedGalleryImage) -> Result<String, MappingError> {
    let segments = [
        ("subscriptionID", &image.subscription_id),
        ("resourceGroup", &image.resource_group),
        ("gallery", &image.gallery),
        ("name", &image.name),
        ("version", &image.version),
    ];
    for (field, value) in segments {
        if value.is_empty() || value.contains('/') {
            return Err(MappingError::new(
                ApiVersion::V1Alpha3,
                format!("spec.image.sharedGallery.{}", field),
                format!("'{}' cannot be used as a resource ID segment", value),
            ));
        }
    }

    Ok(format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/galleries/{}/images/{}/versions/{}",
        image.subscription_id, image.resource_group, image.gallery, image.name, image.version
    ))
}

fn status_to_hub(src: &AzureMachineStatus) -> hub::AzureMachineStatus {
    hub::AzureMachineStatus {
        ready: src.ready,
        addresses: src.addresses.iter().map(Into::into).collect(),
        vm_state: src.vm_state.clone(),
        failure_reason: src.failure_reason.clone(),
        failure_message: src.failure_message.clone(),
        conditions: Vec::new(),
    }
}

fn status_from_hub(src: &hub::AzureMachineStatus) -> AzureMachineStatus {
    AzureMachineStatus {
        ready: src.ready,
        addresses: src.addresses.iter().map(Into::into).collect(),
        vm_state: src.vm_state.clone(),
        failure_reason: src.failure_reason.clone(),
        failure_message: src.failure_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GALLERY_ID: &str = "/subscriptions/sub-1/resourceGroups/rg-images/providers/Microsoft.Compute/galleries/gallery1/images/ubuntu/versions/1.2.3";

    #[test]
    fn test_shared_gallery_id_splits() {
        let image = shared_gallery_from_id(GALLERY_ID).unwrap();
        assert_eq!(image.subscription_id, "sub-1");
        assert_eq!(image.resource_group, "rg-images");
        assert_eq!(image.gallery, "gallery1");
        assert_eq!(image.name, "ubuntu");
        assert_eq!(image.version, "1.2.3");
        assert_eq!(shared_gallery_to_id(&image).unwrap(), GALLERY_ID);
    }

    #[test]
    fn test_malformed_shared_gallery_id_is_mapping_error() {
        let machine = AzureMachine {
            spec: AzureMachineSpec {
                image: Some(Image {
                    shared_gallery_id: Some("/subscriptions/sub-1/images/ubuntu".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = machine.to_hub().unwrap_err();
        assert_eq!(err.version, ApiVersion::V1Alpha3);
        assert_eq!(err.field, "spec.image.sharedGalleryID");
    }

    #[test]
    fn test_unrepresentable_shared_gallery_is_mapping_error() {
        let mut image = shared_gallery_from_id(GALLERY_ID).unwrap();
        image.resource_group = "rg/nested".to_string();
        let err = shared_gallery_to_id(&image).unwrap_err();
        assert_eq!(err.field, "spec.image.sharedGallery.resourceGroup");

        image.resource_group = String::new();
        assert!(shared_gallery_to_id(&image).is_err());
    }

    #[test]
    fn test_unrepresentable_shared_gallery_left_unset() {
        let mut gallery = shared_gallery_from_id(GALLERY_ID).unwrap();
        gallery.version = String::new();
        let hub = hub::AzureMachine {
            spec: hub::AzureMachineSpec {
                image: Some(hub::Image {
                    shared_gallery: Some(gallery.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let spoke = AzureMachine::from_hub(&hub).unwrap();
        assert_eq!(spoke.spec.image.as_ref().unwrap().shared_gallery_id, None);

        let mut mapped = spoke.to_hub().unwrap();
        assert!(restore_shared_gallery(&hub, &mut mapped));
        assert_eq!(mapped, hub);
    }

    #[test]
    fn test_representable_shared_gallery_not_restored() {
        let mut stale = hub::AzureMachine::default();
        stale.spec.image = Some(hub::Image {
            shared_gallery: Some(shared_gallery_from_id(GALLERY_ID).unwrap()),
            ..Default::default()
        });
        let mut edited = hub::AzureMachine::default();
        edited.spec.image = Some(hub::Image::default());

        assert!(!restore_shared_gallery(&stale, &mut edited));
        assert!(edited.spec.image.unwrap().shared_gallery.is_none());
    }

    #[test]
    fn test_lowercase_id_is_normalized() {
        let lower = "/subscriptions/sub-1/resourcegroups/rg/providers/microsoft.compute/galleries/g/images/i/versions/1";
        let image = shared_gallery_from_id(lower).unwrap();
        assert_eq!(
            shared_gallery_to_id(&image).unwrap(),
            "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/galleries/g/images/i/versions/1"
        );
    }

    #[test]
    fn test_availability_zone_fills_failure_domain() {
        let zone = AvailabilityZone {
            id: Some("2".to_string()),
            enabled: Some(true),
        };
        assert_eq!(failure_domain_from_zone(None, &zone).as_deref(), Some("2"));
        assert_eq!(failure_domain_from_zone(Some("1"), &zone).as_deref(), Some("1"));
        assert_eq!(failure_domain_from_zone(None, &AvailabilityZone::default()), None);
    }

    #[test]
    fn test_down_conversion_leaves_zone_empty() {
        let hub = hub::AzureMachine {
            spec: hub::AzureMachineSpec {
                failure_domain: Some("3".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let spoke = AzureMachine::from_hub(&hub).unwrap();
        assert_eq!(spoke.spec.failure_domain.as_deref(), Some("3"));
        assert!(spoke.spec.availability_zone.is_empty());

        let json = serde_json::to_value(&spoke).unwrap();
        assert!(json["spec"].get("availabilityZone").is_none());
    }
}
