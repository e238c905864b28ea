//! v1alpha4 AzureMachine types and their conversion to and from the hub
//!
//! Differences from v1beta1:
//! - marketplace images carry the purchase plan as a flat `publisher`/`offer`/`sku` triple
//! - no `image.computeGallery`, `dnsServers` or `diagnostics`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::v1beta1 as hub;
use crate::convert::Spoke;
use crate::error::MappingError;
use crate::metadata::{List, Object, ObjectMeta};
use crate::restore::{restore_option, restore_vec, PreservedField};
use crate::version::ApiVersion;

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

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_profile: Option<SecurityProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_gallery: Option<AzureSharedGalleryImage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<AzureMarketplaceImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureSharedGalleryImage {
    #[serde(rename = "subscriptionID")]
    pub subscription_id: String,
    pub resource_group: String,
    pub gallery: String,
    pub name: String,
    pub version: String,
}

/// Marketplace image with the purchase plan inlined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMarketplaceImage {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub third_party_image: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmIdentity {
    #[default]
    None,
    SystemAssigned,
    UserAssigned,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssignedIdentity {
    #[serde(rename = "providerID")]
    pub provider_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(default)]
    pub os_type: String,
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDiskParameters {
    pub storage_account_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    pub name_suffix: String,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lun: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotVmOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_at_host: Option<bool>,
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

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    #[serde(rename = "type")]
    pub address_type: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Preserved fields
// =============================================================================

pub(crate) fn restore_compute_gallery(from: &hub::AzureMachine, to: &mut hub::AzureMachine) -> bool {
    let Some(decoded) = from.spec.image.as_ref().and_then(|i| i.compute_gallery.as_ref()) else {
        return false;
    };
    match to.spec.image.as_mut() {
        Some(image) => {
            image.compute_gallery = Some(decoded.clone());
            true
        }
        None => false,
    }
}

pub(crate) fn restore_dns_servers(from: &hub::AzureMachine, to: &mut hub::AzureMachine) -> bool {
    restore_vec(&from.spec.dns_servers, &mut to.spec.dns_servers)
}

pub(crate) fn restore_diagnostics(from: &hub::AzureMachine, to: &mut hub::AzureMachine) -> bool {
    restore_option(&from.spec.diagnostics, &mut to.spec.diagnostics)
}

/// Hub fields that v1alpha4 cannot express
static PRESERVED: &[PreservedField<hub::AzureMachine>] = &[
    PreservedField::new("spec.image.computeGallery", restore_compute_gallery),
    PreservedField::new("spec.dnsServers", restore_dns_servers),
    PreservedField::new("spec.diagnostics", restore_diagnostics),
];

// =============================================================================
// Field mapping
// =============================================================================

impl Spoke for AzureMachine {
    type Hub = hub::AzureMachine;

    const VERSION: ApiVersion = ApiVersion::V1Alpha4;

    fn to_hub(&self) -> Result<hub::AzureMachine, MappingError> {
        Ok(hub::AzureMachine {
            metadata: self.metadata.clone(),
            spec: spec_to_hub(&self.spec),
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

fn spec_to_hub(src: &AzureMachineSpec) -> hub::AzureMachineSpec {
    hub::AzureMachineSpec {
        provider_id: src.provider_id.clone(),
        vm_size: src.vm_size.clone(),
        failure_domain: src.failure_domain.clone(),
        image: src.image.as_ref().map(image_to_hub),
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
        security_profile: src.security_profile.as_ref().map(Into::into),
        subnet_name: src.subnet_name.clone(),
        dns_servers: Vec::new(),
        diagnostics: None,
    }
}

fn spec_from_hub(src: &hub::AzureMachineSpec) -> AzureMachineSpec {
    AzureMachineSpec {
        provider_id: src.provider_id.clone(),
        vm_size: src.vm_size.clone(),
        failure_domain: src.failure_domain.clone(),
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
        security_profile: src.security_profile.as_ref().map(Into::into),
        subnet_name: src.subnet_name.clone(),
    }
}

fn image_to_hub(src: &Image) -> hub::Image {
    hub::Image {
        id: src.id.clone(),
        shared_gallery: src.shared_gallery.as_ref().map(Into::into),
        marketplace: src.marketplace.as_ref().map(marketplace_to_hub),
        compute_gallery: None,
    }
}

fn image_from_hub(src: &hub::Image) -> Image {
    Image {
        id: src.id.clone(),
        shared_gallery: src.shared_gallery.as_ref().map(Into::into),
        marketplace: src.marketplace.as_ref().map(marketplace_from_hub),
    }
}

pub(crate) fn marketplace_to_hub(src: &AzureMarketplaceImage) -> hub::AzureMarketplaceImage {
    hub::AzureMarketplaceImage {
        image_plan: plan_from_flat(&src.publisher, &src.offer, &src.sku),
        version: src.version.clone(),
        third_party_image: src.third_party_image,
    }
}

pub(crate) fn marketplace_from_hub(src: &hub::AzureMarketplaceImage) -> AzureMarketplaceImage {
    let (publisher, offer, sku) = plan_to_flat(&src.image_plan);
    AzureMarketplaceImage {
        publisher,
        offer,
        sku,
        version: src.version.clone(),
        third_party_image: src.third_party_image,
    }
}

/// Fold the flat marketplace triple into the hub's nested image plan
pub fn plan_from_flat(publisher: &str, offer: &str, sku: &str) -> hub::ImagePlan {
    hub::ImagePlan {
        publisher: publisher.to_string(),
        offer: offer.to_string(),
        sku: sku.to_string(),
    }
}

/// Unfold the hub's nested image plan into (publisher, offer, sku)
pub fn plan_to_flat(plan: &hub::ImagePlan) -> (String, String, String) {
    (plan.publisher.clone(), plan.offer.clone(), plan.sku.clone())
}

fn status_to_hub(src: &AzureMachineStatus) -> hub::AzureMachineStatus {
    hub::AzureMachineStatus {
        ready: src.ready,
        addresses: src.addresses.iter().map(Into::into).collect(),
        vm_state: src.vm_state.clone(),
        failure_reason: src.failure_reason.clone(),
        failure_message: src.failure_message.clone(),
        conditions: src.conditions.iter().map(Into::into).collect(),
    }
}

fn status_from_hub(src: &hub::AzureMachineStatus) -> AzureMachineStatus {
    AzureMachineStatus {
        ready: src.ready,
        addresses: src.addresses.iter().map(Into::into).collect(),
        vm_state: src.vm_state.clone(),
        failure_reason: src.failure_reason.clone(),
        failure_message: src.failure_message.clone(),
        conditions: src.conditions.iter().map(Into::into).collect(),
    }
}

// Leaf types with the same shape in both versions

impl From<VmIdentity> for hub::VmIdentity {
    fn from(v: VmIdentity) -> Self {
        match v {
            VmIdentity::None => hub::VmIdentity::None,
            VmIdentity::SystemAssigned => hub::VmIdentity::SystemAssigned,
            VmIdentity::UserAssigned => hub::VmIdentity::UserAssigned,
        }
    }
}

impl From<hub::VmIdentity> for VmIdentity {
    fn from(v: hub::VmIdentity) -> Self {
        match v {
            hub::VmIdentity::None => VmIdentity::None,
            hub::VmIdentity::SystemAssigned => VmIdentity::SystemAssigned,
            hub::VmIdentity::UserAssigned => VmIdentity::UserAssigned,
        }
    }
}

impl From<&AzureSharedGalleryImage> for hub::AzureSharedGalleryImage {
    fn from(v: &AzureSharedGalleryImage) -> Self {
        Self {
            subscription_id: v.subscription_id.clone(),
            resource_group: v.resource_group.clone(),
            gallery: v.gallery.clone(),
            name: v.name.clone(),
            version: v.version.clone(),
        }
    }
}

impl From<&hub::AzureSharedGalleryImage> for AzureSharedGalleryImage {
    fn from(v: &hub::AzureSharedGalleryImage) -> Self {
        Self {
            subscription_id: v.subscription_id.clone(),
            resource_group: v.resource_group.clone(),
            gallery: v.gallery.clone(),
            name: v.name.clone(),
            version: v.version.clone(),
        }
    }
}

impl From<&UserAssignedIdentity> for hub::UserAssignedIdentity {
    fn from(v: &UserAssignedIdentity) -> Self {
        Self {
            provider_id: v.provider_id.clone(),
        }
    }
}

impl From<&hub::UserAssignedIdentity> for UserAssignedIdentity {
    fn from(v: &hub::UserAssignedIdentity) -> Self {
        Self {
            provider_id: v.provider_id.clone(),
        }
    }
}

impl From<&OsDisk> for hub::OsDisk {
    fn from(v: &OsDisk) -> Self {
        Self {
            os_type: v.os_type.clone(),
            disk_size_gb: v.disk_size_gb,
            managed_disk: v.managed_disk.as_ref().map(|m| hub::ManagedDiskParameters {
                storage_account_type: m.storage_account_type.clone(),
            }),
            caching_type: v.caching_type.clone(),
        }
    }
}

impl From<&hub::OsDisk> for OsDisk {
    fn from(v: &hub::OsDisk) -> Self {
        Self {
            os_type: v.os_type.clone(),
            disk_size_gb: v.disk_size_gb,
            managed_disk: v.managed_disk.as_ref().map(|m| ManagedDiskParameters {
                storage_account_type: m.storage_account_type.clone(),
            }),
            caching_type: v.caching_type.clone(),
        }
    }
}

impl From<&DataDisk> for hub::DataDisk {
    fn from(v: &DataDisk) -> Self {
        Self {
            name_suffix: v.name_suffix.clone(),
            disk_size_gb: v.disk_size_gb,
            lun: v.lun,
            caching_type: v.caching_type.clone(),
        }
    }
}

impl From<&hub::DataDisk> for DataDisk {
    fn from(v: &hub::DataDisk) -> Self {
        Self {
            name_suffix: v.name_suffix.clone(),
            disk_size_gb: v.disk_size_gb,
            lun: v.lun,
            caching_type: v.caching_type.clone(),
        }
    }
}

impl From<&SpotVmOptions> for hub::SpotVmOptions {
    fn from(v: &SpotVmOptions) -> Self {
        Self {
            max_price: v.max_price.clone(),
        }
    }
}

impl From<&hub::SpotVmOptions> for SpotVmOptions {
    fn from(v: &hub::SpotVmOptions) -> Self {
        Self {
            max_price: v.max_price.clone(),
        }
    }
}

impl From<&SecurityProfile> for hub::SecurityProfile {
    fn from(v: &SecurityProfile) -> Self {
        Self {
            encryption_at_host: v.encryption_at_host,
        }
    }
}

impl From<&hub::SecurityProfile> for SecurityProfile {
    fn from(v: &hub::SecurityProfile) -> Self {
        Self {
            encryption_at_host: v.encryption_at_host,
        }
    }
}

impl From<&NodeAddress> for hub::NodeAddress {
    fn from(v: &NodeAddress) -> Self {
        Self {
            address_type: v.address_type.clone(),
            address: v.address.clone(),
        }
    }
}

impl From<&hub::NodeAddress> for NodeAddress {
    fn from(v: &hub::NodeAddress) -> Self {
        Self {
            address_type: v.address_type.clone(),
            address: v.address.clone(),
        }
    }
}

impl From<&Condition> for hub::Condition {
    fn from(v: &Condition) -> Self {
        Self {
            condition_type: v.condition_type.clone(),
            status: v.status.clone(),
            severity: v.severity.clone(),
            last_transition_time: v.last_transition_time,
            reason: v.reason.clone(),
            message: v.message.clone(),
        }
    }
}

impl From<&hub::Condition> for Condition {
    fn from(v: &hub::Condition) -> Self {
        Self {
            condition_type: v.condition_type.clone(),
            status: v.status.clone(),
            severity: v.severity.clone(),
            last_transition_time: v.last_transition_time,
            reason: v.reason.clone(),
            message: v.message.clone(),
        }
    }
}
