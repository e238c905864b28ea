//! v1beta1 AzureMachine types (the hub version)
//!
//! Every other version converts to and from these types. A field added here
//! that an older version cannot express must also be added to that version's
//! preserved field set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::convert::Hub;
use crate::metadata::{List, Object, ObjectMeta};

/// AzureMachine is the hub representation of an Azure virtual machine
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

impl Hub for AzureMachine {}

/// Desired state of an AzureMachine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMachineSpec {
    /// Unique identifier set by the cloud provider
    #[serde(rename = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Size of the VM (e.g. "Standard_D2s_v3")
    #[serde(default)]
    pub vm_size: String,

    /// Failure domain (availability zone) the machine runs in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_domain: Option<String>,

    /// OS image reference
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

    /// Subnet to attach the primary NIC to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_name: Option<String>,

    /// Custom DNS servers for the machine's network interface
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

/// OS image reference. Exactly one of the fields is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Full ARM resource ID of a specific image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_gallery: Option<AzureSharedGalleryImage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<AzureMarketplaceImage>,

    /// Image from an Azure Compute Gallery (shared or community)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_gallery: Option<AzureComputeGalleryImage>,
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

/// Marketplace image with its purchase plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMarketplaceImage {
    pub image_plan: ImagePlan,
    pub version: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub third_party_image: bool,
}

/// Purchase plan identifying a marketplace image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlan {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureComputeGalleryImage {
    pub gallery: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "subscriptionID", default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    /// Purchase plan for third-party gallery images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ImagePlan>,
}

/// Kind of managed identity assigned to the VM
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
    /// Maximum hourly price as a decimal string; unset means on-demand price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_at_host: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot: Option<BootDiagnostics>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootDiagnostics {
    pub storage_account_type: BootDiagnosticsStorageAccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_managed: Option<UserManagedBootDiagnostics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootDiagnosticsStorageAccountType {
    #[default]
    Managed,
    UserManaged,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserManagedBootDiagnostics {
    #[serde(rename = "storageAccountURI")]
    pub storage_account_uri: String,
}

/// Observed state of an AzureMachine
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

/// Observation of one aspect of the machine's state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    /// "True", "False" or "Unknown"
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
