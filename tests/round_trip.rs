//! Round-trip tests for AzureMachine conversion
//!
//! Exercises the hub-and-spoke conversion end to end against a fully populated
//! v1beta1 object.

use azmachine_conversion::api::{v1alpha3, v1alpha4, v1beta1};
use azmachine_conversion::codec::DEFAULT_ANNOTATION;
use azmachine_conversion::fidelity::ChangeType;
use azmachine_conversion::{
    down, up, AnyAzureMachine, AnyAzureMachineList, ApiVersion, ConversionError, Converter, DecodeError, Degradation,
    FidelityAuditor, List, ObjectMeta, SideChannel, Spoke,
};
use serde_json::json;

fn full_hub() -> v1beta1::AzureMachine {
    serde_json::from_str(include_str!("fixtures/full_hub.json")).unwrap()
}

fn named_hub(name: &str) -> v1beta1::AzureMachine {
    let mut hub = full_hub();
    hub.metadata.name = Some(name.to_string());
    hub
}

// =============================================================================
// Round-trip law
// =============================================================================

#[test]
fn test_v1alpha4_round_trip_is_lossless() {
    let hub = full_hub();
    let old = down::<v1alpha4::AzureMachine>(&hub).unwrap();
    assert!(old.metadata.annotations.contains_key(DEFAULT_ANNOTATION));
    assert_eq!(up(&old).unwrap(), hub);
}

#[test]
fn test_v1alpha3_round_trip_is_lossless() {
    let hub = full_hub();
    let old = down::<v1alpha3::AzureMachine>(&hub).unwrap();
    assert_eq!(up(&old).unwrap(), hub);
}

#[test]
fn test_empty_hub_round_trips() {
    let hub = v1beta1::AzureMachine::default();
    assert_eq!(up(&down::<v1alpha4::AzureMachine>(&hub).unwrap()).unwrap(), hub);
    assert_eq!(up(&down::<v1alpha3::AzureMachine>(&hub).unwrap()).unwrap(), hub);
}

#[test]
fn test_repeated_conversion_is_stable() {
    let hub = full_hub();
    let first = down::<v1alpha4::AzureMachine>(&hub).unwrap();
    let second = down::<v1alpha4::AzureMachine>(&up(&first).unwrap()).unwrap();
    assert_eq!(first, second);

    assert_eq!(up(&first).unwrap(), up(&first).unwrap());
}

// =============================================================================
// Preserved field set completeness
// =============================================================================

#[test]
fn test_v1alpha4_preserved_fields_are_complete() {
    let report = FidelityAuditor::new()
        .audit::<v1alpha4::AzureMachine>(&full_hub())
        .unwrap();

    assert!(report.is_complete(), "uncovered: {:?}", report.uncovered().collect::<Vec<_>>());

    let mut lost: Vec<&str> = report.changes.iter().map(|c| c.path.as_str()).collect();
    lost.sort();
    assert_eq!(lost, vec!["spec.diagnostics", "spec.dnsServers", "spec.image.computeGallery"]);
    assert!(report.changes.iter().all(|c| c.change_type == ChangeType::FieldLost));
}

#[test]
fn test_v1alpha3_preserved_fields_are_complete() {
    let report = FidelityAuditor::new()
        .audit::<v1alpha3::AzureMachine>(&full_hub())
        .unwrap();

    assert!(report.is_complete(), "uncovered: {:?}", report.uncovered().collect::<Vec<_>>());

    let mut lost: Vec<&str> = report.changes.iter().map(|c| c.path.as_str()).collect();
    lost.sort();
    assert_eq!(
        lost,
        vec![
            "spec.diagnostics",
            "spec.dnsServers",
            "spec.image.computeGallery",
            "spec.securityProfile",
            "spec.subnetName",
            "status.conditions",
        ]
    );
}

#[test]
fn test_v1alpha3_audit_covers_unrepresentable_gallery() {
    let mut hub = full_hub();
    if let Some(gallery) = hub.spec.image.as_mut().and_then(|i| i.shared_gallery.as_mut()) {
        gallery.version = String::new();
    }

    let report = FidelityAuditor::new().audit::<v1alpha3::AzureMachine>(&hub).unwrap();
    assert!(report.is_complete());
    assert!(report.changes.iter().any(|c| c.path == "spec.image.sharedGallery"));
    assert_eq!(report.changes.len(), v1alpha3::AzureMachine::preserved_fields().len());
}

#[test]
fn test_audit_diff_shows_lost_lines() {
    let diff = FidelityAuditor::new()
        .text_diff::<v1alpha4::AzureMachine>(&full_hub())
        .unwrap();
    assert!(diff.contains("-    \"dnsServers\": ["));
    assert!(!diff.contains("vmSize"));
}

// =============================================================================
// Decode failure tolerance
// =============================================================================

#[test]
fn test_corrupt_blob_falls_back_to_mapped_fields() {
    let mut old = down::<v1alpha4::AzureMachine>(&full_hub()).unwrap();
    old.metadata
        .annotations
        .insert(DEFAULT_ANNOTATION.to_string(), "{not json".to_string());

    let converted = Converter::default().up(&old).unwrap();
    assert!(matches!(
        converted.degraded,
        Some(Degradation::Decode(DecodeError::Malformed(_)))
    ));

    let hub = converted.object;
    assert_eq!(hub.spec.vm_size, "Standard_D2s_v3");
    assert!(hub.spec.dns_servers.is_empty());
    assert!(hub.spec.diagnostics.is_none());
    assert!(!hub.metadata.annotations.contains_key(DEFAULT_ANNOTATION));
}

#[test]
fn test_tampered_blob_is_ignored() {
    let mut old = down::<v1alpha4::AzureMachine>(&full_hub()).unwrap();
    let blob = old.metadata.annotations.get(DEFAULT_ANNOTATION).unwrap();
    let mut envelope: serde_json::Value = serde_json::from_str(blob).unwrap();
    envelope["data"]["spec"]["dnsServers"] = json!(["192.0.2.1"]);
    old.metadata
        .annotations
        .insert(DEFAULT_ANNOTATION.to_string(), envelope.to_string());

    let converted = Converter::default().up(&old).unwrap();
    assert!(matches!(
        converted.degraded,
        Some(Degradation::Decode(DecodeError::ChecksumMismatch { .. }))
    ));
    assert!(converted.object.spec.dns_servers.is_empty());
}

#[test]
fn test_never_converted_object_is_lossless() {
    let old: v1alpha4::AzureMachine = serde_json::from_value(json!({
        "metadata": {"name": "fresh"},
        "spec": {"vmSize": "Standard_B2s"}
    }))
    .unwrap();

    let converted = Converter::default().up(&old).unwrap();
    assert!(converted.is_lossless());
    assert_eq!(converted.object.spec.vm_size, "Standard_B2s");
}

// =============================================================================
// Live edits
// =============================================================================

#[test]
fn test_edited_fields_win_over_preserved_data() {
    let mut old = down::<v1alpha4::AzureMachine>(&full_hub()).unwrap();
    old.spec.vm_size = "Standard_D4s_v3".to_string();
    old.spec.data_disks.truncate(1);

    let hub = up(&old).unwrap();
    assert_eq!(hub.spec.vm_size, "Standard_D4s_v3");
    assert_eq!(hub.spec.data_disks.len(), 1);
    assert_eq!(hub.spec.dns_servers, vec!["10.0.0.10", "10.0.0.11"]);
}

// =============================================================================
// Lists
// =============================================================================

#[test]
fn test_list_preserves_order_and_count() {
    let hubs = List::new(vec![named_hub("a"), named_hub("b"), named_hub("c")]);
    let converter = Converter::default();

    let old = converter.down_list::<v1alpha3::AzureMachine>(&hubs).unwrap();
    assert!(old.is_lossless());
    let old = old.into_inner();
    let names: Vec<_> = old.items.iter().filter_map(|m| m.metadata.name.as_deref()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);

    let back = converter.up_list(&old).unwrap();
    assert!(back.is_lossless());
    assert_eq!(back.into_inner(), hubs);
}

#[test]
fn test_list_reports_degraded_items() {
    let hubs = List::new(vec![named_hub("a"), named_hub("b"), named_hub("c")]);
    let converter = Converter::default();

    let mut old = converter.down_list::<v1alpha4::AzureMachine>(&hubs).unwrap().into_inner();
    old.items[1]
        .metadata
        .annotations
        .insert(DEFAULT_ANNOTATION.to_string(), "{not json".to_string());

    let back = converter.up_list(&old).unwrap();
    assert_eq!(back.degraded_indices(), vec![1]);
    assert!(matches!(back.degraded[0].1, Degradation::Decode(DecodeError::Malformed(_))));

    let back = back.into_inner();
    assert_eq!(back.items.len(), 3);
    assert_eq!(back.items[0], hubs.items[0]);
    assert!(back.items[1].spec.dns_servers.is_empty());
    assert_eq!(back.items[2], hubs.items[2]);
}

#[test]
fn test_any_list_reports_degraded_items() {
    let hubs = List::new(vec![named_hub("a"), named_hub("b")]);
    let converter = Converter::default();

    let mut old = converter.down_list::<v1alpha4::AzureMachine>(&hubs).unwrap().into_inner();
    old.items[0]
        .metadata
        .annotations
        .insert(DEFAULT_ANNOTATION.to_string(), "{not json".to_string());

    let converted = AnyAzureMachineList::V1Alpha4(old)
        .convert_to(ApiVersion::V1Alpha3, &converter)
        .unwrap();
    assert_eq!(converted.degraded_indices(), vec![0]);
    assert_eq!(converted.list.len(), 2);
}

#[test]
fn test_list_fails_fast_on_bad_item() {
    let mut bad = v1alpha3::AzureMachine {
        metadata: ObjectMeta::named("bad", "default"),
        ..Default::default()
    };
    bad.spec.image = Some(v1alpha3::Image {
        shared_gallery_id: Some("/subscriptions/sub-1/images/not-a-gallery".to_string()),
        ..Default::default()
    });
    let list = List::new(vec![v1alpha3::AzureMachine::default(), bad, v1alpha3::AzureMachine::default()]);

    let err = Converter::default().up_list(&list).unwrap_err();
    assert!(matches!(err, ConversionError::ListItem { index: 1, .. }));

    let mapping = err.mapping_error().unwrap();
    assert_eq!(mapping.version, ApiVersion::V1Alpha3);
    assert_eq!(mapping.field, "spec.image.sharedGalleryID");
}

#[test]
fn test_unrepresentable_gallery_round_trips_through_v1alpha3() {
    for broken in ["", "nested/name"] {
        let mut hub = full_hub();
        if let Some(gallery) = hub.spec.image.as_mut().and_then(|i| i.shared_gallery.as_mut()) {
            gallery.version = broken.to_string();
        }

        let old = down::<v1alpha3::AzureMachine>(&hub).unwrap();
        assert!(old.spec.image.as_ref().unwrap().shared_gallery_id.is_none());
        assert_eq!(up(&old).unwrap(), hub);
    }
}

#[test]
fn test_reserved_annotation_on_hub_does_not_round_trip() {
    let mut hub = full_hub();
    hub.metadata
        .annotations
        .insert(DEFAULT_ANNOTATION.to_string(), "user-value".to_string());

    let back = up(&down::<v1alpha4::AzureMachine>(&hub).unwrap()).unwrap();
    assert!(!back.metadata.annotations.contains_key(DEFAULT_ANNOTATION));

    hub.metadata.annotations.remove(DEFAULT_ANNOTATION);
    assert_eq!(back, hub);
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_compute_gallery_survives_older_version() {
    let hub: v1beta1::AzureMachine = serde_json::from_value(json!({
        "metadata": {"name": "x", "namespace": "default"},
        "spec": {
            "vmSize": "Standard_B2s",
            "image": {"computeGallery": {"gallery": "community", "name": "g", "version": "v"}}
        }
    }))
    .unwrap();

    let old = down::<v1alpha4::AzureMachine>(&hub).unwrap();
    let image = old.spec.image.as_ref().unwrap();
    assert!(image.shared_gallery.is_none() && image.marketplace.is_none() && image.id.is_none());

    let back = up(&old).unwrap();
    assert_eq!(back.metadata.name.as_deref(), Some("x"));
    let gallery = back.spec.image.unwrap().compute_gallery.unwrap();
    assert_eq!((gallery.name.as_str(), gallery.version.as_str()), ("g", "v"));
}

#[test]
fn test_flat_marketplace_triple_needs_no_side_channel() {
    let old: v1alpha4::AzureMachine = serde_json::from_value(json!({
        "metadata": {"name": "market"},
        "spec": {
            "vmSize": "Standard_B2s",
            "image": {"marketplace": {"publisher": "p", "offer": "o", "sku": "s", "version": "1.0.0"}}
        }
    }))
    .unwrap();

    let hub = up(&old).unwrap();
    let plan = &hub.spec.image.as_ref().unwrap().marketplace.as_ref().unwrap().image_plan;
    assert_eq!((plan.publisher.as_str(), plan.offer.as_str(), plan.sku.as_str()), ("p", "o", "s"));

    let disabled = Converter::new(SideChannel::new().disabled());
    let again = disabled.down::<v1alpha4::AzureMachine>(&hub).unwrap().into_inner();
    assert_eq!(again, old);
}

#[test]
fn test_availability_zone_becomes_failure_domain() {
    let old: v1alpha3::AzureMachine = serde_json::from_value(json!({
        "spec": {"vmSize": "Standard_B2s", "availabilityZone": {"id": "3", "enabled": true}}
    }))
    .unwrap();

    assert_eq!(up(&old).unwrap().spec.failure_domain.as_deref(), Some("3"));
}

// =============================================================================
// Routing between versions
// =============================================================================

#[test]
fn test_spoke_to_spoke_goes_through_hub() {
    let machine: AnyAzureMachine = serde_json::from_value(json!({
        "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha3",
        "kind": "AzureMachine",
        "metadata": {"name": "legacy"},
        "spec": {
            "vmSize": "Standard_B2s",
            "availabilityZone": {"id": "1"},
            "image": {"sharedGalleryID": "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/galleries/gal/images/img/versions/2.0.0"}
        }
    }))
    .unwrap();

    let converted = machine.convert_to(ApiVersion::V1Alpha4, &Converter::default()).unwrap();
    assert!(converted.is_lossless());

    let AnyAzureMachine::V1Alpha4(newer) = converted.object else {
        panic!("expected v1alpha4");
    };
    assert_eq!(newer.spec.failure_domain.as_deref(), Some("1"));
    let gallery = newer.spec.image.unwrap().shared_gallery.unwrap();
    assert_eq!(gallery.gallery, "gal");
    assert_eq!(gallery.version, "2.0.0");
}

#[test]
fn test_hub_survives_trip_through_both_spokes() {
    let hub = full_hub();
    let converter = Converter::default();

    let v3 = AnyAzureMachine::V1Beta1(hub.clone())
        .convert_to(ApiVersion::V1Alpha3, &converter)
        .unwrap()
        .into_inner();
    let v4 = v3.convert_to(ApiVersion::V1Alpha4, &converter).unwrap().into_inner();
    let back = v4.convert_to(ApiVersion::V1Beta1, &converter).unwrap().into_inner();

    assert_eq!(back, AnyAzureMachine::V1Beta1(hub));
}

// =============================================================================
// Side channel settings
// =============================================================================

#[test]
fn test_disabled_side_channel_drops_hub_only_fields() {
    let converter = Converter::new(SideChannel::new().disabled());
    let old = converter.down::<v1alpha4::AzureMachine>(&full_hub()).unwrap().into_inner();
    assert!(!old.metadata.annotations.contains_key(DEFAULT_ANNOTATION));

    let hub = up(&old).unwrap();
    assert!(hub.spec.dns_servers.is_empty());
    assert!(hub.spec.image.unwrap().compute_gallery.is_none());
}

#[test]
fn test_custom_annotation_key() {
    let converter = Converter::new(SideChannel::with_key("example.com/hub-data"));
    let hub = full_hub();

    let old = converter.down::<v1alpha4::AzureMachine>(&hub).unwrap().into_inner();
    assert!(old.metadata.annotations.contains_key("example.com/hub-data"));
    assert!(!old.metadata.annotations.contains_key(DEFAULT_ANNOTATION));

    assert_eq!(converter.up(&old).unwrap().into_inner(), hub);

    // A converter on the default key does not see the data
    let partial = up(&old).unwrap();
    assert!(partial.spec.dns_servers.is_empty());
}
