//! # Trusted CA Bundle
//!
//! The ConfigMap mounted at the CA path when a proxy is in effect. Its data is
//! filled in by the cluster network operator in response to the inject label;
//! the operator only owns its labels.

use crate::constants::{TRUSTED_CA_BUNDLE_CONFIGMAP, TRUSTED_CA_BUNDLE_INJECT_LABEL};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

pub fn build_trusted_ca_bundle(namespace: &str, labels: &BTreeMap<String, String>) -> ConfigMap {
    let mut labels = labels.clone();
    labels.insert(TRUSTED_CA_BUNDLE_INJECT_LABEL.to_string(), "true".to_string());

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(TRUSTED_CA_BUNDLE_CONFIGMAP.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_carries_inject_label_and_no_data() {
        let labels = BTreeMap::from([("app".to_string(), "external-secrets".to_string())]);
        let bundle = build_trusted_ca_bundle("eso", &labels);

        assert_eq!(bundle.metadata.name.as_deref(), Some(TRUSTED_CA_BUNDLE_CONFIGMAP));
        assert_eq!(bundle.metadata.namespace.as_deref(), Some("eso"));
        let labels = bundle.metadata.labels.unwrap();
        assert_eq!(labels[TRUSTED_CA_BUNDLE_INJECT_LABEL], "true");
        assert_eq!(labels["app"], "external-secrets");
        assert!(bundle.data.is_none());
    }
}
