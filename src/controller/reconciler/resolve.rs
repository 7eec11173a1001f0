//! # Configuration Resolution
//!
//! Layers, highest precedence first: the `ExternalSecretsConfig` spec, the
//! `ExternalSecretsManager` global config, then the operator's own process
//! environment. For each concern the first layer that sets it wins as a whole;
//! fields are never mixed across layers.

use crate::config::OperandEnvironment;
use crate::constants::{
    LABEL_APP, LABEL_APP_VALUE, LABEL_MANAGED_BY, LABEL_PART_OF, OPERATOR_NAME,
};
use crate::crd::{ExternalSecretsConfigSpec, GlobalConfig, ProxyConfig};
use std::collections::BTreeMap;

/// Effective proxy for the operand, or `None` to leave proxy settings untouched
pub fn resolve_proxy(
    desired: &ExternalSecretsConfigSpec,
    global: Option<&GlobalConfig>,
    environment: &OperandEnvironment,
) -> Option<ProxyConfig> {
    if let Some(proxy) = &desired.app_config.common.proxy {
        return Some(proxy.clone());
    }
    if let Some(proxy) = global.and_then(|g| g.proxy.as_ref()) {
        return Some(proxy.clone());
    }
    environment.proxy()
}

/// Labels stamped on every managed object
///
/// Operator defaults, then global labels, then spec labels; later layers
/// override earlier ones key by key. The managed-by label is fixed: the
/// operand watches select on it.
pub fn resolve_labels(
    desired: &ExternalSecretsConfigSpec,
    global: Option<&GlobalConfig>,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::from([
        (LABEL_APP.to_string(), LABEL_APP_VALUE.to_string()),
        (LABEL_PART_OF.to_string(), OPERATOR_NAME.to_string()),
    ]);
    if let Some(extra) = global.and_then(|g| g.labels.as_ref()) {
        labels.extend(extra.clone());
    }
    if let Some(extra) = &desired.controller_config.labels {
        labels.extend(extra.clone());
    }
    labels.insert(LABEL_MANAGED_BY.to_string(), OPERATOR_NAME.to_string());
    labels
}
