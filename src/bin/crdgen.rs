//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions for `ExternalSecretsConfig` and
//! `ExternalSecretsManager` as a multi-document YAML stream.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/bases/operator.openshift.io.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use external_secrets_operator::crd::{ExternalSecretsConfig, ExternalSecretsManager};
use kube::core::CustomResourceExt;

fn main() {
    let crds = [ExternalSecretsConfig::crd(), ExternalSecretsManager::crd()];

    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    println!("# Change the types in src/crd/ and regenerate");
    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
