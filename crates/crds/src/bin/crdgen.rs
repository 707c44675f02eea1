//! Prints the CRD manifests as a multi-document YAML stream.
//!
//! `cargo run -p crds --bin crdgen > config/crd/bases/crds.yaml`

use crds::{GardenerCluster, Runtime};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let manifests = [Runtime::crd(), GardenerCluster::crd()];
    for crd in &manifests {
        println!("---");
        print!("{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
