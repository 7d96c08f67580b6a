//! Prints the MyApp CustomResourceDefinition as YAML.

use crds::MyApp;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = MyApp::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
