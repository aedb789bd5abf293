use kube::core::CustomResourceExt;
use panda_operator::crd::cluster::Cluster;

fn main() {
    let crd = Cluster::crd();
    let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
    println!("{}", yaml);
}
