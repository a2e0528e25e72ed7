//! Typed cluster configuration.
//!
//! Every type implements [`Describe`] so a pair of configurations can be
//! compared. Field names are published under the `yaml` tag and identity
//! fields are flagged under the `opt` tag, which yields change paths such as
//! `cluster.nodes.worker.instances.<id>.cpu` or
//! `hosts.<name>.mainResourcePoolPath`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use keel_cmp::{Describe, Field, Record, Value};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

/// Primary tag of the model: identity flags and skipped fields.
pub const OPT_TAG: &str = "opt";

/// Tag holding the external field names.
pub const YAML_TAG: &str = "yaml";

fn field<T: Describe + ?Sized>(name: &str, yaml: &str, value: &T) -> Field {
    Field::new(name, value).tag(YAML_TAG, yaml)
}

fn id_field<T: Describe + ?Sized>(name: &str, yaml: &str, value: &T) -> Field {
    field(name, yaml, value).tag(OPT_TAG, ",id")
}

fn skipped_field<T: Describe + ?Sized>(name: &str, yaml: &str, value: &T) -> Field {
    field(name, yaml, value).tag(OPT_TAG, "-")
}

// ---------------------------------------------------------------------------
// ClusterConfig
// ---------------------------------------------------------------------------

/// A complete cluster configuration snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    pub hosts: Vec<Host>,
    pub cluster: Cluster,
    pub kubernetes: Kubernetes,
    pub addons: Addons,
}

impl ClusterConfig {
    pub fn from_json_str(s: &str) -> PlanResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_toml_str(s: &str) -> PlanResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a snapshot from a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::io(path, e))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            _ => Err(PlanError::Config(format!(
                "unsupported snapshot format: {}",
                path.display()
            ))),
        }
    }
}

impl Describe for ClusterConfig {
    fn describe(&self) -> Value {
        Record::new("ClusterConfig")
            .with(field("Hosts", "hosts", &self.hosts))
            .with(field("Cluster", "cluster", &self.cluster))
            .with(field("Kubernetes", "kubernetes", &self.kubernetes))
            .with(field("Addons", "addons", &self.addons))
            .into()
    }
}

// ---------------------------------------------------------------------------
// Hosts
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Host {
    pub name: String,
    pub default: bool,
    pub connection: Connection,
    pub main_resource_pool_path: String,
    pub data_resource_pools: Vec<DataResourcePool>,
}

impl Describe for Host {
    fn describe(&self) -> Value {
        Record::new("Host")
            .with(id_field("Name", "name", &self.name))
            .with(field("Default", "default", &self.default))
            .with(field("Connection", "connection", &self.connection))
            .with(field(
                "MainResourcePoolPath",
                "mainResourcePoolPath",
                &self.main_resource_pool_path,
            ))
            .with(field(
                "DataResourcePools",
                "dataResourcePools",
                &self.data_resource_pools,
            ))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Connection {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub ip: String,
}

impl Describe for Connection {
    fn describe(&self) -> Value {
        Record::new("Connection")
            .with(field("Type", "type", &self.kind))
            .with(field("User", "user", &self.user))
            .with(field("IP", "ip", &self.ip))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataResourcePool {
    pub name: String,
    pub path: String,
}

impl Describe for DataResourcePool {
    fn describe(&self) -> Value {
        Record::new("DataResourcePool")
            .with(id_field("Name", "name", &self.name))
            .with(field("Path", "path", &self.path))
            .into()
    }
}

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cluster {
    pub name: String,
    pub network: Network,
    pub node_template: NodeTemplate,
    pub nodes: Nodes,
}

impl Describe for Cluster {
    fn describe(&self) -> Value {
        Record::new("Cluster")
            .with(field("Name", "name", &self.name))
            .with(field("Network", "network", &self.network))
            .with(field("NodeTemplate", "nodeTemplate", &self.node_template))
            .with(field("Nodes", "nodes", &self.nodes))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Network {
    pub mode: String,
    pub bridge: String,
    pub cidr: String,
    pub gateway: Option<String>,
}

impl Describe for Network {
    fn describe(&self) -> Value {
        Record::new("Network")
            .with(field("Mode", "mode", &self.mode))
            .with(field("Bridge", "bridge", &self.bridge))
            .with(field("CIDR", "cidr", &self.cidr))
            .with(field("Gateway", "gateway", &self.gateway))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeTemplate {
    pub user: String,
    pub os: Os,
    pub ssh: NodeTemplateSsh,
    pub cpu_mode: String,
    pub dns: Vec<String>,
    pub update_on_boot: Option<bool>,
}

impl Describe for NodeTemplate {
    fn describe(&self) -> Value {
        Record::new("NodeTemplate")
            .with(field("User", "user", &self.user))
            .with(field("OS", "os", &self.os))
            .with(field("SSH", "ssh", &self.ssh))
            .with(field("CpuMode", "cpuMode", &self.cpu_mode))
            .with(field("DNS", "dns", &self.dns))
            .with(field("UpdateOnBoot", "updateOnBoot", &self.update_on_boot))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Os {
    pub distro: String,
    pub network_interface: String,
    pub source: String,
}

impl Describe for Os {
    fn describe(&self) -> Value {
        Record::new("OS")
            .with(field("Distro", "distro", &self.distro))
            .with(field(
                "NetworkInterface",
                "networkInterface",
                &self.network_interface,
            ))
            .with(field("Source", "source", &self.source))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeTemplateSsh {
    pub add_to_known_hosts: bool,
    pub private_key_path: String,
}

impl Describe for NodeTemplateSsh {
    fn describe(&self) -> Value {
        Record::new("NodeTemplateSSH")
            .with(field(
                "AddToKnownHosts",
                "addToKnownHosts",
                &self.add_to_known_hosts,
            ))
            .with(field(
                "PrivateKeyPath",
                "privateKeyPath",
                &self.private_key_path,
            ))
            .into()
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// The role a node instance plays in the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeRole {
    Master,
    Worker,
    LoadBalancer,
}

impl NodeRole {
    pub const ALL: [NodeRole; 3] = [Self::Master, Self::Worker, Self::LoadBalancer];

    /// The key of the role under `cluster.nodes`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Worker => "worker",
            Self::LoadBalancer => "loadBalancer",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeRole {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| PlanError::Config(format!("unknown node role {s:?}")))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Nodes {
    pub master: NodePool,
    pub worker: NodePool,
    pub load_balancer: LoadBalancer,
}

impl Nodes {
    /// Instances of the given role.
    pub fn instances(&self, role: NodeRole) -> &[Instance] {
        match role {
            NodeRole::Master => &self.master.instances,
            NodeRole::Worker => &self.worker.instances,
            NodeRole::LoadBalancer => &self.load_balancer.instances,
        }
    }

    /// Look up an instance by role and identity.
    pub fn instance(&self, role: NodeRole, id: &str) -> Option<&Instance> {
        self.instances(role).iter().find(|i| i.id == id)
    }
}

impl Describe for Nodes {
    fn describe(&self) -> Value {
        Record::new("Nodes")
            .with(field("Master", "master", &self.master))
            .with(field("Worker", "worker", &self.worker))
            .with(field("LoadBalancer", "loadBalancer", &self.load_balancer))
            .into()
    }
}

/// Defaults and instances of master or worker nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePool {
    pub default: NodeDefaults,
    pub instances: Vec<Instance>,
}

impl Describe for NodePool {
    fn describe(&self) -> Value {
        Record::new("NodePool")
            .with(field("Default", "default", &self.default))
            .with(field("Instances", "instances", &self.instances))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancer {
    pub vip: String,
    pub default: NodeDefaults,
    pub instances: Vec<Instance>,
    pub forward_ports: Vec<ForwardPort>,
}

impl Describe for LoadBalancer {
    fn describe(&self) -> Value {
        Record::new("LoadBalancer")
            .with(field("VIP", "vip", &self.vip))
            .with(field("Default", "default", &self.default))
            .with(field("Instances", "instances", &self.instances))
            .with(field("ForwardPorts", "forwardPorts", &self.forward_ports))
            .into()
    }
}

/// Physical properties applied to instances that do not set their own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeDefaults {
    pub cpu: u32,
    /// GiB.
    pub ram: u32,
    /// GiB.
    pub main_disk_size: u32,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
    pub data_disks: Vec<DataDisk>,
}

impl Describe for NodeDefaults {
    fn describe(&self) -> Value {
        Record::new("NodeDefaults")
            .with(field("CPU", "cpu", &self.cpu))
            .with(field("RAM", "ram", &self.ram))
            .with(field("MainDiskSize", "mainDiskSize", &self.main_disk_size))
            .with(field("Labels", "labels", &self.labels))
            .with(field("Taints", "taints", &self.taints))
            .with(field("DataDisks", "dataDisks", &self.data_disks))
            .into()
    }
}

/// A single node. Instances are matched across snapshots by `id`; the
/// display `name` is never compared.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    pub name: String,
    pub id: String,
    pub host: String,
    pub ip: String,
    pub mac: String,
    pub cpu: u32,
    pub ram: u32,
    pub main_disk_size: u32,
    pub data_disks: Vec<DataDisk>,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
}

impl Instance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Describe for Instance {
    fn describe(&self) -> Value {
        Record::new("Instance")
            .with(skipped_field("Name", "name", &self.name))
            .with(id_field("Id", "id", &self.id))
            .with(field("Host", "host", &self.host))
            .with(field("IP", "ip", &self.ip))
            .with(field("MAC", "mac", &self.mac))
            .with(field("CPU", "cpu", &self.cpu))
            .with(field("RAM", "ram", &self.ram))
            .with(field("MainDiskSize", "mainDiskSize", &self.main_disk_size))
            .with(field("DataDisks", "dataDisks", &self.data_disks))
            .with(field("Labels", "labels", &self.labels))
            .with(field("Taints", "taints", &self.taints))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataDisk {
    pub name: String,
    pub pool: String,
    /// GiB.
    pub size: u32,
}

impl Describe for DataDisk {
    fn describe(&self) -> Value {
        Record::new("DataDisk")
            .with(id_field("Name", "name", &self.name))
            .with(field("Pool", "pool", &self.pool))
            .with(field("Size", "size", &self.size))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: String,
}

impl Describe for Taint {
    fn describe(&self) -> Value {
        Record::new("Taint")
            .with(field("Key", "key", &self.key))
            .with(field("Value", "value", &self.value))
            .with(field("Effect", "effect", &self.effect))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardPort {
    pub name: String,
    pub port: u16,
    pub target_port: u16,
    pub target: String,
}

impl Describe for ForwardPort {
    fn describe(&self) -> Value {
        Record::new("ForwardPort")
            .with(id_field("Name", "name", &self.name))
            .with(field("Port", "port", &self.port))
            .with(field("TargetPort", "targetPort", &self.target_port))
            .with(field("Target", "target", &self.target))
            .into()
    }
}

// ---------------------------------------------------------------------------
// Kubernetes and addons
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Kubernetes {
    pub version: String,
    pub manager: String,
    pub dns_mode: String,
    pub network_plugin: String,
    pub other: KubernetesOther,
}

impl Describe for Kubernetes {
    fn describe(&self) -> Value {
        Record::new("Kubernetes")
            .with(field("Version", "version", &self.version))
            .with(field("Manager", "manager", &self.manager))
            .with(field("DnsMode", "dnsMode", &self.dns_mode))
            .with(field("NetworkPlugin", "networkPlugin", &self.network_plugin))
            .with(field("Other", "other", &self.other))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubernetesOther {
    pub auto_renew_certificates: bool,
    pub merge_kubeconfig: bool,
}

impl Describe for KubernetesOther {
    fn describe(&self) -> Value {
        Record::new("Other")
            .with(field(
                "AutoRenewCertificates",
                "autoRenewCertificates",
                &self.auto_renew_certificates,
            ))
            .with(field("MergeKubeconfig", "mergeKubeconfig", &self.merge_kubeconfig))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Addons {
    /// Opaque addon manifest; changes here are not planned.
    pub kubespray: String,
    pub rook: Rook,
}

impl Describe for Addons {
    fn describe(&self) -> Value {
        Record::new("Addons")
            .with(skipped_field("Kubespray", "kubespray", &self.kubespray))
            .with(field("Rook", "rook", &self.rook))
            .into()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rook {
    pub enabled: bool,
    pub version: String,
    pub node_selector: BTreeMap<String, String>,
}

impl Describe for Rook {
    fn describe(&self) -> Value {
        Record::new("Rook")
            .with(field("Enabled", "enabled", &self.enabled))
            .with(field("Version", "version", &self.version))
            .with(field("NodeSelector", "nodeSelector", &self.node_selector))
            .into()
    }
}
