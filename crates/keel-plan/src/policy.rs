//! Built-in change policies, one per apply action.
//!
//! Rules are matched by precedence (longest path, fewest wildcards, highest
//! priority), not by their order in the list.

use keel_cmp::ChangeType;
use keel_event::{ActionType, Rule, RuleType};

fn allow(path: &str) -> Rule {
    Rule::new(RuleType::ALLOW, path)
}

fn warn(path: &str, message: &str) -> Rule {
    Rule::new(RuleType::WARN, path).with_message(message)
}

fn error(path: &str, message: &str) -> Rule {
    Rule::new(RuleType::ERROR, path).with_message(message)
}

/// Upgrades may only bump the Kubernetes version.
pub fn upgrade_rules() -> Vec<Rule> {
    vec![
        allow("kubernetes.version").on(ChangeType::Modify),
        error(
            "@",
            "Change is not allowed. Upgrade action allows changing only 'kubernetes.version'.",
        ),
    ]
}

/// Scaling adds and removes worker and load balancer instances, and the
/// hosts they live on.
pub fn scale_rules() -> Vec<Rule> {
    const CONTROL_PLANE: &str = "Currently, control plane cannot be scaled.";

    let mut rules = Vec::new();
    for pool in ["worker", "loadBalancer"] {
        let path = format!("cluster.nodes.{pool}.instances.@");
        rules.push(
            allow(&path)
                .on(ChangeType::Delete)
                .with_action(ActionType::ScaleDown),
        );
        rules.push(
            allow(&path)
                .on(ChangeType::Create)
                .with_action(ActionType::ScaleUp),
        );
    }

    rules.extend([
        error("cluster.nodes.master.instances.@", CONTROL_PLANE).on(ChangeType::Create),
        allow("cluster.nodes.master.instances.@")
            .on(ChangeType::Delete)
            .with_message(CONTROL_PLANE),
        allow("hosts.@").on(ChangeType::Create),
        allow("hosts.@").on(ChangeType::Delete),
        error(
            "*",
            "Change is not allowed. Scale action allows only addition and removal of worker and load balancer nodes.",
        ),
    ]);
    rules
}

/// Changes accepted when re-applying an existing cluster.
pub fn modify_rules() -> Vec<Rule> {
    const ALL_NODES: &str = "cluster.nodes.{master, worker, loadBalancer}";

    vec![
        warn(
            "hosts.*.mainResourcePoolPath",
            "Changing main resource pool location will trigger recreation of all resources bound to that resource pool, such as virtual machines and data disks.",
        )
        .on(ChangeType::Modify),
        warn(
            "hosts.*.dataResourcePools.*",
            "Removing data resource pool will destroy all the data on that location.",
        )
        .on(ChangeType::Delete),
        warn(
            "hosts.*.dataResourcePools.*.path",
            "Changing data resource pool location will trigger recreation of all resources bound to that resource pool, such as virtual machines and data disks",
        )
        .on(ChangeType::Modify),
        allow("hosts.*.dataResourcePools.*"),
        error(
            "cluster.network",
            "Once the cluster is created, further changes to the network properties are not allowed. Such action may render the cluster unusable.",
        ),
        error(
            "cluster.nodeTemplate",
            "Once the cluster is created, further changes to the nodeTemplate properties are not allowed. Such action may render the cluster unusable.",
        ),
        error(
            &format!("{ALL_NODES}.instances.@"),
            "To remove existing nodes run apply command with '--action scale' flag.",
        )
        .on(ChangeType::Delete),
        error(
            &format!("{ALL_NODES}.instances.@"),
            "To add new nodes run apply command with '--action scale' flag.",
        )
        .on(ChangeType::Create),
        error(
            &format!("{ALL_NODES}.default.{{cpu, ram, mainDiskSize}}"),
            "Changing any default physical properties of nodes (cpu, ram, mainDiskSize) is not allowed. Such action may render the cluster unusable.",
        ),
        error(
            &format!("{ALL_NODES}.instances.@.{{cpu, ram, mainDiskSize}}"),
            "Changing any physical properties of nodes (cpu, ram, mainDiskSize) is not allowed. Such action will recreate the node.",
        )
        .on(ChangeType::Modify),
        error(
            &format!("{ALL_NODES}.instances.@.{{ip, mac}}"),
            "Changing IP or MAC address of the node is not allowed. Such action may render the cluster unusable.",
        )
        .on(ChangeType::Modify),
        warn(
            "cluster.nodes.{master, worker}.instances.*.dataDisks.*",
            "Changing data disk properties, will recreate the disk (removing all of its content in the process).",
        )
        .on(ChangeType::Modify),
        warn(
            "cluster.nodes.{master, worker}.instances.*.dataDisks.*",
            "One or more data disks will be removed.",
        )
        .on(ChangeType::Delete),
        allow("cluster.nodes.loadBalancer.forwardPorts.*"),
        error(
            "cluster.nodes.loadBalancer.vip",
            "Once the cluster is created, changing virtual IP (VIP) is not allowed. Such action may render the cluster unusable.",
        ),
        allow(&format!("{ALL_NODES}.instances.*")),
        error(
            "kubernetes.version",
            "Changing Kubernetes is allowed only when upgrading the cluster.\nTo upgrade the cluster run apply command with '--action upgrade' flag.",
        ),
        allow("addons"),
        error("@", "Change is not allowed."),
    ]
}
