//! Node instances added or removed by a scale plan.

use keel_cmp::{Change, Value};
use keel_event::{ActionType, Event, Events};
use serde::Serialize;

use crate::error::{PlanError, PlanResult};
use crate::model::{ClusterConfig, Instance, NodeRole};

/// Index of the role segment in `cluster.nodes.<role>.instances.<id>`.
const ROLE_SEGMENT: usize = 2;
/// Index of the instance identity in the same path.
const ID_SEGMENT: usize = 4;

/// An instance together with the node pool it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScaledInstance {
    pub role: NodeRole,
    pub instance: Instance,
}

/// Instances removed by `ScaleDown` events, looked up in the applied
/// configuration.
pub fn removed_instances(events: &Events, applied: &ClusterConfig) -> PlanResult<Vec<ScaledInstance>> {
    collect(events, ActionType::ScaleDown, applied, |c| c.value_before.as_ref())
}

/// Instances added by `ScaleUp` events, looked up in the new configuration.
pub fn new_instances(events: &Events, new: &ClusterConfig) -> PlanResult<Vec<ScaledInstance>> {
    collect(events, ActionType::ScaleUp, new, |c| c.value_after.as_ref())
}

fn collect(
    events: &Events,
    action: ActionType,
    config: &ClusterConfig,
    side: impl Fn(&Change) -> Option<&Value>,
) -> PlanResult<Vec<ScaledInstance>> {
    let mut scaled: Vec<ScaledInstance> = Vec::new();

    for event in events.filter_by_action(action).iter() {
        for s in resolve(event, side(&event.change), config)? {
            if !scaled.contains(&s) {
                scaled.push(s);
            }
        }
    }

    Ok(scaled)
}

/// Every instance an event's matched paths point at. The event must be
/// attributed to an `Instance` record.
fn resolve(event: &Event, value: Option<&Value>, config: &ClusterConfig) -> PlanResult<Vec<ScaledInstance>> {
    let record = value.and_then(|v| v.deep().as_record());
    match record {
        Some(r) if r.type_name() == "Instance" => {}
        Some(r) => return Err(PlanError::NotScalable(r.type_name().to_string())),
        None => return Err(PlanError::NotScalable(event.change.kind.to_string())),
    }

    event
        .matched_paths
        .iter()
        .map(|path| lookup(path, config).ok_or_else(|| PlanError::NotScalable(path.clone())))
        .collect()
}

fn lookup(path: &str, config: &ClusterConfig) -> Option<ScaledInstance> {
    let segments: Vec<&str> = path.split('.').collect();
    let role = segments.get(ROLE_SEGMENT)?.parse::<NodeRole>().ok()?;
    let id = segments.get(ID_SEGMENT)?;
    let instance = config.cluster.nodes.instance(role, id)?;

    Some(ScaledInstance {
        role,
        instance: instance.clone(),
    })
}
