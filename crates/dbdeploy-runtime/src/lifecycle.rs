//! Container lifecycle state machine.
//!
//! State is observed from the runtime on every invocation, never persisted.
//! The host port is owned by at most one running container per
//! port-prefix: any other running occupant is evicted before the target
//! claims it. Restart versus create depends only on the target's state.
//!
//! | target  | conflict | actions              |
//! |---------|----------|----------------------|
//! | running | any      | none                 |
//! | stopped | yes      | stop C, restart T    |
//! | stopped | no       | restart T            |
//! | absent  | yes      | stop C, create T     |
//! | absent  | no       | create T             |
//!
//! Actions are not transactional: a failed restart or create after a
//! successful eviction leaves the port unbound.

use std::fmt;

use dbdeploy_catalog::resolver::Plan;
use dbdeploy_common::error::Result;
use dbdeploy_common::types::{ContainerName, ContainerState};

use crate::backend::{ContainerRuntime, RunSpec};

/// Runtime state relevant to one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// State of the target container.
    pub target: ContainerState,
    /// A running container holding the same port-prefix, if any.
    pub conflict: Option<ContainerName>,
}

/// One runtime mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Stop a conflicting container.
    Stop(ContainerName),
    /// Restart the stopped target.
    Restart,
    /// Create the target from its image.
    Create,
}

/// What happened to the target container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already running; nothing was done.
    NoOp,
    /// An existing container was restarted.
    Restarted,
    /// A new container was created.
    Created,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => write!(f, "already running"),
            Self::Restarted => write!(f, "restarted"),
            Self::Created => write!(f, "created"),
        }
    }
}

/// Queries the runtime for the target container and any port conflict.
///
/// # Errors
///
/// Returns `DeployError::Runtime` if the runtime cannot be queried.
pub fn observe(runtime: &dyn ContainerRuntime, plan: &Plan) -> Result<Observation> {
    let target = plan.container.as_str();
    let running = runtime.list_names(&plan.port_prefix, false)?;

    let state = if running.iter().any(|name| name == target) {
        ContainerState::Running
    } else if runtime
        .list_names(target, true)?
        .iter()
        .any(|name| name == target)
    {
        ContainerState::Stopped
    } else {
        ContainerState::Absent
    };

    let conflict = running
        .into_iter()
        .find(|name| name.starts_with(&plan.port_prefix) && name != target)
        .map(ContainerName::new);

    tracing::info!(
        container = %plan.container,
        state = %state,
        conflict = conflict.as_ref().map(ContainerName::as_str),
        "observed container"
    );
    Ok(Observation {
        target: state,
        conflict,
    })
}

/// Returns the actions that bring the target to running.
#[must_use]
pub fn plan_transition(observation: &Observation) -> Vec<Action> {
    if observation.target == ContainerState::Running {
        return Vec::new();
    }
    let mut actions = Vec::with_capacity(2);
    if let Some(conflict) = &observation.conflict {
        actions.push(Action::Stop(conflict.clone()));
    }
    actions.push(match observation.target {
        ContainerState::Stopped => Action::Restart,
        _ => Action::Create,
    });
    actions
}

/// Executes `actions` for `plan` in order.
///
/// # Errors
///
/// Returns the first runtime failure; remaining actions are skipped.
pub fn apply(runtime: &dyn ContainerRuntime, plan: &Plan, actions: &[Action]) -> Result<Transition> {
    let mut transition = Transition::NoOp;
    for action in actions {
        match action {
            Action::Stop(name) => {
                tracing::info!(container = %name, "stopping conflicting container");
                runtime.stop(name)?;
            }
            Action::Restart => {
                tracing::info!(container = %plan.container, "restarting container");
                runtime.restart(&plan.container)?;
                transition = Transition::Restarted;
            }
            Action::Create => {
                tracing::info!(container = %plan.container, image = %plan.image, "running container");
                runtime.run(&RunSpec::from_plan(plan))?;
                transition = Transition::Created;
            }
        }
    }
    Ok(transition)
}
