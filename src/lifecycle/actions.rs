//! Declarative phase paths for lifecycle operations.
//!
//! Every operation declares the set of phases acceptable to observe while
//! waiting ("in flight") and the single phase that means it is done. The
//! paths live in one table here instead of being repeated at call sites.

use crate::api::{CustomAction, Phase};

/// The expected phase path of one lifecycle operation.
#[derive(Debug, Clone)]
pub struct PhasePath {
    /// Phases acceptable to observe while the operation is progressing.
    pub in_flight: Vec<Phase>,
    /// The phase that completes the operation.
    pub desired: Phase,
}

impl PhasePath {
    /// Creates a phase path.
    #[must_use]
    pub fn new(in_flight: &[Phase], desired: Phase) -> Self {
        Self {
            in_flight: in_flight.to_vec(),
            desired,
        }
    }

    /// Returns true if `phase` is acceptable while waiting.
    #[must_use]
    pub fn tolerates(&self, phase: Phase) -> bool {
        self.in_flight.contains(&phase)
    }
}

/// Path for the initial submission of a spec.
#[must_use]
pub fn creation_path() -> PhasePath {
    PhasePath::new(&[Phase::Pending, Phase::Starting], Phase::Serving)
}

/// Path for replacing the spec of a running workload.
#[must_use]
pub fn update_path() -> PhasePath {
    PhasePath::new(&[Phase::Pending, Phase::Updating], Phase::Serving)
}

/// Path for a custom action.
///
/// All actions share the base in-flight set; `pause` additionally tolerates
/// `Serving` while the workload drains, and `resume` tolerates the `Paused`
/// phase it starts from.
#[must_use]
pub fn action_path(action: CustomAction) -> PhasePath {
    let base = [Phase::Pending, Phase::Updating, Phase::Starting];

    match action {
        CustomAction::Restart | CustomAction::Scale | CustomAction::Recreate => {
            PhasePath::new(&base, Phase::Serving)
        }
        CustomAction::Pause => {
            let mut in_flight = base.to_vec();
            in_flight.push(Phase::Serving);
            PhasePath {
                in_flight,
                desired: Phase::Paused,
            }
        }
        CustomAction::Resume => {
            let mut in_flight = base.to_vec();
            in_flight.push(Phase::Paused);
            PhasePath {
                in_flight,
                desired: Phase::Serving,
            }
        }
    }
}

/// Path for waiting out a deletion.
///
/// The phase observed just before the delete call is tolerated in flight,
/// since the service keeps reporting it until teardown starts.
#[must_use]
pub fn deletion_path(observed: Option<Phase>) -> PhasePath {
    let mut in_flight = vec![Phase::Serving];
    if let Some(phase) = observed
        && !in_flight.contains(&phase)
    {
        in_flight.push(phase);
    }

    PhasePath {
        in_flight,
        desired: Phase::Deleted,
    }
}
