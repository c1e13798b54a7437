//! Compensation planning.
//!
//! When forward execution is abandoned, the completed steps are unwound
//! in reverse completion order. Planning is pure so it can be tested and
//! replayed independently of the orchestrator that executes the plan.

use serde::{Deserialize, Serialize};

use crate::instance::SagaInstance;
use crate::step::Step;

/// One entry of a compensation plan: a step to unwind and the artifact
/// its compensating action needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCompensation {
    pub step: Step,
    pub artifact: String,
}

/// Computes the compensating actions for a saga, in execution order.
///
/// Walks the completed steps in reverse, skipping steps that have no
/// compensating action and steps that recorded no artifact (nothing to
/// act on). Steps already compensated on a previous run are skipped too,
/// so re-entering compensation after a crash does not repeat work.
pub fn compensation_plan(instance: &SagaInstance) -> Vec<PlannedCompensation> {
    instance
        .completed_steps()
        .iter()
        .rev()
        .filter(|step| step.is_compensatable())
        .filter(|step| !instance.compensated_steps().contains(step))
        .filter_map(|&step| {
            instance.artifact(step).map(|artifact| PlannedCompensation {
                step,
                artifact: artifact.to_string(),
            })
        })
        .collect()
}

/// Outcome of one compensating action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompensationOutcome {
    /// The compensating action succeeded.
    Compensated,
    /// The compensating action failed; the chain continued regardless.
    Failed(String),
}

/// What happened to one step during a compensation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationAttempt {
    pub step: Step,
    pub outcome: CompensationOutcome,
}

/// Summary of a full compensation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompensationReport {
    /// Every compensating action attempted, in execution order.
    pub attempts: Vec<CompensationAttempt>,
    /// Whether the cancellation notice went out.
    pub cancellation_notice_sent: bool,
}

impl CompensationReport {
    /// Returns true if every attempted compensating action succeeded.
    pub fn fully_compensated(&self) -> bool {
        self.attempts
            .iter()
            .all(|attempt| attempt.outcome == CompensationOutcome::Compensated)
    }

    /// Returns the steps whose compensating action failed, in execution
    /// order.
    pub fn failed_steps(&self) -> Vec<Step> {
        self.attempts
            .iter()
            .filter(|attempt| attempt.outcome != CompensationOutcome::Compensated)
            .map(|attempt| attempt.step)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SagaEvent;
    use common::OrderId;

    fn instance_with_steps(steps: &[(Step, &str)]) -> SagaInstance {
        let mut instance = SagaInstance::default();
        instance.apply(SagaEvent::saga_started(OrderId::new(), "C1".into()));
        for &(step, artifact) in steps {
            instance.apply(SagaEvent::step_completed(step, Some(artifact.to_string())));
        }
        instance
    }

    #[test]
    fn test_plan_is_reverse_completion_order() {
        let instance = instance_with_steps(&[
            (Step::Payment, "TXN-1"),
            (Step::Inventory, "RES-1"),
            (Step::Shipping, "TRACK-1"),
        ]);

        let plan = compensation_plan(&instance);
        let steps: Vec<Step> = plan.iter().map(|p| p.step).collect();
        assert_eq!(steps, vec![Step::Shipping, Step::Inventory, Step::Payment]);
        assert_eq!(plan[0].artifact, "TRACK-1");
        assert_eq!(plan[2].artifact, "TXN-1");
    }

    #[test]
    fn test_notification_is_not_compensated() {
        let instance = instance_with_steps(&[
            (Step::Payment, "TXN-1"),
            (Step::Inventory, "RES-1"),
            (Step::Shipping, "TRACK-1"),
            (Step::Notification, "NOTICE-1"),
        ]);

        let plan = compensation_plan(&instance);
        assert!(plan.iter().all(|p| p.step != Step::Notification));
    }

    #[test]
    fn test_empty_plan_when_nothing_completed() {
        let mut instance = SagaInstance::default();
        instance.apply(SagaEvent::saga_started(OrderId::new(), "C1".into()));
        assert!(compensation_plan(&instance).is_empty());
    }

    #[test]
    fn test_already_compensated_steps_are_skipped() {
        let mut instance = instance_with_steps(&[
            (Step::Payment, "TXN-1"),
            (Step::Inventory, "RES-1"),
        ]);
        instance.apply(SagaEvent::compensation_step_completed(Step::Inventory));

        let plan = compensation_plan(&instance);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].step, Step::Payment);
    }

    #[test]
    fn test_report_fully_compensated() {
        let mut report = CompensationReport::default();
        report.attempts.push(CompensationAttempt {
            step: Step::Payment,
            outcome: CompensationOutcome::Compensated,
        });
        assert!(report.fully_compensated());

        report.attempts.push(CompensationAttempt {
            step: Step::Inventory,
            outcome: CompensationOutcome::Failed("gateway down".to_string()),
        });
        assert!(!report.fully_compensated());
    }

    #[test]
    fn test_report_failed_steps() {
        let report = CompensationReport {
            attempts: vec![
                CompensationAttempt {
                    step: Step::Shipping,
                    outcome: CompensationOutcome::Compensated,
                },
                CompensationAttempt {
                    step: Step::Inventory,
                    outcome: CompensationOutcome::Failed("release failed".to_string()),
                },
                CompensationAttempt {
                    step: Step::Payment,
                    outcome: CompensationOutcome::Compensated,
                },
            ],
            cancellation_notice_sent: true,
        };

        assert_eq!(report.failed_steps(), vec![Step::Inventory]);
        assert!(CompensationReport::default().failed_steps().is_empty());
    }
}
