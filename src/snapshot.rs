//! Everything derived for one tracker at one instant.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{PriorityTest, ScheduledTest, TrackerProgress, TrackerTree};
use crate::priority::rank_priority_tests;
use crate::progress::compute_progress;

/// The raw state of one tracker as loaded from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerSnapshot {
    pub tree: TrackerTree,
    pub tests: Vec<ScheduledTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerView {
    pub computed_at: DateTime<Utc>,
    pub progress: TrackerProgress,
    pub priority_tests: Vec<PriorityTest>,
}

impl TrackerSnapshot {
    pub fn new(tree: TrackerTree, tests: Vec<ScheduledTest>) -> Self {
        Self { tree, tests }
    }

    /// Recomputes every derived value from scratch. Pure: calling this again
    /// with the same `now` yields the same view.
    pub fn recompute(&self, now: DateTime<Utc>, window_days: i64) -> TrackerView {
        TrackerView {
            computed_at: now,
            progress: compute_progress(&self.tree),
            priority_tests: rank_priority_tests(&self.tests, &self.tree, now, window_days),
        }
    }

    /// Flips one topic in place so the next recompute sees it without a reload.
    /// Returns the new state, or `None` if the topic is not in this tracker.
    pub fn set_topic_completed(&mut self, topic_id: i64, completed: bool) -> Option<bool> {
        let topic = self
            .tree
            .subjects
            .iter_mut()
            .flat_map(|s| s.units.iter_mut())
            .flat_map(|u| u.topics.iter_mut())
            .find(|t| t.id == topic_id)?;
        topic.completed = completed;
        Some(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CoverageTarget, Subject, SubjectTree, Test, TestCoverage, TestType, Topic, Unit, UnitTree,
    };
    use crate::time::{fixed_now, Clock};
    use chrono::Duration;

    fn snapshot() -> TrackerSnapshot {
        let now = fixed_now();
        let tree = TrackerTree {
            tracker_id: 1,
            subjects: vec![SubjectTree {
                subject: Subject {
                    id: 1,
                    tracker_id: 1,
                    name: "Math".to_string(),
                },
                units: vec![UnitTree {
                    unit: Unit {
                        id: 10,
                        subject_id: 1,
                        name: "Algebra".to_string(),
                        order: 0,
                    },
                    topics: vec![
                        Topic {
                            id: 100,
                            unit_id: 10,
                            name: "Linear".to_string(),
                            completed: true,
                            order: 0,
                        },
                        Topic {
                            id: 101,
                            unit_id: 10,
                            name: "Quadratic".to_string(),
                            completed: false,
                            order: 1,
                        },
                    ],
                }],
            }],
        };
        let tests = vec![ScheduledTest {
            test: Test {
                id: 1,
                tracker_id: 1,
                name: "ISA 1".to_string(),
                test_type: TestType::Isa,
                scheduled_at: now + Duration::hours(2),
            },
            coverage: vec![TestCoverage {
                id: 1,
                test_id: 1,
                target: CoverageTarget::Unit(10),
            }],
        }];
        TrackerSnapshot::new(tree, tests)
    }

    #[test]
    fn recompute_combines_progress_and_priority() {
        let view = snapshot().recompute(fixed_now(), 7);
        assert_eq!(view.progress.percentage, 50.0);
        assert_eq!(view.priority_tests.len(), 1);
        assert_eq!(view.priority_tests[0].time_remaining, "0d 2h 0m");
        assert_eq!(
            view.priority_tests[0].covered_topics,
            vec!["Linear", "Quadratic"]
        );
    }

    #[test]
    fn recompute_is_deterministic() {
        let snap = snapshot();
        assert_eq!(snap.recompute(fixed_now(), 7), snap.recompute(fixed_now(), 7));
    }

    #[test]
    fn advancing_clock_expires_tests() {
        let snap = snapshot();
        let mut clock = Clock::fixed(fixed_now());
        assert_eq!(snap.recompute(clock.now(), 7).priority_tests.len(), 1);

        clock.advance(Duration::hours(1));
        let view = snap.recompute(clock.now(), 7);
        assert_eq!(view.priority_tests[0].time_remaining, "0d 1h 0m");

        clock.advance(Duration::hours(1));
        assert!(snap.recompute(clock.now(), 7).priority_tests.is_empty());
    }

    #[test]
    fn toggle_is_seen_by_next_recompute() {
        let mut snap = snapshot();
        assert_eq!(snap.set_topic_completed(101, true), Some(true));
        assert_eq!(snap.recompute(fixed_now(), 7).progress.percentage, 100.0);
    }

    #[test]
    fn toggle_unknown_topic_is_none() {
        let mut snap = snapshot();
        assert_eq!(snap.set_topic_completed(999, true), None);
    }

    #[test]
    fn empty_snapshot() {
        let view = TrackerSnapshot::default().recompute(fixed_now(), 7);
        assert_eq!(view.progress.total_topics, 0);
        assert!(view.priority_tests.is_empty());
    }
}
