//! Countdown feed of upcoming tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::debug;

use crate::coverage::resolve_coverage;
use crate::models::{PriorityTest, ScheduledTest, TestDetails, TrackerTree, Urgency};

pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Local hour every test is pinned to.
pub const DEFAULT_EXAM_HOUR: u32 = 20;

pub const TEST_PASSED: &str = "Test has passed";

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Whole days until `scheduled_at`, floored (negative once it has passed).
pub fn days_remaining(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (scheduled_at - now).num_milliseconds().div_euclid(MS_PER_DAY)
}

/// Formats the time left as `"{d}d {h}h {m}m"`, or [`TEST_PASSED`].
pub fn format_countdown(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (scheduled_at - now).num_milliseconds();
    if diff <= 0 {
        return TEST_PASSED.to_string();
    }

    let days = diff / MS_PER_DAY;
    let hours = (diff % MS_PER_DAY) / MS_PER_HOUR;
    let minutes = (diff % MS_PER_HOUR) / MS_PER_MINUTE;

    format!("{}d {}h {}m", days, hours, minutes)
}

/// Builds the priority feed: tests still ahead of `now` whose whole-day
/// countdown is at most `window_days`, soonest first.
pub fn rank_priority_tests(
    tests: &[ScheduledTest],
    tree: &TrackerTree,
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<PriorityTest> {
    let mut ranked: Vec<PriorityTest> = tests
        .iter()
        .filter(|s| s.test.scheduled_at > now)
        .filter_map(|s| {
            let days = days_remaining(s.test.scheduled_at, now);
            if days > window_days {
                return None;
            }
            Some(PriorityTest {
                test: s.test.clone(),
                days_remaining: days,
                time_remaining: format_countdown(s.test.scheduled_at, now),
                urgency: Urgency::from_days_remaining(days),
                covered_topics: resolve_coverage(&s.coverage, tree),
            })
        })
        .collect();

    ranked.sort_by_key(|p| p.test.scheduled_at);

    debug!(
        total = tests.len(),
        ranked = ranked.len(),
        window_days,
        "ranked priority tests"
    );
    ranked
}

pub fn test_details(
    scheduled: &ScheduledTest,
    tree: &TrackerTree,
    now: DateTime<Utc>,
) -> TestDetails {
    TestDetails {
        test: scheduled.test.clone(),
        coverage: scheduled.coverage.clone(),
        covered_topics: resolve_coverage(&scheduled.coverage, tree),
        days_remaining: days_remaining(scheduled.test.scheduled_at, now),
        time_remaining: format_countdown(scheduled.test.scheduled_at, now),
    }
}

/// The instant a test on `date` starts: `hour:00` local time in `tz`.
///
/// An ambiguous local time (DST fall-back) resolves to the earlier instant.
/// Returns `None` when the hour is out of range or the local time does not
/// exist (DST spring-forward).
pub fn exam_instant<Tz: TimeZone>(date: NaiveDate, hour: u32, tz: &Tz) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CoverageTarget, Subject, SubjectTree, Test, TestCoverage, TestType, Topic, Unit, UnitTree,
    };
    use crate::time::fixed_now;
    use chrono::{Duration, FixedOffset};

    fn scheduled(id: i64, at: DateTime<Utc>, coverage: Vec<CoverageTarget>) -> ScheduledTest {
        ScheduledTest {
            test: Test {
                id,
                tracker_id: 1,
                name: format!("Test {}", id),
                test_type: TestType::ClassTest,
                scheduled_at: at,
            },
            coverage: coverage
                .into_iter()
                .enumerate()
                .map(|(i, target)| TestCoverage {
                    id: id * 10 + i as i64,
                    test_id: id,
                    target,
                })
                .collect(),
        }
    }

    fn tree() -> TrackerTree {
        TrackerTree {
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
                            completed: false,
                            order: 0,
                        },
                        Topic {
                            id: 101,
                            unit_id: 10,
                            name: "Quadratic".to_string(),
                            completed: true,
                            order: 1,
                        },
                    ],
                }],
            }],
        }
    }

    mod countdown_tests {
        use super::*;

        #[test]
        fn formats_days_hours_minutes() {
            let now = fixed_now();
            let at = now + Duration::days(2) + Duration::hours(5) + Duration::minutes(30);
            assert_eq!(format_countdown(at, now), "2d 5h 30m");
        }

        #[test]
        fn truncates_seconds() {
            let now = fixed_now();
            let at = now + Duration::minutes(1) + Duration::seconds(59);
            assert_eq!(format_countdown(at, now), "0d 0h 1m");
        }

        #[test]
        fn past_test_has_passed() {
            let now = fixed_now();
            assert_eq!(format_countdown(now - Duration::hours(1), now), TEST_PASSED);
        }

        #[test]
        fn exactly_now_has_passed() {
            let now = fixed_now();
            assert_eq!(format_countdown(now, now), "Test has passed");
        }

        #[test]
        fn days_remaining_floors() {
            let now = fixed_now();
            assert_eq!(days_remaining(now + Duration::hours(23), now), 0);
            assert_eq!(days_remaining(now + Duration::hours(47), now), 1);
            assert_eq!(days_remaining(now + Duration::days(7), now), 7);
            assert_eq!(days_remaining(now - Duration::hours(1), now), -1);
        }
    }

    mod ranking_tests {
        use super::*;

        #[test]
        fn sorted_by_scheduled_at() {
            let now = fixed_now();
            let tests = vec![
                scheduled(1, now + Duration::days(5), vec![]),
                scheduled(2, now + Duration::hours(3), vec![]),
                scheduled(3, now + Duration::days(2), vec![]),
            ];
            let ranked = rank_priority_tests(&tests, &tree(), now, DEFAULT_WINDOW_DAYS);
            let ids: Vec<i64> = ranked.iter().map(|p| p.test.id).collect();
            assert_eq!(ids, vec![2, 3, 1]);
        }

        #[test]
        fn excludes_passed_tests() {
            let now = fixed_now();
            let tests = vec![
                scheduled(1, now - Duration::hours(1), vec![]),
                scheduled(2, now, vec![]),
                scheduled(3, now + Duration::minutes(1), vec![]),
            ];
            let ranked = rank_priority_tests(&tests, &tree(), now, DEFAULT_WINDOW_DAYS);
            assert_eq!(ranked.len(), 1);
            assert_eq!(ranked[0].test.id, 3);
            assert_eq!(ranked[0].time_remaining, "0d 0h 1m");
        }

        #[test]
        fn window_edge_is_inclusive() {
            let now = fixed_now();
            let tests = vec![
                scheduled(1, now + Duration::days(7) + Duration::hours(23), vec![]),
                scheduled(2, now + Duration::days(8), vec![]),
            ];
            let ranked = rank_priority_tests(&tests, &tree(), now, 7);
            assert_eq!(ranked.len(), 1);
            assert_eq!(ranked[0].test.id, 1);
            assert_eq!(ranked[0].days_remaining, 7);
        }

        #[test]
        fn never_returns_out_of_window_or_past() {
            let now = fixed_now();
            let tests: Vec<ScheduledTest> = (-20..40)
                .map(|h| scheduled(h, now + Duration::hours(h * 7), vec![]))
                .collect();
            let ranked = rank_priority_tests(&tests, &tree(), now, 7);
            assert!(!ranked.is_empty());
            for p in &ranked {
                assert!(p.days_remaining <= 7);
                assert!(p.test.scheduled_at >= now);
            }
        }

        #[test]
        fn resolves_covered_topics() {
            let now = fixed_now();
            let tests = vec![scheduled(
                1,
                now + Duration::days(1),
                vec![CoverageTarget::Topic(101), CoverageTarget::Unit(10)],
            )];
            let ranked = rank_priority_tests(&tests, &tree(), now, 7);
            assert_eq!(ranked[0].covered_topics, vec!["Quadratic", "Linear"]);
        }

        #[test]
        fn classifies_urgency() {
            let now = fixed_now();
            let tests = vec![
                scheduled(1, now + Duration::hours(30), vec![]),
                scheduled(2, now + Duration::days(3), vec![]),
                scheduled(3, now + Duration::days(6), vec![]),
                scheduled(4, now + Duration::days(9), vec![]),
            ];
            let ranked = rank_priority_tests(&tests, &tree(), now, 14);
            let urgencies: Vec<Urgency> = ranked.iter().map(|p| p.urgency).collect();
            assert_eq!(
                urgencies,
                vec![
                    Urgency::Critical,
                    Urgency::High,
                    Urgency::Elevated,
                    Urgency::Normal
                ]
            );
        }

        #[test]
        fn recompute_with_later_now_drops_passed() {
            let now = fixed_now();
            let tests = vec![scheduled(1, now + Duration::minutes(30), vec![])];
            assert_eq!(rank_priority_tests(&tests, &tree(), now, 7).len(), 1);
            let later = now + Duration::hours(1);
            assert!(rank_priority_tests(&tests, &tree(), later, 7).is_empty());
        }
    }

    mod details_tests {
        use super::*;

        #[test]
        fn reports_passed_tests_too() {
            let now = fixed_now();
            let s = scheduled(1, now - Duration::days(2), vec![CoverageTarget::Unit(10)]);
            let details = test_details(&s, &tree(), now);
            assert_eq!(details.time_remaining, TEST_PASSED);
            assert_eq!(details.days_remaining, -2);
            assert_eq!(details.covered_topics, vec!["Linear", "Quadratic"]);
            assert_eq!(details.coverage.len(), 1);
        }
    }

    mod exam_instant_tests {
        use super::*;

        #[test]
        fn pins_to_local_hour() {
            let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
            let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
            let at = exam_instant(date, DEFAULT_EXAM_HOUR, &ist).unwrap();
            assert_eq!(at.to_rfc3339(), "2024-03-15T14:30:00+00:00");
        }

        #[test]
        fn utc_hour() {
            let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let at = exam_instant(date, 20, &Utc).unwrap();
            assert_eq!(at.to_rfc3339(), "2024-01-01T20:00:00+00:00");
        }

        #[test]
        fn invalid_hour_is_none() {
            let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            assert!(exam_instant(date, 24, &Utc).is_none());
        }
    }
}
