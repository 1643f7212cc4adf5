use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Semester {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// A syllabus being tracked within one semester.
///
/// The `total_*` counters are a cache refreshed by the store after every
/// structural change; progress itself is never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: i64,
    pub semester_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub total_subjects: i64,
    pub total_units: i64,
    pub total_topics: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub tracker_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub unit_id: i64,
    pub name: String,
    pub completed: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    LabPractical,
    ClassTest,
    Isa,
    Esa,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::LabPractical => "lab_practical",
            TestType::ClassTest => "class_test",
            TestType::Isa => "isa",
            TestType::Esa => "esa",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lab_practical" | "lab" => Some(TestType::LabPractical),
            "class_test" | "class" => Some(TestType::ClassTest),
            "isa" => Some(TestType::Isa),
            "esa" => Some(TestType::Esa),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestType::LabPractical => "Lab Practical",
            TestType::ClassTest => "Class Test",
            TestType::Isa => "ISA",
            TestType::Esa => "ESA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: i64,
    pub tracker_id: i64,
    pub name: String,
    pub test_type: TestType,
    pub scheduled_at: DateTime<Utc>,
}

/// What a single coverage row examines: a whole unit or one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CoverageTarget {
    Unit(i64),
    Topic(i64),
}

impl CoverageTarget {
    /// Rebuilds a target from the nullable column pair used in storage.
    /// Returns `None` for the both-null and both-set states.
    pub fn from_columns(unit_id: Option<i64>, topic_id: Option<i64>) -> Option<Self> {
        match (unit_id, topic_id) {
            (Some(unit), None) => Some(CoverageTarget::Unit(unit)),
            (None, Some(topic)) => Some(CoverageTarget::Topic(topic)),
            _ => None,
        }
    }

    pub fn unit_id(&self) -> Option<i64> {
        match self {
            CoverageTarget::Unit(id) => Some(*id),
            CoverageTarget::Topic(_) => None,
        }
    }

    pub fn topic_id(&self) -> Option<i64> {
        match self {
            CoverageTarget::Unit(_) => None,
            CoverageTarget::Topic(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCoverage {
    pub id: i64,
    pub test_id: i64,
    pub target: CoverageTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTree {
    pub unit: Unit,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectTree {
    pub subject: Subject,
    pub units: Vec<UnitTree>,
}

/// Every subject, unit and topic of one tracker, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerTree {
    pub tracker_id: i64,
    pub subjects: Vec<SubjectTree>,
}

impl TrackerTree {
    pub fn units(&self) -> impl Iterator<Item = &UnitTree> {
        self.subjects.iter().flat_map(|s| s.units.iter())
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.units().flat_map(|u| u.topics.iter())
    }

    pub fn find_unit(&self, unit_id: i64) -> Option<&UnitTree> {
        self.units().find(|u| u.unit.id == unit_id)
    }

    pub fn find_topic(&self, topic_id: i64) -> Option<&Topic> {
        self.topics().find(|t| t.id == topic_id)
    }
}

/// A test together with the coverage rows recorded when it was scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTest {
    pub test: Test,
    pub coverage: Vec<TestCoverage>,
}

// === Derived, never persisted ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitProgress {
    pub unit_id: i64,
    pub unit_name: String,
    pub total_topics: u32,
    pub completed_topics: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProgress {
    pub subject_id: i64,
    pub subject_name: String,
    pub total_topics: u32,
    pub completed_topics: u32,
    pub percentage: f64,
    pub units: Vec<UnitProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerProgress {
    pub tracker_id: i64,
    pub total_topics: u32,
    pub completed_topics: u32,
    pub percentage: f64,
    pub subjects: Vec<SubjectProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    High,
    Elevated,
    Normal,
}

impl Urgency {
    pub fn from_days_remaining(days: i64) -> Self {
        if days <= 1 {
            Urgency::Critical
        } else if days <= 3 {
            Urgency::High
        } else if days <= 7 {
            Urgency::Elevated
        } else {
            Urgency::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Urgency::Critical => "Critical",
            Urgency::High => "High",
            Urgency::Elevated => "Elevated",
            Urgency::Normal => "Normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityTest {
    pub test: Test,
    pub days_remaining: i64,
    pub time_remaining: String,
    pub urgency: Urgency,
    pub covered_topics: Vec<String>,
}

/// One test with its countdown, whether or not it falls inside the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDetails {
    pub test: Test,
    pub coverage: Vec<TestCoverage>,
    pub covered_topics: Vec<String>,
    pub days_remaining: i64,
    pub time_remaining: String,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: i64, unit_id: i64, name: &str) -> Topic {
        Topic {
            id,
            unit_id,
            name: name.to_string(),
            completed: false,
            order: id as i32,
        }
    }

    fn sample_tree() -> TrackerTree {
        TrackerTree {
            tracker_id: 1,
            subjects: vec![SubjectTree {
                subject: Subject {
                    id: 1,
                    tracker_id: 1,
                    name: "Math".to_string(),
                },
                units: vec![
                    UnitTree {
                        unit: Unit {
                            id: 10,
                            subject_id: 1,
                            name: "Algebra".to_string(),
                            order: 0,
                        },
                        topics: vec![topic(100, 10, "Linear"), topic(101, 10, "Quadratic")],
                    },
                    UnitTree {
                        unit: Unit {
                            id: 11,
                            subject_id: 1,
                            name: "Geometry".to_string(),
                            order: 1,
                        },
                        topics: vec![topic(102, 11, "Circles")],
                    },
                ],
            }],
        }
    }

    mod test_type_tests {
        use super::*;

        #[test]
        fn as_str_returns_correct_values() {
            assert_eq!(TestType::LabPractical.as_str(), "lab_practical");
            assert_eq!(TestType::ClassTest.as_str(), "class_test");
            assert_eq!(TestType::Isa.as_str(), "isa");
            assert_eq!(TestType::Esa.as_str(), "esa");
        }

        #[test]
        fn from_str_round_trips_as_str() {
            for t in [
                TestType::LabPractical,
                TestType::ClassTest,
                TestType::Isa,
                TestType::Esa,
            ] {
                assert_eq!(TestType::from_str(t.as_str()), Some(t));
            }
        }

        #[test]
        fn from_str_accepts_short_and_uppercase() {
            assert_eq!(TestType::from_str("LAB"), Some(TestType::LabPractical));
            assert_eq!(TestType::from_str("class"), Some(TestType::ClassTest));
            assert_eq!(TestType::from_str(" ESA "), Some(TestType::Esa));
        }

        #[test]
        fn from_str_invalid_returns_none() {
            assert_eq!(TestType::from_str("quiz"), None);
            assert_eq!(TestType::from_str(""), None);
        }

        #[test]
        fn serializes_snake_case() {
            let json = serde_json::to_string(&TestType::LabPractical).unwrap();
            assert_eq!(json, "\"lab_practical\"");
        }
    }

    mod coverage_target_tests {
        use super::*;

        #[test]
        fn from_columns_accepts_exactly_one() {
            assert_eq!(
                CoverageTarget::from_columns(Some(3), None),
                Some(CoverageTarget::Unit(3))
            );
            assert_eq!(
                CoverageTarget::from_columns(None, Some(7)),
                Some(CoverageTarget::Topic(7))
            );
        }

        #[test]
        fn from_columns_rejects_both_or_neither() {
            assert_eq!(CoverageTarget::from_columns(None, None), None);
            assert_eq!(CoverageTarget::from_columns(Some(1), Some(2)), None);
        }

        #[test]
        fn column_accessors() {
            let unit = CoverageTarget::Unit(5);
            assert_eq!(unit.unit_id(), Some(5));
            assert_eq!(unit.topic_id(), None);

            let topic = CoverageTarget::Topic(9);
            assert_eq!(topic.unit_id(), None);
            assert_eq!(topic.topic_id(), Some(9));
        }

        #[test]
        fn serializes_as_tagged_variant() {
            let json = serde_json::to_string(&CoverageTarget::Unit(4)).unwrap();
            assert_eq!(json, r#"{"kind":"unit","id":4}"#);
        }
    }

    mod tree_tests {
        use super::*;

        #[test]
        fn find_unit_and_topic() {
            let tree = sample_tree();
            assert_eq!(tree.find_unit(11).unwrap().unit.name, "Geometry");
            assert_eq!(tree.find_topic(101).unwrap().name, "Quadratic");
            assert!(tree.find_unit(99).is_none());
            assert!(tree.find_topic(999).is_none());
        }

        #[test]
        fn iterates_all_topics_in_order() {
            let tree = sample_tree();
            let names: Vec<&str> = tree.topics().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["Linear", "Quadratic", "Circles"]);
        }

        #[test]
        fn default_tree_is_empty() {
            let tree = TrackerTree::default();
            assert_eq!(tree.units().count(), 0);
            assert_eq!(tree.topics().count(), 0);
        }
    }

    mod urgency_tests {
        use super::*;

        #[test]
        fn thresholds() {
            assert_eq!(Urgency::from_days_remaining(0), Urgency::Critical);
            assert_eq!(Urgency::from_days_remaining(1), Urgency::Critical);
            assert_eq!(Urgency::from_days_remaining(2), Urgency::High);
            assert_eq!(Urgency::from_days_remaining(3), Urgency::High);
            assert_eq!(Urgency::from_days_remaining(4), Urgency::Elevated);
            assert_eq!(Urgency::from_days_remaining(7), Urgency::Elevated);
            assert_eq!(Urgency::from_days_remaining(8), Urgency::Normal);
        }

        #[test]
        fn labels() {
            assert_eq!(Urgency::Critical.label(), "Critical");
            assert_eq!(Urgency::Normal.label(), "Normal");
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn ok_with_number() {
            let output = JsonOutput::ok(42);
            assert!(output.success);
            assert_eq!(output.data, Some(42));
            assert!(output.error.is_none());
        }

        #[test]
        fn err_with_string() {
            let output = JsonOutput::<()>::err("something went wrong");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("something went wrong".to_string()));
        }

        #[test]
        fn serializes_ok_correctly() {
            let output = JsonOutput::ok("test");
            let json = serde_json::to_string(&output).unwrap();
            assert!(json.contains("\"success\":true"));
            assert!(json.contains("\"data\":\"test\""));
            assert!(json.contains("\"error\":null"));
        }

        #[test]
        fn serializes_err_correctly() {
            let output = JsonOutput::<()>::err("error");
            let json = serde_json::to_string(&output).unwrap();
            assert!(json.contains("\"success\":false"));
            assert!(json.contains("\"data\":null"));
            assert!(json.contains("\"error\":\"error\""));
        }
    }
}
