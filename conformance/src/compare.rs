//! Result comparison.

use crate::oracle::OracleReport;
use crate::testcase::{CaseOutcome, Mismatch, TestCase};

/// Prefix Java's `Class.toString()` puts in front of a class name.
pub const CLASS_PREFIX: &str = "class ";

/// Strip one leading [`CLASS_PREFIX`] from a reported type name.
///
/// Applying this to its own output changes nothing unless the name itself
/// starts with the prefix twice.
pub fn normalize_label(type_line: &str) -> &str {
    type_line.strip_prefix(CLASS_PREFIX).unwrap_or(type_line)
}

/// Check a report against the case's expectations.
///
/// Both checks always run, so a case can fail with a type and a data
/// mismatch at once.
pub fn compare(report: &OracleReport, case: &TestCase) -> CaseOutcome {
    let mut mismatches = Vec::new();

    let label = normalize_label(&report.type_line);
    if label != case.expected_label {
        mismatches.push(Mismatch::Type {
            actual: label.to_owned(),
            expected: case.expected_label.clone(),
        });
    }
    if report.string_line != case.expected_string {
        mismatches.push(Mismatch::Data {
            actual: report.string_line.clone(),
            expected: case.expected_string.clone(),
        });
    }

    if mismatches.is_empty() {
        CaseOutcome::Pass
    } else {
        CaseOutcome::Mismatch(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickle_ref::Graph;

    fn case(label: &str, expected: &str) -> TestCase {
        let mut graph = Graph::new();
        let root = graph.int(256);
        TestCase {
            graph,
            root,
            expected_label: label.to_owned(),
            expected_string: expected.to_owned(),
        }
    }

    fn report(type_line: &str, string_line: &str) -> OracleReport {
        OracleReport {
            type_line: type_line.to_owned(),
            string_line: string_line.to_owned(),
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "class java.lang.Integer",
            "java.lang.Integer",
            "array of class java.lang.Object",
            "",
        ] {
            let once = normalize_label(raw);
            assert_eq!(normalize_label(once), once, "{raw:?}");
        }
        assert_eq!(normalize_label("class java.util.HashMap"), "java.util.HashMap");
        assert_eq!(
            normalize_label("array of class java.lang.Object"),
            "array of class java.lang.Object"
        );
    }

    #[test]
    fn matching_report_passes() {
        let outcome = compare(
            &report("java.lang.Integer", "256"),
            &case("java.lang.Integer", "256"),
        );
        assert_eq!(outcome, CaseOutcome::Pass);

        let outcome = compare(
            &report("class java.lang.Integer", "256"),
            &case("java.lang.Integer", "256"),
        );
        assert!(outcome.passed());
    }

    #[test]
    fn both_mismatches_are_kept() {
        let outcome = compare(
            &report("java.lang.Long", "255"),
            &case("java.lang.Integer", "256"),
        );
        assert_eq!(
            outcome,
            CaseOutcome::Mismatch(vec![
                Mismatch::Type {
                    actual: "java.lang.Long".into(),
                    expected: "java.lang.Integer".into(),
                },
                Mismatch::Data {
                    actual: "255".into(),
                    expected: "256".into(),
                },
            ])
        );
        assert_eq!(outcome.diagnostics().len(), 2);
    }

    #[test]
    fn comparison_is_exact() {
        let outcome = compare(
            &report("java.util.arraylist", "[1,2,3]"),
            &case("java.util.ArrayList", "[1, 2, 3]"),
        );
        let CaseOutcome::Mismatch(found) = outcome else {
            panic!("expected a mismatch");
        };
        assert!(matches!(found[0], Mismatch::Type { .. }));
        assert!(matches!(found[1], Mismatch::Data { .. }));
    }
}
