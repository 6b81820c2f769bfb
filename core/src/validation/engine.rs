//! Field-by-field comparison of a primary result against validator results.

use std::collections::BTreeMap;

use crate::types::{ExtractionResult, FieldValue, ProviderId};

use super::config::ComparisonConfig;
use super::normalize::normalize_text;
use super::outline::{flatten, match_nodes, repair};
use super::report::{Agreement, FieldDiff, FieldPath, ValidationReport, ValidatorOutcome, ValidatorStatus};
use super::similarity::{levenshtein_similarity, similarity};

/// Compares extraction results and scores their agreement.
#[derive(Debug, Clone, Default)]
pub struct CrossValidator {
    config: ComparisonConfig,
}

/// How a text field should be scored.
#[derive(Clone, Copy)]
enum TextKind {
    Short,
    Long,
}

impl CrossValidator {
    /// Creates a validator with the given tolerances.
    #[must_use]
    pub const fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Compares `primary` against each validator result, in the given order.
    ///
    /// Confidence is the share of agreeing diffs across all validators, with
    /// missing fields counted as disagreement. An empty `validators` slice
    /// yields an `insufficient_data` report.
    #[must_use]
    pub fn compare(&self, primary: &ExtractionResult, validators: &[ExtractionResult]) -> ValidationReport {
        if validators.is_empty() {
            return ValidationReport::insufficient();
        }

        let mut diffs = Vec::new();
        let mut outcomes = Vec::with_capacity(validators.len());
        for validator in validators {
            let before = diffs.len();
            self.compare_pair(primary, validator, &mut diffs);
            let fields = diffs.len() - before;

            let agreeing = diffs[before..].iter().filter(|d| d.agreement.is_agreement()).count();
            tracing::debug!(
                validator = %validator.provider,
                fields,
                agreeing,
                "Compared validator result"
            );
            outcomes.push(ValidatorOutcome {
                provider: validator.provider.clone(),
                status: ValidatorStatus::Compared { fields },
            });
        }

        let agreeing = diffs.iter().filter(|d| d.agreement.is_agreement()).count();
        #[allow(clippy::cast_precision_loss)]
        let confidence = if diffs.is_empty() {
            1.0
        } else {
            agreeing as f64 / diffs.len() as f64
        };

        ValidationReport {
            diffs,
            confidence: Some(confidence),
            insufficient_data: false,
            validators: outcomes,
            problems: Vec::new(),
        }
    }

    fn compare_pair(&self, primary: &ExtractionResult, validator: &ExtractionResult, out: &mut Vec<FieldDiff>) {
        let id = &validator.provider;

        self.compare_text_field(
            out,
            id,
            FieldPath::Title,
            primary.title.as_deref(),
            validator.title.as_deref(),
            TextKind::Short,
        );

        for (label, p, v) in union_by_label(&primary.figures, &validator.figures) {
            self.push_values(out, id, FieldPath::Figure(label), p.cloned(), v.cloned());
        }

        let sections = primary.sections.len().max(validator.sections.len());
        for i in 0..sections {
            let p = primary.sections.get(i);
            let v = validator.sections.get(i);
            self.compare_text_field(
                out,
                id,
                FieldPath::SectionTitle(i),
                p.and_then(|s| s.title.as_deref()),
                v.and_then(|s| s.title.as_deref()),
                TextKind::Short,
            );
            self.compare_text_field(
                out,
                id,
                FieldPath::SectionText(i),
                p.and_then(|s| s.text.as_deref()),
                v.and_then(|s| s.text.as_deref()),
                TextKind::Long,
            );
        }

        let empty = BTreeMap::new();
        let tables = primary.tables.len().max(validator.tables.len());
        for t in 0..tables {
            let p_rows = primary.tables.get(t).map_or(&[][..], |tb| tb.rows.as_slice());
            let v_rows = validator.tables.get(t).map_or(&[][..], |tb| tb.rows.as_slice());
            for r in 0..p_rows.len().max(v_rows.len()) {
                let p_row = p_rows.get(r).unwrap_or(&empty);
                let v_row = v_rows.get(r).unwrap_or(&empty);
                for (label, p, v) in union_by_label(p_row, v_row) {
                    let path = FieldPath::TableCell { table: t, row: r, label };
                    self.push_values(out, id, path, p.cloned(), v.cloned());
                }
            }
        }

        compare_outline(primary, validator, out);
    }

    fn compare_text_field(
        &self,
        out: &mut Vec<FieldDiff>,
        validator: &ProviderId,
        path: FieldPath,
        primary: Option<&str>,
        other: Option<&str>,
        kind: TextKind,
    ) {
        let (agreement, score) = match (primary, other) {
            (None, None) => return,
            (Some(_), None) | (None, Some(_)) => (Agreement::MissingInOneSide, None),
            (Some(p), Some(v)) => self.classify_text(p, v, kind),
        };
        out.push(FieldDiff {
            path,
            validator: validator.clone(),
            primary: primary.map(FieldValue::text),
            validator_value: other.map(FieldValue::text),
            agreement,
            similarity: score,
        });
    }

    fn push_values(
        &self,
        out: &mut Vec<FieldDiff>,
        validator: &ProviderId,
        path: FieldPath,
        primary: Option<FieldValue>,
        other: Option<FieldValue>,
    ) {
        let (agreement, score) = match (&primary, &other) {
            (None, None) => return,
            (Some(_), None) | (None, Some(_)) => (Agreement::MissingInOneSide, None),
            (Some(p), Some(v)) => self.classify_values(p, v),
        };
        out.push(FieldDiff {
            path,
            validator: validator.clone(),
            primary,
            validator_value: other,
            agreement,
            similarity: score,
        });
    }

    /// Classifies two typed values.
    #[must_use]
    pub fn classify_values(&self, primary: &FieldValue, other: &FieldValue) -> (Agreement, Option<f64>) {
        use FieldValue::{Currency, Date, Text};

        match (primary, other) {
            (Date(a), Date(b)) => (if a == b { Agreement::Exact } else { Agreement::Mismatch }, None),
            (Date(_), _) | (_, Date(_)) => (Agreement::Mismatch, None),
            (
                Currency {
                    currency: Some(a), ..
                },
                Currency {
                    currency: Some(b), ..
                },
            ) if !a.eq_ignore_ascii_case(b) => (Agreement::Mismatch, None),
            (Text(a), Text(b)) => match (primary.as_number(), other.as_number()) {
                (Some(x), Some(y)) => (self.classify_numbers(x, y), None),
                _ => self.classify_text(a, b, TextKind::Short),
            },
            _ => match (primary.as_number(), other.as_number()) {
                (Some(x), Some(y)) => (self.classify_numbers(x, y), None),
                _ => (Agreement::Mismatch, None),
            },
        }
    }

    /// Relative-tolerance comparison, boundary inclusive.
    ///
    /// The tolerance is relative to the primary's magnitude, or to the
    /// validator's when the primary is zero. Non-finite values never agree.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn classify_numbers(&self, primary: f64, other: f64) -> Agreement {
        if !primary.is_finite() || !other.is_finite() {
            return Agreement::Mismatch;
        }
        if primary == other {
            return Agreement::Exact;
        }
        let magnitude = if primary == 0.0 { other.abs() } else { primary.abs() };
        let allowed = self.config.numeric_tolerance * magnitude;
        // Absorb representation error so the boundary itself is inclusive.
        let slack = f64::EPSILON * 8.0 * magnitude.max(1.0);
        if (primary - other).abs() <= allowed + slack {
            Agreement::FuzzyMatch
        } else {
            Agreement::Mismatch
        }
    }

    fn classify_text(&self, primary: &str, other: &str, kind: TextKind) -> (Agreement, Option<f64>) {
        if normalize_text(primary) == normalize_text(other) {
            return (Agreement::Exact, Some(1.0));
        }
        let score = match kind {
            TextKind::Short => levenshtein_similarity(primary, other),
            TextKind::Long => similarity(primary, other, self.config.text_method),
        };
        let agreement = if score >= self.config.text_similarity_threshold {
            Agreement::FuzzyMatch
        } else {
            Agreement::Mismatch
        };
        (agreement, Some(score))
    }
}

/// Pairs entries of two labeled maps by normalized label.
///
/// Primary labels win for the path; validator-only labels follow in order.
fn union_by_label<'a>(
    primary: &'a BTreeMap<String, FieldValue>,
    other: &'a BTreeMap<String, FieldValue>,
) -> Vec<(String, Option<&'a FieldValue>, Option<&'a FieldValue>)> {
    let mut by_key: BTreeMap<String, &'a str> = BTreeMap::new();
    for label in other.keys() {
        by_key.entry(normalize_text(label)).or_insert(label.as_str());
    }

    let mut pairs = Vec::with_capacity(primary.len().max(other.len()));
    let mut consumed = Vec::new();
    for (label, value) in primary {
        let key = normalize_text(label);
        let counterpart = by_key.get(&key).and_then(|l| other.get(*l));
        if counterpart.is_some() {
            consumed.push(key);
        }
        pairs.push((label.clone(), Some(value), counterpart));
    }
    for (key, label) in &by_key {
        if !consumed.contains(key) {
            pairs.push(((*label).to_string(), None, other.get(*label)));
        }
    }
    pairs
}

fn compare_outline(primary: &ExtractionResult, validator: &ExtractionResult, out: &mut Vec<FieldDiff>) {
    let p_nodes = flatten(&repair(&primary.outline));
    let v_nodes = flatten(&repair(&validator.outline));
    if p_nodes.is_empty() && v_nodes.is_empty() {
        return;
    }

    let matching = match_nodes(&p_nodes, &v_nodes);
    let level = |l: u8| Some(FieldValue::Number(f64::from(l)));
    let id = &validator.provider;

    for (pi, vi) in matching.matched {
        let (p, v) = (&p_nodes[pi], &v_nodes[vi]);
        let agreement = if p.level == v.level {
            Agreement::Exact
        } else {
            Agreement::Mismatch
        };
        out.push(FieldDiff {
            path: FieldPath::Outline {
                title: p.key.clone(),
                page: p.page.or(v.page),
            },
            validator: id.clone(),
            primary: level(p.level),
            validator_value: level(v.level),
            agreement,
            similarity: None,
        });
    }
    for pi in matching.primary_only {
        let p = &p_nodes[pi];
        out.push(FieldDiff {
            path: FieldPath::Outline {
                title: p.key.clone(),
                page: p.page,
            },
            validator: id.clone(),
            primary: level(p.level),
            validator_value: None,
            agreement: Agreement::MissingInOneSide,
            similarity: None,
        });
    }
    for vi in matching.validator_only {
        let v = &v_nodes[vi];
        out.push(FieldDiff {
            path: FieldPath::Outline {
                title: v.key.clone(),
                page: v.page,
            },
            validator: id.clone(),
            primary: None,
            validator_value: level(v.level),
            agreement: Agreement::MissingInOneSide,
            similarity: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutlineNode, Section, Table};

    fn engine() -> CrossValidator {
        CrossValidator::default()
    }

    fn sample(provider: ProviderId) -> ExtractionResult {
        let mut row = BTreeMap::new();
        row.insert("Amount".to_string(), FieldValue::Number(1500.0));
        row.insert("Description".to_string(), FieldValue::text("Rent"));
        ExtractionResult::new(provider)
            .with_title("Annual Report 2023")
            .with_figure("Total revenue", FieldValue::Number(1_234_567.0))
            .with_section(Section {
                title: Some("Summary".into()),
                level: 1,
                page_range: None,
                text: Some("Revenue grew by 12% to 1,234,567".into()),
            })
            .with_table(Table {
                page: Some(2),
                headers: vec!["Description".into(), "Amount".into()],
                rows: vec![row],
            })
            .with_outline(vec![OutlineNode::new("Summary", 1, Some(1))])
    }

    #[test]
    fn test_identical_results_full_confidence() {
        let report = engine().compare(&sample(ProviderId::document_intelligence()), &[sample(ProviderId::openai())]);
        assert_eq!(report.confidence, Some(1.0));
        assert_eq!(report.disagreements().count(), 0);
        assert_eq!(report.structural_mismatches(), 0);
        assert!(!report.insufficient_data);
        // title, figure, section title, section text, two cells, one outline node
        assert_eq!(report.diffs.len(), 7);
    }

    #[test]
    fn test_no_validators_is_insufficient() {
        let report = engine().compare(&sample(ProviderId::openai()), &[]);
        assert!(report.insufficient_data);
        assert_eq!(report.confidence, None);
    }

    #[test]
    fn test_empty_results_vacuous_confidence() {
        let report = engine().compare(
            &ExtractionResult::new(ProviderId::openai()),
            &[ExtractionResult::new(ProviderId::gemini())],
        );
        assert_eq!(report.confidence, Some(1.0));
        assert!(report.diffs.is_empty());
    }

    #[test]
    fn test_numeric_tolerance_boundary() {
        let e = engine();
        assert_eq!(e.classify_numbers(200.0, 201.0), Agreement::FuzzyMatch);
        assert_eq!(e.classify_numbers(200.0, 199.0), Agreement::FuzzyMatch);
        assert_eq!(e.classify_numbers(200.0, 201.5), Agreement::Mismatch);
        assert_eq!(e.classify_numbers(100.0, 100.5), Agreement::FuzzyMatch);
        assert_eq!(e.classify_numbers(100.0, 100.6), Agreement::Mismatch);
        assert_eq!(e.classify_numbers(0.0, 0.0), Agreement::Exact);
        assert_eq!(e.classify_numbers(0.0, 1.0), Agreement::Mismatch);
    }

    #[test]
    fn test_value_type_rules() {
        let e = engine();
        let ils = FieldValue::Currency {
            amount: 10.0,
            currency: Some("ILS".into()),
        };
        let usd = FieldValue::Currency {
            amount: 10.0,
            currency: Some("USD".into()),
        };
        assert_eq!(e.classify_values(&ils, &usd).0, Agreement::Mismatch);
        assert_eq!(e.classify_values(&ils, &FieldValue::Number(10.0)).0, Agreement::Exact);
        assert_eq!(e.classify_values(&FieldValue::text("1,000"), &FieldValue::Number(1000.0)).0, Agreement::Exact);
        assert_eq!(e.classify_values(&FieldValue::text("n/a"), &FieldValue::Number(1.0)).0, Agreement::Mismatch);

        let d1 = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).map(FieldValue::Date).unwrap();
        let d2 = chrono::NaiveDate::from_ymd_opt(2024, 1, 30).map(FieldValue::Date).unwrap();
        assert_eq!(e.classify_values(&d1, &d1.clone()).0, Agreement::Exact);
        assert_eq!(e.classify_values(&d1, &d2).0, Agreement::Mismatch);
    }

    #[test]
    fn test_non_finite_numbers_mismatch() {
        let e = engine();
        assert_eq!(e.classify_numbers(f64::INFINITY, 5.0), Agreement::Mismatch);
        assert_eq!(e.classify_numbers(5.0, f64::NEG_INFINITY), Agreement::Mismatch);
        assert_eq!(e.classify_numbers(f64::INFINITY, f64::INFINITY), Agreement::Mismatch);
        assert_eq!(e.classify_numbers(f64::NAN, f64::NAN), Agreement::Mismatch);

        let huge = format!("1{}", "0".repeat(400));
        let (agreement, _) = e.classify_values(&FieldValue::Text(huge), &FieldValue::Number(5.0));
        assert_eq!(agreement, Agreement::Mismatch);
    }

    #[test]
    fn test_word_set_precheck_counts_as_agreement() {
        let e = CrossValidator::new(ComparisonConfig::default().with_text_similarity_threshold(0.99));
        let primary: String = (0..60).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let validator = format!("{primary} extra");

        let (agreement, score) = e.classify_text(&primary, &validator, TextKind::Long);
        assert_eq!(agreement, Agreement::FuzzyMatch);
        assert_eq!(score, Some(1.0));
    }

    #[test]
    fn test_case_and_whitespace_are_exact() {
        let (agreement, _) = engine().classify_values(&FieldValue::text("Annual  Report"), &FieldValue::text("annual report"));
        assert_eq!(agreement, Agreement::Exact);
    }

    #[test]
    fn test_missing_fields_count_against_confidence() {
        let primary = ExtractionResult::new(ProviderId::openai())
            .with_figure("Net", FieldValue::Number(5.0))
            .with_figure("Gross", FieldValue::Number(8.0));
        let validator = ExtractionResult::new(ProviderId::gemini()).with_figure("net", FieldValue::Number(5.0));

        let report = engine().compare(&primary, &[validator]);
        assert_eq!(report.diffs.len(), 2);
        assert_eq!(report.confidence, Some(0.5));
        let missing = report.disagreements().next().unwrap();
        assert_eq!(missing.path, FieldPath::Figure("Gross".into()));
        assert_eq!(missing.agreement, Agreement::MissingInOneSide);
    }

    #[test]
    fn test_outline_repaired_before_matching() {
        let primary = ExtractionResult::new(ProviderId::document_intelligence()).with_outline(OutlineNode::build_tree(vec![
            ("A", 1, Some(1)),
            ("B", 2, Some(2)),
            ("C", 4, Some(3)),
        ]));
        let validator = ExtractionResult::new(ProviderId::openai()).with_outline(OutlineNode::build_tree(vec![
            ("A", 1, Some(1)),
            ("B", 2, Some(2)),
            ("C", 3, Some(3)),
        ]));

        let report = engine().compare(&primary, &[validator]);
        assert_eq!(report.structural_mismatches(), 0);
        let levels: Vec<_> = report.diffs.iter().filter_map(|d| d.primary.as_ref()?.as_number()).collect();
        assert_eq!(levels, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_outline_level_difference_is_structural() {
        let primary = ExtractionResult::new(ProviderId::openai())
            .with_outline(OutlineNode::build_tree(vec![("A", 1, Some(1)), ("B", 2, Some(2))]));
        let validator = ExtractionResult::new(ProviderId::gemini())
            .with_outline(vec![OutlineNode::new("A", 1, Some(1)), OutlineNode::new("B", 1, Some(2))]);

        let report = engine().compare(&primary, &[validator]);
        assert_eq!(report.structural_mismatches(), 1);
    }

    #[test]
    fn test_diffs_follow_validator_order() {
        let primary = sample(ProviderId::document_intelligence());
        let report = engine().compare(&primary, &[sample(ProviderId::mistral()), sample(ProviderId::openai())]);
        let first = report.diffs.first().unwrap();
        let last = report.diffs.last().unwrap();
        assert_eq!(first.validator, ProviderId::mistral());
        assert_eq!(last.validator, ProviderId::openai());
        assert_eq!(report.validators.len(), 2);
    }
}
