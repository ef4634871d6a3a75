// Fallback statistics engine
// Hand-coded aggregates used when neither retrieval nor analysis produced an
// answer. Rules are an ordered, data-driven table; the first match wins, so a
// question containing both "average" and "sum" language resolves by table
// order.


use std::collections::HashMap;

use crate::dataset::Dataset;

/// Aggregate computations the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregate {
    RecordCount,
    MostFrequent { column: &'static str },
    Sum { column: &'static str },
    Mean { column: &'static str },
    Min { column: &'static str },
    Max { column: &'static str },
}

/// One trigger rule: the question must contain any of `primary` and, when
/// `secondary` is non-empty, any of `secondary` too.
struct FallbackRule {
    primary: &'static [&'static str],
    secondary: &'static [&'static str],
    aggregate: Aggregate,
}

const COST_TERMS: &[&str] = &["cost", "service cost"];

/// Evaluated top to bottom; order is part of the contract.
const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        primary: &["how many", "total number", "count"],
        secondary: &["record", "service"],
        aggregate: Aggregate::RecordCount,
    },
    FallbackRule {
        primary: &["most frequent", "most common"],
        secondary: &[],
        aggregate: Aggregate::MostFrequent {
            column: "Problem_Type",
        },
    },
    FallbackRule {
        primary: &["sum", "total"],
        secondary: COST_TERMS,
        aggregate: Aggregate::Sum { column: "Cost" },
    },
    FallbackRule {
        primary: &["average", "mean"],
        secondary: COST_TERMS,
        aggregate: Aggregate::Mean { column: "Cost" },
    },
    FallbackRule {
        primary: &["minimum", "lowest", "smallest"],
        secondary: COST_TERMS,
        aggregate: Aggregate::Min { column: "Cost" },
    },
    FallbackRule {
        primary: &["maximum", "highest", "largest"],
        secondary: COST_TERMS,
        aggregate: Aggregate::Max { column: "Cost" },
    },
];

/// Answer a question from the rule table, or `None` when no rule matches.
/// Never panics, even on an empty dataset.
#[inline]
pub fn fallback_answer(question: &str, dataset: &Dataset) -> Option<String> {
    let question = question.to_lowercase();

    let rule = FALLBACK_RULES.iter().find(|rule| {
        let primary = rule.primary.iter().any(|term| question.contains(term));
        let secondary =
            rule.secondary.is_empty() || rule.secondary.iter().any(|term| question.contains(term));
        primary && secondary
    })?;

    Some(compute(rule.aggregate, dataset))
}

fn compute(aggregate: Aggregate, dataset: &Dataset) -> String {
    match aggregate {
        Aggregate::RecordCount => {
            if dataset.is_empty() {
                "There are no machine service records in the database.".to_string()
            } else {
                format!(
                    "There are {} machine service records in the database.",
                    dataset.row_count()
                )
            }
        }
        Aggregate::MostFrequent { column } => most_frequent_sentence(dataset, column),
        Aggregate::Sum { column } => {
            numeric_sentence(dataset, column, "sum of all service costs", |values| {
                values.iter().sum()
            })
        }
        Aggregate::Mean { column } => {
            numeric_sentence(dataset, column, "average service cost", |values| {
                values.iter().sum::<f64>() / values.len() as f64
            })
        }
        Aggregate::Min { column } => {
            numeric_sentence(dataset, column, "minimum service cost", |values| {
                values.iter().copied().fold(f64::INFINITY, f64::min)
            })
        }
        Aggregate::Max { column } => {
            numeric_sentence(dataset, column, "maximum service cost", |values| {
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            })
        }
    }
}

fn most_frequent_sentence(dataset: &Dataset, column: &str) -> String {
    let Some(values) = dataset.text_column(column) else {
        return "No problem types found in the data.".to_string();
    };
    if values.is_empty() {
        return "No problem types found in the data.".to_string();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    // Deterministic tie-break: highest count, then lexicographically smallest.
    let (most_common, frequency) = counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .unwrap_or(("", 0));

    format!(
        "The most frequent problem type is '{}' with {} occurrences.",
        most_common, frequency
    )
}

fn numeric_sentence<F>(dataset: &Dataset, column: &str, label: &str, aggregate: F) -> String
where
    F: Fn(&[f64]) -> f64,
{
    let values = dataset.numeric_column(column).unwrap_or_default();
    if values.is_empty() {
        return format!("There are no cost values in the records to compute the {}.", label);
    }

    format!(
        "The {} in the records is {:.2}.",
        label,
        aggregate(&values)
    )
}
