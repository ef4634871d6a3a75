// Query classifier
// Keyword heuristic labelling each question quantitative or qualitative.
// Mis-routes are expected and absorbed by the downstream fallback paths.


/// Label attached to a question for one turn. Recomputed every turn, never
/// cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Quantitative,
    Qualitative,
}

/// Trigger terms whose presence marks a question quantitative. Data-driven so
/// the table stays independently testable and extensible.
pub const QUANTITATIVE_TRIGGERS: &[&str] = &[
    "how many",
    "count",
    "total",
    "sum",
    "average",
    "mean",
    "median",
    "min",
    "max",
    "most",
    "least",
    "top",
    "bottom",
    "list",
    "which",
    "trend",
    "cost",
    "hours",
    "compare",
    "frequency",
    "times",
    "percentage",
];

/// Case-insensitive substring match against the trigger table. Total and
/// deterministic: every question gets a label.
#[inline]
pub fn classify(question: &str) -> QueryKind {
    let question = question.to_lowercase();
    if QUANTITATIVE_TRIGGERS
        .iter()
        .any(|term| question.contains(term))
    {
        QueryKind::Quantitative
    } else {
        QueryKind::Qualitative
    }
}
