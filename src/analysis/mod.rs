// Code-synthesis analyst
//
// For quantitative questions, asks the generation model for a snippet in the
// restricted analysis language, sanitizes it, evaluates it against the
// dataset, and extracts the `result` binding. Every failure on this path is
// converted to "absent" (`None`); nothing propagates to the caller.

#[cfg(test)]
mod tests;

pub mod lang;

use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::pipeline::Completer;
use lang::{DATASET_BINDING, Interpreter, RESULT_BINDING, Value};

/// Render the analysis prompt: dataset schema, the restricted language
/// reference, and strict formatting instructions.
#[inline]
pub fn render_analysis_prompt(question: &str) -> String {
    format!(
        "You are a data analyst working with a table of machine service records.\n\
         The table has these columns: {schema}.\n\
         \n\
         Write a short analysis snippet that answers the question below. The snippet\n\
         must follow these rules exactly:\n\
         - Use only the mini-language described here; it is NOT Python.\n\
         - The table is available through the binding `{binding}`.\n\
         - Each line is an assignment: name = expression.\n\
         - Available table methods: count(), sum(col), mean(col), median(col),\n\
           min(col), max(col), most_common(col), count_distinct(col), distinct(col),\n\
           filter(col, value), filter_gt(col, number), filter_lt(col, number).\n\
         - Column names are quoted strings, e.g. {binding}.mean(\"Cost\").\n\
         - filter returns a table, so calls can be chained:\n\
           {binding}.filter(\"Problem_Type\", \"Leak\").count()\n\
         - Arithmetic between numbers is allowed: + - * /\n\
         - Assign the final answer to `{result}`.\n\
         - Output only the snippet. No markdown fences, no prose, no explanations.\n\
         \n\
         Question: {question}\n",
        schema = Dataset::schema_description(),
        binding = DATASET_BINDING,
        result = RESULT_BINDING,
        question = question,
    )
}

/// Strip markdown code fences and model thinking blocks from a raw
/// completion. Cosmetic cleanup only; safety comes from the interpreter.
#[inline]
pub fn sanitize_snippet(raw: &str) -> String {
    let mut text = raw.trim();

    // Some models prepend a <think>...</think> block despite instructions.
    if let Some(start) = text.find("<think>") {
        if let Some(end) = text.find("</think>") {
            if start < end {
                return sanitize_snippet(&format!(
                    "{}{}",
                    &text[..start],
                    &text[end + "</think>".len()..]
                ));
            }
        }
    }

    text = text.trim();

    let mut lines: Vec<&str> = text.lines().collect();
    if let Some(first) = lines.first() {
        if first.trim_start().starts_with("```") {
            lines.remove(0);
        }
    }
    if let Some(last) = lines.last() {
        if last.trim_start().starts_with("```") {
            lines.pop();
        }
    }

    lines.join("\n").trim().to_string()
}

/// Analyst over the restricted language. Stateless apart from its borrowed
/// completion service.
pub struct Analyst<'a> {
    completer: &'a dyn Completer,
}

impl<'a> Analyst<'a> {
    #[inline]
    pub fn new(completer: &'a dyn Completer) -> Self {
        Self { completer }
    }

    /// Run the synthesize-sanitize-execute cycle for one question.
    ///
    /// Returns `None` when the completion fails, the snippet does not parse
    /// or evaluate, or the snippet never binds `result`. The caller treats
    /// `None` as "try the next strategy".
    #[inline]
    pub fn analyze(&self, question: &str, dataset: &Dataset) -> Option<Value> {
        let prompt = render_analysis_prompt(question);

        let raw = match self.completer.complete(&prompt) {
            Ok(text) => text,
            Err(e) => {
                warn!("Completion service failed during analysis: {}", e);
                return None;
            }
        };

        let snippet = sanitize_snippet(&raw);
        if snippet.is_empty() {
            debug!("Model returned an empty analysis snippet");
            return None;
        }

        match Interpreter::new(dataset).run(&snippet) {
            Ok(Some(value)) => {
                debug!("Analysis snippet produced result: {}", value.render());
                Some(value)
            }
            Ok(None) => {
                debug!("Analysis snippet never bound '{}'", RESULT_BINDING);
                None
            }
            Err(e) => {
                debug!("Analysis snippet rejected: {} (snippet: {:?})", e, snippet);
                None
            }
        }
    }
}
