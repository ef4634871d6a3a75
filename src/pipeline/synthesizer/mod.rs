// Answer synthesizer
// Two pure prompt renderers plus thin delegation to the completion service.
// No retrieval and no computation happens here.


use itertools::Itertools;

use crate::analysis::lang::Value;
use crate::database::RecordDocument;

use super::Completer;

/// Render the grounded-answer prompt over retrieved records.
#[inline]
pub fn render_grounded_prompt(question: &str, documents: &[RecordDocument]) -> String {
    let records = documents.iter().map(|doc| doc.content.as_str()).join("\n");

    format!(
        "You are an expert assistant for answering questions about machine maintenance and \
         service records.\n\
         \n\
         Here are some relevant machine service records:\n\
         {records}\n\
         \n\
         Please answer the following question using only the information from the records \
         above. If the answer is not present, say so clearly. Cite specific fields from the \
         records where possible.\n\
         \n\
         Question: {question}\n",
        records = records,
        question = question,
    )
}

/// Render the result-explanation prompt over an analyst result.
#[inline]
pub fn render_explanation_prompt(question: &str, result: &Value) -> String {
    format!(
        "A question about machine service records was answered by computing a value from \
         the data.\n\
         \n\
         Question: {question}\n\
         Computed value: {value}\n\
         \n\
         Explain what this value means in the context of the question and phrase it as a \
         complete answer, not a bare value. Do not invent any information beyond the \
         computed value.\n",
        question = question,
        value = result.render(),
    )
}

/// Grounded-answer mode: retrieved records plus the question.
#[inline]
pub fn grounded_answer(
    completer: &dyn Completer,
    question: &str,
    documents: &[RecordDocument],
) -> anyhow::Result<String> {
    completer.complete(&render_grounded_prompt(question, documents))
}

/// Result-explanation mode: the question plus the stringified analyst result.
#[inline]
pub fn explain_result(
    completer: &dyn Completer,
    question: &str,
    result: &Value,
) -> anyhow::Result<String> {
    completer.complete(&render_explanation_prompt(question, result))
}
