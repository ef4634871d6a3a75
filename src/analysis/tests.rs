use super::*;
use crate::dataset::{Dataset, ServiceRecord};

struct FixedCompleter(&'static str);

impl Completer for FixedCompleter {
    fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

struct FailingCompleter;

impl Completer for FailingCompleter {
    fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

fn record(problem: &str, cost: f64) -> ServiceRecord {
    ServiceRecord {
        problem_type: problem.to_string(),
        service_status: "Completed".to_string(),
        cost,
        hours: 1.0,
        date: "2024-01-15".to_string(),
        machine_id: "M-001".to_string(),
    }
}

fn sample_dataset() -> Dataset {
    Dataset::from_records(vec![
        record("Leak", 100.0),
        record("Leak", 50.0),
        record("Overheat", 250.0),
    ])
}

#[test]
fn prompt_embeds_schema_question_and_contract() {
    let prompt = render_analysis_prompt("what is the average cost?");

    assert!(prompt.contains("Problem_Type (categorical)"));
    assert!(prompt.contains("Cost (numeric)"));
    assert!(prompt.contains("what is the average cost?"));
    assert!(prompt.contains(DATASET_BINDING));
    assert!(prompt.contains(RESULT_BINDING));
    assert!(prompt.contains("No markdown fences"));
}

#[test]
fn sanitize_strips_code_fences() {
    let raw = "```\nresult = records.count()\n```";
    assert_eq!(sanitize_snippet(raw), "result = records.count()");

    let tagged = "```python\nresult = records.count()\n```";
    assert_eq!(sanitize_snippet(tagged), "result = records.count()");
}

#[test]
fn sanitize_strips_thinking_blocks() {
    let raw = "<think>\nI should count the rows.\n</think>\nresult = records.count()";
    assert_eq!(sanitize_snippet(raw), "result = records.count()");
}

#[test]
fn sanitize_leaves_clean_snippets_alone() {
    let raw = "total = records.sum(\"Cost\")\nresult = total";
    assert_eq!(sanitize_snippet(raw), raw);
}

#[test]
fn analyze_extracts_result_value() {
    let completer = FixedCompleter("result = records.mean(\"Cost\")");
    let dataset = sample_dataset();

    let value = Analyst::new(&completer).analyze("average cost?", &dataset);
    assert_eq!(value, Some(Value::Number(400.0 / 3.0)));
}

#[test]
fn analyze_handles_fenced_output() {
    let completer = FixedCompleter("```\nresult = records.count()\n```");
    let dataset = sample_dataset();

    let value = Analyst::new(&completer).analyze("how many records?", &dataset);
    assert_eq!(value, Some(Value::Number(3.0)));
}

#[test]
fn failing_snippet_is_absent_not_error() {
    // Undefined variable: evaluation fails inside the interpreter.
    let completer = FixedCompleter("result = df.groupby(\"x\")");
    let dataset = sample_dataset();

    assert_eq!(
        Analyst::new(&completer).analyze("how many?", &dataset),
        None
    );
}

#[test]
fn prose_response_is_absent() {
    let completer = FixedCompleter("Sure! The answer is 3 records.");
    let dataset = sample_dataset();

    assert_eq!(
        Analyst::new(&completer).analyze("how many?", &dataset),
        None
    );
}

#[test]
fn missing_result_binding_is_absent() {
    let completer = FixedCompleter("answer = records.count()");
    let dataset = sample_dataset();

    assert_eq!(
        Analyst::new(&completer).analyze("how many?", &dataset),
        None
    );
}

#[test]
fn completion_failure_is_absent() {
    let dataset = sample_dataset();

    assert_eq!(
        Analyst::new(&FailingCompleter).analyze("how many?", &dataset),
        None
    );
}

#[test]
fn empty_completion_is_absent() {
    let completer = FixedCompleter("   \n  ");
    let dataset = sample_dataset();

    assert_eq!(
        Analyst::new(&completer).analyze("how many?", &dataset),
        None
    );
}
