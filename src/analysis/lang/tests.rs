use super::*;
use crate::dataset::{Dataset, ServiceRecord};

fn record(problem: &str, status: &str, cost: f64, hours: f64) -> ServiceRecord {
    ServiceRecord {
        problem_type: problem.to_string(),
        service_status: status.to_string(),
        cost,
        hours,
        date: "2024-01-15".to_string(),
        machine_id: "M-001".to_string(),
    }
}

fn sample_dataset() -> Dataset {
    Dataset::from_records(vec![
        record("Leak", "Completed", 100.0, 2.0),
        record("Leak", "Pending", 50.0, 1.0),
        record("Overheat", "Completed", 250.0, 4.0),
        record("Vibration", "Completed", 75.5, 1.5),
    ])
}

fn run(source: &str) -> Result<Option<Value>, LangError> {
    let dataset = sample_dataset();
    Interpreter::new(&dataset).run(source)
}

#[test]
fn count_all_records() {
    let value = run("result = records.count()").expect("should evaluate");
    assert_eq!(value, Some(Value::Number(4.0)));
}

#[test]
fn numeric_aggregates() {
    assert_eq!(
        run("result = records.sum(\"Cost\")").expect("should evaluate"),
        Some(Value::Number(475.5))
    );
    assert_eq!(
        run("result = records.mean(\"Hours\")").expect("should evaluate"),
        Some(Value::Number(2.125))
    );
    assert_eq!(
        run("result = records.min(\"Cost\")").expect("should evaluate"),
        Some(Value::Number(50.0))
    );
    assert_eq!(
        run("result = records.max(\"Cost\")").expect("should evaluate"),
        Some(Value::Number(250.0))
    );
    assert_eq!(
        run("result = records.median(\"Cost\")").expect("should evaluate"),
        Some(Value::Number(87.75))
    );
}

#[test]
fn most_common_returns_modal_value() {
    let value = run("result = records.most_common(\"Problem_Type\")").expect("should evaluate");
    assert_eq!(value, Some(Value::Text("Leak".to_string())));
}

#[test]
fn most_common_tie_breaks_deterministically() {
    let dataset = Dataset::from_records(vec![
        record("Overheat", "Completed", 1.0, 1.0),
        record("Leak", "Completed", 1.0, 1.0),
    ]);
    let value = Interpreter::new(&dataset)
        .run("result = records.most_common(\"Problem_Type\")")
        .expect("should evaluate");
    assert_eq!(value, Some(Value::Text("Leak".to_string())));
}

#[test]
fn filter_then_aggregate() {
    let value = run("result = records.filter(\"Problem_Type\", \"Leak\").count()")
        .expect("should evaluate");
    assert_eq!(value, Some(Value::Number(2.0)));

    let value = run("result = records.filter(\"Service_Status\", \"completed\").sum(\"Cost\")")
        .expect("should evaluate");
    assert_eq!(value, Some(Value::Number(425.5)));
}

#[test]
fn filter_comparisons() {
    let value = run("result = records.filter_gt(\"Cost\", 80).count()").expect("should evaluate");
    assert_eq!(value, Some(Value::Number(2.0)));

    let value = run("result = records.filter_lt(\"Hours\", 2).count()").expect("should evaluate");
    assert_eq!(value, Some(Value::Number(2.0)));
}

#[test]
fn distinct_values() {
    assert_eq!(
        run("result = records.count_distinct(\"Problem_Type\")").expect("should evaluate"),
        Some(Value::Number(3.0))
    );
    assert_eq!(
        run("result = records.distinct(\"Problem_Type\")").expect("should evaluate"),
        Some(Value::List(vec![
            Value::Text("Leak".to_string()),
            Value::Text("Overheat".to_string()),
            Value::Text("Vibration".to_string()),
        ]))
    );
}

#[test]
fn intermediate_bindings_and_arithmetic() {
    let source = "total = records.sum(\"Cost\")\ncount = records.count()\nresult = total / count";
    let value = run(source).expect("should evaluate");
    assert_eq!(value, Some(Value::Number(118.875)));
}

#[test]
fn single_quotes_and_comments() {
    let source = "# average repair cost\nresult = records.mean('Cost')";
    let value = run(source).expect("should evaluate");
    assert_eq!(value, Some(Value::Number(118.875)));
}

#[test]
fn missing_result_binding_is_none() {
    let value = run("answer = records.count()").expect("should evaluate");
    assert_eq!(value, None);
}

#[test]
fn unknown_column_is_an_error() {
    assert_eq!(
        run("result = records.sum(\"Price\")"),
        Err(LangError::UnknownColumn("Price".to_string()))
    );
}

#[test]
fn textual_column_rejects_numeric_aggregate() {
    assert_eq!(
        run("result = records.sum(\"Problem_Type\")"),
        Err(LangError::NotNumericColumn("Problem_Type".to_string()))
    );
}

#[test]
fn unknown_variable_is_an_error() {
    assert_eq!(
        run("result = df.count()"),
        Err(LangError::UnknownVariable("df".to_string()))
    );
}

#[test]
fn unknown_method_is_an_error() {
    assert_eq!(
        run("result = records.pivot(\"Cost\")"),
        Err(LangError::UnknownMethod("pivot".to_string()))
    );
}

#[test]
fn prose_fails_to_parse() {
    assert!(run("The answer is 42").is_err());
}

#[test]
fn division_by_zero_is_an_error() {
    assert_eq!(run("result = 1 / 0"), Err(LangError::DivisionByZero));
}

#[test]
fn aggregates_over_empty_dataset_error_instead_of_panicking() {
    let dataset = Dataset::from_records(Vec::new());
    let interpreter = Interpreter::new(&dataset);

    assert_eq!(
        interpreter.run("result = records.mean(\"Cost\")"),
        Err(LangError::EmptyAggregate)
    );
    assert_eq!(
        interpreter.run("result = records.count()").expect("count"),
        Some(Value::Number(0.0))
    );
}

#[test]
fn statement_cap_is_enforced() {
    let source = (0..=MAX_STATEMENTS)
        .map(|i| format!("x{} = {}", i, i))
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(run(&source), Err(LangError::TooManyStatements));
}

#[test]
fn rebinding_records_cannot_mutate_the_dataset() {
    let dataset = sample_dataset();
    let interpreter = Interpreter::new(&dataset);

    let value = interpreter
        .run("records = records.filter(\"Problem_Type\", \"Leak\")\nresult = records.count()")
        .expect("should evaluate");
    assert_eq!(value, Some(Value::Number(2.0)));

    // Shadowing is scoped to the snippet; the dataset itself is untouched.
    assert_eq!(dataset.row_count(), 4);
}

#[test]
fn render_formats_values() {
    assert_eq!(Value::Number(500.0).render(), "500");
    assert_eq!(Value::Number(123.456).render(), "123.46");
    assert_eq!(Value::Text("Leak".to_string()).render(), "Leak");
    assert_eq!(
        Value::List(vec![
            Value::Text("Leak".to_string()),
            Value::Text("Overheat".to_string())
        ])
        .render(),
        "Leak, Overheat"
    );
}
