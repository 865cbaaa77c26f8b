//! End-to-end interrogations against in-memory tables.

mod common;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use std::sync::{Arc, Mutex};
use term_interrogate::checks::{SchemaMatchOptions, SchemaSpec};
use term_interrogate::core::{
    ActionEvent, Actions, AuthoredStep, FinalActions, InterrogateOptions, Operand, Severity,
    StepStatus, Thresholds, ValidationPlan,
};
use term_interrogate::error::TermError;
use term_interrogate::selectors::{ColumnSelector, SegmentSpec};

fn outline(results: &term_interrogate::core::ResultModel) -> Vec<(usize, StepStatus, u64, u64, Severity)> {
    results
        .steps()
        .iter()
        .map(|s| (s.index, s.status, s.total, s.failed, s.severity))
        .collect()
}

#[tokio::test]
async fn test_columns_times_segments_are_numbered_contiguously() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("orders")
        .step(
            AuthoredStep::col_vals_gt(ColumnSelector::starts_with("amount"), 0)
                .segments(SegmentSpec::column("region")),
        )
        .step(AuthoredStep::col_vals_not_null("order_id"))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();

    // two columns by four regions, then the literal step
    assert_eq!(results.len(), 9);
    let indices: Vec<usize> = results.steps().iter().map(|s| s.index).collect();
    assert_eq!(indices, (1..=9).collect::<Vec<_>>());

    let layout: Vec<(&str, &str)> = results.steps()[..8]
        .iter()
        .map(|s| (s.columns[0].as_str(), s.segment.as_deref().unwrap()))
        .collect();
    assert_eq!(
        layout,
        vec![
            ("amount", "region/east"),
            ("amount", "region/north"),
            ("amount", "region/south"),
            ("amount", "region/west"),
            ("amount_net", "region/east"),
            ("amount_net", "region/north"),
            ("amount_net", "region/south"),
            ("amount_net", "region/west"),
        ]
    );
    assert!(results.steps()[..8].iter().all(|s| s.authored_index == 1));
    assert_eq!(results.step(9).unwrap().authored_index, 2);

    // east holds a null amount, south a negative one
    let east = results.step(1).unwrap();
    assert_eq!((east.total, east.failed), (2, 1));
    let north = results.step(2).unwrap();
    assert_eq!((north.total, north.failed), (3, 0));
    let south = results.step(3).unwrap();
    assert_eq!((south.total, south.failed), (3, 1));

    // segment sizes add up to the table
    let covered: u64 = results.steps()[..4].iter().map(|s| s.total).sum();
    assert_eq!(covered, 10);
}

#[tokio::test]
async fn test_five_row_scenario_reaches_critical() {
    let ctx = common::five_rows();
    let plan = ValidationPlan::builder("t")
        .thresholds(
            Thresholds::builder()
                .warning(0.1)
                .error(0.3)
                .critical(0.5)
                .build()
                .unwrap(),
        )
        .step(AuthoredStep::col_vals_gt("a", 5))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    let step = results.step(1).unwrap();

    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.total, 5);
    assert_eq!(step.passed, 2);
    assert_eq!(step.failed, 3);
    assert!((step.fraction_failed - 0.6).abs() < 1e-9);
    assert_eq!(step.severity, Severity::Critical);
    assert_eq!(results.highest_severity(), Severity::Critical);
    assert_eq!(results.exit_code(Severity::Error), 1);
}

#[tokio::test]
async fn test_single_negative_value_is_a_warning() {
    let ctx = datafusion::prelude::SessionContext::new();
    common::register(
        &ctx,
        "readings",
        vec![(
            "value",
            Arc::new(Int64Array::from(vec![10, 20, -3, 40, 5])) as ArrayRef,
        )],
    );
    let plan = ValidationPlan::builder("readings")
        .thresholds(
            Thresholds::builder()
                .warning(0.1)
                .error(0.3)
                .critical(0.5)
                .build()
                .unwrap(),
        )
        .step(AuthoredStep::col_vals_gt("value", 0))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    let step = results.step(1).unwrap();

    assert_eq!(step.total, 5);
    assert_eq!(step.failed, 1);
    assert!((step.fraction_failed - 0.2).abs() < 1e-9);
    assert_eq!(step.severity, Severity::Warning);
    assert_eq!(results.exit_code(Severity::Error), 0);
    assert_eq!(results.exit_code(Severity::Warning), 1);

    let extract = results.extract(1).unwrap().unwrap();
    assert_eq!(extract.num_rows(), 1);
}

#[tokio::test]
async fn test_na_pass_turns_nulls_into_passing_units() {
    let ctx = common::five_rows();
    let plan = ValidationPlan::builder("t")
        .step(AuthoredStep::col_vals_gt("a", 5).na_pass(true))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    assert_eq!(results.step(1).unwrap().failed, 2);
}

#[test]
fn test_decreasing_thresholds_are_rejected() {
    let err = Thresholds::builder()
        .warning(0.5)
        .error(0.1)
        .build()
        .unwrap_err();
    assert!(matches!(err, TermError::Configuration(_)));

    let err = Thresholds::builder()
        .error(10u64)
        .critical(2u64)
        .build()
        .unwrap_err();
    assert!(matches!(err, TermError::Configuration(_)));
}

#[tokio::test]
async fn test_zero_column_selector_yields_one_empty_step() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("orders")
        .thresholds(Thresholds::builder().warning(1u64).build().unwrap())
        .step(AuthoredStep::col_vals_not_null(ColumnSelector::starts_with("zzz")))
        .step(AuthoredStep::col_vals_not_null("order_id"))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();

    assert_eq!(results.len(), 2);
    let empty = results.step(1).unwrap();
    assert_eq!(empty.status, StepStatus::Empty);
    assert_eq!(empty.total, 0);
    assert_eq!(empty.severity, Severity::None);

    let next = results.step(2).unwrap();
    assert_eq!(next.index, 2);
    assert_eq!(next.status, StepStatus::Passed);
    assert_eq!(next.total, 10);
}

#[tokio::test]
async fn test_zero_column_subset_for_row_checks_is_empty() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("orders")
        .step(AuthoredStep::rows_distinct().columns(ColumnSelector::starts_with("zzz")))
        .step(AuthoredStep::rows_complete().columns(ColumnSelector::starts_with("zzz")))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    assert_eq!(results.len(), 2);
    for step in results.steps() {
        assert_eq!(step.status, StepStatus::Empty);
        assert!(step.error.is_none());
        assert_eq!(step.total, 0);
        assert_eq!(step.note.as_deref(), Some("Column selection matched no columns"));
    }

    let parsed: serde_json::Value = serde_json::from_str(&results.to_json().unwrap()).unwrap();
    assert_eq!(
        parsed["steps"][0]["note"],
        "Column selection matched no columns"
    );
}

#[tokio::test]
async fn test_interrogation_is_repeatable() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("orders")
        .thresholds(Thresholds::builder().warning(1u64).error(0.25).build().unwrap())
        .step(
            AuthoredStep::col_vals_between(ColumnSelector::starts_with("amount"), 0, 250)
                .segments(SegmentSpec::column("region")),
        )
        .step(AuthoredStep::col_vals_in_set("status", ["open", "closed", "pending"]))
        .step(AuthoredStep::rows_distinct().columns("region"))
        .build()
        .unwrap();

    let first = plan.interrogate(&ctx).await.unwrap();
    let second = plan.interrogate(&ctx).await.unwrap();
    assert_eq!(outline(&first), outline(&second));

    // the table is left untouched
    let rows = ctx.table("orders").await.unwrap().count().await.unwrap();
    assert_eq!(rows, 10);
}

#[tokio::test]
async fn test_absent_segment_value_has_no_units() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("orders")
        .thresholds(Thresholds::builder().warning(1u64).build().unwrap())
        .step(
            AuthoredStep::col_vals_gt("amount", 0)
                .segments(SegmentSpec::values("region", ["north", "Atlantis"])),
        )
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    assert_eq!(results.len(), 2);

    let north = results.step(1).unwrap();
    assert_eq!(north.status, StepStatus::Passed);
    assert_eq!(north.total, 3);

    let absent = results.step(2).unwrap();
    assert!(absent.segment.as_deref().unwrap().ends_with("Atlantis"));
    assert_eq!(absent.total, 0);
    assert_eq!(absent.failed, 0);
    assert_eq!(absent.severity, Severity::None);
}

#[tokio::test]
async fn test_rows_distinct_counts_every_duplicated_row() {
    let ctx = datafusion::prelude::SessionContext::new();
    common::register(
        &ctx,
        "pairs",
        vec![
            (
                "k",
                Arc::new(StringArray::from(vec!["a", "a", "b"])) as ArrayRef,
            ),
            ("v", Arc::new(Int64Array::from(vec![1, 1, 2]))),
        ],
    );

    let plan = ValidationPlan::builder("pairs")
        .step(AuthoredStep::rows_distinct())
        .build()
        .unwrap();
    let results = plan.interrogate(&ctx).await.unwrap();

    assert_eq!(results.len(), 1);
    let step = results.step(1).unwrap();
    assert_eq!(step.columns, vec!["k", "v"]);
    assert_eq!(step.total, 3);
    assert_eq!(step.failed, 2);
    assert_eq!(step.status, StepStatus::Failed);
}

#[tokio::test]
async fn test_schema_match_reports_missing_column() {
    let ctx = common::orders();
    let schema = SchemaSpec::new()
        .column("order_id", "Int64")
        .column("region", "Utf8")
        .any_type("customer_id");
    let plan = ValidationPlan::builder("orders")
        .step(AuthoredStep::col_schema_match(schema, SchemaMatchOptions::lenient()))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    let step = results.step(1).unwrap();

    assert_eq!(step.total, 1);
    assert_eq!(step.failed, 1);
    assert_eq!(step.status, StepStatus::Failed);
    let diff = step.schema_diff.as_ref().unwrap();
    assert_eq!(diff.missing, vec!["customer_id".to_string()]);
    assert!(diff.type_mismatches.is_empty());
}

#[tokio::test]
async fn test_schema_match_accepts_equivalent_types() {
    let ctx = common::orders();
    let plan = ValidationPlan::from_json(
        r#"{
            "table": "orders",
            "steps": [
                {"check": "col_schema_match",
                 "schema": {"columns": [
                     {"name": "order_id", "dtype": ["Int32", "Int64"]},
                     {"name": "amount", "dtype": ["Float32", "Float64"]},
                     {"name": "status", "dtype": ["LargeUtf8", "Utf8View"]}
                 ]},
                 "options": {"complete": false}}
            ]
        }"#,
    )
    .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    let step = results.step(1).unwrap();
    assert_eq!(step.failed, 1);

    let diff = step.schema_diff.as_ref().unwrap();
    assert_eq!(diff.type_mismatches.len(), 1);
    assert_eq!(diff.type_mismatches[0].column, "status");
    assert_eq!(diff.type_mismatches[0].expected.names(), ["LargeUtf8", "Utf8View"]);
}

#[tokio::test]
async fn test_value_checks_against_orders() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("orders")
        .step(AuthoredStep::col_vals_regex("email", "^[^@]+@[^@]+$"))
        .step(AuthoredStep::col_vals_regex("email", "^[^@]+@[^@]+$").na_pass(true))
        .step(AuthoredStep::col_vals_in_set("status", ["open", "closed", "pending"]))
        .step(AuthoredStep::col_vals_between("amount", 0, 250))
        .step(AuthoredStep::col_vals_ge("amount", Operand::column("amount_net")))
        .step(AuthoredStep::conjointly(["amount > 0", "amount_net < amount"]))
        .step(AuthoredStep::col_exists(vec!["order_id", "customer_id"]))
        .step(AuthoredStep::row_count_match(10))
        .step(AuthoredStep::col_count_match(6))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    let failed: Vec<u64> = results.steps().iter().map(|s| s.failed).collect();

    // regex: null and "not-an-email"; with na_pass only the latter
    // between: -5, 300 and null; ge: -5 < -4 and null
    assert_eq!(failed, vec![2, 1, 1, 3, 2, 2, 0, 1, 0, 0]);

    let exists = results.step(8).unwrap();
    assert_eq!(exists.columns, vec!["customer_id"]);
    assert_eq!(exists.status, StepStatus::Failed);
    assert_eq!(results.step(9).unwrap().status, StepStatus::Passed);
}

#[tokio::test]
async fn test_preprocessing_validates_a_derived_table() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("orders")
        .step(
            AuthoredStep::col_vals_gt("amount_usd", 0)
                .pre_sql("SELECT *, amount * 1.1 AS amount_usd FROM {tbl}"),
        )
        .step(AuthoredStep::col_vals_not_null("order_id").pre(|df| {
            df.filter(datafusion::prelude::col("region").eq(datafusion::prelude::lit("west")))
        }))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();

    let derived = results.step(1).unwrap();
    assert_eq!(derived.status, StepStatus::Failed);
    assert_eq!(derived.failed, 2);

    let filtered = results.step(2).unwrap();
    assert_eq!(filtered.total, 2);
    assert_eq!(filtered.status, StepStatus::Passed);

    // derived views do not outlive the interrogation
    assert!(ctx.table("orders__pre_1").await.is_err());
    assert!(ctx.table("orders__pre_2").await.is_err());
}

#[tokio::test]
async fn test_preprocessing_queries_are_read_only() {
    let ctx = common::five_rows();
    let plan = ValidationPlan::builder("t")
        .step(AuthoredStep::col_vals_gt("a", 0).pre_sql("DROP TABLE {tbl}"))
        .step(AuthoredStep::col_vals_gt("a", 0))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();

    assert_eq!(results.step(1).unwrap().status, StepStatus::Error);
    let next = results.step(2).unwrap();
    assert_eq!(next.status, StepStatus::Failed);
    assert_eq!((next.total, next.failed), (5, 1));
    assert!(ctx.table("t").await.is_ok());
}

#[tokio::test]
async fn test_broken_steps_do_not_stop_the_interrogation() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("orders")
        .step(AuthoredStep::col_vals_gt("missing_column", 0))
        .step(AuthoredStep::col_vals_expr("amount >"))
        .step(AuthoredStep::col_vals_not_null("order_id"))
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results.step(1).unwrap().status, StepStatus::Error);
    assert!(results.step(1).unwrap().error.is_some());
    assert_eq!(results.step(2).unwrap().status, StepStatus::Error);
    assert_eq!(results.step(3).unwrap().status, StepStatus::Passed);
    assert_eq!(results.summary().error_steps, 2);
    assert_eq!(results.exit_code(Severity::None), 1);
}

#[tokio::test]
async fn test_missing_table_fails_the_whole_interrogation() {
    let ctx = common::orders();
    let plan = ValidationPlan::builder("customers")
        .step(AuthoredStep::col_vals_not_null("id"))
        .build()
        .unwrap();

    let err = plan.interrogate(&ctx).await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_actions_fire_in_step_order() {
    let ctx = common::orders();
    let events: Arc<Mutex<Vec<ActionEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let summaries = Arc::new(Mutex::new(Vec::new()));
    let summary_sink = summaries.clone();

    let plan = ValidationPlan::builder("orders")
        .thresholds(Thresholds::builder().warning(1u64).build().unwrap())
        .actions(
            Actions::new()
                .warning("{type} on {col} at {seg} needs a look")
                .on_trigger(move |event| sink.lock().unwrap().push(event.clone())),
        )
        .final_actions(FinalActions::new().add(move |summary| {
            summary_sink
                .lock()
                .unwrap()
                .push((summary.total_steps, summary.failed_steps));
        }))
        .options(InterrogateOptions::new().with_concurrency(4))
        .step(
            AuthoredStep::col_vals_gt("amount", 0).segments(SegmentSpec::column("region")),
        )
        .build()
        .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();

    let events = events.lock().unwrap();
    let fired: Vec<usize> = events.iter().map(|e| e.step).collect();
    assert_eq!(fired, vec![1, 3]);
    assert_eq!(events[0].message, "col_vals_gt on amount at region/east needs a look");
    assert_eq!(
        results.step(1).unwrap().actions_triggered,
        vec!["col_vals_gt on amount at region/east needs a look".to_string()]
    );
    assert_eq!(*summaries.lock().unwrap(), vec![(4, 2)]);
}

#[tokio::test]
async fn test_concurrency_does_not_change_results() {
    let ctx = common::orders();
    let steps = || {
        vec![
            AuthoredStep::col_vals_not_null(ColumnSelector::Everything)
                .segments(SegmentSpec::column("region")),
            AuthoredStep::rows_complete(),
            AuthoredStep::col_vals_le(ColumnSelector::Numeric, 250),
        ]
    };

    let sequential = ValidationPlan::builder("orders")
        .steps(steps())
        .build()
        .unwrap()
        .interrogate(&ctx)
        .await
        .unwrap();
    let parallel = ValidationPlan::builder("orders")
        .steps(steps())
        .options(InterrogateOptions::new().with_concurrency(8))
        .build()
        .unwrap()
        .interrogate(&ctx)
        .await
        .unwrap();

    assert_eq!(sequential.len(), 6 * 4 + 1 + 3);
    assert_eq!(outline(&sequential), outline(&parallel));
}

#[tokio::test]
async fn test_plan_from_json() {
    let ctx = common::orders();
    let plan = ValidationPlan::from_json(
        r#"{
            "table": "orders",
            "label": "Nightly orders",
            "thresholds": {"warning": 1, "error": 0.2},
            "steps": [
                {"check": "col_vals_gt", "columns": {"starts_with": "amount"}, "value": 0,
                 "segments": "region"},
                {"check": "col_vals_in_set", "columns": "status",
                 "set": ["open", "closed", "pending"], "brief": "{col} is a known status"},
                {"check": "col_vals_not_null", "columns": "email", "active": false}
            ]
        }"#,
    )
    .unwrap();

    let results = plan.interrogate(&ctx).await.unwrap();
    assert_eq!(results.summary().label.as_deref(), Some("Nightly orders"));
    assert_eq!(results.len(), 10);

    let status = results.step(9).unwrap();
    assert_eq!(status.brief.as_deref(), Some("status is a known status"));
    assert_eq!(status.severity, Severity::Warning);

    assert_eq!(results.step(10).unwrap().status, StepStatus::Inactive);
    assert_eq!(results.summary().inactive_steps, 1);

    let json: serde_json::Value = serde_json::from_str(&results.to_json().unwrap()).unwrap();
    assert_eq!(json["steps"].as_array().unwrap().len(), 10);
    assert_eq!(json["passed"], false);
}

#[test]
fn test_invalid_json_plan_is_a_configuration_error() {
    let err = ValidationPlan::from_json(r#"{"table": "orders", "steps": [{"check": "nope"}]}"#)
        .unwrap_err();
    assert!(matches!(err, TermError::Configuration(_)));

    let err = ValidationPlan::from_json(
        r#"{"table": "orders", "thresholds": {"warning": 0.5, "error": 0.1}, "steps": []}"#,
    )
    .unwrap_err();
    assert!(matches!(err, TermError::Configuration(_)));
}
