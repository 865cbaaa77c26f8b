//! Shared fixtures for unit tests.

use crate::core::{Constraint, Tally, ValidationContext, CURRENT_CONTEXT};
use crate::error::Result;
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

/// Evaluates a check against `table_name` without a segment.
pub async fn evaluate_with_context(
    constraint: &dyn Constraint,
    ctx: &SessionContext,
    table_name: &str,
) -> Result<Tally> {
    let validation_ctx = ValidationContext::new(table_name);
    CURRENT_CONTEXT
        .scope(validation_ctx, constraint.evaluate(ctx))
        .await
}

/// Table `numbers`:
///
/// | a    | b  | label |
/// |------|----|-------|
/// | 1    | 0  | x     |
/// | 4    | 5  | y     |
/// | 6    | 5  | z     |
/// | 9    | 10 | x     |
/// | null | 1  | null  |
pub async fn numbers_context() -> SessionContext {
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Int64, true),
        Field::new("b", DataType::Int64, true),
        Field::new("label", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![Some(1), Some(4), Some(6), Some(9), None])),
            Arc::new(Int64Array::from(vec![0, 5, 5, 10, 1])),
            Arc::new(StringArray::from(vec![
                Some("x"),
                Some("y"),
                Some("z"),
                Some("x"),
                None,
            ])),
        ],
    )
    .unwrap();

    register(schema, batch, "numbers")
}

/// Table `sales` with eight orders across three regions and two channels.
///
/// `(north, online)` and `(south, store)` each occur twice; every other
/// region/channel pair occurs once.
pub async fn sales_context() -> SessionContext {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new("region", DataType::Utf8, false),
        Field::new("channel", DataType::Utf8, false),
        Field::new("amount", DataType::Float64, false),
        Field::new("quantity", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6, 7, 8])),
            Arc::new(StringArray::from(vec![
                "north", "north", "north", "south", "south", "east", "east", "south",
            ])),
            Arc::new(StringArray::from(vec![
                "online", "online", "store", "store", "store", "online", "store", "online",
            ])),
            Arc::new(Float64Array::from(vec![
                100.0, 250.0, 75.0, 40.0, 310.0, 55.0, 120.0, 90.0,
            ])),
            Arc::new(Int64Array::from(vec![1, 3, 1, 2, 6, 1, 2, 1])),
        ],
    )
    .unwrap();

    register(schema, batch, "sales")
}

fn register(schema: Arc<Schema>, batch: RecordBatch, name: &str) -> SessionContext {
    let ctx = SessionContext::new();
    let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table(name, Arc::new(table)).unwrap();
    ctx
}
