//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;

/// Registers `columns` as a single-batch in-memory table.
pub fn register(ctx: &SessionContext, name: &str, columns: Vec<(&str, ArrayRef)>) {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batch = RecordBatch::try_new(
        schema.clone(),
        columns.into_iter().map(|(_, array)| array).collect(),
    )
    .unwrap();
    let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table(name, Arc::new(table)).unwrap();
}

/// Table `t` with a single column `a = [1, 4, 6, 9, null]`.
pub fn five_rows() -> SessionContext {
    let ctx = SessionContext::new();
    register(
        &ctx,
        "t",
        vec![(
            "a",
            Arc::new(Int64Array::from(vec![Some(1), Some(4), Some(6), Some(9), None])) as ArrayRef,
        )],
    );
    ctx
}

/// Table `orders`, ten rows:
///
/// | order_id | region | amount | amount_net | status   | email       |
/// |----------|--------|--------|------------|----------|-------------|
/// | 1        | north  | 120    | 100        | open     | a@shop.io   |
/// | 2        | north  | 80     | 66         | closed   | b@shop.io   |
/// | 3        | south  | -5     | -4         | open     | null        |
/// | 4        | south  | 300    | 250        | pending  | c@shop.io   |
/// | 5        | east   | 45     | 37.5       | closed   | d@shop.io   |
/// | 6        | east   | null   | null       | open     | e@shop.io   |
/// | 7        | west   | 60     | 50         | refunded | f@shop.io   |
/// | 8        | west   | 15     | 12.5       | closed   | g@shop.io   |
/// | 9        | north  | 220    | 183        | open     | h@shop.io   |
/// | 10       | south  | 95     | 79         | closed   | not-an-email|
pub fn orders() -> SessionContext {
    let ctx = SessionContext::new();
    register(
        &ctx,
        "orders",
        vec![
            (
                "order_id",
                Arc::new(Int64Array::from((1..=10).collect::<Vec<i64>>())) as ArrayRef,
            ),
            (
                "region",
                Arc::new(StringArray::from(vec![
                    "north", "north", "south", "south", "east", "east", "west", "west", "north",
                    "south",
                ])),
            ),
            (
                "amount",
                Arc::new(Float64Array::from(vec![
                    Some(120.0),
                    Some(80.0),
                    Some(-5.0),
                    Some(300.0),
                    Some(45.0),
                    None,
                    Some(60.0),
                    Some(15.0),
                    Some(220.0),
                    Some(95.0),
                ])),
            ),
            (
                "amount_net",
                Arc::new(Float64Array::from(vec![
                    Some(100.0),
                    Some(66.0),
                    Some(-4.0),
                    Some(250.0),
                    Some(37.5),
                    None,
                    Some(50.0),
                    Some(12.5),
                    Some(183.0),
                    Some(79.0),
                ])),
            ),
            (
                "status",
                Arc::new(StringArray::from(vec![
                    "open", "closed", "open", "pending", "closed", "open", "refunded", "closed",
                    "open", "closed",
                ])),
            ),
            (
                "email",
                Arc::new(StringArray::from(vec![
                    Some("a@shop.io"),
                    Some("b@shop.io"),
                    None,
                    Some("c@shop.io"),
                    Some("d@shop.io"),
                    Some("e@shop.io"),
                    Some("f@shop.io"),
                    Some("g@shop.io"),
                    Some("h@shop.io"),
                    Some("not-an-email"),
                ])),
            ),
        ],
    );
    ctx
}
