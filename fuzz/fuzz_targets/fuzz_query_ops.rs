#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modelite_core::{Backend, ModelRef, Query, Record};
use modelite_embedded::{EmbeddedBackend, EmbeddedConfig};
use std::sync::Arc;

#[derive(Arbitrary, Debug)]
enum QueryOp {
    Insert { score: i64, label: String },
    Filter { token: String, score: i64 },
    Update { token: String, score: i64 },
    Delete { token: String, score: i64 },
    Page { offset: u8, limit: u8 },
}

fuzz_target!(|ops: Vec<QueryOp>| {
    let backend = Arc::new(EmbeddedBackend::new(
        EmbeddedConfig::in_memory().with_auto_create(true),
    ));
    let model = ModelRef::new("Item");
    if backend.ensure_model(model.name()).is_err() {
        return;
    }
    let query = Query::new(model.clone(), backend.clone());

    for op in ops.iter().take(64) {
        match op {
            QueryOp::Insert { score, label } => {
                let record = Record::new().with("score", *score).with("label", label.as_str());
                let _ = backend.add(&model, record);
            }
            QueryOp::Filter { token, score } => {
                if let Ok(q) = query.filter_by([(token.as_str(), *score)]) {
                    let total = q.count().unwrap_or(0);
                    let rows = q.all().map(|rows| rows.len()).unwrap_or(0);
                    assert_eq!(total, rows);
                }
            }
            QueryOp::Update { token, score } => {
                let _ = query.update([(token.as_str(), *score)]);
            }
            QueryOp::Delete { token, score } => {
                if let Ok(q) = query.filter_by([(token.as_str(), *score)]) {
                    let _ = q.delete();
                }
            }
            QueryOp::Page { offset, limit } => {
                let total = query.count().unwrap_or(0);
                let page = query
                    .offset(*offset as usize)
                    .limit(*limit as usize)
                    .all()
                    .map(|rows| rows.len())
                    .unwrap_or(0);
                assert!(page <= *limit as usize);
                assert!(page <= total.saturating_sub(*offset as usize));
            }
        }
    }
});
