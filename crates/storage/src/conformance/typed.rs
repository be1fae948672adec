use std::collections::BTreeMap;

use serde_json::json;

use super::{check, TestResult};
use crate::{load, save, KeyValueStore, StorageError};

pub(super) fn run_typed_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: KeyValueStore,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result("typed", "save_then_load", save_then_load(factory())),
        TestResult::from_result("typed", "load_missing_is_none", load_missing_is_none(factory())),
        TestResult::from_result(
            "typed",
            "load_wrong_shape_is_serialization_error",
            load_wrong_shape_is_serialization_error(factory()),
        ),
    ]
}

fn save_then_load(store: impl KeyValueStore) -> Result<(), String> {
    let mut map = BTreeMap::new();
    map.insert("a".to_string(), 1_i64);
    map.insert("b".to_string(), 2_i64);
    save(&store, "map", &map).map_err(|e| e.to_string())?;
    let back: Option<BTreeMap<String, i64>> = load(&store, "map").map_err(|e| e.to_string())?;
    check(back == Some(map), format!("round trip mismatch: {:?}", back))
}

fn load_missing_is_none(store: impl KeyValueStore) -> Result<(), String> {
    let back: Option<u64> = load(&store, "missing").map_err(|e| e.to_string())?;
    check(back.is_none(), "expected None")
}

fn load_wrong_shape_is_serialization_error(store: impl KeyValueStore) -> Result<(), String> {
    store.put("n", json!("text")).map_err(|e| e.to_string())?;
    match load::<u64>(&store, "n") {
        Err(StorageError::Serialization { key, .. }) => {
            check(key == "n", format!("error names key '{}'", key))
        }
        other => Err(format!("expected Serialization error, got {:?}", other)),
    }
}
