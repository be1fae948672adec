use serde_json::json;

use super::{check, TestResult};
use crate::KeyValueStore;

pub(super) fn run_basic_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: KeyValueStore,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result("basic", "get_missing_is_none", get_missing_is_none(factory())),
        TestResult::from_result("basic", "put_then_get", put_then_get(factory())),
        TestResult::from_result("basic", "put_overwrites", put_overwrites(factory())),
        TestResult::from_result("basic", "remove_deletes", remove_deletes(factory())),
        TestResult::from_result(
            "basic",
            "remove_missing_is_ok",
            remove_missing_is_ok(factory()),
        ),
        TestResult::from_result("basic", "keys_are_sorted", keys_are_sorted(factory())),
    ]
}

fn get_missing_is_none(store: impl KeyValueStore) -> Result<(), String> {
    let got = store.get("absent").map_err(|e| e.to_string())?;
    check(got.is_none(), format!("expected None, got {:?}", got))
}

fn put_then_get(store: impl KeyValueStore) -> Result<(), String> {
    let value = json!({"count": 3, "nested": {"ok": true}});
    store.put("k", value.clone()).map_err(|e| e.to_string())?;
    let got = store.get("k").map_err(|e| e.to_string())?;
    check(got == Some(value), format!("unexpected value {:?}", got))
}

fn put_overwrites(store: impl KeyValueStore) -> Result<(), String> {
    store.put("k", json!(1)).map_err(|e| e.to_string())?;
    store.put("k", json!(2)).map_err(|e| e.to_string())?;
    let got = store.get("k").map_err(|e| e.to_string())?;
    check(got == Some(json!(2)), format!("expected 2, got {:?}", got))
}

fn remove_deletes(store: impl KeyValueStore) -> Result<(), String> {
    store.put("k", json!("v")).map_err(|e| e.to_string())?;
    store.remove("k").map_err(|e| e.to_string())?;
    let got = store.get("k").map_err(|e| e.to_string())?;
    check(got.is_none(), format!("expected None after remove, got {:?}", got))
}

fn remove_missing_is_ok(store: impl KeyValueStore) -> Result<(), String> {
    store.remove("never-written").map_err(|e| e.to_string())
}

fn keys_are_sorted(store: impl KeyValueStore) -> Result<(), String> {
    for key in ["b", "a", "c"] {
        store.put(key, json!(null)).map_err(|e| e.to_string())?;
    }
    let keys = store.keys().map_err(|e| e.to_string())?;
    check(keys == ["a", "b", "c"], format!("unexpected keys {:?}", keys))
}
