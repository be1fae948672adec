use herald_storage::conformance::run_conformance_suite;
use herald_storage::{JsonFileStore, MemoryStore};

#[test]
fn memory_store_conformance() {
    let report = run_conformance_suite(MemoryStore::new);
    assert_eq!(report.failed, 0, "{report}");
    assert!(report.total > 0);
}

#[test]
fn json_file_store_conformance() {
    let dir = tempfile::tempdir().unwrap();
    let counter = std::cell::Cell::new(0u32);
    let report = run_conformance_suite(|| {
        counter.set(counter.get() + 1);
        let path = dir.path().join(format!("store-{}.json", counter.get()));
        JsonFileStore::open(path).unwrap()
    });
    assert_eq!(report.failed, 0, "{report}");
}
