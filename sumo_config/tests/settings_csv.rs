use std::fs;

use rstest::rstest;
use sumo_config::CsvSettingsStore;
use sumo_traits::SettingsStore;
use tempfile::tempdir;

#[rstest]
fn put_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("line.csv");

    let mut store = CsvSettingsStore::open(&path).unwrap();
    assert!(store.is_empty());
    store.put("0000 NO_LINE", 1384).unwrap();
    store.put("1111 OUTSIDE", 4096).unwrap();

    let reopened = CsvSettingsStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get("0000 NO_LINE"), Some(1384));
    assert_eq!(reopened.get("1111 OUTSIDE"), Some(4096));
    assert_eq!(reopened.get("0101 RIGHT"), None);
}

#[rstest]
fn keys_are_trimmed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("line.csv");
    fs::write(&path, "key,value\n0000 NO_LINE   ,1400\n").unwrap();
    let store = CsvSettingsStore::open(&path).unwrap();
    assert_eq!(store.get("0000 NO_LINE"), Some(1400));
}

#[rstest]
#[case("k,v\na,1\n", "headers")]
#[case("key,value\na,notanumber\n", "row 2")]
fn malformed_files_are_rejected(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, body).unwrap();
    let err = CsvSettingsStore::open(&path).unwrap_err();
    assert!(format!("{err}").contains(needle), "{err}");
}
