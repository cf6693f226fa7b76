use std::fs;

use harvester_core::UrlStatus;
use harvester_engine::{
    ensure_output_dir, AtomicFileWriter, DataDir, EMAILS_TABLE, LINKS_TABLE, VALID_TABLE,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("links.csv", b"url,status\n").unwrap();
    assert_eq!(first.file_name().unwrap(), "links.csv");
    assert_eq!(fs::read_to_string(&first).unwrap(), "url,status\n");

    let second = writer.write("links.csv", b"replaced").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "replaced");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("links.csv", b"data").is_err());
    assert!(!file_path.with_file_name("links.csv").exists());
}

#[test]
fn missing_tables_load_empty() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();
    assert!(store.load_frontier().unwrap().is_empty());
    assert!(store.load_emails().unwrap().is_empty());
    assert!(store.load_processed().unwrap().is_empty());
    assert!(store.load_valid().unwrap().is_empty());
}

#[test]
fn frontier_table_uses_zero_and_one_flags() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();
    store
        .save_frontier([
            ("https://a.org/", UrlStatus::Crawled),
            ("https://b.org/", UrlStatus::Pending),
        ])
        .unwrap();

    let raw = fs::read_to_string(store.path(LINKS_TABLE)).unwrap();
    assert_eq!(raw, "url,status\nhttps://a.org/,1\nhttps://b.org/,0\n");

    let loaded = store.load_frontier().unwrap();
    assert_eq!(
        loaded,
        vec![
            ("https://a.org/".to_string(), UrlStatus::Crawled),
            ("https://b.org/".to_string(), UrlStatus::Pending),
        ]
    );
}

#[test]
fn malformed_frontier_rows_are_skipped() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();
    fs::write(
        store.path(LINKS_TABLE),
        "url,status\nhttps://ok.org/,0\nhttps://bad.org/,7\nhttps://worse.org/,x\n",
    )
    .unwrap();

    let loaded = store.load_frontier().unwrap();
    assert_eq!(
        loaded,
        vec![("https://ok.org/".to_string(), UrlStatus::Pending)]
    );
}

#[test]
fn email_appender_writes_header_once() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();

    let mut appender = store.email_appender().unwrap();
    appender.append("a@site.org").unwrap();
    drop(appender);

    let mut appender = store.email_appender().unwrap();
    appender.append("b@site.org").unwrap();
    drop(appender);

    let raw = fs::read_to_string(store.path(EMAILS_TABLE)).unwrap();
    assert_eq!(raw, "email\na@site.org\nb@site.org\n");
    assert_eq!(
        store.load_emails().unwrap(),
        vec!["a@site.org".to_string(), "b@site.org".to_string()]
    );
}

#[test]
fn verdict_tables_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();
    store.save_valid([("x@corp.io", 4u32), ("y@gmail.com", 5)]).unwrap();
    store.save_processed(["x@corp.io", "y@gmail.com", "z@bad"]).unwrap();

    let raw = fs::read_to_string(store.path(VALID_TABLE)).unwrap();
    assert_eq!(raw, "email,score\nx@corp.io,4\ny@gmail.com,5\n");
    assert_eq!(
        store.load_valid().unwrap(),
        vec![("x@corp.io".to_string(), 4), ("y@gmail.com".to_string(), 5)]
    );
    assert_eq!(store.load_processed().unwrap().len(), 3);
}
