use harvester_core::{normalize, Frontier, UrlStatus};
use pretty_assertions::assert_eq;

#[test]
fn recording_the_same_canonical_url_twice_grows_by_one() {
    let mut frontier = Frontier::new();
    let first = normalize("http://Example.com//a");
    let second = normalize("https://example.com/a");

    assert!(frontier.record_discovery(&first));
    assert!(!frontier.record_discovery(&second));
    assert_eq!(frontier.len(), 1);
    assert_eq!(frontier.pending_count(), 1);
}

#[test]
fn claim_does_not_transition_status() {
    let mut frontier = Frontier::new();
    frontier.record_discovery("https://a.example/");
    frontier.record_discovery("https://b.example/");

    let first = frontier.claim_pending();
    let second = frontier.claim_pending();
    assert_eq!(first, second);
    assert_eq!(first, vec!["https://a.example/", "https://b.example/"]);
    assert_eq!(frontier.status("https://a.example/"), Some(UrlStatus::Pending));
}

#[test]
fn every_claimed_url_is_crawled_after_marking() {
    let mut frontier = Frontier::new();
    for i in 0..5 {
        frontier.record_discovery(&format!("https://site{i}.example/"));
    }
    let batch = frontier.claim_pending();
    let before = frontier.pending_count();
    for url in &batch {
        frontier.mark_crawled(url);
    }
    assert!(batch
        .iter()
        .all(|url| frontier.status(url) == Some(UrlStatus::Crawled)));
    assert!(frontier.pending_count() < before);
    assert!(frontier.claim_pending().is_empty());
}

#[test]
fn compaction_keeps_pending_and_drops_crawled_over_ceiling() {
    let mut frontier = Frontier::new();
    for i in 0..4 {
        frontier.record_discovery(&format!("https://done{i}.example/"));
        frontier.mark_crawled(&format!("https://done{i}.example/"));
    }
    frontier.record_discovery("https://todo.example/");

    assert_eq!(frontier.compact(10), 0);
    assert_eq!(frontier.len(), 5);

    assert_eq!(frontier.compact(3), 4);
    let rows: Vec<_> = frontier.records().collect();
    assert_eq!(rows, vec![("https://todo.example/", UrlStatus::Pending)]);
}

#[test]
fn records_follow_discovery_order() {
    let frontier = Frontier::from_records(vec![
        ("https://b.example/".to_string(), UrlStatus::Crawled),
        ("https://a.example/".to_string(), UrlStatus::Pending),
    ]);
    let rows: Vec<_> = frontier.records().collect();
    assert_eq!(
        rows,
        vec![
            ("https://b.example/", UrlStatus::Crawled),
            ("https://a.example/", UrlStatus::Pending),
        ]
    );
}
