//! Integration tests for the frontier and the timeout policy
//!
//! These exercise the queueing and timeout rules through the public API only.

use site_downloader::crawler::{BoundItem, Frontier, FrontierError, TimeoutPolicy, WorkItem};
use site_downloader::state::DomainFailureCounters;
use std::time::Duration;

fn seed(url: &str) -> WorkItem {
    WorkItem::Seed(url.to_string())
}

fn drain(frontier: &mut Frontier) -> Vec<String> {
    std::iter::from_fn(|| frontier.pop().ok())
        .map(|item| item.url().to_string())
        .collect()
}

#[test]
fn test_discovered_batch_runs_before_backlog() {
    let mut frontier = Frontier::new();
    frontier.add([seed("http://a.com/A"), seed("http://a.com/B")]);

    let a = frontier.pop().unwrap();
    assert_eq!(a.url(), "http://a.com/A");

    frontier.add([
        BoundItem::page("p", "http://a.com/C", "c").into(),
        BoundItem::page("p", "http://a.com/D", "d").into(),
    ]);

    assert_eq!(
        drain(&mut frontier),
        ["http://a.com/C", "http://a.com/D", "http://a.com/B"]
    );
}

#[test]
fn test_url_is_accepted_once_per_run() {
    let mut frontier = Frontier::new();
    assert_eq!(frontier.add([seed("http://a.com/x.png")]), 1);

    // Same URL as a bound item: same resource.
    let bound = BoundItem::file("p", "http://a.com/x.png", "x.png");
    assert_eq!(frontier.add([bound.clone().into()]), 0);

    frontier.pop().unwrap();
    assert!(frontier.is_empty());

    // Still rejected after the original has been dispatched.
    assert_eq!(frontier.add([bound.into()]), 0);
    assert!(frontier.is_empty());
    assert_eq!(frontier.seen_count(), 1);
}

#[test]
fn test_duplicates_within_a_batch_keep_first() {
    let mut frontier = Frontier::new();
    let added = frontier.add([
        seed("http://a.com/1"),
        seed("http://a.com/2"),
        seed("http://a.com/1"),
    ]);

    assert_eq!(added, 2);
    assert_eq!(drain(&mut frontier), ["http://a.com/1", "http://a.com/2"]);
}

#[test]
fn test_pop_on_empty_frontier() {
    let mut frontier = Frontier::new();
    assert_eq!(frontier.pop(), Err(FrontierError::Empty));
}

#[test]
fn test_image_timeouts_degrade_with_failures() {
    let default = Duration::from_secs(12);
    let mut policy = TimeoutPolicy::new(default, default, 3);
    let image = "http://www.img.com/a/b.jpg";
    let page = "http://img.com/thread.php";

    assert_eq!(policy.timeouts_for(image).connect, default);

    let mut failures = DomainFailureCounters::new();
    failures.add("img.com", 6);
    policy.record_failures(&failures);
    assert_eq!(policy.timeouts_for(image).connect, default / 2);
    assert_eq!(policy.timeouts_for(page).connect, default);

    failures = DomainFailureCounters::new();
    failures.add("img.com", 15);
    policy.record_failures(&failures);
    assert_eq!(policy.failure_count("img.com"), 21);
    assert_eq!(policy.timeouts_for(image).connect, default / 4);
    assert_eq!(policy.timeouts_for(image).read, default);
    assert_eq!(policy.timeouts_for(page).connect, default);
    assert_eq!(policy.timeouts_for("http://img.com/style.css").connect, default);
}

#[test]
fn test_degraded_timeout_applies_to_every_spelling_of_a_host() {
    let default = Duration::from_secs(12);
    let mut policy = TimeoutPolicy::new(default, default, 3);

    let mut failures = DomainFailureCounters::new();
    failures.add("img.com", 6);
    policy.record_failures(&failures);

    for url in [
        "http://img.com/a.png",
        "http://WWW.IMG.com/a.png",
        "https://user:pw@www.img.com/a.png",
    ] {
        assert_eq!(policy.timeouts_for(url).connect, default / 2, "{}", url);
    }
}
