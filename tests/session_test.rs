//! Tests for the browsing session state machine

use chrono::NaiveDate;

use fakebnb::filter::AttributeFilter;
use fakebnb::model::Listing;
use fakebnb::search::SearchQuery;
use std::time::Duration;

use fakebnb::session::{BrowseSession, SearchCompletion, SessionRegistry, SessionState};

fn listing(id: &str, price: u64, pool: bool) -> Listing {
    Listing {
        id: id.to_string(),
        title: id.to_string(),
        description: String::new(),
        location: "Medellín".to_string(),
        price,
        max_guests: 2,
        rooms: 1,
        bathrooms: 1,
        pets_allowed: false,
        pool,
        wifi: true,
        air_conditioning: false,
        parking: false,
        images: vec![],
        latitude: None,
        longitude: None,
    }
}

fn query(location: &str) -> SearchQuery {
    SearchQuery {
        location: location.to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 8, 28),
        end_date: NaiveDate::from_ymd_opt(2025, 8, 30),
    }
}

fn ids(listings: &[Listing]) -> Vec<&str> {
    listings.iter().map(|l| l.id.as_str()).collect()
}

#[test]
fn test_new_session_shows_everything() {
    let session = BrowseSession::new(vec![listing("a", 10, true), listing("b", 20, false)]);
    assert_eq!(session.state(), SessionState::All);
    assert_eq!(ids(session.visible()), vec!["a", "b"]);
    assert_eq!(ids(session.base()), vec!["a", "b"]);
}

#[test]
fn test_filter_without_search_uses_full_set() {
    let mut session = BrowseSession::new(vec![listing("a", 10, true), listing("b", 20, false)]);
    session.apply_filter(AttributeFilter {
        require_pool: true,
        ..AttributeFilter::default()
    });
    assert_eq!(session.state(), SessionState::AttributeFiltered);
    assert_eq!(ids(session.visible()), vec!["a"]);
}

#[test]
fn test_filter_composes_with_latest_search() {
    let a = listing("a", 10, true);
    let b = listing("b", 20, true);
    let mut session = BrowseSession::new(vec![a.clone(), b.clone()]);

    // The search kept only `b`; `a` passes the filter but must stay hidden.
    let ticket = session.begin_search();
    assert_eq!(
        session.complete_search(ticket, query("Medellín"), vec![b.clone()]),
        SearchCompletion::Applied
    );
    assert_eq!(session.state(), SessionState::SearchApplied);

    session.apply_filter(AttributeFilter::default());
    assert_eq!(ids(session.visible()), vec!["b"]);

    // A new search re-bases the next filter.
    let ticket = session.begin_search();
    session.complete_search(ticket, query("Medellín"), vec![a.clone()]);
    session.apply_filter(AttributeFilter {
        max_price: 15,
        ..AttributeFilter::default()
    });
    assert_eq!(ids(session.visible()), vec!["a"]);
}

#[test]
fn test_stale_search_is_discarded() {
    let a = listing("a", 10, true);
    let b = listing("b", 20, true);
    let mut session = BrowseSession::new(vec![a.clone(), b.clone()]);

    let older = session.begin_search();
    let newer = session.begin_search();

    assert_eq!(
        session.complete_search(newer, query("newer"), vec![b.clone()]),
        SearchCompletion::Applied
    );
    // The older request resolves last and loses.
    assert_eq!(
        session.complete_search(older, query("older"), vec![a.clone()]),
        SearchCompletion::Stale
    );
    assert_eq!(ids(session.visible()), vec!["b"]);

    let snapshot = session.snapshot("s1");
    assert_eq!(snapshot.query, Some(query("newer")));
}

#[test]
fn test_empty_search_snapshot_has_message() {
    let mut session = BrowseSession::new(vec![listing("a", 10, true)]);
    let ticket = session.begin_search();
    session.complete_search(ticket, query("Tokyo"), vec![]);

    let snapshot = session.snapshot("s1");
    assert_eq!(snapshot.results.count, 0);
    assert!(snapshot.results.message.is_some());
}

#[test]
fn test_registry_lifecycle() {
    let registry = SessionRegistry::default();
    assert!(registry.is_empty());

    let id = registry.create(vec![listing("a", 10, true)]).id;
    assert_eq!(registry.len(), 1);

    let visible = registry.with_session(&id, |s| s.visible().len());
    assert_eq!(visible, Some(1));
    assert_eq!(registry.with_session("missing", |s| s.visible().len()), None);

    assert!(registry.remove(&id));
    assert!(!registry.remove(&id));
}

#[test]
fn test_registry_expires_idle_sessions() {
    let registry = SessionRegistry::new(Duration::ZERO, 10);
    let id = registry.create(vec![listing("a", 10, true)]).id;

    assert_eq!(registry.with_session(&id, |s| s.visible().len()), None);
    assert!(registry.is_empty());
}

#[test]
fn test_registry_keeps_active_sessions() {
    let registry = SessionRegistry::new(Duration::from_secs(60), 10);
    let id = registry.create(vec![listing("a", 10, true)]).id;

    for _ in 0..3 {
        assert_eq!(registry.with_session(&id, |s| s.visible().len()), Some(1));
    }
}

#[test]
fn test_registry_evicts_least_recently_used_when_full() {
    let registry = SessionRegistry::new(Duration::from_secs(60), 2);
    let first = registry.create(vec![listing("a", 10, true)]).id;
    let second = registry.create(vec![listing("b", 10, true)]).id;

    // Touching the first session makes the second the eviction candidate.
    assert!(registry.with_session(&first, |_| ()).is_some());
    let third = registry.create(vec![listing("c", 10, true)]).id;

    assert_eq!(registry.len(), 2);
    assert!(registry.with_session(&first, |_| ()).is_some());
    assert!(registry.with_session(&second, |_| ()).is_none());
    assert!(registry.with_session(&third, |_| ()).is_some());
}
