//! Tests for the pure search building blocks: location normalization,
//! date conflicts, attribute filtering and search composition.

use chrono::{NaiveDate, Utc};
use std::convert::Infallible;

use fakebnb::availability::{conflicts, is_available, BoundaryPolicy, DateRange};
use fakebnb::filter::{matches_filter, AttributeFilter};
use fakebnb::model::{Listing, Reservation};
use fakebnb::normalize::{location_matches, normalize};
use fakebnb::search::{refine, search_listings, SearchQuery, SearchResults, NO_LISTINGS_MESSAGE};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn listing(id: &str, location: &str) -> Listing {
    Listing {
        id: id.to_string(),
        title: format!("Listing {}", id),
        description: String::new(),
        location: location.to_string(),
        price: 100,
        max_guests: 4,
        rooms: 2,
        bathrooms: 1,
        pets_allowed: true,
        pool: true,
        wifi: true,
        air_conditioning: false,
        parking: false,
        images: vec![],
        latitude: None,
        longitude: None,
    }
}

fn reservation(listing_id: &str, start: &str, end: &str) -> Reservation {
    Reservation {
        id: format!("r-{}-{}", listing_id, start),
        listing_id: listing_id.to_string(),
        user_id: "u1".to_string(),
        user_email: "guest@example.com".to_string(),
        title: String::new(),
        location: String::new(),
        start_date: date(start),
        end_date: date(end),
        nightly_price: 100,
        nights: 0,
        total_price: 0,
        payment_reference: None,
        created_at: Utc::now(),
    }
}

fn available(reservations: &[Reservation], start: &str, end: &str) -> bool {
    is_available(
        &listing("a", "Medellín"),
        reservations,
        date(start),
        date(end),
        BoundaryPolicy::Inclusive,
    )
}

// ----- normalizer -----

#[test]
fn test_normalize_is_idempotent() {
    for s in ["Medellín", "SÃO PAULO", "Ñuñoa", "", "İstanbul", "Zürich 8001", "crème brûlée"] {
        let once = normalize(s);
        assert_eq!(normalize(&once), once, "input {:?}", s);
    }
}

#[test]
fn test_normalize_ignores_accents_and_case() {
    assert_eq!(normalize("Medellín"), normalize("medellin"));
    assert_eq!(normalize("BOGOTÁ"), "bogota");
    assert_eq!(normalize(""), "");
}

#[test]
fn test_location_matches_substring() {
    assert!(location_matches("El Poblado, Medellín, Colombia", "medellin"));
    assert!(location_matches("El Poblado, Medellín, Colombia", "  POBLADO "));
    assert!(location_matches("Anywhere", ""));
    assert!(!location_matches("Envigado, Colombia", "medellin"));
}

// ----- availability -----

#[test]
fn test_no_reservations_is_always_available() {
    assert!(available(&[], "2025-08-01", "2025-08-05"));
    assert!(available(&[], "2030-01-01", "2030-12-31"));
}

#[test]
fn test_identical_range_conflicts() {
    let booked = [reservation("a", "2025-08-01", "2025-08-05")];
    assert!(!available(&booked, "2025-08-01", "2025-08-05"));
}

#[test]
fn test_disjoint_range_is_available() {
    let booked = [reservation("a", "2025-08-01", "2025-08-05")];
    assert!(available(&booked, "2025-08-10", "2025-08-12"));
    assert!(available(&booked, "2025-07-20", "2025-07-25"));
}

#[test]
fn test_partial_overlaps_and_containment_conflict() {
    let booked = [reservation("a", "2025-08-01", "2025-08-05")];
    assert!(!available(&booked, "2025-07-30", "2025-08-02"));
    assert!(!available(&booked, "2025-08-03", "2025-08-10"));
    assert!(!available(&booked, "2025-07-25", "2025-08-20"));
    assert!(!available(&booked, "2025-08-02", "2025-08-03"));
}

#[test]
fn test_reservations_of_other_listings_are_ignored() {
    let booked = [reservation("b", "2025-08-01", "2025-08-05")];
    assert!(available(&booked, "2025-08-01", "2025-08-05"));
}

#[test]
fn test_checkout_day_policy() {
    let (start, end) = (date("2025-08-01"), date("2025-08-05"));

    // Inclusive bounds: starting on the checkout day collides.
    assert!(conflicts(BoundaryPolicy::Inclusive, date("2025-08-05"), date("2025-08-07"), start, end));
    assert!(conflicts(BoundaryPolicy::Inclusive, date("2025-07-29"), date("2025-08-01"), start, end));

    // Same-day turnover: both edges are free.
    assert!(!conflicts(BoundaryPolicy::SameDayTurnover, date("2025-08-05"), date("2025-08-07"), start, end));
    assert!(!conflicts(BoundaryPolicy::SameDayTurnover, date("2025-07-29"), date("2025-08-01"), start, end));
    assert!(conflicts(BoundaryPolicy::SameDayTurnover, date("2025-08-04"), date("2025-08-07"), start, end));
    assert!(conflicts(BoundaryPolicy::SameDayTurnover, date("2025-07-25"), date("2025-08-20"), start, end));
}

#[test]
fn test_date_range_validation() {
    assert!(DateRange::from_parts(None, Some(date("2025-08-05"))).is_err());
    assert!(DateRange::from_parts(Some(date("2025-08-05")), None).is_err());
    assert!(DateRange::new(date("2025-08-05"), date("2025-08-05")).is_err());
    assert!(DateRange::new(date("2025-08-06"), date("2025-08-05")).is_err());

    let range = DateRange::new(date("2025-08-01"), date("2025-08-05")).unwrap();
    assert_eq!(range.nights(), 4);
}

// ----- attribute filter -----

#[test]
fn test_default_filter_accepts_everything() {
    assert!(matches_filter(&listing("a", "x"), &AttributeFilter::default()));
}

#[test]
fn test_filter_is_conjunctive() {
    let l = listing("a", "x");
    let passing = AttributeFilter {
        min_guests: 4,
        min_rooms: 2,
        min_bathrooms: 1,
        max_price: 100,
        require_pets: true,
        require_pool: true,
        require_wifi: true,
    };
    assert!(matches_filter(&l, &passing));

    let failing_one = [
        AttributeFilter { min_guests: 5, ..passing.clone() },
        AttributeFilter { min_rooms: 3, ..passing.clone() },
        AttributeFilter { min_bathrooms: 2, ..passing.clone() },
        AttributeFilter { max_price: 99, ..passing.clone() },
    ];
    for filter in &failing_one {
        assert!(!matches_filter(&l, filter), "{:?}", filter);
    }
}

#[test]
fn test_amenity_flags_are_implications() {
    let mut l = listing("a", "x");
    l.pool = false;

    let wants_pool = AttributeFilter { require_pool: true, ..AttributeFilter::default() };
    assert!(!matches_filter(&l, &wants_pool));

    let no_pool_needed = AttributeFilter { require_pool: false, ..wants_pool };
    assert!(matches_filter(&l, &no_pool_needed));

    l.pets_allowed = false;
    l.wifi = false;
    assert!(!matches_filter(&l, &AttributeFilter { require_pets: true, ..AttributeFilter::default() }));
    assert!(!matches_filter(&l, &AttributeFilter { require_wifi: true, ..AttributeFilter::default() }));
}

#[test]
fn test_max_price_threshold() {
    let mut l = listing("a", "x");
    l.price = 500_000;
    assert!(!matches_filter(&l, &AttributeFilter { max_price: 10, ..AttributeFilter::default() }));
    assert!(matches_filter(&l, &AttributeFilter { max_price: 1_000_000, ..AttributeFilter::default() }));
}

// ----- search composition -----

fn fetch_from<'a>(
    all: &'a [Reservation],
) -> impl FnMut(&str) -> Result<Vec<Reservation>, Infallible> + 'a {
    move |listing_id| Ok(all.iter().filter(|r| r.listing_id == listing_id).cloned().collect())
}

#[test]
fn test_search_excludes_booked_listing() {
    let listings = vec![listing("a", "El Poblado, Medellín"), listing("b", "Laureles, Medellín")];
    let booked = vec![reservation("a", "2025-08-26", "2025-08-31")];
    let range = DateRange::new(date("2025-08-28"), date("2025-08-30")).unwrap();

    let found = search_listings(&listings, "Medellín", range, BoundaryPolicy::Inclusive, fetch_from(&booked)).unwrap();

    let ids: Vec<_> = found.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);
}

#[test]
fn test_search_only_fetches_location_matches() {
    let listings = vec![listing("a", "Medellín"), listing("b", "Cartagena")];
    let range = DateRange::new(date("2025-08-01"), date("2025-08-03")).unwrap();
    let mut asked = Vec::new();

    let found = search_listings(&listings, "cartagena", range, BoundaryPolicy::Inclusive, |id| {
        asked.push(id.to_string());
        Ok::<_, Infallible>(vec![])
    })
    .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(asked, vec!["b".to_string()]);
}

#[test]
fn test_search_with_no_match_is_empty_not_error() {
    let listings = vec![listing("a", "Medellín")];
    let range = DateRange::new(date("2025-08-01"), date("2025-08-03")).unwrap();

    let found = search_listings(&listings, "Tokyo", range, BoundaryPolicy::Inclusive, fetch_from(&[])).unwrap();
    assert!(found.is_empty());

    let results = SearchResults::new(found, true);
    assert_eq!(results.count, 0);
    assert_eq!(results.message, Some(NO_LISTINGS_MESSAGE));
}

#[test]
fn test_search_propagates_fetch_failure() {
    let listings = vec![listing("a", "Medellín")];
    let range = DateRange::new(date("2025-08-01"), date("2025-08-03")).unwrap();

    let result = search_listings(&listings, "", range, BoundaryPolicy::Inclusive, |_| Err("offline"));
    assert_eq!(result, Err("offline"));
}

#[test]
fn test_search_is_repeatable() {
    let listings = vec![listing("a", "Medellín"), listing("b", "Medellín"), listing("c", "Cali")];
    let booked = vec![reservation("b", "2025-08-01", "2025-08-10")];
    let range = DateRange::new(date("2025-08-05"), date("2025-08-07")).unwrap();

    let first = search_listings(&listings, "medellin", range, BoundaryPolicy::Inclusive, fetch_from(&booked)).unwrap();
    let second = search_listings(&listings, "medellin", range, BoundaryPolicy::Inclusive, fetch_from(&booked)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_refine_never_adds_listings() {
    let base = vec![listing("b", "Medellín")];
    let refined = refine(&base, &AttributeFilter::default());
    assert_eq!(refined, base);
}

#[test]
fn test_search_query_requires_both_dates() {
    let query = SearchQuery {
        location: "Medellín".to_string(),
        start_date: Some(date("2025-08-01")),
        end_date: None,
    };
    assert!(query.date_range().is_err());
}
