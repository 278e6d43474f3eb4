//! End-to-end mapping selection through the public API.

use chrono::{Duration, TimeZone, Utc};
use mimic_http::backends::InMemoryScenarioStore;
use mimic_http::mapping::{Mapping, MappingStore, TimeSettings};
use mimic_http::mapping_matcher::{MappingMatcher, MatchingOptions};
use mimic_http::matchers::{JsonMatcher, RegexMatcher, XPathMatcher};
use mimic_http::request::RequestMessage;
use mimic_http::request_matcher::RequestMatcherBuilder;
use mimic_http::response::StaticResponse;
use mimic_http::scenario::{ScenarioStore, Transition};
use serde_json::json;
use std::sync::Arc;

fn matcher_with(options: MatchingOptions) -> MappingMatcher {
    let store = Arc::new(MappingStore::new(Arc::new(InMemoryScenarioStore::new())));
    MappingMatcher::new(store, options)
}

fn matcher() -> MappingMatcher {
    matcher_with(MatchingOptions::default())
}

fn ok() -> StaticResponse {
    StaticResponse::ok()
}

#[test]
fn test_perfect_match_is_selected() {
    let matcher = matcher();
    let users = matcher.store().upsert(Mapping::new(
        RequestMatcherBuilder::new()
            .using_methods(["GET"])
            .with_path("/users")
            .build(),
        ok(),
    ));
    matcher.store().upsert(Mapping::new(
        RequestMatcherBuilder::new().with_path("/orders").build(),
        ok(),
    ));

    let best = matcher.find_best_match(&RequestMessage::new("GET", "/users?page=1"));
    assert_eq!(best.full.unwrap().mapping.guid, users.guid);
}

#[test]
fn test_priority_breaks_ties_between_perfect_matches() {
    let matcher = matcher();
    matcher.store().upsert(
        Mapping::new(RequestMatcherBuilder::new().with_path("/a").build(), ok()).with_priority(5),
    );
    let preferred = matcher.store().upsert(
        Mapping::new(RequestMatcherBuilder::new().with_path("/a").build(), ok()).with_priority(1),
    );

    let best = matcher.find_best_match(&RequestMessage::new("GET", "/a"));
    assert_eq!(best.full.unwrap().mapping.guid, preferred.guid);
}

#[test]
fn test_newest_mapping_wins_equal_priority() {
    let matcher = matcher();
    matcher
        .store()
        .upsert(Mapping::new(RequestMatcherBuilder::new().with_path("/a").build(), ok()));
    let newest = matcher
        .store()
        .upsert(Mapping::new(RequestMatcherBuilder::new().with_path("/a").build(), ok()));

    let best = matcher.find_best_match(&RequestMessage::new("GET", "/a"));
    assert_eq!(best.full.unwrap().mapping.guid, newest.guid);
}

#[test]
fn test_vacuous_mapping_matches_everything() {
    let matcher = matcher();
    let any = matcher
        .store()
        .upsert(Mapping::new(RequestMatcherBuilder::new().build(), ok()));

    let best = matcher.find_best_match(&RequestMessage::new("DELETE", "/whatever"));
    assert_eq!(best.full.unwrap().mapping.guid, any.guid);
}

#[test]
fn test_no_match_reports_partial() {
    let matcher = matcher();
    let close = matcher.store().upsert(Mapping::new(
        RequestMatcherBuilder::new()
            .using_methods(["POST"])
            .with_path("/users")
            .build(),
        ok(),
    ));

    let best = matcher.find_best_match(&RequestMessage::new("GET", "/users"));
    assert!(best.full.is_none());
    assert_eq!(best.partial.unwrap().mapping.guid, close.guid);
}

#[test]
fn test_allow_partial_mapping_answers_with_partial() {
    let matcher = matcher_with(MatchingOptions {
        allow_partial_mapping: true,
        ..MatchingOptions::default()
    });
    let close = matcher.store().upsert(Mapping::new(
        RequestMatcherBuilder::new()
            .using_methods(["POST"])
            .with_path("/users")
            .build(),
        ok(),
    ));

    let best = matcher.find_best_match(&RequestMessage::new("GET", "/users"));
    assert_eq!(best.full.unwrap().mapping.guid, close.guid);
}

#[test]
fn test_body_matchers() {
    let matcher = matcher();
    let json_mapping = matcher.store().upsert(Mapping::new(
        RequestMatcherBuilder::new()
            .with_path("/orders")
            .with_body(JsonMatcher::partial(vec![json!({"status": "new"})]))
            .build(),
        ok(),
    ));
    let xml_mapping = matcher.store().upsert(Mapping::new(
        RequestMatcherBuilder::new()
            .with_path("/orders")
            .with_body(XPathMatcher::new(["/order[@status='new']"]))
            .build(),
        ok(),
    ));

    let json_request = RequestMessage::new("POST", "/orders")
        .with_header("Content-Type", "application/json")
        .with_body_bytes(r#"{"status":"new","id":3}"#);
    assert_eq!(
        matcher.find_best_match(&json_request).full.unwrap().mapping.guid,
        json_mapping.guid
    );

    let xml_request = RequestMessage::new("POST", "/orders")
        .with_header("Content-Type", "application/xml")
        .with_body_bytes(r#"<order status="new"/>"#);
    assert_eq!(
        matcher.find_best_match(&xml_request).full.unwrap().mapping.guid,
        xml_mapping.guid
    );
}

#[test]
fn test_time_window_excludes_mapping() {
    let matcher = matcher();
    let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    matcher.store().upsert(
        Mapping::new(RequestMatcherBuilder::new().with_path("/sale").build(), ok())
            .with_time_settings(TimeSettings {
                start: Some(start),
                end: Some(start + Duration::days(1)),
                ttl: None,
            }),
    );

    let request = RequestMessage::new("GET", "/sale");
    assert!(matcher
        .find_best_match_at(&request, start - Duration::hours(1))
        .full
        .is_none());
    assert!(matcher
        .find_best_match_at(&request, start + Duration::hours(1))
        .full
        .is_some());
    assert!(matcher
        .find_best_match_at(&request, start + Duration::days(2))
        .full
        .is_none());
}

#[test]
fn test_scenario_walks_through_states() {
    let matcher = matcher();
    let store = matcher.store();
    let empty = store.upsert(
        Mapping::new(
            RequestMatcherBuilder::new()
                .using_methods(["GET"])
                .with_path("/cart")
                .build(),
            ok(),
        )
        .in_scenario("shopping"),
    );
    let add = store.upsert(
        Mapping::new(
            RequestMatcherBuilder::new()
                .using_methods(["POST"])
                .with_path("/cart")
                .build(),
            ok(),
        )
        .in_scenario("shopping")
        .will_set_state_to("Filled"),
    );
    let filled = store.upsert(
        Mapping::new(
            RequestMatcherBuilder::new()
                .using_methods(["GET"])
                .with_path("/cart")
                .build(),
            ok(),
        )
        .in_scenario("shopping")
        .when_state_is("Filled"),
    );

    let get = RequestMessage::new("GET", "/cart");
    assert_eq!(matcher.find_best_match(&get).full.unwrap().mapping.guid, empty.guid);

    let post = RequestMessage::new("POST", "/cart");
    let chosen = matcher.find_best_match(&post).full.unwrap().mapping;
    assert_eq!(chosen.guid, add.guid);
    assert!(matches!(
        matcher.commit_scenario_transition(&chosen),
        Some(Transition::Advanced { .. })
    ));

    assert_eq!(matcher.find_best_match(&get).full.unwrap().mapping.guid, filled.guid);
}

#[test]
fn test_state_times_needs_repeated_hits() {
    let matcher = matcher();
    let store = matcher.store();
    let flaky = store.upsert(
        Mapping::new(RequestMatcherBuilder::new().with_path("/job").build(), ok())
            .in_scenario("job")
            .will_set_state_to("Done")
            .times_in_same_state(3),
    );
    let done = store.upsert(
        Mapping::new(RequestMatcherBuilder::new().with_path("/job").build(), ok())
            .in_scenario("job")
            .when_state_is("Done"),
    );

    let request = RequestMessage::new("GET", "/job");
    for _ in 0..3 {
        let chosen = matcher.find_best_match(&request).full.unwrap().mapping;
        assert_eq!(chosen.guid, flaky.guid);
        matcher.commit_scenario_transition(&chosen);
    }
    assert_eq!(
        matcher.scenarios().current_state("job").as_deref(),
        Some("Done")
    );
    assert_eq!(
        matcher.find_best_match(&request).full.unwrap().mapping.guid,
        done.guid
    );
}

#[test]
fn test_broken_matcher_only_excludes_its_mapping() {
    let matcher = matcher();
    matcher.store().upsert(Mapping::new(
        RequestMatcherBuilder::new()
            .with_path("/feed")
            .with_body(XPathMatcher::new(["/feed"]))
            .build(),
        ok(),
    ));
    let fallback = matcher.store().upsert(
        Mapping::new(
            RequestMatcherBuilder::new()
                .with_path_matcher(RegexMatcher::new(["^/fe+d$"], false).unwrap())
                .build(),
            ok(),
        )
        .with_priority(10),
    );

    let request = RequestMessage::new("POST", "/feed").with_body_bytes("<feed");
    let best = matcher.find_best_match(&request);
    assert_eq!(best.full.unwrap().mapping.guid, fallback.guid);
}
