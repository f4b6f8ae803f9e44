//! End-to-end scenarios through the public `run_check` pipeline, driven
//! against an in-process mock resolver.

mod helpers;

use std::net::Ipv4Addr;
use std::time::Duration;

use hickory_proto::rr::RecordType;

use cdn_radar::geoip::NoEnrichment;
use cdn_radar::{
    classify_targets, run_check, CompiledProviderDb, Config, ProviderDatabase,
};
use helpers::{a, cname, silent_server, start_mock_server, MockZone};

fn compile_db(json: &str) -> CompiledProviderDb {
    let db: ProviderDatabase = serde_json::from_str(json).expect("parse provider db");
    CompiledProviderDb::compile(&db)
}

fn offline_config(resolver: String) -> Config {
    Config {
        resolvers: vec![resolver],
        vantage_points: Vec::new(),
        timeout: Duration::from_secs(2),
        use_chain_discovery: false,
        ..Config::default()
    }
}

#[tokio::test]
async fn cdn_detected_via_cname_pattern() {
    // example.cdn.test resolves to a fastly edge CNAME; the provider
    // database knows fastly.net as a CDN pattern
    let resolver = start_mock_server(
        MockZone::default()
            .answer("example.cdn.test", RecordType::CNAME, cname("edge.fastly.net."))
            .answer("example.cdn.test", RecordType::A, a(Ipv4Addr::new(151, 101, 1, 57))),
    )
    .await;

    let db = compile_db(r#"{"cdn": {"cname": {"fastly": ["fastly.net"]}}}"#);
    let targets = classify_targets(["example.cdn.test"]);
    let config = offline_config(resolver);

    let report = run_check(&config, targets, &db, &NoEnrichment, &NoEnrichment)
        .await
        .expect("run");

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert!(record.cname.contains("edge.fastly.net"));
    assert!(record.classification.is_cdn);
    assert_eq!(record.classification.cdn_provider, "fastly");
    assert!(!record.classification.is_waf);
}

#[tokio::test]
async fn unmatched_wide_answer_sets_heuristic_only() {
    // Five distinct addresses, none matching any provider pattern: all
    // category flags stay false, only the informational heuristic fires
    let mut zone = MockZone::default();
    for i in 1..=5u8 {
        zone = zone.answer(
            "spread.example.test",
            RecordType::A,
            a(Ipv4Addr::new(198, 51, 100, i)),
        );
    }
    let resolver = start_mock_server(zone).await;

    let db = compile_db(r#"{"cdn": {"cname": {"fastly": ["fastly.net"]}}}"#);
    let targets = classify_targets(["spread.example.test"]);
    let config = offline_config(resolver);

    let report = run_check(&config, targets, &db, &NoEnrichment, &NoEnrichment)
        .await
        .expect("run");

    let record = &report.records[0];
    assert_eq!(record.a.len(), 5);
    assert!(!record.classification.is_cdn);
    assert!(!record.classification.is_waf);
    assert!(!record.classification.is_cloud);
    assert!(record.classification.address_count_exceeded);
    assert_eq!(record.classification.address_count, 5);
}

#[tokio::test]
async fn ip_target_matches_provider_cidr() {
    // IP targets skip DNS entirely and classify straight off the address
    let db = compile_db(r#"{"cdn": {"ip": {"edgecast": ["93.184.216.0/24"]}}}"#);
    let targets = classify_targets(["93.184.216.34"]);
    let config = offline_config("127.0.0.1:1".to_string());

    let report = run_check(&config, targets, &db, &NoEnrichment, &NoEnrichment)
        .await
        .expect("run");

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.fmt, "93.184.216.34");
    assert!(record.a.contains("93.184.216.34"));
    assert!(record.classification.is_cdn);
    assert_eq!(record.classification.cdn_provider, "edgecast");
}

#[tokio::test]
async fn all_timeout_resolver_still_yields_record() {
    // A resolver that never answers: the domain must still produce a
    // well-formed record with empty values and per-type error entries
    let (resolver, _socket) = silent_server().await;

    let db = compile_db("{}");
    let targets = classify_targets(["dead.example.test"]);
    let config = Config {
        resolvers: vec![resolver.clone()],
        vantage_points: Vec::new(),
        timeout: Duration::from_millis(100),
        use_chain_discovery: false,
        ..Config::default()
    };

    let report = run_check(&config, targets, &db, &NoEnrichment, &NoEnrichment)
        .await
        .expect("run");

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.fmt, "dead.example.test");
    assert!(record.a.is_empty());
    assert!(record.cname.is_empty());
    // One error per record type, labeled by resolver
    assert_eq!(record.errors.len(), 6);
    assert!(record
        .errors
        .keys()
        .all(|key| key.starts_with(&format!("{resolver}/"))));
    assert!(!record.classification.is_cdn);
}

#[tokio::test]
async fn invalid_lines_are_reported_not_dropped_silently() {
    let db = compile_db("{}");
    let targets = classify_targets(["definitely not a target", "93.184.216.34"]);
    let config = offline_config("127.0.0.1:1".to_string());

    let report = run_check(&config, targets, &db, &NoEnrichment, &NoEnrichment)
        .await
        .expect("run");

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.invalid, vec!["definitely not a target".to_string()]);
}

#[tokio::test]
async fn empty_resolver_list_is_a_configuration_error() {
    let db = compile_db("{}");
    let targets = classify_targets(["example.com"]);
    let config = Config {
        resolvers: Vec::new(),
        ..Config::default()
    };

    let result = run_check(&config, targets, &db, &NoEnrichment, &NoEnrichment).await;
    assert!(result.is_err());
}
