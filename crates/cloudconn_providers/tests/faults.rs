//! Fault injection through the full connector stack.

use cloudconn_core::{Connector, ErrorKind, Filter, ProviderId, Record, RetryPolicy};
use cloudconn_providers::aws::{AwsBackend, AwsServiceError, SimulatedAws};
use cloudconn_providers::gcp::{GcpApiError, GcpBackend, SimulatedGcp};
use cloudconn_providers::{default_translator, BackendFactory, ConnectorConfig, GcpConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts)
        .with_base_delay(Duration::from_millis(10))
        .with_jitter(Duration::ZERO)
}

fn aws_connector(max_attempts: u32) -> (Connector, Arc<SimulatedAws>) {
    let client = Arc::new(SimulatedAws::with_bucket("bucket"));
    let connector = Connector::builder(ProviderId::Aws)
        .retry_policy(fast_retry(max_attempts))
        .translator(default_translator(&ConnectorConfig::default()))
        .sleeper(|_| {})
        .bind(Arc::new(AwsBackend::new(client.clone(), "bucket")));
    (connector, client)
}

fn gcp_connector(max_attempts: u32) -> (Connector, Arc<SimulatedGcp>) {
    let client = Arc::new(SimulatedGcp::with_bucket("bucket"));
    let connector = Connector::builder(ProviderId::Gcp)
        .retry_policy(fast_retry(max_attempts))
        .translator(default_translator(&ConnectorConfig::default()))
        .sleeper(|_| {})
        .bind(Arc::new(GcpBackend::new(client.clone(), "bucket")));
    (connector, client)
}

fn throttled() -> AwsServiceError {
    AwsServiceError::new("ServiceUnavailable", 503, "503 throttled")
}

#[test]
fn throttled_put_is_retried_until_attempts_run_out() {
    let (connector, client) = aws_connector(3);
    client.faults().fail_times("put_object", 5, throttled());

    let err = connector.storage().put("k", b"v").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(err.attempts(), 3);
    assert_eq!(client.faults().calls("put_object"), 3);
    assert_eq!(err.native_status(), Some(503));
}

#[test]
fn transient_failures_below_the_limit_recover() {
    let (connector, client) = aws_connector(4);
    client.faults().fail_times("put_object", 2, throttled());

    connector.storage().put("k", b"v").unwrap();

    assert_eq!(client.faults().calls("put_object"), 3);
    assert_eq!(connector.storage().get("k").unwrap(), b"v");
}

#[test]
fn permanent_failures_are_not_retried() {
    let (connector, client) = aws_connector(5);
    client
        .faults()
        .fail_next("get_object", AwsServiceError::new("AccessDenied", 403, "denied"));

    let err = connector.storage().get("k").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(err.attempts(), 1);
    assert_eq!(client.faults().calls("get_object"), 1);
}

#[test]
fn unmapped_vendor_errors_keep_their_cause() {
    let (connector, client) = aws_connector(5);
    client
        .faults()
        .fail_next("get_object", AwsServiceError::new("Teapot", 418, "short and stout"));

    let err = connector.storage().get("k").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.native_code(), Some("Teapot"));
    let vendor = err
        .native()
        .and_then(|native| native.downcast_ref::<AwsServiceError>())
        .unwrap();
    assert_eq!(vendor.status, 418);
    assert_eq!(client.faults().calls("get_object"), 1);
}

#[test]
fn invalid_keys_never_reach_the_client() {
    let (connector, client) = aws_connector(5);

    let err = connector.storage().put("", b"v").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(err.attempts(), 0);
    assert_eq!(client.faults().total_calls(), 0);
}

#[test]
fn listing_retries_each_page_independently() {
    let client = Arc::new(SimulatedAws::with_bucket("bucket"));
    let connector = Connector::builder(ProviderId::Aws)
        .retry_policy(fast_retry(3))
        .translator(default_translator(&ConnectorConfig::default()))
        .sleeper(|_| {})
        .bind(Arc::new(AwsBackend::new(client.clone(), "bucket").with_page_size(2)));
    for key in ["a", "b", "c", "d", "e"] {
        connector.storage().put(key, key.as_bytes()).unwrap();
    }

    let listing = connector.storage().list("").unwrap();
    assert_eq!(client.faults().calls("list_objects_v2"), 0);

    client.faults().fail_times("list_objects_v2", 2, throttled());
    let keys: Vec<String> = listing.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
    // two failures plus three pages
    assert_eq!(client.faults().calls("list_objects_v2"), 5);
}

#[test]
fn gcp_rate_limits_are_transient() {
    let (connector, client) = gcp_connector(2);
    client.faults().fail_times(
        "run_query",
        2,
        GcpApiError::new(429, "rateLimitExceeded", "Rate limit exceeded"),
    );

    let rows = connector.database().query("people", Filter::all()).unwrap();
    let err = rows.iter().next().unwrap().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(err.attempts(), 2);
    assert_eq!(client.faults().calls("run_query"), 2);
}

#[test]
fn gcp_missing_document_delete_is_not_found() {
    let (connector, _client) = gcp_connector(3);
    let err = connector.database().remove("people", "ghost").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn configured_overrides_reach_the_pipeline() {
    let config = ConnectorConfig::from_json_str(
        r#"{
            "provider": "gcp",
            "retry": {"max_attempts": 3, "base_delay": 0.01, "jitter": 0.0},
            "gcp": {"project_id": "proj", "bucket": "bucket"},
            "error_tables": [
                {"provider": "gcp", "rules": [{"match": "code", "code": "conditionNotMet", "kind": "transient"}]}
            ]
        }"#,
    )
    .unwrap();
    let client = Arc::new(SimulatedGcp::with_bucket("bucket"));
    let connector = BackendFactory::new()
        .with_gcp_client(client.clone())
        .connect(&config)
        .unwrap();
    client.faults().fail_next(
        "set_document",
        GcpApiError::new(412, "conditionNotMet", "precondition failed"),
    );

    connector
        .database()
        .write("people", "ada", &Record::new().with("name", "ada"))
        .unwrap();

    assert_eq!(client.faults().calls("set_document"), 2);
}

#[test]
fn backoff_waits_grow_between_attempts() {
    let client = Arc::new(SimulatedAws::with_bucket("bucket"));
    let waits = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&waits);
    let connector = Connector::builder(ProviderId::Aws)
        .retry_policy(fast_retry(4))
        .translator(default_translator(&ConnectorConfig::default()))
        .sleeper(move |wait| recorded.lock().push(wait))
        .bind(Arc::new(AwsBackend::new(client.clone(), "bucket")));
    client.faults().fail_times("head_object", 4, throttled());

    let err = connector.storage().head("k").unwrap_err();

    assert_eq!(err.attempts(), 4);
    assert_eq!(
        *waits.lock(),
        vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40)
        ]
    );
}

#[test]
fn simulated_factory_uses_config_sections() {
    let connector = BackendFactory::simulated()
        .connect(&ConnectorConfig::gcp(GcpConfig::new("proj", "media")))
        .unwrap();
    connector.storage().put("a", b"1").unwrap();
    assert_eq!(connector.storage().list("").unwrap().collect_all().unwrap(), vec!["a"]);
}
