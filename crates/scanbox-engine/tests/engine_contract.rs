#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Contract tests for `EngineClient` against a mock engine.

use scanbox_core::{FailureReport, Finding, ResultSubmission, ScanboxError};
use scanbox_engine::{EngineApi, EngineClient, EngineConfig, LockOutcome};
use wiremock::matchers::{basic_auth, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> EngineClient {
    EngineClient::new(EngineConfig::new(server.uri())).unwrap()
}

fn submission() -> ResultSubmission {
    ResultSubmission {
        findings: vec![Finding::new("sub.example.com", "sub.example.com", "Subdomain")],
        raw_findings: "[]".into(),
        scanner_id: "worker-1".into(),
        scanner_type: "SubdomainScanner".into(),
    }
}

// --- lock ---

#[tokio::test]
async fn lock_decodes_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/box/jobs/lock/subdomain_scan/worker-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jobId": "j1",
            "targets": [{"name": "t", "location": "example.com", "attributes": {}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .await
        .lock_job("subdomain_scan", "worker-1")
        .await
        .unwrap();

    match outcome {
        LockOutcome::Job(job) => {
            assert_eq!(job.job_id, "j1");
            assert_eq!(job.targets[0].location, "example.com");
        }
        LockOutcome::NoJobAvailable => panic!("expected a job"),
    }
}

#[tokio::test]
async fn lock_204_means_no_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/box/jobs/lock/subdomain_scan/worker-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .await
        .lock_job("subdomain_scan", "worker-1")
        .await
        .unwrap();
    assert_eq!(outcome, LockOutcome::NoJobAvailable);
}

#[tokio::test]
async fn lock_invalid_json_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .lock_job("subdomain_scan", "worker-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ScanboxError::Decode(_)));
    assert!(err.engine_reached());
}

#[tokio::test]
async fn lock_error_codes_are_protocol_errors() {
    for code in [400u16, 401, 500, 503] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(code))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .lock_job("subdomain_scan", "worker-1")
            .await
            .unwrap_err();
        match err {
            ScanboxError::EngineProtocol { code: got, .. } => assert_eq!(got, code),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn lock_unreachable_engine_is_transport_error() {
    let client = EngineClient::new(EngineConfig::new("http://127.0.0.1:1")).unwrap();
    let err = client.lock_job("subdomain_scan", "w").await.unwrap_err();
    assert!(matches!(err, ScanboxError::Transport(_)));
}

// --- auth ---

#[tokio::test]
async fn basic_auth_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(basic_auth("engine-user", "engine-pass"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = EngineConfig::new(server.uri()).with_basic_auth("engine-user", "engine-pass");
    let client = EngineClient::new(config).unwrap();
    let outcome = client.lock_job("subdomain_scan", "w").await.unwrap();
    assert_eq!(outcome, LockOutcome::NoJobAvailable);
}

#[tokio::test]
async fn no_auth_header_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let config = EngineConfig::new(server.uri()).with_basic_auth("engine-user", "");
    let client = EngineClient::new(config).unwrap();
    client.lock_job("subdomain_scan", "w").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

// --- result ---

#[tokio::test]
async fn submit_result_posts_wire_document() {
    let server = MockServer::start().await;
    let submission = submission();
    let body = serde_json::to_value(&submission).unwrap();
    Mock::given(method("POST"))
        .and(path("/box/jobs/j1/result"))
        .and(header("content-type", "application/json"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .await
        .submit_result("j1", &submission)
        .await
        .unwrap();

    assert_eq!(body["scannerType"], "SubdomainScanner");
    assert_eq!(body["findings"][0]["category"], "Subdomain");
}

#[tokio::test]
async fn submit_result_500_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/box/jobs/j1/result"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .submit_result("j1", &submission())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanboxError::EngineProtocol { code: 500, .. }));
}

// --- failure ---

#[tokio::test]
async fn submit_failure_posts_wire_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/box/jobs/j2/failure"))
        .and(body_json(serde_json::json!({
            "errorMessage": "Scan timed out",
            "errorDetails": "",
            "scannerId": "worker-1",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let report = FailureReport {
        error_message: "Scan timed out".into(),
        error_details: String::new(),
        scanner_id: "worker-1".into(),
    };
    client_for(&server)
        .await
        .submit_failure("j2", &report)
        .await
        .unwrap();
}

#[tokio::test]
async fn submit_failure_401_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let report = FailureReport {
        error_message: "x".into(),
        error_details: String::new(),
        scanner_id: "w".into(),
    };
    let err = client_for(&server)
        .await
        .submit_failure("j2", &report)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanboxError::EngineProtocol { code: 401, .. }));
}

#[tokio::test]
async fn job_id_with_reserved_characters_stays_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/box/jobs/job%3F42%23x/failure"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let report = FailureReport {
        error_message: "Scan timed out".into(),
        error_details: String::new(),
        scanner_id: "worker-1".into(),
    };
    client_for(&server)
        .await
        .submit_failure("job?42#x", &report)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn lock_path_segments_are_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/box/jobs/lock/dns%2Fscan/worker%201"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .await
        .lock_job("dns/scan", "worker 1")
        .await
        .unwrap();
    assert!(matches!(outcome, LockOutcome::NoJobAvailable));
}

#[tokio::test]
async fn lock_truncated_body_counts_as_engine_reached() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        // promises 500 bytes, sends a few, then hangs up
        let _ = socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{\"jobId\":",
            )
            .await;
        let _ = socket.shutdown().await;
    });

    let client = EngineClient::new(EngineConfig::new(format!("http://{addr}"))).unwrap();
    let err = client
        .lock_job("subdomain_scan", "worker-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ScanboxError::Decode(_)));
    assert!(err.engine_reached());
}
