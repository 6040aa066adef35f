use std::net::{Ipv4Addr, TcpListener};
use std::path::PathBuf;
use std::time::Duration;

use cfscan::scan::desired_response;
use cfscan::{Probe, ProbeError, ReqwestProbe, ScanConfig};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOCALHOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

fn probe_for(server: &MockServer, reference: &str) -> ReqwestProbe {
    ReqwestProbe::new(Url::parse(reference).unwrap(), server.address().port()).unwrap()
}

fn config(reference_url: Url, look_for_text: Option<&str>) -> ScanConfig {
    ScanConfig {
        targets: vec![LOCALHOST],
        host: "origin.example.com".to_string(),
        reference_url,
        look_for_text: look_for_text.map(str::to_string),
        timeout: Duration::from_secs(5),
        workers: 1,
        port: 80,
        interval: Duration::from_secs(1),
        drain_window: Duration::from_millis(500),
        output_dir: PathBuf::from("."),
        prefix: "unused".to_string(),
    }
}

#[tokio::test]
async fn probe_sends_host_header_to_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("host", "origin.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_string("status: OK"))
        .expect(1)
        .mount(&server)
        .await;

    let probe = probe_for(&server, "https://cdn.example.com/health?v=1");
    let body = probe
        .probe(LOCALHOST, "origin.example.com", Duration::from_secs(5))
        .await
        .expect("probe ok");

    assert_eq!(body, b"status: OK");
}

#[tokio::test]
async fn probe_returns_body_of_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let probe = probe_for(&server, "http://cdn.example.com/");
    let body = probe
        .probe(LOCALHOST, "origin.example.com", Duration::from_secs(5))
        .await
        .expect("probe ok");

    assert_eq!(body, b"not here");
}

#[tokio::test]
async fn probe_times_out_on_slow_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_string("too late"),
        )
        .mount(&server)
        .await;

    let probe = probe_for(&server, "http://cdn.example.com/");
    let err = probe
        .probe(LOCALHOST, "origin.example.com", Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Timeout(_)), "{err:?}");
    assert!(err.to_string().starts_with("request timed out"));
}

#[tokio::test]
async fn probe_reports_refused_connection() {
    let port = {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap().port()
    };

    let probe = ReqwestProbe::new(Url::parse("http://cdn.example.com/").unwrap(), port).unwrap();
    let err = probe
        .probe(LOCALHOST, "origin.example.com", Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn reference_body_is_fetched_when_no_text_given() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reference"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 255]))
        .expect(1)
        .mount(&server)
        .await;

    let reference = Url::parse(&format!("{}/reference", server.uri())).unwrap();
    let probe = ReqwestProbe::new(reference.clone(), 80).unwrap();

    let expected = desired_response(&config(reference, None), &probe).await.unwrap();
    assert_eq!(expected, vec![0u8, 1, 2, 255]);
}

#[tokio::test]
async fn literal_text_skips_reference_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let reference = Url::parse(&server.uri()).unwrap();
    let probe = ReqwestProbe::new(reference.clone(), 80).unwrap();

    let expected = desired_response(&config(reference, Some("OK")), &probe)
        .await
        .unwrap();
    assert_eq!(expected, b"OK");
}
