//! Relay server end to end: HTTP control requests in, device lines out

use iot_dimmer::config::RelayConfig;
use iot_dimmer::{DimmerClient, RelayHandle, RelayServer};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::TcpStream;

async fn start_relay() -> RelayHandle {
    let config = RelayConfig {
        http_bind: "127.0.0.1:0".parse().unwrap(),
        device_bind: "127.0.0.1:0".parse().unwrap(),
        poll_interval: Duration::from_millis(20),
        ..RelayConfig::default()
    };
    RelayServer::start(config).await.unwrap()
}

async fn get(url: &str) -> (StatusCode, String) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

async fn connect_device(relay: &RelayHandle) -> Lines<BufReader<TcpStream>> {
    let stream = TcpStream::connect(relay.device_addr()).await.unwrap();
    for _ in 0..50 {
        if relay.hub().count().await > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    BufReader::new(stream).lines()
}

async fn next_line(lines: &mut Lines<BufReader<TcpStream>>) -> String {
    tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("device line")
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_start_rejects_oversized_max_level() {
    let config = RelayConfig {
        http_bind: "127.0.0.1:0".parse().unwrap(),
        device_bind: "127.0.0.1:0".parse().unwrap(),
        max_level: 2_000_000_000,
        ..RelayConfig::default()
    };
    assert!(RelayServer::start(config).await.is_err());
}

#[tokio::test]
async fn test_valid_request_is_queued() {
    let relay = start_relay().await;
    let url = format!("{}?intensity=5&token=letmein&device=device1", relay.control_url());

    let (status, body) = get(&url).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Received command: device1 will switch intensity to 5"));
    assert!(body.contains("'>Off</a>"));
    assert_eq!(relay.queue().get("device1").await, Some(5));

    let (_, body) = get(&url.replace("intensity=5", "intensity=2")).await;
    assert!(body.contains("will switch intensity to 2 instead of 5"));

    relay.shutdown().await;
}

#[tokio::test]
async fn test_error_statuses() {
    let relay = start_relay().await;
    let base = relay.control_url();
    let http = format!("http://{}", relay.http_addr());

    let cases = [
        (format!("{http}/elsewhere?intensity=1&token=letmein&device=d"), StatusCode::NOT_FOUND),
        (format!("{base}?intensity=1&token=letmein"), StatusCode::BAD_REQUEST),
        (base.clone(), StatusCode::BAD_REQUEST),
        (format!("{base}?intensity=bright&token=letmein&device=d"), StatusCode::RANGE_NOT_SATISFIABLE),
        (format!("{base}?intensity=1&token=wrong&device=d"), StatusCode::FORBIDDEN),
    ];

    for (url, expected) in cases {
        let (status, _) = get(&url).await;
        assert_eq!(status, expected, "{url}");
    }
    assert!(relay.queue().is_empty().await);

    let response = reqwest::Client::new()
        .post(format!("{base}?intensity=1&token=letmein&device=d"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_path_is_case_insensitive() {
    let relay = start_relay().await;
    let url = format!(
        "http://{}/IoTDimmer?intensity=3&token=letmein&device=device1",
        relay.http_addr()
    );
    let (status, _) = get(&url).await;
    assert_eq!(status, StatusCode::OK);
    relay.shutdown().await;
}

#[tokio::test]
async fn test_out_of_range_level_is_not_queued() {
    let relay = start_relay().await;
    let url = format!("{}?intensity=50&token=letmein&device=device1", relay.control_url());

    let (status, body) = get(&url).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("Received command"));
    assert!(relay.queue().is_empty().await);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_device_receives_queued_level() {
    let relay = start_relay().await;
    let mut device = connect_device(&relay).await;

    let url = format!("{}?intensity=4&token=letmein&device=device1", relay.control_url());
    get(&url).await;

    assert_eq!(next_line(&mut device).await, "{letmein: device1=4}");

    for _ in 0..50 {
        if relay.queue().is_empty().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(relay.queue().is_empty().await);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_queue_waits_for_a_device() {
    let relay = start_relay().await;
    let url = format!("{}?intensity=6&token=letmein&device=lamp", relay.control_url());
    get(&url).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(relay.queue().get("lamp").await, Some(6));

    let mut device = connect_device(&relay).await;
    assert_eq!(next_line(&mut device).await, "{letmein: lamp=6}");

    relay.shutdown().await;
}

#[tokio::test]
async fn test_client_against_relay() {
    let relay = start_relay().await;
    let client = DimmerClient::with_defaults().unwrap();

    assert_eq!(client.set_intensity(&relay.control_url(), 7).await.unwrap(), "OK");
    assert_eq!(relay.queue().get("device1").await, Some(7));

    let wrong_path = format!("http://{}/dimmer", relay.http_addr());
    assert_eq!(client.set_intensity(&wrong_path, 7).await.unwrap(), "Not Found");

    drop(client);
    relay.shutdown().await;
}
