//! End-to-end issuance against a local authority: transport failures, concurrent
//! calls, and handing the issued token to a gate verifier.

use std::time::Duration;

use mockito::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use secrecy::SecretString;
use ticketguard_core::{
    compute_signature, IssuanceClient, IssueTokenError, IssuerConfig, ReplayError,
    TokenStatus, TokenVerifier, VerificationError,
};

const SIGNING_SECRET: &str = "secret";

fn signed_body(ticket_id: &str, device_id: &str, start: i64, ttl: u32, nonce: &str) -> String {
    let sig = compute_signature(
        SIGNING_SECRET.as_bytes(),
        ticket_id,
        device_id,
        start,
        ttl,
        nonce,
    )
    .expect("signature");
    serde_json::json!({
        "ticketId": ticket_id,
        "deviceId": device_id,
        "startAtEpochSec": start,
        "ttlSec": ttl,
        "nonce": nonce,
        "sig": sig,
    })
    .to_string()
}

#[tokio::test]
async fn test_unresponsive_authority_times_out() {
    // accepted by the kernel backlog, never answered
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));

    let client = IssuanceClient::new(
        IssuerConfig::new(base_url)
            .allow_insecure_http()
            .with_timeout(Duration::from_millis(200)),
    )
    .expect("client");

    let err = client
        .issue_token("T1", "D1", Some(8))
        .await
        .expect_err("must time out");
    assert!(matches!(err, IssueTokenError::Network { .. }));
    assert!(err.is_timeout());

    drop(listener);
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };

    let client = IssuanceClient::new(
        IssuerConfig::new(format!("http://127.0.0.1:{port}"))
            .allow_insecure_http()
            .with_function_key(SecretString::from("do-not-leak".to_string())),
    )
    .expect("client");

    let err = client
        .issue_token("T1", "D1", None)
        .await
        .expect_err("must fail");
    match &err {
        IssueTokenError::Network { url, .. } => {
            assert_eq!(url, &format!("http://127.0.0.1:{port}/api/issue-token"));
        }
        other => panic!("Expected Network, got: {other:?}"),
    }
    assert!(!err.is_timeout());
    assert!(!err.to_string().contains("do-not-leak"));
}

#[tokio::test]
async fn test_truncated_error_body_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));

    let authority = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        // read the whole request so closing the socket is a clean FIN
        loop {
            let n = socket.read(&mut buf).await.expect("read");
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + content_length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\nserver")
            .await
            .expect("write");
        socket.shutdown().await.expect("shutdown");
    });

    let client = IssuanceClient::new(IssuerConfig::new(base_url).allow_insecure_http())
        .expect("client");
    let err = client
        .issue_token("T1", "D1", Some(8))
        .await
        .expect_err("body is cut short");
    authority.await.expect("authority task");

    match err {
        IssueTokenError::Network { url, .. } => assert!(url.ends_with("/api/issue-token")),
        other => panic!("Expected Network, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_calls_yield_independent_tokens() {
    let mut server = Server::new_async().await;

    let first = server
        .mock("POST", "/api/issue-token")
        .match_body(mockito::Matcher::PartialJson(
            serde_json::json!({"ticketId": "T1"}),
        ))
        .with_status(200)
        .with_body(signed_body("T1", "D1", 1_700_000_000, 8, "nonce-one"))
        .create_async()
        .await;
    let second = server
        .mock("POST", "/api/issue-token")
        .match_body(mockito::Matcher::PartialJson(
            serde_json::json!({"ticketId": "T2"}),
        ))
        .with_status(200)
        .with_body(signed_body("T2", "D2", 1_700_000_000, 8, "nonce-two"))
        .create_async()
        .await;

    let client = IssuanceClient::new(IssuerConfig::new(server.url()).allow_insecure_http())
        .expect("client");
    let other = client.clone();

    let (a, b) = tokio::join!(
        client.issue_token("T1", "D1", Some(8)),
        other.issue_token("T2", "D2", Some(8)),
    );
    let (a, b) = (a.expect("first token"), b.expect("second token"));

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(a.ticket_id(), "T1");
    assert_eq!(b.ticket_id(), "T2");
    assert_ne!(a.nonce(), b.nonce());
}

#[tokio::test]
async fn test_issued_token_is_admitted_once() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/api/issue-token")
        .with_status(200)
        .with_body(signed_body("TICK", "DEV", 1_000, 10, "QUFBQUFBQUFBQUFB"))
        .create_async()
        .await;

    let client = IssuanceClient::new(IssuerConfig::new(server.url()).allow_insecure_http())
        .expect("client");
    let token = client
        .issue_token("TICK", "DEV", Some(10))
        .await
        .expect("token");
    assert_eq!(token.status_at(1_005), TokenStatus::Active);

    // the token survives a JSON hop to the gate unchanged
    let forwarded = ticketguard_core::IssuedToken::from_json_str(&token.to_json().expect("json"))
        .expect("decode");
    assert_eq!(forwarded, token);

    let verifier = TokenVerifier::in_memory(SecretString::from(SIGNING_SECRET.to_string()));
    verifier.verify(&forwarded, 1_005).expect("first use");
    assert!(matches!(
        verifier.verify(&forwarded, 1_006),
        Err(VerificationError::Replay(ReplayError::AlreadyConsumed { .. }))
    ));
}

#[tokio::test]
async fn test_caller_can_abandon_pending_call() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let client = IssuanceClient::new(
        IssuerConfig::new(format!("http://{}", listener.local_addr().expect("addr")))
            .allow_insecure_http(),
    )
    .expect("client");

    // the caller's bound is independent of the client's own 10 s timeout
    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), client.issue_token("T1", "D1", None))
            .await;
    assert!(abandoned.is_err());

    drop(listener);
}
