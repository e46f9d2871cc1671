use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use checkin_scanner::verify::{Identifier, StaticCredential};
use checkin_scanner::{HttpVerifier, ScanError, VerificationRequest, Verifier};

const TOKEN: &str = "door-token-42";

/// One-shot HTTP server. Returns the raw request it received.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).expect("write response");
        request
    });
    (base, handle)
}

fn read_request(stream: &mut TcpStream) -> String {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    let mut raw = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).expect("read request");
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&raw).to_string();
        if let Some(split) = text.find("\r\n\r\n") {
            let headers = text[..split].to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= split + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).to_string()
}

fn verifier(base: &str, token: Option<&str>) -> HttpVerifier {
    HttpVerifier::new(
        base,
        "/api/tickets/verify",
        Duration::from_secs(5),
        Arc::new(StaticCredential::new(token.map(str::to_string))),
    )
    .expect("build verifier")
}

#[test]
fn approved_ticket_sends_bearer_and_mark_used() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"approved":true,"meta":{"ticket":{"ticketId":"T1"},"booking":{"id":7,"status":"confirmed","payment_status":"paid"}}}"#,
    );
    let result = verifier(&base, Some(TOKEN))
        .verify(&VerificationRequest::new("TICKET-123"))
        .expect("verification completes");

    assert!(result.approved);
    let meta = result.meta.expect("meta");
    assert_eq!(
        meta.booking.and_then(|booking| booking.id),
        Some(Identifier::Number(7))
    );

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /api/tickets/verify "));
    assert!(request
        .to_ascii_lowercase()
        .contains(&format!("authorization: bearer {}", TOKEN).to_ascii_lowercase()));
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).expect("json body");
    assert_eq!(json["qrContent"], "TICKET-123");
    assert_eq!(json["markUsed"], true);
}

#[test]
fn error_body_with_200_is_rejected_with_reason() {
    let (base, server) = serve_once("200 OK", r#"{"error":"Ticket already used"}"#);
    let result = verifier(&base, Some(TOKEN))
        .verify(&VerificationRequest::new("TICKET-123"))
        .expect("verification completes");
    assert!(!result.approved);
    assert_eq!(result.reason, "Ticket already used");
    server.join().unwrap();
}

#[test]
fn http_error_status_is_rejected_not_thrown() {
    let (base, server) = serve_once("404 Not Found", r#"{"error":"Ticket not found"}"#);
    let result = verifier(&base, Some(TOKEN))
        .verify(&VerificationRequest::new("TICKET-999"))
        .expect("verification completes");
    assert!(!result.approved);
    assert_eq!(result.reason, "Ticket not found");
    server.join().unwrap();
}

#[test]
fn lookup_only_request_does_not_mark_used() {
    let (base, server) = serve_once("200 OK", r#"{"approved":true}"#);
    verifier(&base, Some(TOKEN))
        .verify(&VerificationRequest::new("TICKET-123").lookup_only())
        .expect("verification completes");
    let request = server.join().unwrap();
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).expect("json body");
    assert_eq!(json["markUsed"], false);
}

#[test]
fn refused_connection_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = verifier(&base, Some(TOKEN))
        .verify(&VerificationRequest::new("TICKET-123"))
        .expect_err("no server");
    assert!(matches!(err, ScanError::Unreachable(_)));
}

#[test]
fn missing_token_never_touches_the_network() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let err = verifier(&base, None)
        .verify(&VerificationRequest::new("TICKET-123"))
        .expect_err("signed out");
    assert_eq!(err, ScanError::Unauthenticated);
    match listener.accept() {
        Err(e) if e.kind() == ErrorKind::WouldBlock => {}
        other => panic!("unexpected connection: {:?}", other.map(|(_, addr)| addr)),
    }
}
