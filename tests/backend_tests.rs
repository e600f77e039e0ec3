use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use triage_voice::transport::rest::BackendClient;
use triage_voice::Error;

/// Accept one connection, read the request head, and write a canned
/// response.
async fn serve_once(listener: TcpListener, status_line: &str, body: String) -> String {
    let (mut socket, _) = listener.accept().await.unwrap();

    let mut buf = vec![0_u8; 64 * 1024];
    let mut read_total = 0;
    loop {
        let n = socket.read(&mut buf[read_total..]).await.unwrap();
        if n == 0 {
            break;
        }
        read_total += n;
        if buf[..read_total].windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }
    let request_head = String::from_utf8_lossy(&buf[..read_total]).to_string();

    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.unwrap();

    request_head
}

async fn local_backend() -> (BackendClient, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = BackendClient::new(&format!("http://{addr}")).unwrap();
    (client, listener)
}

#[tokio::test]
async fn medical_lookup_hits_expected_path_and_parses() {
    let (client, listener) = local_backend().await;
    let server = tokio::spawn(serve_once(
        listener,
        "200 OK",
        serde_json::json!({
            "data": {
                "name": "Jane",
                "date_of_birth": "1990-01-01",
                "medical_info": {
                    "blood_type": "O+",
                    "allergies": "Penicillin",
                    "medications": "None",
                    "chronic_conditions": "Asthma",
                    "emergency_contact": "John",
                    "emergency_phone": "555-1234"
                }
            }
        })
        .to_string(),
    ));

    let envelope = client.fetch_medical_data("Jane Doe").await.unwrap();
    assert_eq!(
        envelope.summarize(),
        "The medical data for Jane is: Date of birth: 1990-01-01, Blood type: O+, \
         Allergies: Penicillin, Medications: None, Conditions: Asthma, \
         Emergency contact: John at 555-1234."
    );

    let request_head = server.await.unwrap();
    let request_line = request_head.lines().next().unwrap();
    // Name is form-encoded into the query string.
    assert!(request_line.starts_with("GET /api/medical-data?name=Jane+Doe"));
    assert!(request_head.to_ascii_lowercase().contains("accept: application/json"));
}

#[tokio::test]
async fn medical_lookup_non_200_carries_status_code() {
    let (client, listener) = local_backend().await;
    tokio::spawn(serve_once(
        listener,
        "404 Not Found",
        serde_json::json!({ "error": "No user found with the provided name" }).to_string(),
    ));

    let err = client.fetch_medical_data("nobody").await.unwrap_err();
    assert!(matches!(err, Error::MedicalLookup { status: 404 }));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn emergency_query_posts_json_and_returns_answer() {
    let (client, listener) = local_backend().await;
    let server = tokio::spawn(serve_once(
        listener,
        "200 OK",
        serde_json::json!({ "response": "Call 911" }).to_string(),
    ));

    let answer = client.query_emergency_info("house fire").await.unwrap();
    assert_eq!(answer, "Call 911");

    let request_head = server.await.unwrap();
    let request_line = request_head.lines().next().unwrap();
    assert!(request_line.starts_with("POST /api/rag"));
    assert!(request_head.to_ascii_lowercase().contains("content-type: application/json"));
}

#[tokio::test]
async fn emergency_query_without_response_field_uses_fallback() {
    let (client, listener) = local_backend().await;
    tokio::spawn(serve_once(listener, "200 OK", "{}".to_string()));

    let answer = client.query_emergency_info("anything").await.unwrap();
    assert_eq!(answer, "I couldn't find information about that.");
}

#[tokio::test]
async fn emergency_query_non_200_carries_status_and_body() {
    let (client, listener) = local_backend().await;
    tokio::spawn(serve_once(
        listener,
        "500 Internal Server Error",
        serde_json::json!({ "error": "Failed to process your request" }).to_string(),
    ));

    let err = client.query_emergency_info("anything").await.unwrap_err();
    match err {
        Error::EmergencyQuery { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("Failed to process your request"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
