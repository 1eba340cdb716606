use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tempfile::TempDir;

#[derive(Default)]
struct Service {
    statuses: Vec<&'static str>,
    polls: usize,
    created: Vec<Value>,
}

/// Flat-API inscription service answering on a local port.
struct FakeService {
    url: String,
    state: Arc<Mutex<Service>>,
}

impl FakeService {
    fn spawn(statuses: &[&'static str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}/v1", listener.local_addr().expect("addr"));
        let state = Arc::new(Mutex::new(Service {
            statuses: statuses.to_vec(),
            ..Service::default()
        }));
        let shared = state.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                serve(stream, &shared);
            }
        });
        Self { url, state }
    }

    fn created(&self) -> Vec<Value> {
        self.state.lock().expect("lock").created.clone()
    }
}

fn serve(mut stream: TcpStream, state: &Mutex<Service>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone"));
    let mut request_line = String::new();
    reader.read_line(&mut request_line).expect("request line");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("header");
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().expect("length");
            }
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).expect("body");
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let data = {
        let mut state = state.lock().expect("lock");
        match (method.as_str(), path.as_str()) {
            ("POST", "/v1/inscribe/create") => {
                state.created.push(body);
                Some(json!({
                    "orderId": "o-42",
                    "status": "pending",
                    "payAddress": "bc1qpay",
                    "amount": 1200
                }))
            }
            ("GET", "/v1/inscribe/order/o-42") => {
                let idx = state.polls.min(state.statuses.len() - 1);
                state.polls += 1;
                Some(json!({
                    "orderId": "o-42",
                    "status": state.statuses[idx],
                    "paidAmount": 1200
                }))
            }
            _ => None,
        }
    };
    let reply = match data {
        Some(data) => json!({"code": 0, "msg": "ok", "data": data}),
        None => json!({"code": -1, "msg": "order not found"}),
    }
    .to_string();

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
        reply.len()
    );
    stream.write_all(response.as_bytes()).expect("write");
}

fn run(bin: &str, store: &Path, args: &[&str]) -> Output {
    Command::new(bin)
        .arg("--store")
        .arg(store)
        .args(args)
        .env_remove("INKRYPT_ADDRESS")
        .env_remove("INKRYPT_API")
        .env_remove("INKRYPT_API_URL")
        .env("INKRYPT_API_KEY", "test-key")
        .env("RUST_LOG", "off")
        .output()
        .expect("run")
}

fn inkrypt(store: &Path, args: &[&str]) -> Output {
    run(env!("CARGO_BIN_EXE_inkrypt"), store, args)
}

fn watch(store: &Path, args: &[&str]) -> Output {
    run(env!("CARGO_BIN_EXE_inkrypt-order-watch"), store, args)
}

fn succeeded(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("utf-8")
}

fn ongoing(store: &Path) -> Value {
    serde_json::from_str(
        &fs::read_to_string(store.join("ongoingInscriptions.json")).expect("read"),
    )
    .expect("json")
}

fn tracked_order(dir: &TempDir) {
    fs::write(
        dir.path().join("ongoingInscriptions.json"),
        json!([{"orderId": "o-42", "address": "X", "status": "pending"}]).to_string(),
    )
    .expect("seed");
}

#[test]
fn create_prints_and_tracks_the_order() {
    let service = FakeService::spawn(&["pending"]);
    let dir = tempfile::tempdir().expect("tempdir");

    let out = succeeded(&inkrypt(
        dir.path(),
        &["--address", "X", "order", "create", "--content", "gm", "--api-url", &service.url],
    ));
    let order: Value = serde_json::from_str(&out).expect("json");
    assert_eq!(order["orderId"], json!("o-42"));

    assert_eq!(
        service.created(),
        vec![json!({
            "content": "gm",
            "contentType": "text/plain;charset=utf-8",
            "receiveAddress": "X"
        })]
    );
    assert_eq!(
        ongoing(dir.path()),
        json!([{
            "orderId": "o-42",
            "address": "X",
            "status": "pending",
            "payAddress": "bc1qpay",
            "amount": 1200
        }])
    );
}

#[test]
fn create_still_prints_the_order_when_tracking_fails() {
    let service = FakeService::spawn(&["pending"]);
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("ongoingInscriptions.json"), "{corrupt").expect("seed");

    let out = succeeded(&inkrypt(
        dir.path(),
        &["--address", "X", "order", "create", "--content", "gm", "--api-url", &service.url],
    ));
    let order: Value = serde_json::from_str(&out).expect("json");
    assert_eq!(order["orderId"], json!("o-42"));
    assert_eq!(order["payAddress"], json!("bc1qpay"));
    assert_eq!(
        fs::read_to_string(dir.path().join("ongoingInscriptions.json")).expect("read"),
        "{corrupt"
    );
}

#[test]
fn status_updates_the_tracked_row() {
    let service = FakeService::spawn(&["inscribing"]);
    let dir = tempfile::tempdir().expect("tempdir");
    tracked_order(&dir);

    let out = succeeded(&inkrypt(
        dir.path(),
        &["--address", "X", "order", "status", "o-42", "--api-url", &service.url],
    ));
    let status: Value = serde_json::from_str(&out).expect("json");
    assert_eq!(status["status"], json!("inscribing"));
    assert_eq!(
        ongoing(dir.path()),
        json!([{"orderId": "o-42", "address": "X", "status": "inscribing", "paidAmount": 1200}])
    );
}

#[test]
fn watcher_stops_once_minted() {
    let service = FakeService::spawn(&["inscribing", "inscribing", "minted"]);
    let dir = tempfile::tempdir().expect("tempdir");
    tracked_order(&dir);

    let out = succeeded(&watch(
        dir.path(),
        &["o-42", "--address", "X", "--interval-ms", "10", "--api-url", &service.url],
    ));
    let states: Vec<Value> = out
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).expect("json")["status"].clone())
        .collect();
    assert_eq!(states, [json!("inscribing"), json!("minted")]);
    assert_eq!(ongoing(dir.path())[0]["status"], json!("minted"));
}

#[test]
fn watcher_gives_up_after_timeout() {
    let service = FakeService::spawn(&["inscribing"]);
    let dir = tempfile::tempdir().expect("tempdir");

    let out = watch(
        dir.path(),
        &[
            "o-42",
            "--interval-ms",
            "10",
            "--timeout-ms",
            "100",
            "--api-url",
            &service.url,
        ],
    );
    assert_eq!(out.status.code(), Some(3));
}
