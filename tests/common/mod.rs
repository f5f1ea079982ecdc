//! Shared utilities for integration tests: raw-TCP mock services.

#![allow(dead_code)]

use alloy::primitives::{hex, keccak256};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Anvil's first development key and its address.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// A second well-known development address, used as the recipient.
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// One request received by a mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: String,
}

/// Read one HTTP/1.1 request: headers, then exactly Content-Length bytes.
async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(Recorded { path, body })
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a mock HTTP service on an ephemeral port. `handler` maps each
/// request to a status and body; every request is recorded.
pub async fn start_mock<F>(handler: F) -> (SocketAddr, Arc<Mutex<Vec<Recorded>>>)
where
    F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
{
    start_delayed_mock(move |request| {
        let (status, body) = handler(request);
        (status, body, Duration::ZERO)
    })
    .await
}

/// Like [`start_mock`], but the handler also says how long to wait before
/// answering. Requests are recorded as soon as they arrive.
pub async fn start_delayed_mock<F>(handler: F) -> (SocketAddr, Arc<Mutex<Vec<Recorded>>>)
where
    F: Fn(&Recorded) -> (u16, String, Duration) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let log = recorded.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let (status, body, delay) = handler(&request);
                log.lock().unwrap().push(request);
                tokio::time::sleep(delay).await;

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, recorded)
}

/// Mock `siteverify` endpoint answering `{"success": <success>}`.
pub async fn start_mock_captcha(success: bool) -> (SocketAddr, Arc<Mutex<Vec<Recorded>>>) {
    start_mock(move |_| {
        let body = if success {
            json!({ "success": true })
        } else {
            json!({ "success": false, "error-codes": ["invalid-input-response"] })
        };
        (200, body.to_string())
    })
    .await
}

/// How the mock node answers `eth_sendRawTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broadcast {
    Accept,
    /// Accept, but only answer after the delay.
    Slow(Duration),
    InsufficientFunds,
}

/// Mock JSON-RPC node on chain 31337 (0x7a69). The pending nonce counts
/// every accepted broadcast, answered or not.
pub struct MockNode {
    pub addr: SocketAddr,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl MockNode {
    pub async fn start(broadcast: Broadcast) -> Self {
        let pending = Arc::new(AtomicU64::new(0));
        let (addr, recorded) = start_delayed_mock(move |request| {
            let call: Value = serde_json::from_str(&request.body).unwrap_or(Value::Null);
            let reply = rpc_reply(&call, broadcast, &pending).to_string();
            let delay = match broadcast {
                Broadcast::Slow(delay) if call["method"] == "eth_sendRawTransaction" => delay,
                _ => Duration::ZERO,
            };
            (200, reply, delay)
        })
        .await;
        Self { addr, recorded }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// JSON-RPC methods received so far, in order.
    pub fn methods(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| serde_json::from_str::<Value>(&r.body).ok())
            .filter_map(|call| call["method"].as_str().map(str::to_string))
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| m.as_str() == method).count()
    }

    /// Raw transactions broadcast so far, in order.
    pub fn raw_transactions(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| serde_json::from_str::<Value>(&r.body).ok())
            .filter(|call| call["method"] == "eth_sendRawTransaction")
            .filter_map(|call| call["params"][0].as_str().map(str::to_string))
            .collect()
    }
}

fn rpc_reply(call: &Value, broadcast: Broadcast, pending: &AtomicU64) -> Value {
    let id = call.get("id").cloned().unwrap_or(Value::Null);
    let method = call["method"].as_str().unwrap_or_default();

    let result = match method {
        "eth_chainId" => json!("0x7a69"),
        "eth_blockNumber" => json!("0x1"),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_getTransactionCount" => json!(format!("{:#x}", pending.load(Ordering::SeqCst))),
        "eth_getBalance" => json!("0xde0b6b3a7640000"),
        "eth_sendRawTransaction" => match broadcast {
            Broadcast::Accept | Broadcast::Slow(_) => {
                pending.fetch_add(1, Ordering::SeqCst);
                let raw = call["params"][0].as_str().unwrap_or_default();
                let bytes = hex::decode(raw).unwrap_or_default();
                json!(format!("{:#x}", keccak256(bytes)))
            }
            Broadcast::InsufficientFunds => {
                return json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32000, "message": "insufficient funds for gas * price + value" }
                });
            }
        },
        _ => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "method not found" }
            });
        }
    };

    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}
