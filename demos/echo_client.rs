//! Echo round trip through the plugin call surface.
//!
//! Demonstrates:
//! - Creating a plugin and subscribing to control, text and byte channels
//! - Connecting with custom headers and a keepalive interval
//! - Sending text and bytes, printing echoed frames
//! - Graceful disconnect
//!
//! Usage:
//!   cargo run --example echo_client -- ws://127.0.0.1:9001
//!   cargo run --example echo_client -- ws://127.0.0.1:9001 --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;
use web_socket_support::{MethodCall, Notification, StreamItem, WebSocketPlugin};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://127.0.0.1:9001";
const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    let url = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    init_logging(debug);

    if let Err(e) = run(&url).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(url: &str) -> Result<(), String> {
    println!("=== Echo Client: {url} ===\n");

    let plugin = WebSocketPlugin::new().map_err(|e| e.to_string())?;
    let mut control = plugin.notifier().listen();
    let mut text = plugin.text_relay().attach();
    let mut bytes = plugin.byte_relay().attach();

    call(
        &plugin,
        MethodCall::new(
            "connect",
            json!({
                "serverUrl": url,
                "options": { "headers": { "X-Client": "echo-demo" }, "pingInterval": 10 }
            }),
        ),
    )?;

    match timeout(WAIT, control.recv()).await {
        Ok(Some(Notification::Opened)) => println!("[Control] opened"),
        Ok(Some(other)) => return Err(format!("unexpected notification: {other:?}")),
        Ok(None) | Err(_) => return Err("no response from server".into()),
    }

    call(&plugin, MethodCall::new("sendTextMessage", json!({ "message": "hello" })))?;
    if let Ok(Some(StreamItem::Event(echo))) = timeout(WAIT, text.recv()).await {
        println!("[Text]    {echo}");
    }

    call(&plugin, MethodCall::new("sendByteMessage", json!({ "message": [1, 2, 3] })))?;
    if let Ok(Some(StreamItem::Event(echo))) = timeout(WAIT, bytes.recv()).await {
        println!("[Bytes]   {echo:?}");
    }

    call(
        &plugin,
        MethodCall::new("disconnect", json!({ "code": 1000, "reason": "demo done" })),
    )?;

    if let Ok(Some(notification)) = timeout(WAIT, control.recv()).await {
        println!("[Control] {}", notification.to_message());
    }

    Ok(())
}

fn call(plugin: &WebSocketPlugin, call: MethodCall) -> Result<(), String> {
    plugin
        .handle(&call)
        .map(|_| ())
        .map_err(|e| format!("{} failed: {} ({})", call.method, e.message, e.code))
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "web_socket_support=debug"
    } else {
        "web_socket_support=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
