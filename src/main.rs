mod db;
mod escape;
mod ipc;
mod report;
mod session;

use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // stdout carries the protocol, so every log line goes to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("attendanced=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "attendanced starting");

    let mut state = ipc::AppState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                tracing::warn!(error = %e, "malformed request line");
                serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                })
            }
        };

        let written = serde_json::to_string(&resp)
            .map_err(io::Error::from)
            .and_then(|s| writeln!(stdout, "{}", s))
            .and_then(|_| stdout.flush());
        if let Err(e) = written {
            // The client has gone away; nothing left to answer.
            tracing::warn!(error = %e, "stdout write failed, shutting down");
            break;
        }
    }
    tracing::info!("attendanced stopped");
}
