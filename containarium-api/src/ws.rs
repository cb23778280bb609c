use std::process::Stdio;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use containarium_core::ApiError;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ApiErrorResponse;
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct TerminalQuery {
    token: Option<String>,
}

/// WebSocket terminal (§4.H): streams `stdin`/`stdout` to an `exec` session
/// in a named container. Both the token and the `Origin` check are
/// mandatory before the upgrade is accepted — rejecting after upgrade
/// would still have let the handshake through.
pub async fn terminal(
    ws: WebSocketUpgrade,
    Path(container_name): Path<String>,
    Query(query): Query<TerminalQuery>,
    headers: HeaderMap,
    State(state): State<ApiState>,
) -> Result<Response, ApiErrorResponse> {
    let origin = headers
        .get(http::header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    state
        .origins
        .require(origin)
        .map_err(|e| ApiErrorResponse(ApiError::validation(e.to_string())))?;

    let token = query
        .token
        .ok_or_else(|| ApiErrorResponse(ApiError::validation("missing token")))?;
    state
        .jwt
        .validate(&token)
        .map_err(|e| ApiErrorResponse(ApiError::validation(e.to_string())))?;

    Ok(ws.on_upgrade(move |socket| run_terminal(socket, state, container_name)))
}

async fn run_terminal(mut socket: WebSocket, state: ApiState, container_name: String) {
    let mut child = match Command::new(&state.runtime_binary)
        .args(["exec", &container_name, "--", "/bin/bash", "-l"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!(container_name, error = %err, "failed to spawn terminal exec session");
            let _ = socket
                .send(Message::Text(format!("failed to start session: {err}")))
                .await;
            return;
        }
    };

    let mut child_stdin = child.stdin.take().expect("piped stdin");
    let mut child_stdout = child.stdout.take().expect("piped stdout");

    let mut read_buf = [0u8; 4096];
    loop {
        tokio::select! {
            n = child_stdout.read(&mut read_buf) => {
                match n {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if socket.send(Message::Binary(read_buf[..n].to_vec())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Binary(bytes))) => {
                        if child_stdin.write_all(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        if child_stdin.write_all(text.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    debug!(container_name, "terminal session ended");
    let _ = child.kill().await;
}
