// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP server and connection handling.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use lambda_core::IdSource;
use lambda_worker::Reply;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::adapter::{into_response, Adapter};

/// Accept connections until `shutdown` completes.
///
/// Connections already accepted keep running on their own tasks. Request
/// bodies larger than `max_body_bytes` are answered with
/// `413 Payload Too Large`.
pub async fn serve<S, F>(
    listener: TcpListener,
    adapter: Arc<Adapter<S>>,
    max_body_bytes: usize,
    shutdown: F,
) where
    S: IdSource + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, remote) = match result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                let adapter = Arc::clone(&adapter);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |request| {
                        handle_request(Arc::clone(&adapter), remote, max_body_bytes, request)
                    });
                    let builder = Builder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(io, service).await {
                        debug!(%remote, error = %e, "connection closed with error");
                    }
                });
            }

            _ = &mut shutdown => {
                info!("stopped accepting connections");
                break;
            }
        }
    }
}

/// Handle a single request
async fn handle_request<S: IdSource>(
    adapter: Arc<Adapter<S>>,
    remote: SocketAddr,
    max_body_bytes: usize,
    request: hyper::Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (mut parts, body) = request.into_parts();

    debug!(method = %parts.method, uri = %parts.uri, %remote, "received request");

    match discard_body(body, max_body_bytes).await {
        Ok(()) => {}
        Err(BodyRejected::TooLarge) => {
            info!(uri = %parts.uri, %remote, max_body_bytes, "request body too large");
            let response = into_response(Reply::canonical(StatusCode::PAYLOAD_TOO_LARGE));
            return Ok(response.map(Full::new));
        }
        Err(BodyRejected::Read(e)) => debug!(error = %e, "failed to read request body"),
    }

    let response = match adapter.serve(&mut parts, Some(remote)).await {
        Some(response) => response,
        None => into_response(Reply::canonical(StatusCode::NOT_FOUND)),
    };

    debug!(status = response.status().as_u16(), "sending response");

    Ok(response.map(Full::new))
}

/// Why a request body was not consumed
#[derive(Debug)]
enum BodyRejected {
    TooLarge,
    Read(Box<dyn StdError + Send + Sync>),
}

/// Read `body` frame by frame and drop it; functions never see it.
///
/// Refuses a body announcing or reaching more than `limit` bytes.
async fn discard_body<B>(body: B, limit: usize) -> Result<(), BodyRejected>
where
    B: Body + Unpin,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    if body.size_hint().lower() > limit as u64 {
        return Err(BodyRejected::TooLarge);
    }

    let mut body = Limited::new(body, limit);
    while let Some(frame) = body.frame().await {
        if let Err(e) = frame {
            if e.is::<LengthLimitError>() {
                return Err(BodyRejected::TooLarge);
            }
            return Err(BodyRejected::Read(e));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
