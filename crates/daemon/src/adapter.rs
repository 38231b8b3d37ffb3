// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invocation adapter: HTTP request in, worker reply out

use bytes::Bytes;
use http::request::Parts;
use http::{Response, StatusCode};
use lambda_core::{FunctionConfig, IdSource, InvocationEvent, RandomIds, RequestId};
use lambda_worker::{Executor, Reply};
use std::net::SocketAddr;
use std::sync::Arc;

/// Routes matching requests to one function's executor
pub struct Adapter<S: IdSource = RandomIds> {
    function: FunctionConfig,
    executor: Arc<Executor>,
    ids: S,
}

impl Adapter {
    pub fn new(function: FunctionConfig, executor: Arc<Executor>) -> Self {
        Self::with_ids(function, executor, RandomIds)
    }
}

impl<S: IdSource> Adapter<S> {
    pub fn with_ids(function: FunctionConfig, executor: Arc<Executor>, ids: S) -> Self {
        Self {
            function,
            executor,
            ids,
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    /// Invoke the function for a request.
    ///
    /// Returns `None` when the URI filter rejects the request, leaving the
    /// response to the caller. The request id is reused from the request
    /// extensions, or minted and stored there.
    pub async fn serve(
        &self,
        parts: &mut Parts,
        remote: Option<SocketAddr>,
    ) -> Option<Response<Bytes>> {
        let request_uri = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
        if !self.function.matches_uri(request_uri) {
            tracing::debug!(uri = request_uri, "request skipped by uri filter");
            return None;
        }

        let request_id = RequestId::get_or_mint(&mut parts.extensions, &self.ids);
        let event = InvocationEvent::from_parts(parts, &request_id, remote);

        let reply = match self.executor.dispatch(&event).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    lambda_name = %self.function.name,
                    request_id = %request_id,
                    error = %e,
                    "invocation failed"
                );
                Reply::canonical(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        Some(into_response(reply))
    }
}

pub(crate) fn into_response(reply: Reply) -> Response<Bytes> {
    let mut response = Response::new(reply.body);
    *response.status_mut() = reply.status;
    response
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
