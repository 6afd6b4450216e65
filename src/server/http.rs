//! `tiny_http` listener that feeds requests to a `FontService`.

use crate::config::ServerConfig;
use crate::rasterizer::GlyphSource;
use crate::server::{FontService, Reply};
use anyhow::{anyhow, Context, Result};
use log::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tiny_http::{Header, Response, Server};

/// Bind the listener and serve until every worker exits.
///
/// Each of `worker_threads` threads pulls requests from the shared listener
/// and answers them to completion, so a slow render only stalls its own
/// worker.
pub fn serve<S>(service: Arc<FontService<S>>, config: &ServerConfig) -> Result<()>
where
    S: GlyphSource + 'static,
{
    let server = Server::http(&config.bind_address)
        .map_err(|e| anyhow!("Failed to bind {}: {}", config.bind_address, e))?;
    let server = Arc::new(server);
    info!(
        "HttpServer: Listening on http://{} with {} worker(s)",
        config.bind_address,
        config.worker_threads.max(1)
    );

    let workers = (0..config.worker_threads.max(1))
        .map(|id| {
            let server = Arc::clone(&server);
            let service = Arc::clone(&service);
            thread::Builder::new()
                .name(format!("http-worker-{}", id))
                .spawn(move || worker_loop(id, &server, &service))
                .with_context(|| format!("Failed to spawn HTTP worker {}", id))
        })
        .collect::<Result<Vec<_>>>()?;

    for worker in workers {
        if worker.join().is_err() {
            error!("HttpServer: A worker thread panicked");
        }
    }
    Ok(())
}

fn worker_loop<S: GlyphSource>(id: usize, server: &Server, service: &FontService<S>) {
    debug!("HttpServer: Worker {} started", id);
    for request in server.incoming_requests() {
        let reply = contain_panic(request.url(), || {
            service.handle(request.method(), request.url())
        });
        let response = to_response(reply);
        if let Err(e) = request.respond(response) {
            warn!("HttpServer: Failed to send response: {}", e);
        }
    }
    debug!("HttpServer: Worker {} stopped", id);
}

/// Run `handle`, turning a panic into a 500 so the worker keeps serving.
fn contain_panic(url: &str, handle: impl FnOnce() -> Reply) -> Reply {
    panic::catch_unwind(AssertUnwindSafe(handle)).unwrap_or_else(|_| {
        error!("HttpServer: Handler panicked on {}", url);
        Reply::error(500, "Internal Server Error")
    })
}

fn to_response(reply: Reply) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    for (name, value) in &reply.headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => warn!("HttpServer: Dropping invalid header {}: {:?}", name, value),
        }
    }
    response
}
