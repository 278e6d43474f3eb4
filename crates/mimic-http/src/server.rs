//! HTTP/1 front end.
//!
//! Each request is converted into a [`RequestMessage`], matched against the
//! mapping store and answered by the winning mapping's response provider.
//! The scenario transition of the winning mapping is committed only after
//! its response was produced.

use crate::backends::InMemoryScenarioStore;
use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::mapping::MappingStore;
use crate::mapping_matcher::MappingMatcher;
use crate::metrics;
use crate::request::RequestMessage;
use crate::response::{no_match_body, ResponseBuilder};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Header naming the closest partial mapping on a 404.
pub const PARTIAL_MAPPING_HEADER: &str = "x-mimic-partial-mapping";

/// Build the matcher for a config: an in-memory scenario store plus every
/// configured mapping.
pub fn build_matcher(config: &ServerConfig) -> Result<Arc<MappingMatcher>, ConfigError> {
    let store = Arc::new(MappingStore::new(Arc::new(InMemoryScenarioStore::new())));
    for mapping in config.build_mappings()? {
        store.upsert(mapping);
    }
    info!(mappings = store.len(), "Mappings loaded");
    Ok(Arc::new(MappingMatcher::new(
        store,
        config.matching_options(),
    )))
}

/// A bound, running server.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            warn!("Server task ended abnormally: {}", e);
        }
    }
}

/// Bind `addr` and start serving in a background task.
pub async fn serve(
    addr: SocketAddr,
    matcher: Arc<MappingMatcher>,
) -> std::io::Result<RunningServer> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Mimic listening on {}", local_addr);

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, client_addr)) => {
                            let matcher = Arc::clone(&matcher);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let matcher = Arc::clone(&matcher);
                                    async move { handle_request(req, matcher, client_addr).await }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!("Connection error from {}: {}", client_addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on {}: {}", local_addr, e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Server on {} shutting down", local_addr);
                    break;
                }
            }
        }
    });

    Ok(RunningServer {
        local_addr,
        shutdown_tx,
        handle,
    })
}

/// Handle one hyper request.
pub async fn handle_request(
    req: Request<Incoming>,
    matcher: Arc<MappingMatcher>,
    client_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut request =
        RequestMessage::new(parts.method.as_str(), url).with_client_ip(client_addr.ip().to_string());
    for (name, value) in &parts.headers {
        request.add_header(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body from {}: {}", client_addr, e);
            metrics::record_request(parts.method.as_str(), StatusCode::BAD_REQUEST.as_u16());
            return Ok(ResponseBuilder::new(StatusCode::BAD_REQUEST)
                .header("content-type", "application/json")
                .body(r#"{"status":"Request body could not be read"}"#)
                .build_full());
        }
    };
    let request = request.with_body_bytes(bytes);

    Ok(respond(&matcher, &request).await)
}

/// Answer a request from the mapping store.
pub async fn respond(matcher: &MappingMatcher, request: &RequestMessage) -> Response<Full<Bytes>> {
    let best = matcher.find_best_match(request);

    let Some(full) = best.full else {
        let mut builder = ResponseBuilder::new(StatusCode::NOT_FOUND)
            .header("content-type", "application/json")
            .body(no_match_body());
        if let Some(partial) = &best.partial {
            builder = builder.header(PARTIAL_MAPPING_HEADER, &partial.mapping.guid.to_string());
        }
        metrics::record_request(&request.method, StatusCode::NOT_FOUND.as_u16());
        return builder.build_full();
    };

    let mapping = full.mapping;
    let response = match mapping.provider.provide(request) {
        Ok(response) => response,
        Err(e) => {
            error!(mapping = %mapping.guid, "Response provider failed: {}", e);
            return internal_error(request);
        }
    };

    let delay = response.delay;
    let response = match response.into_hyper() {
        Ok(response) => response,
        Err(e) => {
            error!(mapping = %mapping.guid, "Response could not be built: {}", e);
            return internal_error(request);
        }
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    matcher.commit_scenario_transition(&mapping);
    metrics::record_request(&request.method, response.status().as_u16());
    response
}

fn internal_error(request: &RequestMessage) -> Response<Full<Bytes>> {
    metrics::record_request(&request.method, StatusCode::INTERNAL_SERVER_ERROR.as_u16());
    ResponseBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
        .header("content-type", "application/json")
        .body(r#"{"status":"Response generation failed"}"#)
        .build_full()
}
