//! Hyper accept loop

use super::error::{bad_request, json_error};
use super::router::{route, Incoming};
use super::utils::Resp;
use crate::config::ServerConfig;
use crate::service::LeadService;
use anyhow::Context;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Leadpool HTTP server
pub struct LeadpoolServer {
    service: Arc<LeadService>,
    config: ServerConfig,
}

impl LeadpoolServer {
    pub fn new(service: LeadService, config: ServerConfig) -> Self {
        Self { service: Arc::new(service), config }
    }

    pub fn service(&self) -> &Arc<LeadService> {
        &self.service
    }

    /// Bind `host:port` and serve until the process is interrupted
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.config.bind_addr();
        let listener =
            TcpListener::bind(&addr).await.with_context(|| format!("Failed to bind to {}", addr))?;
        self.serve_with_shutdown(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// In-flight connections are left to finish on their own tasks.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr().context("Listener has no local address")?;
        log::info!("Leadpool listening on http://{}", local);

        let max_body = self.config.max_body_size;
        tokio::pin!(shutdown);
        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        log::warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    log::info!("Shutting down listener on {}", local);
                    return Ok(());
                }
            };

            let service = self.service.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let handler = service_fn(move |req| {
                    let service = service.clone();
                    async move { Ok::<_, Infallible>(handle(&service, req, max_body).await) }
                });
                if let Err(e) = http1::Builder::new().serve_connection(io, handler).await {
                    log::debug!("Connection from {} closed with error: {}", peer, e);
                }
            });
        }
    }
}

/// Read the body within `max_body` bytes and dispatch
pub async fn handle<B>(service: &LeadService, req: Request<B>, max_body: usize) -> Resp
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let resp = match Limited::new(body, max_body).collect().await {
        Ok(collected) => {
            let incoming = Incoming {
                method: &parts.method,
                path: parts.uri.path(),
                query: parts.uri.query(),
                headers: &parts.headers,
                body: collected.to_bytes(),
            };
            route(service, incoming).await
        }
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => json_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            &format!("Request body exceeds {} bytes", max_body),
        ),
        Err(e) => bad_request("invalid_body", &format!("Failed to read request body: {}", e)),
    };

    log::debug!(
        "{} {} -> {} in {:?}",
        parts.method,
        parts.uri.path(),
        resp.status().as_u16(),
        started.elapsed()
    );
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use bytes::Bytes;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let harness = Harness::new();
        let req = Request::post("/api/emails")
            .body(Full::new(Bytes::from(vec![b'x'; 64])))
            .unwrap();
        let resp = handle(&harness.service, req, 16).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_request_within_limit_is_routed() {
        let harness = Harness::new();
        let req = Request::post("/api/emails")
            .body(Full::new(Bytes::from_static(br#"{"recipient":"a@b.c","subject":"Hi"}"#)))
            .unwrap();
        let resp = handle(&harness.service, req, 1024).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let harness = Harness::new();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = LeadpoolServer::new(harness.service, ServerConfig::default());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(server.serve_with_shutdown(listener, async {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }
}
