//! The hyper accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use daedalus_core::{ErrorKind, HttpError};
use daedalus_telemetry::{init_logging, TelemetryError};
use http::{Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use tokio::net::{TcpListener, TcpStream};

use crate::app::App;
use crate::error::AppError;
use crate::shutdown::ConnectionTracker;

impl App {
    /// Sets up logging, binds the configured address and serves until
    /// [`App::stop`] is called.
    ///
    /// The app is shared so that another task holding a clone of the `Arc`
    /// can call [`App::stop`] while it serves.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Logging`] for an invalid log filter and
    /// [`AppError::Bind`] if the address cannot be bound.
    pub async fn start(self: Arc<Self>) -> Result<(), AppError> {
        match init_logging(&self.logging) {
            Ok(()) => {}
            Err(TelemetryError::LoggingInit(reason)) => {
                tracing::debug!(%reason, "keeping the installed tracing subscriber");
            }
            Err(err) => return Err(err.into()),
        }

        let addr = self.serve.bind_addr.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener until [`App::stop`] is called.
    ///
    /// On stop the listener is closed, open connections are asked to finish
    /// their in-flight requests, and the call returns once they have closed
    /// or the shutdown timeout has passed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Serve`] if the listener address cannot be read.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), AppError> {
        self.router.freeze();
        let local_addr = listener.local_addr().map_err(AppError::Serve)?;

        tracing::info!(environment = %self.env(), routes = self.routes().len(), "{}", self.banner());
        tracing::info!("Listening on {local_addr}");

        let background = self.background.clone();
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                () = background.cancelled() => {
                    tracing::info!("stopped accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let token = tracker.acquire();
                        let app = Arc::clone(&self);
                        tokio::spawn(async move {
                            app.serve_connection(stream, remote_addr).await;
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
            }
        }

        drop(listener);
        let open = tracker.drain(self.serve.shutdown_timeout).await;
        tracing::info!(open, "server stopped");
        Ok(())
    }

    async fn serve_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr) {
        let mut builder = Builder::new(TokioExecutor::new());
        if !self.serve.http2 {
            builder = builder.http1_only();
        }

        let background = self.background.clone();
        let service = service_fn(move |request: Request<Incoming>| {
            let app = Arc::clone(&self);
            async move { Ok::<_, std::convert::Infallible>(app.handle(request, remote_addr).await) }
        });

        let connection = builder.serve_connection(TokioIo::new(stream), service);
        tokio::pin!(connection);

        let result = tokio::select! {
            result = connection.as_mut() => result,
            () = background.cancelled() => {
                connection.as_mut().graceful_shutdown();
                connection.await
            }
        };
        if let Err(e) = result {
            tracing::debug!(%remote_addr, error = %e, "connection closed with error");
        }
    }

    async fn handle(&self, request: Request<Incoming>, remote_addr: SocketAddr) -> Response<Full<Bytes>> {
        let (parts, body) = request.into_parts();
        match collect_body(body, self.serve.max_body_bytes).await {
            Ok(body) => {
                self.dispatch(Request::from_parts(parts, body), Some(remote_addr))
                    .await
            }
            Err(err) => {
                let mut ctx = self.pool.acquire();
                ctx.error(&err);
                ctx.take_response()
            }
        }
    }
}

async fn collect_body(body: Incoming, limit: usize) -> Result<Bytes, HttpError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(HttpError::new(
            ErrorKind::PayloadTooLarge,
            format!("request body exceeds {limit} bytes"),
        )),
        Err(err) => Err(HttpError::bad_request(format!(
            "failed to read request body: {err}"
        ))),
    }
}
