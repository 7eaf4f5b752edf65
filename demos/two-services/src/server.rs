//! HTTP/1 accept loop shared by both services.
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Body type of every response.
pub type ResponseBody = Full<Bytes>;

/// Answers requests whose body has already been read in full.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Produce the response to `request`. Failures are expressed as error
    /// responses, never as panics.
    async fn handle(&self, request: Request<Bytes>) -> Response<ResponseBody>;
}

/// A `text/plain` response.
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// `404 Not Found`.
pub fn not_found() -> Response<ResponseBody> {
    text_response(StatusCode::NOT_FOUND, "404 page not found\n")
}

/// Serve connections from `listener` with `handler` until `shutdown`
/// completes. Each connection runs on its own task; connections still open
/// at shutdown are left to finish on their own.
pub async fn serve<H, S>(listener: TcpListener, handler: Arc<H>, shutdown: S) -> io::Result<()>
where
    H: Handler,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => return Ok(()),
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    continue;
                }
            },
        };

        let handler = handler.clone();
        tokio::spawn(async move {
            let service = service_fn(move |request: Request<Incoming>| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(dispatch(handler.as_ref(), request).await) }
            });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(peer = %peer, error = %err, "connection closed with an error");
            }
        });
    }
}

/// Completes on Ctrl-C. If the signal handler cannot be installed the
/// future never completes and the process runs until killed.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn dispatch<H: Handler>(handler: &H, request: Request<Incoming>) -> Response<ResponseBody> {
    let (parts, body) = request.into_parts();
    match body.collect().await {
        Ok(collected) => {
            handler
                .handle(Request::from_parts(parts, collected.to_bytes()))
                .await
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not read request body");
            text_response(StatusCode::BAD_REQUEST, "unreadable request body\n")
        }
    }
}
