//! Hand-rolled hyper 1.x HTTP/SSE server (§6).
//!
//! Grounded on `guribe94-bog/bog-core/src/monitoring/server.rs`'s exact
//! shape: bind a `TcpListener`, accept in a loop, spawn one task per
//! connection, `http1::Builder::new().serve_connection` over a
//! `service_fn`, manual `(Method, path)` routing. That example logs via
//! `tracing` and propagates errors via `anyhow`; neither crate is in
//! this package's dependency stack, so this module uses the teacher's
//! own `println!`/`eprintln!` + `DynError` idiom instead.

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::engine::scheduler::Scheduler;
use crate::engine::settings::SettingsPatch;
use crate::engine::{error::EngineError, full_pipeline, reprocess, streaming_pipeline, SharedEngine};
use crate::http::sse;
use crate::utils::ts_hm;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, Infallible>;

/// Binds `addr` and serves every route in §6 until the process exits.
/// Accept errors are logged and do not tear down the listener, matching
/// the teacher's connector reconnect posture of "log and keep going".
pub async fn serve(addr: SocketAddr, engine: SharedEngine) -> Result<(), crate::DynError> {
    let listener = TcpListener::bind(addr).await?;
    println!("[{}] [HTTP] listening on {}", ts_hm(), addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                eprintln!("[{}] [HTTP] accept failed: {}", ts_hm(), e);
                continue;
            }
        };

        let engine = engine.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let engine = engine.clone();
                async move { route(req, engine).await }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                eprintln!("[{}] [HTTP] connection error from {}: {}", ts_hm(), peer, e);
            }
        });
    }
}

async fn route(req: Request<Incoming>, engine: SharedEngine) -> Result<Response<BoxBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    println!("[{}] [HTTP] {} {}", ts_hm(), method, path);

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/status") => status(&engine).await,
        (&Method::GET, "/opportunities") => opportunities(&engine).await,
        (&Method::POST, "/force-full") => force_full(&engine).await,
        (&Method::POST, "/force-incremental") => force_incremental(&engine).await,
        (&Method::POST, "/settings") => settings(req, &engine).await,
        (&Method::POST, "/stream") => stream(&engine).await,
        _ => not_found(),
    };

    Ok(response)
}

async fn status(engine: &SharedEngine) -> Response<BoxBody> {
    let gate_status = engine.gate.status().await;
    json_response(StatusCode::OK, &gate_status)
}

async fn opportunities(engine: &SharedEngine) -> Response<BoxBody> {
    match engine.data_store.load_opportunities().await {
        Ok(Some(list)) => json_response(StatusCode::OK, &list),
        Ok(None) => json_response(StatusCode::OK, &serde_json::json!({ "metadata": null, "items": [] })),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn force_full(engine: &SharedEngine) -> Response<BoxBody> {
    match full_pipeline::run(engine).await {
        Ok(list) => json_response(StatusCode::ACCEPTED, &serde_json::json!({ "status": "accepted", "count": list.len() })),
        Err(EngineError::GateBusy) => error_response(StatusCode::CONFLICT, "gate busy"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn force_incremental(engine: &SharedEngine) -> Response<BoxBody> {
    match Scheduler::force_incremental(engine).await {
        Ok(list) => json_response(StatusCode::ACCEPTED, &serde_json::json!({ "status": "accepted", "count": list.len() })),
        Err(EngineError::GateBusy) => error_response(StatusCode::CONFLICT, "gate busy"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn settings(req: Request<Incoming>, engine: &SharedEngine) -> Response<BoxBody> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let patch: SettingsPatch = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("invalid settings body: {}", e)),
    };

    match reprocess::apply_and_reprocess(engine, patch).await {
        Ok(list) => json_response(StatusCode::OK, &serde_json::json!({ "count": list.len() })),
        Err(EngineError::ConfigInvalid(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(EngineError::GateBusy) => error_response(StatusCode::CONFLICT, "gate busy"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn stream(engine: &SharedEngine) -> Response<BoxBody> {
    match streaming_pipeline::start(engine.clone()).await {
        Ok(handle) => {
            let body = sse::to_sse_body(handle.receiver).boxed();
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/event-stream")
                .header("Cache-Control", "no-cache")
                .body(body)
                .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to build stream response"))
        }
        Err(EngineError::GateBusy) => error_response(StatusCode::CONFLICT, "stream already has a subscriber"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn not_found() -> Response<BoxBody> {
    error_response(StatusCode::NOT_FOUND, "not found")
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    match serde_json::to_vec(body) {
        Ok(bytes) => Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(bytes)).boxed())
            .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to build response")),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<BoxBody> {
    let body = serde_json::json!({ "error": message });
    let bytes = serde_json::to_vec(&body).unwrap_or_else(|_| b"{\"error\":\"internal error\"}".to_vec());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(bytes)).boxed())
        .expect("building an error response must not fail")
}

