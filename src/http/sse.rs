//! Server-Sent-Events framing for the Streaming Pipeline (§4.10, §6
//! `POST /stream`).
//!
//! Grounded on the "bounded channel, producer/consumer" shape Design
//! Notes §9 calls for: turns a `tokio::sync::mpsc::Receiver<StreamEvent>`
//! into a `text/event-stream` body via `futures_util::stream::unfold`,
//! avoiding a `tokio-stream` dependency the teacher's stack doesn't
//! carry.

use std::convert::Infallible;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::Stream;
use http_body_util::StreamBody;
use hyper::body::Frame;
use tokio::sync::mpsc;

use crate::engine::streaming_pipeline::StreamEvent;

type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame<Bytes>, Infallible>> + Send>>;
pub type SseBody = StreamBody<FrameStream>;

/// One `data: <json>\n\n` frame per event, matching spec.md §4.10's
/// event sequence. A serialization failure is logged and the event is
/// dropped rather than tearing down the whole stream.
pub fn to_sse_body(receiver: mpsc::Receiver<StreamEvent>) -> SseBody {
    let stream = futures_util::stream::unfold(receiver, |mut rx| async move {
        loop {
            let event = rx.recv().await?;
            match serde_json::to_string(&event) {
                Ok(json) => {
                    let frame = Frame::data(Bytes::from(format!("data: {}\n\n", json)));
                    return Some((Ok(frame), rx));
                }
                Err(e) => {
                    eprintln!("[{}] [SSE] failed to serialize stream event: {}", crate::utils::ts_hm(), e);
                    continue;
                }
            }
        }
    });
    StreamBody::new(Box::pin(stream))
}
