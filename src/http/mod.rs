//! The consumed HTTP/SSE surface (§6): out-of-scope-as-a-core-component
//! per spec.md §1, but someone has to serve it. Hand-rolled on hyper
//! 1.x rather than a framework, grounded on
//! `guribe94-bog/bog-core/src/monitoring/server.rs`'s accept-loop +
//! spawn-per-connection + manual path match shape — adapted to this
//! crate's `println!`/`DynError` idiom instead of that pack's
//! `tracing`/`anyhow` stack, since the teacher carries neither.

pub mod server;
pub mod sse;

pub use server::serve;
