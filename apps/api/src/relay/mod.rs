//! Evaluation Relay: one outbound streamed completion call per request,
//! re-framed into the client event stream.
//!
//! Layering, bottom-up:
//! - `line_decoder`: bytes → complete lines, safe across chunk boundaries
//! - `events`: line → `StreamEvent`, and client frame encoding
//! - `reframer`: pure state machine from upstream chunks to client frames
//! - `stream`: drives the upstream body lazily and owns the connection
//! - `handlers`: `POST /api/evaluate`

pub mod events;
pub mod handlers;
pub mod line_decoder;
pub mod reframer;
pub mod stream;

pub use events::{ClientEvent, RelayFailure, StreamEvent, DONE_SENTINEL};
pub use stream::{ClientStream, EvaluationRelay, RelayError, RelaySettings};
