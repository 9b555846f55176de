//! Request routing
//!
//! Content-facing code reaches the host only through this module:
//! - **Envelopes**: JSON request, response and event shapes
//! - **Handlers**: async functions registered under `namespace.verb`
//! - **Router**: decodes requests, dispatches them concurrently and owns
//!   the push-event channel

mod channels;
mod envelope;
mod handler;
mod registry;

pub use channels::{create_event_channel, EventReceiver, EventSender, EVENT_CHANNEL_SIZE};
pub use envelope::{Event, Request, Response};
pub use handler::{parse_params, Handler, HandlerError, HandlerResult};
pub use registry::Router;
