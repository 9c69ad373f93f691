//! Wire-level contract for the SCRUM coordination facade: the response
//! envelope, the tagged request enum, and the dispatcher that bridges the
//! two to `scrum_core::Facade`. Transport framing (stdio, HTTP, WebSocket)
//! lives outside this crate.

pub mod dispatch;
pub mod envelope;
pub mod requests;

pub use dispatch::{ClaimTtlBounds, FacadeDispatcher};
pub use envelope::{Envelope, ErrorBody, EventFrame};
pub use requests::Request;
