//! Typed event dispatch from inbound envelopes to subscriber handlers.

pub mod dispatcher;

pub use dispatcher::{EventDispatcher, Handler, Subscription};
