//! Message vocabulary shared by the actor engine, supervisor and registry.
//!
//! Every `Behavior::Message` implements [`Message`]; the engine uses
//! `MESSAGE_TYPE` purely for tracing spans and monitoring events, never for
//! runtime dispatch (message routing is by Rust type, not by this string).

pub mod traits;

pub use traits::{Message, MessagePriority};
