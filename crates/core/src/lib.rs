//! Protocol logic for the EventSub webhook gateway.
//!
//! Everything in this crate is free of HTTP and runtime concerns: the app
//! crate extracts headers and bodies, then drives these pieces in order.
pub mod classifier;
pub mod dedupe;
pub mod handshake;
pub mod signature;
pub mod types;
