//! HTTP protocol implementation.
//!
//! An HTTP/1.1 request/response pipeline with keep-alive connections,
//! aiming for correctness against RFC 2616/2396 request framing.
//!
//! # Architecture
//!
//! - **`parser`**: recursive descent parser from the connection's byte
//!   stream to a [`request::Request`] value
//! - **`request`**: the immutable parsed request
//! - **`response`**: the response builder value and status/reason table
//! - **`rules`**: the ordered rule chain that turns a raw handler response
//!   into a protocol-compliant one
//! - **`writer`**: serializes a finalized response onto the wire
//! - **`connection`**: the per-connection session loop
//!
//! # Session state machine
//!
//! Each client connection loops through:
//!
//! ```text
//!        Reading ──parse──▶ Handling ──route──▶ Writing
//!           ▲                                      │
//!           │            Connection != close       │
//!           └──────────────────────────────────────┤
//!                                                  │ Connection: close,
//!                                                  ▼ I/O error, shutdown
//!                                                Closed
//! ```
//!
//! A stream-fatal parse condition (timeout, EOF, transport failure) goes
//! straight from Reading to Closed without a response.

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod rules;
pub mod writer;
