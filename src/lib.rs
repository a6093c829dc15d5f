//! A per-session PostgreSQL wire protocol engine for adapting non-PostgreSQL
//! SQL backends to speak protocol 3.0, modeled on Google's PGAdapter for
//! Cloud Spanner.
//!
//! # Design
//!
//! - **Sans-I/O**: every component here operates on in-memory buffers and
//!   reports what happened; nothing opens a socket, negotiates TLS, or runs
//!   an authentication handshake. A driver built on top owns the listener,
//!   auth, and the actual backend connection.
//! - [`framer`] turns a byte stream into discrete frontend/backend message
//!   frames.
//! - [`value`] converts wire bytes to and from typed values, text and
//!   binary alike, dispatched by OID.
//! - [`classifier`] categorises and lightly rewrites incoming SQL text.
//! - [`session`] drives the simple- and extended-query state machine across
//!   statements, portals, and transactions.
//! - [`copy`] implements the COPY sub-protocol in both directions.

mod error;

pub mod backend_driver;
pub mod classifier;
pub mod copy;
pub mod framer;
pub mod intercept;
pub mod protocol;
pub mod session;
pub mod value;

pub use error::{Error, Result, SqlState, WireError};
