//! Session Engine (§4.4): the per-session simple- and extended-query state
//! machine, transaction state, named statements/portals, and dispatch
//! batching.

mod copy_state;
pub mod engine;
pub mod params;
pub mod portal;
pub mod queue;
pub mod statement;
pub mod transaction;

pub use engine::{ProtocolState, Session};
pub use params::SessionParams;
pub use portal::Portal;
pub use statement::NamedStatement;
pub use transaction::TransactionState;
