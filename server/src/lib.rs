//! Relay server for the herald instant-messaging protocol.
//!
//! One task per connection runs the handshake/auth/serve state machine in
//! [`connection`]; the shared account directory in [`store`] is the only
//! cross-session state, and the live-session [`registry`] exists for
//! shutdown fan-out, never for routing.

mod accept_loop;
mod connection;
mod error;
pub mod persist;
mod registry;
pub mod signal;
mod state;
mod store;

pub use accept_loop::{run, run_until};
pub use error::BoxError;
pub use store::AccountStore;
