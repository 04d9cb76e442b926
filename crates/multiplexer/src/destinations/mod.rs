//! Destination client implementations
//!
//! Contains HttpDestination and MockDestination.

mod http;
mod mock;

pub use self::http::{HttpDestination, HttpDestinationConfig};
pub use self::mock::{MockBehavior, MockCall, MockDestination};
