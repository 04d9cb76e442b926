//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: the view
//! job wire model, the view registry, and the destination client seam.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Lifetime Model
//! - `Registry` is loaded once at startup and is read-only afterwards
//! - Every batch type is created per request and discarded with the response

mod destination;
mod error;
mod registry;
mod view;

pub use destination::*;
pub use error::*;
pub use registry::*;
pub use view::*;
