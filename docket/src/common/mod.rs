//! Shared types and helpers: field values, constants, the event bus and
//! small concurrency/time utilities.

mod constants;
mod event_bus;
mod sort_order;
pub mod util;
mod value;

pub use constants::*;
pub use event_bus::*;
pub use sort_order::*;
pub use util::*;
pub use value::*;
