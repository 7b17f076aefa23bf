//! Self-order gateway backend.
//!
//! Companion service for a restaurant self-ordering deployment. It brings
//! the customer back from the external payment page with a usable access
//! token, serves the per-visit order summary, and owns the order/session
//! state behind the "continue ordering" and "pay per order" flows.

pub mod db;
pub mod models;
pub mod orders;
pub mod resolver;
pub mod server;
pub mod sessions;
pub mod store;

pub use resolver::ReferenceResolver;
pub use sessions::{OrderSummary, SessionGroup};
