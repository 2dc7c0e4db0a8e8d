//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod links;
pub mod redirect;
pub mod stats;

pub use health::health_handler;
pub use links::{create_link_handler, delete_link_handler, update_link_handler};
pub use redirect::redirect_handler;
pub use stats::{history_handler, stats_handler};
