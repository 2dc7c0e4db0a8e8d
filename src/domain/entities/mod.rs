//! Core domain entities representing the business data model.
//!
//! # Entity Types
//!
//! - [`Link`] - A short name mapped to a destination URL
//! - [`Domain`] - A hostname that serves short links
//! - [`LinkHistory`] - A recorded visit to a link
//!
//! # Design Pattern
//!
//! Entities come with separate input structs:
//! - `NewLink`, `NewDomain`, `NewLinkHistory` - For creating new records
//! - `LinkPatch`, `UpdateDomain` - For partial updates

pub mod domain;
pub mod link;
pub mod link_history;

pub use domain::{Domain, NewDomain, OrphanPolicy, UpdateDomain};
pub use link::{Link, LinkDomain, LinkPatch, NewLink};
pub use link_history::{Bucket, ClickSummary, LinkHistory, NewLinkHistory};
