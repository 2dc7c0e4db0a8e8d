//! Domain layer containing business entities and logic.
//!
//! Defines entities, repository interfaces, and the click pipeline
//! independent of infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click tracking event model
//! - [`click_worker`] - Asynchronous click processing worker
//!
//! # Click Processing Flow
//!
//! 1. The redirect path resolves a code and answers immediately
//! 2. A [`click_event::ClickEvent`] is pushed to a bounded channel
//! 3. [`click_worker::run_click_worker`] hands events to a [`click_worker::ClickHandler`]
//! 4. The handler enriches the event and persists it via [`repositories::HistoryRepository`]

pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod repositories;
