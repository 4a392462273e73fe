//! # chime-core
//!
//! Foundation types for the Chime reminder scheduling core.
//!
//! This crate provides the shared vocabulary the other Chime crates depend on:
//!
//! - **Branded IDs**: [`ids::TaskId`], [`ids::EventId`], [`ids::BaseId`], and
//!   [`ids::InstanceId`] as newtypes over the string identifier scheme
//! - **Domain model**: [`model::Reminder`], [`model::ReminderPayload`],
//!   [`model::StoredReminder`], [`model::Task`], [`model::CalendarEvent`]
//! - **Clock**: [`clock::Clock`] abstraction over "now" in a configured zone
//! - **Logging**: [`logging::init`] tracing setup for binaries
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other chime crates.

#![deny(unsafe_code)]

pub mod clock;
pub mod ids;
pub mod logging;
pub mod model;
