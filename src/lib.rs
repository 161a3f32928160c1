//! nvpanel: control panel for the NV cloud container hosting service.
//!
//! Two surfaces share one set of view-models: a terminal client (`cli`) and
//! a small server-rendered web gateway (`web`). All data lives behind the
//! hosting REST API; the panel keeps only a bearer token.

pub mod actions;
pub mod activity;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod guard;
pub mod moderation;
pub mod notify;
pub mod profile;
pub mod resources;
pub mod telemetry;
pub mod utils;
pub mod validation;
pub mod web;
