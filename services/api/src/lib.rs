//! Examiner API Library Crate
//!
//! Configuration, shared state, HTTP handlers and routing for the exam chat
//! relay. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod exam_data;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
