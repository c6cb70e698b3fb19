//! Local text-to-video generation service.
//!
//! Prompts submitted over HTTP become rows in a SQLite job table. A separate
//! worker process claims them one at a time, renders them through an external
//! diffusion inference service, and records the resulting video and thumbnail
//! paths for clients polling the API.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod worker;
