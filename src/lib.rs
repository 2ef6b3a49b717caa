#![forbid(unsafe_code)]

//! Client-side workflows for a smart parcel-locker service.

pub mod app;
pub mod backend;
pub mod config;
pub mod controller;
pub mod errors;
pub mod models;
pub mod realtime;
pub mod ui;
pub mod workflow;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
