//! Donation platform backend library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod config;
pub mod db;
pub mod dm;
pub mod donors;
pub mod routes;
pub mod state;
pub mod users;
pub mod ws;
