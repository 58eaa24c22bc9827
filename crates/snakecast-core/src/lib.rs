// Library root: re-exports all modules so the host binary and integration
// tests can reach the public API.

pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod expand;
pub mod features;
pub mod model;
pub mod players;
pub mod results;
pub mod session;
pub mod sources;
pub mod summary;
