// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod app;
pub mod auth;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod gateway;
pub mod player;
pub mod protocol;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;
