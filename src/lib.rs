// lib.rs
// Library surface so integration tests can drive the state layer and
// routes directly.

pub mod error;
pub mod models;
pub mod money;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
pub mod status;
