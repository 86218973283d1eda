//! Types shared between the GroBro server crates and the settings client.

pub mod api;
pub mod models;
