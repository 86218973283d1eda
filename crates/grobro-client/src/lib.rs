//! Client side of GroBro profile settings.
//!
//! [`settings::SettingsController`] is the edit-mode state machine behind the
//! profile page; [`backend::HttpBackend`] talks to the GroBro API.

pub mod backend;
pub mod settings;

pub use backend::{ClientError, HttpBackend, PhotoFile, ProfileBackend};
pub use settings::{EditMode, Session, SettingsController, SubmitBlocked, SubmitOutcome};
