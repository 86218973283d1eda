//! Profile settings page: one edit mode at a time, validated locally before
//! anything is sent.
//!
//! The controller keeps the last profile fetched from the server (read model)
//! apart from the form the user is typing into (write model). A successful
//! submission replaces the snapshot with a fresh fetch.

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use grobro_types::api::{ProfileFields, UpdateProfileRequest};
use grobro_types::models::Profile;

use crate::backend::{ClientError, PhotoFile, ProfileBackend};

pub const MIN_PASSWORD_LEN: usize = 5;
pub const MIN_STAND_NAME_LEN: usize = 5;

/// The signed-in user, handed to the controller by whoever owns the login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Password,
    Location,
    StandName,
    ProfilePhoto,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordForm {
    pub old_pass: String,
    pub new_pass: String,
    pub confirm_pass: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationForm {
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandNameForm {
    pub stand_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoForm {
    pub bio: String,
    pub file: Option<PhotoFile>,
}

/// The form for the mode being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingEdit {
    Password(PasswordForm),
    Location(LocationForm),
    StandName(StandNameForm),
    ProfilePhoto(PhotoForm),
}

impl PendingEdit {
    fn seeded(mode: EditMode, profile: &Profile) -> Self {
        match mode {
            EditMode::Password => Self::Password(PasswordForm::default()),
            EditMode::Location => Self::Location(LocationForm {
                city: profile.city.clone().unwrap_or_default(),
                state: profile.state.clone().unwrap_or_default(),
            }),
            EditMode::StandName => Self::StandName(StandNameForm {
                stand_name: profile.stand_name.clone().unwrap_or_default(),
            }),
            EditMode::ProfilePhoto => Self::ProfilePhoto(PhotoForm {
                bio: profile.bio.clone().unwrap_or_default(),
                file: None,
            }),
        }
    }

    pub fn mode(&self) -> EditMode {
        match self {
            Self::Password(_) => EditMode::Password,
            Self::Location(_) => EditMode::Location,
            Self::StandName(_) => EditMode::StandName,
            Self::ProfilePhoto(_) => EditMode::ProfilePhoto,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SettingsState {
    #[default]
    Idle,
    Editing(PendingEdit),
}

/// Validation flags shown next to the form fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsErrors {
    pub general: bool,
    pub old_password: bool,
    pub new_password: bool,
    pub confirm_password: bool,
    pub mismatched_password: bool,
    pub same_password: bool,
    pub location: bool,
    pub stand: bool,
    pub profile: bool,
}

impl SettingsErrors {
    pub fn any(&self) -> bool {
        *self != Self::default()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitBlocked {
    #[error("no settings mode is open")]
    NotEditing,
    #[error("a submission is already in flight")]
    InFlight,
    #[error("the form has validation errors")]
    Invalid,
}

/// Work produced by [`SettingsController::start_submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Ready to send as-is.
    Update(UpdateProfileRequest),
    /// The file must be uploaded first; its link becomes `avatar_link`.
    Photo {
        user_id: Uuid,
        file: PhotoFile,
        bio: Option<String>,
    },
}

impl Submission {
    /// Run the submission against `backend` and fetch the updated profile.
    pub async fn run<B: ProfileBackend>(self, backend: &B) -> Result<Profile, ClientError> {
        let request = match self {
            Self::Update(request) => request,
            Self::Photo { user_id, file, bio } => {
                let avatar_link = backend.upload_avatar(&file).await?;
                UpdateProfileRequest {
                    id: user_id,
                    fields: ProfileFields::ProfilePhoto { avatar_link, bio },
                }
            }
        };

        let response = backend.update_profile(&request).await?;
        if !response.success {
            return Err(ClientError::Rejected);
        }
        backend.fetch_profile(request.id).await
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Saved,
    Failed(ClientError),
}

#[derive(Debug)]
pub struct SettingsController {
    session: Session,
    state: SettingsState,
    errors: SettingsErrors,
    panel_open: bool,
    in_flight: bool,
}

impl SettingsController {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            state: SettingsState::Idle,
            errors: SettingsErrors::default(),
            panel_open: false,
            in_flight: false,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.session.user
    }

    pub fn state(&self) -> &SettingsState {
        &self.state
    }

    pub fn errors(&self) -> &SettingsErrors {
        &self.errors
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn mode(&self) -> Option<EditMode> {
        match &self.state {
            SettingsState::Idle => None,
            SettingsState::Editing(edit) => Some(edit.mode()),
        }
    }

    /// Whether the profile page being viewed belongs to the signed-in user.
    pub fn owns_profile(&self, viewed_id: Uuid) -> bool {
        self.session.user.id == viewed_id
    }

    pub fn missing_stand(&self) -> bool {
        !self.session.user.has_stand()
    }

    /// Close the open mode if there is one, otherwise show or hide the panel.
    pub fn toggle_panel(&mut self) {
        if self.in_flight {
            return;
        }
        if self.mode().is_some() {
            self.state = SettingsState::Idle;
            self.errors = SettingsErrors::default();
        } else {
            self.panel_open = !self.panel_open;
        }
    }

    /// Enter `mode`, dropping whatever was being edited before.
    pub fn begin(&mut self, mode: EditMode) -> Result<(), SubmitBlocked> {
        if self.in_flight {
            return Err(SubmitBlocked::InFlight);
        }
        debug!(?mode, "entering settings mode");
        self.errors = SettingsErrors::default();
        self.state = SettingsState::Editing(PendingEdit::seeded(mode, &self.session.user));
        self.panel_open = true;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), SubmitBlocked> {
        if self.in_flight {
            return Err(SubmitBlocked::InFlight);
        }
        self.state = SettingsState::Idle;
        self.errors = SettingsErrors::default();
        Ok(())
    }

    pub fn password_form_mut(&mut self) -> Option<&mut PasswordForm> {
        match &mut self.state {
            SettingsState::Editing(PendingEdit::Password(form)) => Some(form),
            _ => None,
        }
    }

    pub fn location_form_mut(&mut self) -> Option<&mut LocationForm> {
        match &mut self.state {
            SettingsState::Editing(PendingEdit::Location(form)) => Some(form),
            _ => None,
        }
    }

    pub fn stand_form_mut(&mut self) -> Option<&mut StandNameForm> {
        match &mut self.state {
            SettingsState::Editing(PendingEdit::StandName(form)) => Some(form),
            _ => None,
        }
    }

    pub fn photo_form_mut(&mut self) -> Option<&mut PhotoForm> {
        match &mut self.state {
            SettingsState::Editing(PendingEdit::ProfilePhoto(form)) => Some(form),
            _ => None,
        }
    }

    /// Validate the open form and, if it passes, hand back the work to send.
    /// The controller stays in flight until [`finish_submit`](Self::finish_submit).
    pub fn start_submit(&mut self) -> Result<Submission, SubmitBlocked> {
        if self.in_flight {
            return Err(SubmitBlocked::InFlight);
        }

        let user = &self.session.user;
        let edit = match &mut self.state {
            SettingsState::Idle => return Err(SubmitBlocked::NotEditing),
            SettingsState::Editing(edit) => edit,
        };

        let mut errors = SettingsErrors::default();
        let submission = match edit {
            PendingEdit::Password(form) => {
                errors.old_password = form.old_pass.chars().count() < MIN_PASSWORD_LEN;
                errors.new_password = form.new_pass.chars().count() < MIN_PASSWORD_LEN;
                errors.confirm_password = form.confirm_pass.chars().count() < MIN_PASSWORD_LEN;
                errors.mismatched_password = form.new_pass != form.confirm_pass;
                errors.same_password = form.new_pass == form.old_pass;
                errors.general = errors.any();

                Submission::Update(UpdateProfileRequest {
                    id: user.id,
                    fields: ProfileFields::Password {
                        old_pass: form.old_pass.clone(),
                        new_pass: form.new_pass.clone(),
                    },
                })
            }
            PendingEdit::Location(form) => {
                errors.location = form.city.trim().is_empty() || form.state.trim().is_empty();

                Submission::Update(UpdateProfileRequest {
                    id: user.id,
                    fields: ProfileFields::Location {
                        city: form.city.trim().to_string(),
                        state: form.state.trim().to_string(),
                    },
                })
            }
            PendingEdit::StandName(form) => {
                if form.stand_name.trim().is_empty() {
                    form.stand_name = format!("{}'s Stand", user.first_name);
                }
                errors.stand = form.stand_name.trim().chars().count() < MIN_STAND_NAME_LEN;

                Submission::Update(UpdateProfileRequest {
                    id: user.id,
                    fields: ProfileFields::StandName {
                        stand_name: form.stand_name.trim().to_string(),
                    },
                })
            }
            PendingEdit::ProfilePhoto(form) => match &form.file {
                Some(file) => Submission::Photo {
                    user_id: user.id,
                    file: file.clone(),
                    bio: Some(form.bio.clone()).filter(|bio| !bio.trim().is_empty()),
                },
                None => {
                    errors.profile = true;
                    self.errors = errors;
                    return Err(SubmitBlocked::Invalid);
                }
            },
        };

        self.errors = errors;
        if errors.any() {
            debug!(?errors, "settings form rejected locally");
            return Err(SubmitBlocked::Invalid);
        }

        self.in_flight = true;
        Ok(submission)
    }

    /// Apply the result of a submission started with
    /// [`start_submit`](Self::start_submit). `result` carries the re-fetched
    /// profile on success.
    pub fn finish_submit(&mut self, result: Result<Profile, ClientError>) -> SubmitOutcome {
        self.in_flight = false;
        match result {
            Ok(profile) => {
                debug!(user_id = %profile.id, "settings saved");
                self.session.user = profile;
                self.state = SettingsState::Idle;
                self.errors = SettingsErrors::default();
                self.panel_open = false;
                SubmitOutcome::Saved
            }
            Err(e) => {
                warn!("settings update failed: {}", e);
                SubmitOutcome::Failed(e)
            }
        }
    }

    /// Validate, send and apply in one go.
    pub async fn submit<B: ProfileBackend>(&mut self, backend: &B) -> Result<SubmitOutcome, SubmitBlocked> {
        let submission = self.start_submit()?;
        let result = submission.run(backend).await;
        Ok(self.finish_submit(result))
    }
}
