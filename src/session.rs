//! In-memory session state and its single update function.
//!
//! State is never mutated in place: [`reduce`] takes the current state and an
//! [`Action`] and returns the next state. The selection's source image doubles
//! as the session's current image, so a successful result becomes the photo
//! the next request edits.

use crate::generation::AspectRatio;
use crate::prompt::{Accessory, Mode, Selection, Theme, ThemeChoice};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed generation or edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Resulting image as a data URI.
    pub result_image: String,
    /// Scene description the request was built from.
    pub prompt_used: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Generate or edit.
    pub mode: Mode,
    /// Watermark logo that was selected when the record was created.
    pub watermark_logo: Option<String>,
}

impl GenerationRecord {
    /// Creates a record stamped with a fresh id and the current time.
    pub fn new(
        result_image: impl Into<String>,
        prompt_used: impl Into<String>,
        mode: Mode,
        watermark_logo: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            result_image: result_image.into(),
            prompt_used: prompt_used.into(),
            created_at: Utc::now(),
            mode,
            watermark_logo,
        }
    }
}

/// Everything a session knows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current selection. `selection.source_image` is the current image.
    pub selection: Selection,
    /// Advisory flag set while a request is in flight.
    pub is_generating: bool,
    /// Completed generations, newest first.
    pub history: Vec<GenerationRecord>,
    /// Last user-visible error message.
    pub error: Option<String>,
}

impl SessionState {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The image currently shown (uploaded photo or latest result).
    pub fn current_image(&self) -> Option<&str> {
        self.selection.source_image.as_deref()
    }

    /// Returns true if the main action may be triggered.
    pub fn can_generate(&self) -> bool {
        !self.is_generating && self.selection.is_complete()
    }

    /// Most recent history entry.
    pub fn latest(&self) -> Option<&GenerationRecord> {
        self.history.first()
    }
}

/// Events that change session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A photo was uploaded or captured (data URI).
    SourceImageLoaded(String),
    /// The current image was discarded; the next request generates.
    SourceImageCleared,
    /// A watermark logo was loaded (data URI).
    LogoLoaded(String),
    /// The watermark logo was removed.
    LogoCleared,
    /// A preset theme was picked.
    ThemeSelected(Theme),
    /// The custom prompt was edited; selects the custom theme.
    CustomPromptChanged(String),
    /// An accessory was clicked.
    AccessoryToggled(Accessory),
    /// The generate-mode aspect ratio changed.
    AspectRatioSelected(AspectRatio),
    /// A request was dispatched.
    GenerationStarted,
    /// The request produced a result.
    GenerationSucceeded(GenerationRecord),
    /// The request failed with a user-visible message.
    GenerationFailed(String),
    /// Some other action failed (file input, export) with a user-visible message.
    /// Like any failure it releases the in-flight flag.
    ErrorRaised(String),
    /// The error message was dismissed.
    ErrorDismissed,
}

/// Computes the next state.
pub fn reduce(state: &SessionState, action: Action) -> SessionState {
    let mut next = state.clone();
    match action {
        Action::SourceImageLoaded(image) => {
            next.selection.source_image = Some(image);
            next.error = None;
        }
        Action::SourceImageCleared => next.selection.source_image = None,
        Action::LogoLoaded(logo) => next.selection.watermark_logo = Some(logo),
        Action::LogoCleared => next.selection.watermark_logo = None,
        Action::ThemeSelected(theme) => next.selection.theme = ThemeChoice::Preset(theme),
        Action::CustomPromptChanged(text) => next.selection.theme = ThemeChoice::Custom(text),
        Action::AccessoryToggled(accessory) => next.selection.accessories.toggle(accessory),
        Action::AspectRatioSelected(ratio) => next.selection.aspect_ratio = ratio,
        Action::GenerationStarted => {
            if !state.is_generating {
                next.is_generating = true;
                next.error = None;
            }
        }
        Action::GenerationSucceeded(record) => {
            next.selection.source_image = Some(record.result_image.clone());
            next.history.insert(0, record);
            next.is_generating = false;
        }
        Action::GenerationFailed(message) => {
            next.error = Some(message);
            next.is_generating = false;
        }
        Action::ErrorRaised(message) => {
            next.error = Some(message);
            next.is_generating = false;
        }
        Action::ErrorDismissed => next.error = None,
    }
    next
}
