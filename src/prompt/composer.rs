//! Turns a selection into a generate or edit request.

use super::accessory::AccessorySet;
use super::theme::Theme;
use crate::data_uri::DataUri;
use crate::error::{Result, SundaError};
use crate::generation::AspectRatio;
use serde::{Deserialize, Serialize};

const SUBJECT_CLAUSE: &str = "A person in the foreground.";
const QUALITY_SUFFIX: &str = "Hyper-realistic photograph, 8k, cinematic lighting.";
const ACCESSORY_PREFIX: &str = "The subject should be wearing or holding:";
const ACCESSORY_SEPARATOR: &str = ", ";
const EDIT_BACKGROUND_PREFIX: &str = "Replace the entire background with:";
const EDIT_GUIDANCE: [&str; 3] = [
    "Ensure the items (accessories/clothes) are blended naturally onto the subject with perfect perspective, scale, lighting, and shadows.",
    "It must look like a high-quality professional photograph.",
    "Match color grading and global illumination precisely.",
];

/// Which background the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeChoice {
    /// One of the fixed presets.
    Preset(Theme),
    /// Free-form scene text; must be non-blank before composing.
    Custom(String),
}

impl Default for ThemeChoice {
    fn default() -> Self {
        Self::Preset(Theme::default())
    }
}

impl From<Theme> for ThemeChoice {
    fn from(theme: Theme) -> Self {
        Self::Preset(theme)
    }
}

/// Whether a request synthesizes a new scene or edits an uploaded photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Text-only generation.
    Generate,
    /// Background replacement on a source photo.
    Edit,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => f.write_str("generate"),
            Self::Edit => f.write_str("edit"),
        }
    }
}

/// Everything the user has chosen for the next request.
///
/// Image fields hold data URI strings exactly as they were stored; they are
/// parsed when a request is composed or an export is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Photo to edit. `None` selects generate mode.
    pub source_image: Option<String>,
    /// Background theme.
    pub theme: ThemeChoice,
    /// Accessories to add to the subject.
    pub accessories: AccessorySet,
    /// Logo composited on export.
    pub watermark_logo: Option<String>,
    /// Target aspect ratio for generate mode.
    pub aspect_ratio: AspectRatio,
}

impl Selection {
    /// Resolves the scene description, enforcing a non-blank custom prompt.
    pub fn scene_description(&self) -> Result<&str> {
        match &self.theme {
            ThemeChoice::Preset(theme) => Ok(theme.description()),
            ThemeChoice::Custom(text) if text.trim().is_empty() => Err(
                SundaError::InvalidSelection("custom theme requires a non-empty prompt".into()),
            ),
            ThemeChoice::Custom(text) => Ok(text.as_str()),
        }
    }

    /// Returns true if a request can be composed from this selection.
    pub fn is_complete(&self) -> bool {
        self.scene_description().is_ok()
    }

    /// Mode the next request will use.
    pub fn mode(&self) -> Mode {
        if self.source_image.is_some() {
            Mode::Edit
        } else {
            Mode::Generate
        }
    }
}

/// A fully specified request for the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposedRequest {
    /// Synthesize a new image from text.
    Generate {
        /// Complete prompt text.
        prompt: String,
        /// Target aspect ratio.
        aspect_ratio: AspectRatio,
    },
    /// Edit the background of a source image.
    Edit {
        /// Decoded source image and its MIME type.
        image: DataUri,
        /// Edit instruction text.
        instruction: String,
    },
}

impl ComposedRequest {
    /// Mode of this request.
    pub fn mode(&self) -> Mode {
        match self {
            Self::Generate { .. } => Mode::Generate,
            Self::Edit { .. } => Mode::Edit,
        }
    }

    /// Prompt or instruction text.
    pub fn text(&self) -> &str {
        match self {
            Self::Generate { prompt, .. } => prompt.as_str(),
            Self::Edit { instruction, .. } => instruction.as_str(),
        }
    }
}

/// Builds the request for the current selection.
///
/// Fails with [`SundaError::InvalidSelection`] for a blank custom prompt and
/// with [`SundaError::UnsupportedImageEncoding`] if the source image is not a
/// valid image data URI.
pub fn compose_request(selection: &Selection) -> Result<ComposedRequest> {
    let scene = selection.scene_description()?;
    let accessories = accessory_clause(&selection.accessories);

    match &selection.source_image {
        None => {
            let mut parts = vec![sentence(scene), SUBJECT_CLAUSE.to_string()];
            parts.extend(accessories);
            parts.push(QUALITY_SUFFIX.to_string());

            Ok(ComposedRequest::Generate {
                prompt: parts.join(" "),
                aspect_ratio: selection.aspect_ratio,
            })
        }
        Some(source) => {
            let image = DataUri::parse(source)?;

            let mut lines = vec![format!("{EDIT_BACKGROUND_PREFIX} {}", sentence(scene))];
            lines.extend(accessories);
            lines.extend(EDIT_GUIDANCE.iter().map(|line| line.to_string()));

            Ok(ComposedRequest::Edit {
                image,
                instruction: lines.join("\n"),
            })
        }
    }
}

/// Clause listing the selected accessories, or `None` when nothing is selected.
pub fn accessory_clause(accessories: &AccessorySet) -> Option<String> {
    if accessories.is_empty() {
        return None;
    }
    let labels: Vec<&str> = accessories.iter().map(|a| a.label()).collect();
    Some(format!(
        "{ACCESSORY_PREFIX} {}.",
        labels.join(ACCESSORY_SEPARATOR)
    ))
}

/// Terminates `text` with a period unless it already ends a sentence.
fn sentence(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.ends_with(&['.', '!', '?'][..]) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}
