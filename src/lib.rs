#![warn(missing_docs)]
//! SundaScape - Sundanese scene generation and background replacement.
//!
//! This crate composes image-generation requests from a theme and accessory
//! selection, sends them to Gemini, keeps the session history, and exports
//! results with an optional logo watermark.
//!
//! # Quick Start
//!
//! ```no_run
//! use sundascape::{Action, GeminiProvider, Studio, Theme};
//!
//! #[tokio::main]
//! async fn main() -> sundascape::Result<()> {
//!     let provider = GeminiProvider::builder().build()?;
//!     let mut studio = Studio::new(provider);
//!
//!     studio.dispatch(Action::ThemeSelected(Theme::TeaGarden));
//!     studio.load_logo("logo.png").await?;
//!
//!     let record = studio.generate().await?;
//!     println!("generated from: {}", record.prompt_used);
//!
//!     let path = studio.export(".").await?;
//!     println!("saved to {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli`: the `sundascape` command-line tool (enabled by default)

mod error;

pub mod compositor;
pub mod config;
pub mod data_uri;
pub mod export;
pub mod generation;
pub mod prompt;
pub mod session;
pub mod studio;

// Re-export error types at crate root
pub use error::{ErrorKind, Result, SundaError};

pub use compositor::{Compositor, LogoPlacement, DEFAULT_MAX_LOGO_WIDTH};
pub use config::ApiKey;
pub use data_uri::DataUri;
pub use export::{export_file_name, export_png, share_image, SharePayload, ShareTarget};
pub use generation::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
pub use generation::{AspectRatio, GeneratedImage, GenerationMetadata, ImageFormat, ImageProvider};
pub use prompt::{
    compose_request, Accessory, AccessorySet, ComposedRequest, Mode, Selection, Theme, ThemeChoice,
};
pub use session::{reduce, Action, GenerationRecord, SessionState};
pub use studio::Studio;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SundaError};
    pub use crate::generation::providers::GeminiProvider;
    pub use crate::generation::ImageProvider;
    pub use crate::prompt::{Accessory, Theme};
    pub use crate::session::Action;
    pub use crate::studio::Studio;
}
