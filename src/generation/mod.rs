//! Generation service collaborator.

mod provider;
pub mod providers;
mod types;

pub use provider::ImageProvider;
pub use types::{AspectRatio, GeneratedImage, GenerationMetadata, ImageFormat};
