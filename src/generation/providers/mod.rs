//! Generation service implementations.

mod gemini;

pub use gemini::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
