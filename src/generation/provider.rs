//! Image provider trait.

use crate::error::Result;
use crate::generation::types::GeneratedImage;
use crate::prompt::ComposedRequest;
use async_trait::async_trait;

/// A service that turns composed requests into images.
///
/// Implementations return exactly one image per call, or an error if the
/// service failed or answered without image data. They never retry.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates or edits an image for the given request.
    async fn generate(&self, request: &ComposedRequest) -> Result<GeneratedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
impl<T: ImageProvider + ?Sized> ImageProvider for Box<T> {
    async fn generate(&self, request: &ComposedRequest) -> Result<GeneratedImage> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn health_check(&self) -> Result<()> {
        (**self).health_check().await
    }
}
