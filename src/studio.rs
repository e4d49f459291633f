//! Drives one session: selection changes, generation, export and share.

use crate::compositor::Compositor;
use crate::data_uri::DataUri;
use crate::error::{Result, SundaError};
use crate::export::{export_png, share_image, ShareTarget};
use crate::generation::ImageProvider;
use crate::prompt::compose_request;
use crate::session::{reduce, Action, GenerationRecord, SessionState};
use std::path::{Path, PathBuf};

/// A session bound to a generation provider.
///
/// Every state change goes through [`reduce`]. Failures are returned to the
/// caller and also recorded in [`SessionState::error`].
pub struct Studio<P> {
    provider: P,
    compositor: Compositor,
    state: SessionState,
}

impl<P: ImageProvider> Studio<P> {
    /// Creates an empty session using `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            compositor: Compositor::default(),
            state: SessionState::new(),
        }
    }

    /// Replaces the compositor used for export and share.
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    /// Current session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The generation provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Applies an action to the session state.
    pub fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, action);
    }

    /// Loads a photo from disk as the source image.
    pub async fn load_source_image(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let uri = self.record_failure(DataUri::read_file(path).await)?;
        self.dispatch(Action::SourceImageLoaded(uri.to_string()));
        Ok(())
    }

    /// Loads a watermark logo from disk.
    pub async fn load_logo(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let uri = self.record_failure(DataUri::read_file(path).await)?;
        self.dispatch(Action::LogoLoaded(uri.to_string()));
        Ok(())
    }

    /// Composes a request from the selection and sends it to the provider.
    ///
    /// On success the result is prepended to the history and becomes the
    /// current image. On failure the current image is left untouched.
    pub async fn generate(&mut self) -> Result<GenerationRecord> {
        if self.state.is_generating {
            return Err(SundaError::Busy);
        }

        let selection = &self.state.selection;
        let composed = compose_request(selection).and_then(|request| {
            let scene = selection.scene_description()?.to_string();
            Ok((request, scene))
        });
        let (request, prompt_used) = match composed {
            Ok(composed) => composed,
            Err(e) => {
                self.dispatch(Action::GenerationFailed(e.to_string()));
                return Err(e);
            }
        };
        let logo = self.state.selection.watermark_logo.clone();
        let mode = request.mode();

        self.dispatch(Action::GenerationStarted);
        tracing::info!(%mode, provider = self.provider.name(), "sending request");

        match self.provider.generate(&request).await {
            Ok(image) => {
                tracing::info!(
                    %mode,
                    bytes = image.size(),
                    duration_ms = image.metadata.duration_ms,
                    "request succeeded"
                );
                let record = GenerationRecord::new(image.to_data_url(), prompt_used, mode, logo);
                self.dispatch(Action::GenerationSucceeded(record.clone()));
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(%mode, kind = ?e.kind(), "request failed: {e}");
                self.dispatch(Action::GenerationFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Exports the current image, watermarked with the selected logo, into `dir`.
    pub async fn export(&mut self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let Some(image) = self.state.current_image() else {
            let e = SundaError::InvalidRequest("there is no image to export".into());
            self.dispatch(Action::ErrorRaised(e.to_string()));
            return Err(e);
        };
        let logo = self.state.selection.watermark_logo.as_deref();

        let result = export_png(&self.compositor, image, logo, dir).await;
        self.record_failure(result)
    }

    /// Exports a history entry with the logo it was created with.
    pub async fn export_record(
        &mut self,
        record: &GenerationRecord,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let result = export_png(
            &self.compositor,
            &record.result_image,
            record.watermark_logo.as_deref(),
            dir,
        )
        .await;
        self.record_failure(result)
    }

    /// Shares the current image. Returns false if there was nothing to share
    /// or the target declined.
    pub async fn share(&self, target: Option<&dyn ShareTarget>) -> bool {
        match self.state.current_image() {
            Some(image) => share_image(&self.compositor, image, target).await,
            None => false,
        }
    }

    fn record_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.dispatch(Action::ErrorRaised(e.to_string()));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::encode_png;
    use crate::generation::{GeneratedImage, GenerationMetadata, ImageFormat};
    use crate::prompt::{Accessory, ComposedRequest, Mode, Theme};
    use async_trait::async_trait;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::sync::Mutex;

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        encode_png(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba(color),
        )))
        .unwrap()
    }

    /// Replies with a fixed image, or fails every call.
    struct FakeProvider {
        reply: Option<Vec<u8>>,
        requests: Mutex<Vec<ComposedRequest>>,
    }

    impl FakeProvider {
        fn ok() -> Self {
            Self {
                reply: Some(png(32, 32, [0, 0, 255, 255])),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageProvider for FakeProvider {
        async fn generate(&self, request: &ComposedRequest) -> Result<GeneratedImage> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Some(data) => Ok(GeneratedImage::new(
                    data.clone(),
                    ImageFormat::Png,
                    GenerationMetadata {
                        model: Some("fake".into()),
                        duration_ms: Some(1),
                    },
                )),
                None => Err(SundaError::Api {
                    status: 500,
                    message: "backend exploded".into(),
                }),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_generate_then_edit_previous_result() {
        let mut studio = Studio::new(FakeProvider::ok());
        studio.dispatch(Action::ThemeSelected(Theme::Waterfall));
        studio.dispatch(Action::AccessoryToggled(Accessory::Caping));

        let first = studio.generate().await.unwrap();
        assert_eq!(first.mode, Mode::Generate);
        assert_eq!(first.prompt_used, Theme::Waterfall.description());
        assert_eq!(studio.state().current_image(), Some(first.result_image.as_str()));
        assert!(!studio.state().is_generating);

        let second = studio.generate().await.unwrap();
        assert_eq!(second.mode, Mode::Edit);
        assert_eq!(studio.state().history.len(), 2);
        assert_eq!(studio.state().latest().unwrap().id, second.id);

        let requests = studio.provider().requests.lock().unwrap();
        assert!(matches!(requests[0], ComposedRequest::Generate { .. }));
        match &requests[1] {
            ComposedRequest::Edit { image, instruction } => {
                assert_eq!(image.to_string(), first.result_image);
                assert!(instruction.contains("Caping"));
            }
            other => panic!("expected edit request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_current_image() {
        let mut studio = Studio::new(FakeProvider::failing());
        let photo = DataUri::new("image/png", png(8, 8, [255, 255, 255, 255])).to_string();
        studio.dispatch(Action::SourceImageLoaded(photo.clone()));

        let err = studio.generate().await.unwrap_err();
        assert!(err.is_generation_service_error());

        let state = studio.state();
        assert_eq!(state.current_image(), Some(photo.as_str()));
        assert!(state.history.is_empty());
        assert!(!state.is_generating);
        assert!(state.error.as_deref().unwrap().contains("backend exploded"));
    }

    #[tokio::test]
    async fn test_blank_custom_prompt_never_reaches_provider() {
        let mut studio = Studio::new(FakeProvider::ok());
        studio.dispatch(Action::CustomPromptChanged("   ".into()));

        let err = studio.generate().await.unwrap_err();
        assert!(matches!(err, SundaError::InvalidSelection(_)));
        assert!(studio.state().error.is_some());
        assert!(studio.provider().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_source_image() {
        let mut studio = Studio::new(FakeProvider::ok());
        studio.dispatch(Action::SourceImageLoaded("data:text/plain;base64,aGk=".into()));

        let err = studio.generate().await.unwrap_err();
        assert!(matches!(err, SundaError::UnsupportedImageEncoding(_)));
        assert!(!studio.state().is_generating);
        assert!(studio.provider().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_busy_while_generating() {
        let mut studio = Studio::new(FakeProvider::ok());
        studio.dispatch(Action::GenerationStarted);

        assert!(matches!(studio.generate().await, Err(SundaError::Busy)));
        assert!(studio.provider().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_with_logo() {
        let dir = tempfile::tempdir().unwrap();
        let mut studio = Studio::new(FakeProvider::ok());

        let err = studio.export(dir.path()).await.unwrap_err();
        assert!(matches!(err, SundaError::InvalidRequest(_)));
        assert!(studio.state().error.is_some());

        let logo = DataUri::new("image/png", png(4, 2, [255, 0, 0, 255])).to_string();
        studio.dispatch(Action::LogoLoaded(logo));
        let record = studio.generate().await.unwrap();
        assert!(record.watermark_logo.is_some());

        let path = studio.export(dir.path()).await.unwrap();
        let exported = image::open(&path).unwrap().to_rgba8();
        assert_eq!(exported.dimensions(), (32, 32));
        // 32px base: inset 1, logo width 12.
        assert_eq!(exported.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(exported.get_pixel(20, 20), &Rgba([0, 0, 255, 255]));

        let again = studio.export_record(&record, dir.path()).await.unwrap();
        assert!(again.exists());
    }

    #[tokio::test]
    async fn test_load_files() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("photo.png");
        std::fs::write(&photo, png(8, 8, [0, 0, 0, 255])).unwrap();

        let mut studio = Studio::new(FakeProvider::ok());
        studio.load_source_image(&photo).await.unwrap();
        studio.load_logo(&photo).await.unwrap();
        assert_eq!(studio.state().selection.mode(), Mode::Edit);
        assert!(studio.state().selection.watermark_logo.is_some());

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            studio.load_source_image(&missing).await,
            Err(SundaError::Io(_))
        ));
        assert!(studio.state().error.is_some());
    }

    #[tokio::test]
    async fn test_share_without_image_or_target() {
        let mut studio = Studio::new(FakeProvider::ok());
        assert!(!studio.share(None).await);

        studio.generate().await.unwrap();
        assert!(!studio.share(None).await);
    }
}
