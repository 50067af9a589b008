use bytes::Bytes;
use futures::FutureExt;
use image::{DynamicImage, GenericImageView};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::TransferConfig;
use crate::error::{TransferError, TransferResult};
use crate::models::{
    DisplayTarget, ObjectKey, Operation, RemoteLocation, TransferOutcome, TransferRequest,
    TransferState,
};
use crate::services::codec::{self, ImageFormat};
use crate::services::staging::{StagingFile, StagingStore};
use crate::services::storage::TransferClient;
use crate::ui::UiCollaborator;

/// State slot behind one UI trigger. At most one request per slot is in flight.
struct Trigger {
    operation: Operation,
    state: AtomicU8,
}

impl Trigger {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            state: AtomicU8::new(TransferState::Idle as u8),
        }
    }

    fn state(&self) -> TransferState {
        TransferState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves any non-`InFlight` state to `InFlight` and disables the trigger.
    fn begin<'a>(&'a self, ui: &'a dyn UiCollaborator) -> TransferResult<InFlight<'a>> {
        let in_flight = TransferState::InFlight as u8;
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != in_flight).then_some(in_flight)
            })
            .map_err(|_| TransferError::Busy(self.operation))?;

        ui.set_trigger_enabled(self.operation, false);
        Ok(InFlight {
            trigger: self,
            ui,
            terminal: TransferState::Failed,
        })
    }
}

/// Held for the lifetime of one request. Dropping it records the terminal
/// state and re-enables the trigger, including during unwinding.
struct InFlight<'a> {
    trigger: &'a Trigger,
    ui: &'a dyn UiCollaborator,
    terminal: TransferState,
}

impl InFlight<'_> {
    fn complete(mut self, succeeded: bool) {
        if succeeded {
            self.terminal = TransferState::Succeeded;
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.trigger
            .state
            .store(self.terminal as u8, Ordering::Release);
        self.ui.set_trigger_enabled(self.trigger.operation, true);
    }
}

/// Coordinates uploads and downloads between the UI, the object store, the
/// staging directory and the image codec.
pub struct TransferService {
    client: Arc<dyn TransferClient>,
    ui: Arc<dyn UiCollaborator>,
    staging: StagingStore,
    config: TransferConfig,
    upload_trigger: Trigger,
    download_trigger: Trigger,
}

impl TransferService {
    pub fn new(
        client: Arc<dyn TransferClient>,
        ui: Arc<dyn UiCollaborator>,
        config: TransferConfig,
    ) -> Self {
        Self {
            client,
            ui,
            staging: StagingStore::new(config.staging_dir.clone()),
            config,
            upload_trigger: Trigger::new(Operation::Upload),
            download_trigger: Trigger::new(Operation::Download),
        }
    }

    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    pub fn state(&self, operation: Operation) -> TransferState {
        self.trigger(operation).state()
    }

    fn trigger(&self, operation: Operation) -> &Trigger {
        match operation {
            Operation::Upload => &self.upload_trigger,
            Operation::Download => &self.download_trigger,
        }
    }

    /// Runs one request to its terminal outcome.
    ///
    /// A request for a trigger that is already in flight is rejected with
    /// `Busy` and leaves the running request and the UI untouched.
    pub async fn submit(&self, request: TransferRequest) -> TransferResult<TransferOutcome> {
        let operation = request.operation();
        let in_flight = match self.trigger(operation).begin(self.ui.as_ref()) {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Rejected {} request: {}", operation, e);
                return Err(e);
            }
        };

        info!("▶️  {} started", operation);
        let run = async {
            match request {
                TransferRequest::Upload { key, source } => self.run_upload(key, source).await,
                TransferRequest::Download { key, destination } => {
                    self.run_download(key, destination).await
                }
            }
        };
        // A panicking step still ends in exactly one terminal report.
        let result = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(TransferError::Aborted {
                operation,
                message: panic_message(payload.as_ref()),
            }),
        };

        in_flight.complete(result.is_ok());
        self.report(operation, &result);
        result
    }

    /// Runs `submit` on the Tokio runtime so the calling UI context never waits.
    pub fn spawn(
        self: &Arc<Self>,
        request: TransferRequest,
    ) -> JoinHandle<TransferResult<TransferOutcome>> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.submit(request).await })
    }

    pub async fn upload(
        &self,
        source: Option<DynamicImage>,
        key: Option<ObjectKey>,
    ) -> TransferResult<TransferOutcome> {
        self.submit(TransferRequest::Upload { key, source }).await
    }

    pub async fn download(
        &self,
        key: impl Into<String>,
        destination: Option<DisplayTarget>,
    ) -> TransferResult<TransferOutcome> {
        self.submit(TransferRequest::Download {
            key: key.into(),
            destination,
        })
        .await
    }

    /// Uploads an image in the given format without touching any trigger.
    pub async fn upload_image(
        &self,
        image: &DynamicImage,
        key: ObjectKey,
        format: ImageFormat,
    ) -> TransferResult<RemoteLocation> {
        let result = match ensure_pixels(image) {
            Ok(()) => self.put_image(image, &key, format).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(location) => {
                info!("Texture uploaded to {}", location);
                self.ui
                    .set_status_message(&format!("Texture uploaded to {}", location));
            }
            Err(e) => {
                error!("Error uploading texture {}: {}", key, e);
                self.ui.set_status_message(&e.to_string());
            }
        }
        result
    }

    /// Uploads a local file byte-for-byte. Not bound to a trigger.
    pub async fn upload_file(&self, path: &Path, key: ObjectKey) -> TransferResult<RemoteLocation> {
        let result = self.put_file(path, &key).await;

        match &result {
            Ok(location) => {
                info!("File {} uploaded to {}", path.display(), location);
                self.ui
                    .set_status_message(&format!("File uploaded successfully to {}", location));
            }
            Err(e) => {
                error!("Error uploading file {}: {}", path.display(), e);
                self.ui.set_status_message(&e.to_string());
            }
        }
        result
    }

    /// Startup diagnostics. Enables both idle triggers when the bucket answers;
    /// a failure is reported and leaves later operations unaffected.
    pub async fn probe(&self) -> TransferResult<()> {
        info!("Attempting to connect to object storage...");
        self.ui
            .set_status_message("Attempting to connect to object storage...");

        match self.client.probe().await {
            Ok(()) => {
                info!("🔌 Object storage is reachable");
                self.ui
                    .set_status_message("Connected to object storage, bucket is reachable");
                for operation in [Operation::Upload, Operation::Download] {
                    if self.state(operation).trigger_enabled() {
                        self.ui.set_trigger_enabled(operation, true);
                    }
                }
                Ok(())
            }
            Err(e) => {
                warn!("Connection test failed: {}", e);
                self.ui
                    .set_status_message(&format!("Connection error: {}", e));
                Err(e)
            }
        }
    }

    async fn run_upload(
        &self,
        key: Option<ObjectKey>,
        source: Option<DynamicImage>,
    ) -> TransferResult<TransferOutcome> {
        let image = source
            .ok_or_else(|| TransferError::invalid_input("No image assigned to upload"))?;
        ensure_pixels(&image)?;

        let key = key.unwrap_or_else(|| {
            ObjectKey::generate(&self.config.upload_prefix, ImageFormat::Png.extension())
        });
        let location = self.put_image(&image, &key, ImageFormat::Png).await?;
        Ok(TransferOutcome::Uploaded { location })
    }

    async fn run_download(
        &self,
        key: String,
        destination: Option<DisplayTarget>,
    ) -> TransferResult<TransferOutcome> {
        let key = ObjectKey::new(key)?;
        if key.file_name().is_none() {
            return Err(TransferError::invalid_input(format!(
                "Object key '{}' does not name a file",
                key
            )));
        }
        let destination = destination
            .filter(DisplayTarget::is_valid)
            .ok_or_else(|| TransferError::invalid_input("No display target bound for download"))?;

        let stream = self.client.get(&key).await?;
        let staged = self.staging.stage(&key, stream).await?;

        let decoded = self.decode_staged(&staged).await;
        if let Ok(image) = &decoded {
            self.ui.bind_image(&destination, image.clone());
        }
        self.staging.release(staged);

        let image = decoded?;
        Ok(TransferOutcome::Downloaded { key, image })
    }

    async fn decode_staged(&self, staged: &StagingFile) -> TransferResult<DynamicImage> {
        let data = self.staging.read_all(staged).await?;
        codec::decode(&data)
    }

    async fn put_image(
        &self,
        image: &DynamicImage,
        key: &ObjectKey,
        format: ImageFormat,
    ) -> TransferResult<RemoteLocation> {
        let encoded = codec::encode_with_quality(image, format, self.config.jpeg_quality)?;
        self.client
            .put(key, Bytes::from(encoded), format.content_type())
            .await
    }

    async fn put_file(&self, path: &Path, key: &ObjectKey) -> TransferResult<RemoteLocation> {
        let data = tokio::fs::read(path).await?;
        let content_type = infer::get(&data)
            .map(|t| t.mime_type())
            .unwrap_or("application/octet-stream");
        self.client.put(key, Bytes::from(data), content_type).await
    }

    fn report(&self, operation: Operation, result: &TransferResult<TransferOutcome>) {
        match result {
            Ok(TransferOutcome::Uploaded { location }) => {
                info!("UI image uploaded successfully to {}", location);
                self.ui.set_status_message(&format!(
                    "UI image uploaded successfully to {}",
                    location
                ));
                self.ui.notify_success(operation);
            }
            Ok(TransferOutcome::Downloaded { key, image }) => {
                let (width, height) = image.dimensions();
                info!("Image set on UI: {} ({}x{})", key, width, height);
                self.ui.set_status_message(&format!("Image set on UI: {}", key));
                self.ui.notify_success(operation);
            }
            Err(e) => {
                error!("{} failed ({:?}): {}", operation, e.kind(), e);
                self.ui.set_status_message(&e.to_string());
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic without message".to_string())
}

fn ensure_pixels(image: &DynamicImage) -> TransferResult<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TransferError::invalid_input(
            "Image has no pixel content to upload",
        ));
    }
    Ok(())
}
