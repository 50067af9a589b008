#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use rust_image_transfer::{
    DisplayTarget, ObjectKey, ObjectStream, Operation, RemoteLocation, TransferClient,
    TransferConfig, TransferError, TransferResult, TransferService, UiCollaborator,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio_util::io::StreamReader;

pub const BUCKET: &str = "uploads";

type ErrorFactory = Box<dyn Fn() -> TransferError + Send + Sync>;

struct StoredObject {
    body: Bytes,
    content_type: String,
}

/// In-memory bucket with switchable failure modes.
#[derive(Default)]
pub struct MockStorageService {
    objects: Mutex<HashMap<String, StoredObject>>,
    put_calls: AtomicUsize,
    get_calls: AtomicUsize,
    reject_puts: AtomicBool,
    break_streams: AtomicBool,
    fail_probe: AtomicBool,
    get_failure: Mutex<Option<ErrorFactory>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockStorageService {
    pub fn insert(&self, key: &str, body: impl Into<Bytes>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: body.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).map(|o| o.body.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn reject_puts(&self) {
        self.reject_puts.store(true, Ordering::SeqCst);
    }

    /// Bodies fail halfway through with a connection reset.
    pub fn break_streams(&self) {
        self.break_streams.store(true, Ordering::SeqCst);
    }

    /// Every later `get` fails with a fresh error from `make`.
    pub fn fail_gets(&self, make: impl Fn() -> TransferError + Send + Sync + 'static) {
        *self.get_failure.lock().unwrap() = Some(Box::new(make));
    }

    pub fn fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    /// Makes every `get` wait for a permit on the returned semaphore.
    pub fn hold_gets(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl TransferClient for MockStorageService {
    async fn put(
        &self,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> TransferResult<RemoteLocation> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_puts.load(Ordering::SeqCst) {
            return Err(TransferError::Backend {
                code: "AccessDenied".to_string(),
                status: 403,
                message: "Access Denied".to_string(),
            });
        }

        let size = body.len() as u64;
        self.insert(key.as_str(), body, content_type);
        Ok(RemoteLocation {
            bucket: BUCKET.to_string(),
            key: key.clone(),
            size,
            etag: Some("\"mock-etag\"".to_string()),
        })
    }

    async fn get(&self, key: &ObjectKey) -> TransferResult<ObjectStream> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        if let Some(make) = self.get_failure.lock().unwrap().as_ref() {
            return Err(make());
        }

        let body = self.object(key.as_str()).ok_or_else(|| TransferError::NotFound {
            key: key.to_string(),
        })?;

        if self.break_streams.load(Ordering::SeqCst) {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(body.slice(..body.len() / 2)),
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset mid-body",
                )),
            ];
            return Ok(Box::pin(StreamReader::new(futures::stream::iter(chunks))));
        }

        Ok(Box::pin(std::io::Cursor::new(body.to_vec())))
    }

    async fn probe(&self) -> TransferResult<()> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(TransferError::Transport(
                "dispatch failure: connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Bound {
        target: String,
        width: u32,
        height: u32,
    },
    Status(String),
    Trigger(Operation, bool),
    Success(Operation),
}

#[derive(Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Last enabled state reported for the trigger, if any.
    pub fn trigger_enabled(&self, operation: Operation) -> Option<bool> {
        self.events().into_iter().rev().find_map(|e| match e {
            UiEvent::Trigger(op, enabled) if op == operation => Some(enabled),
            _ => None,
        })
    }

    pub fn trigger_events(&self, operation: Operation) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Trigger(op, enabled) if op == operation => Some(enabled),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Status(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }

    pub fn successes(&self, operation: Operation) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == UiEvent::Success(operation))
            .count()
    }

    pub fn bound_images(&self) -> Vec<(String, u32, u32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Bound {
                    target,
                    width,
                    height,
                } => Some((target, width, height)),
                _ => None,
            })
            .collect()
    }
}

impl UiCollaborator for RecordingUi {
    fn bind_image(&self, target: &DisplayTarget, image: DynamicImage) {
        self.events.lock().unwrap().push(UiEvent::Bound {
            target: target.as_str().to_string(),
            width: image.width(),
            height: image.height(),
        });
    }

    fn set_status_message(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(UiEvent::Status(message.to_string()));
    }

    fn set_trigger_enabled(&self, operation: Operation, enabled: bool) {
        self.events
            .lock()
            .unwrap()
            .push(UiEvent::Trigger(operation, enabled));
    }

    fn notify_success(&self, operation: Operation) {
        self.events
            .lock()
            .unwrap()
            .push(UiEvent::Success(operation));
    }
}

pub struct Harness {
    pub service: Arc<TransferService>,
    pub storage: Arc<MockStorageService>,
    pub ui: Arc<RecordingUi>,
}

pub fn test_config(staging_dir: &Path) -> TransferConfig {
    TransferConfig {
        staging_dir: staging_dir.to_path_buf(),
        ..TransferConfig::default()
    }
}

pub fn setup(staging_dir: &Path) -> Harness {
    setup_with_client(staging_dir, Arc::new(MockStorageService::default()))
}

pub fn setup_with_client(staging_dir: &Path, storage: Arc<MockStorageService>) -> Harness {
    let _ = tracing_subscriber::fmt::try_init();
    let ui = Arc::new(RecordingUi::default());
    let service = Arc::new(TransferService::new(
        storage.clone(),
        ui.clone(),
        test_config(staging_dir),
    ));
    Harness {
        service,
        storage,
        ui,
    }
}

pub fn solid_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([220, 120, 30, 255]),
    ))
}

pub fn display_target() -> Option<DisplayTarget> {
    Some(DisplayTarget::new("displayImage"))
}
