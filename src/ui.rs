use image::DynamicImage;
use tracing::{debug, error, info};

use crate::models::{DisplayTarget, Operation};

/// Front end driven by the transfer service.
///
/// The service only writes to it; the single read of UI state is the
/// precondition data carried in each `TransferRequest`.
pub trait UiCollaborator: Send + Sync {
    fn bind_image(&self, target: &DisplayTarget, image: DynamicImage);
    fn set_status_message(&self, message: &str);
    fn set_trigger_enabled(&self, operation: Operation, enabled: bool);
    fn notify_success(&self, operation: Operation);
}

/// Terminal front end: status goes to the log, bound images are written to
/// the path named by the display target.
pub struct ConsoleUi;

impl UiCollaborator for ConsoleUi {
    fn bind_image(&self, target: &DisplayTarget, image: DynamicImage) {
        match image.save(target.as_str()) {
            Ok(()) => info!("🖼️  Image written to {}", target.as_str()),
            Err(e) => error!("Failed to write image to {}: {}", target.as_str(), e),
        }
    }

    fn set_status_message(&self, message: &str) {
        info!("📣 {}", message);
    }

    fn set_trigger_enabled(&self, operation: Operation, enabled: bool) {
        debug!(
            "{} trigger {}",
            operation,
            if enabled { "enabled" } else { "disabled" }
        );
    }

    fn notify_success(&self, operation: Operation) {
        info!("✅ {} finished", operation);
    }
}
