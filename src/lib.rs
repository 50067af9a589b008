//! Image round trips between a front end and an S3-compatible object store.
//!
//! [`services::transfer_service::TransferService`] drives each upload or
//! download through the transfer client, the staging directory and the
//! image codec, and keeps the front end's triggers in sync.

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod ui;

pub use config::TransferConfig;
pub use error::{ErrorKind, TransferError, TransferResult};
pub use models::{
    DisplayTarget, ObjectKey, Operation, RemoteLocation, TransferOutcome, TransferRequest,
    TransferState,
};
pub use services::codec::ImageFormat;
pub use services::staging::{StagingFile, StagingStore};
pub use services::storage::{ObjectStream, S3TransferClient, TransferClient};
pub use services::transfer_service::TransferService;
pub use ui::{ConsoleUi, UiCollaborator};
