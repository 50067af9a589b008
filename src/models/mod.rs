use chrono::{DateTime, Local, TimeZone};
use image::DynamicImage;
use serde::Serialize;
use std::fmt;

use crate::error::{TransferError, TransferResult};

/// Timestamp layout used for generated upload keys (second precision).
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    Upload,
    Download,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Upload => f.write_str("Upload"),
            Operation::Download => f.write_str("Download"),
        }
    }
}

/// Bucket-scoped object identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> TransferResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(TransferError::invalid_input("Object key must not be empty"));
        }
        Ok(Self(key))
    }

    /// Builds `<prefix>/<YYYYMMDDHHMMSS>.<extension>` from the given instant.
    ///
    /// Two keys generated within the same second with the same prefix are
    /// identical; the later upload overwrites the earlier object.
    pub fn generate_at<Tz>(prefix: &str, extension: &str, at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let stamp = at.format(KEY_TIMESTAMP_FORMAT);
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            Self(format!("{}.{}", stamp, extension))
        } else {
            Self(format!("{}/{}.{}", prefix, stamp, extension))
        }
    }

    pub fn generate(prefix: &str, extension: &str) -> Self {
        Self::generate_at(prefix, extension, &Local::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the key, if it can name a local file.
    pub fn file_name(&self) -> Option<&str> {
        self.0
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle naming where a downloaded image should be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DisplayTarget(String);

impl DisplayTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLocation {
    pub bucket: String,
    pub key: ObjectKey,
    pub size: u64,
    pub etag: Option<String>,
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// One user-initiated transfer. Consumed by a single orchestration run.
#[derive(Debug, Clone)]
pub enum TransferRequest {
    Upload {
        key: Option<ObjectKey>,
        source: Option<DynamicImage>,
    },
    Download {
        key: String,
        destination: Option<DisplayTarget>,
    },
}

impl TransferRequest {
    pub fn operation(&self) -> Operation {
        match self {
            TransferRequest::Upload { .. } => Operation::Upload,
            TransferRequest::Download { .. } => Operation::Download,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransferOutcome {
    Uploaded { location: RemoteLocation },
    Downloaded { key: ObjectKey, image: DynamicImage },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum TransferState {
    Idle = 0,
    InFlight = 1,
    Succeeded = 2,
    Failed = 3,
}

impl TransferState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => TransferState::InFlight,
            2 => TransferState::Succeeded,
            3 => TransferState::Failed,
            _ => TransferState::Idle,
        }
    }

    /// The trigger is usable in every state except `InFlight`.
    pub fn trigger_enabled(self) -> bool {
        self != TransferState::InFlight
    }
}
