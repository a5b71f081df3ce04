use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::PlayError;

pub mod client;
pub mod profile;

/// A device identity issued by checkin.
///
/// Created only by a successful `Client::checkin()` and immutable afterwards;
/// running checkin again issues a fresh identity. Persist one file per
/// hardware profile name so each simulated device keeps its own identity.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Opaque 64-bit device identifier. Sent on every authenticated call.
    pub android_id: u64,
    /// Server timestamp from the checkin response, in milliseconds.
    pub time_msec: i64,
}

/// A Play-scoped bearer token plus the master token it was derived from.
///
/// Both values are secrets. `Debug` prints neither, and nothing in this crate
/// ever logs them. There is no client-visible expiry: when a later call comes
/// back 401 (`PlayError::AuthFailed`), authenticate again.
#[derive(Default, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    /// Bearer token scoped to the Play Store service.
    pub auth: String,
    /// Long-lived master token, kept as refresh material.
    pub token: String,
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken").finish_non_exhaustive()
    }
}

/// App metadata from a details lookup.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct AppDetails {
    pub title: String,
    pub version_code: u64,
    pub version_string: String,
    /// Installation size in bytes.
    pub size: u64,
    pub num_downloads: u64,
    pub currency_code: String,
    /// Backend-formatted date string, e.g. "Feb 14, 2022". See `date()`.
    pub upload_date: String,
    pub package_id: String,
}

impl AppDetails {
    /// Parse `upload_date` into a structured date.
    pub fn date(&self) -> Result<NaiveDate, PlayError> {
        NaiveDate::parse_from_str(&self.upload_date, "%b %d, %Y")
            .or(Err(PlayError::SchemaMismatch("uploadDate")))
    }
}

/// One downloadable APK from a delivery response.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEntry {
    pub url: String,
    pub is_split: bool,
    /// Split name, e.g. "config.arm64_v8a". Empty for the base APK.
    pub split_name: String,
}

/// Ordered download set for one app version.
///
/// Order is the backend's: the base APK first, then named splits. Install in
/// this order; splits cannot install before their base.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryManifest {
    pub entries: Vec<DeliveryEntry>,
}

impl DeviceIdentity {
    /// Write the identity to `path` (conventionally `<profile name>.json`).
    pub fn create(&self, path: impl AsRef<Path>) -> Result<(), PlayError> {
        write_json(path, self)
    }

    /// Read a previously persisted identity.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PlayError> {
        read_json(path)
    }
}

impl AuthToken {
    /// Write the token to `path`.
    pub fn create(&self, path: impl AsRef<Path>) -> Result<(), PlayError> {
        write_json(path, self)
    }

    /// Read a previously persisted token.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PlayError> {
        read_json(path)
    }
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), PlayError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T, PlayError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}
