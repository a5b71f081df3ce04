//! Unofficial Google Play client.
//!
//! Simulates an Android device against the Play backend: checkin for a device
//! identity, credential exchange for a bearer token, then details, purchase
//! and APK delivery using the identity+token pair.
//!
//! The intended flow is checkin, wait (`checkin()` waits for you), then
//! authenticate, build a [`Session`] and issue requests:
//!
//! ```no_run
//! use gplay::{Client, ClientOptions, ProfileRegistry, Session};
//!
//! let client = Client::new(ClientOptions::default())?;
//! let registry = ProfileRegistry::default();
//! let profile = registry.get(2).unwrap(); // arm64-v8a
//!
//! let device = client.checkin(profile)?;
//! let token = client.authenticate("user@gmail.com", "app-password")?;
//!
//! let session = Session::build(&device, &token, &profile.name, false)?;
//! let details = client.details(&session, "org.videolan.vlc")?;
//! let manifest = client.delivery(&session, "org.videolan.vlc", details.version_code)?;
//! # Ok::<(), gplay::PlayError>(())
//! ```

pub mod errors;
pub mod protobuf;
pub mod structs;

pub use errors::PlayError;
pub use structs::client::{Client, ClientOptions, Session, CHECKIN_DELAY};
pub use structs::profile::{HardwareProfile, ProfileRegistry};
pub use structs::{AppDetails, AuthToken, DeliveryEntry, DeliveryManifest, DeviceIdentity};
