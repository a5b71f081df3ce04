use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use colorful::Color;
use colorful::Colorful;
use reqwest::blocking::RequestBuilder;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::StatusCode;

use super::profile::HardwareProfile;
use super::{AppDetails, AuthToken, DeliveryEntry, DeliveryManifest, DeviceIdentity};
use crate::errors::PlayError;
use crate::protobuf::Message;

const CHECKIN_URL: &str = "https://android.googleapis.com/checkin";
const AUTH_URL: &str = "https://android.googleapis.com/auth";
const DETAILS_URL: &str = "https://android.clients.google.com/fdfe/details";
const PURCHASE_URL: &str = "https://android.clients.google.com/fdfe/purchase";
const DELIVERY_URL: &str = "https://android.clients.google.com/fdfe/delivery";

const VENDING_APP: &str = "com.android.vending";
const VENDING_SIG: &str = "38918a453d07199354f8b19af05ec6562ced5788";
const PLAY_SCOPE: &str = "oauth2:https://www.googleapis.com/auth/googleplay";

const SDK_VERSION: u64 = 29;
// Finsky build reported in the user agent. The backend keys split delivery on
// the Play Store version: the older build predates split APKs, so reporting it
// makes delivery return one universal APK.
const VERSION_CODE_MULTI: u64 = 84122930;
const VERSION_CODE_SINGLE: u64 = 80919999;

/// Minimum pause after a successful checkin before the identity is used.
///
/// The backend treats a checkin followed by immediate traffic as bot activity
/// and may silently degrade or block the identity. `Client::checkin()` honors
/// this itself; it is a protocol obligation, not tuning.
pub const CHECKIN_DELAY: Duration = Duration::from_secs(16);

/// Google Play client options. Pass this into the `new()` function of the client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether the client should print debug statements. Tokens are never printed.
    pub debug: bool,
    /// Pause enforced by `checkin()` before it returns. Defaults to
    /// [`CHECKIN_DELAY`]; only tests should shorten it.
    pub checkin_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            debug: false,
            checkin_delay: CHECKIN_DELAY,
        }
    }
}

/// Google Play client. One instance simulates one device at a time.
#[derive(Debug)]
pub struct Client {
    debug: bool,
    checkin_delay: Duration,
    http: reqwest::blocking::Client,
}

/// An authenticated request context: device identity plus bearer token.
///
/// Rebuilt per invocation from the two persisted pieces; never persisted
/// itself. `android_id` is public so requests can be addressed as a different
/// already-checked-in device.
#[derive(Debug, Clone)]
pub struct Session {
    pub android_id: u64,
    token: AuthToken,
    /// Name of the hardware profile the identity was checked in with.
    pub profile_name: String,
    /// Ask delivery for one universal APK instead of a split set.
    /// Details and purchase are unaffected.
    pub single_apk: bool,
}

impl Session {
    /// Compose a session from its two durable pieces. No I/O.
    pub fn build(
        device: &DeviceIdentity,
        token: &AuthToken,
        profile_name: &str,
        single_apk: bool,
    ) -> Result<Self, PlayError> {
        if device.android_id == 0 || token.auth.is_empty() {
            return Err(PlayError::IncompleteSession);
        }
        Ok(Self {
            android_id: device.android_id,
            token: token.clone(),
            profile_name: profile_name.to_string(),
            single_apk,
        })
    }

    pub(crate) fn user_agent(&self) -> String {
        let version_code = if self.single_apk {
            VERSION_CODE_SINGLE
        } else {
            VERSION_CODE_MULTI
        };
        format!("Android-Finsky (sdk={},versionCode={})", SDK_VERSION, version_code)
    }
}

impl Client {
    /// Creates a new Google Play client.
    pub fn new(options: ClientOptions) -> Result<Self, PlayError> {
        // One plain blocking POST per operation, like a device would send.
        // No redirects, no compression negotiation.
        let http = reqwest::blocking::Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            debug: options.debug,
            checkin_delay: options.checkin_delay,
            http,
        })
    }

    /// Register `profile` as a new device and return its identity.
    ///
    /// Sleeps for the configured checkin delay before returning, so the
    /// identity is safe to use immediately. A failed checkin returns
    /// [`PlayError::CheckinFailed`] and nothing may be reused from it;
    /// re-running checkin issues a fresh identity.
    pub fn checkin(&self, profile: &HardwareProfile) -> Result<DeviceIdentity, PlayError> {
        let request = checkin_request(profile);
        let response = self
            .http
            .post(CHECKIN_URL)
            .header(CONTENT_TYPE, "application/x-protobuffer")
            .body(request.encode())
            .send()?;

        self.debug_log(format!("[CHECKIN] {} {}", response.status(), profile.name));

        if !response.status().is_success() {
            return Err(PlayError::CheckinFailed);
        }

        let body = response.bytes()?;
        let message = Message::decode(&body).ok_or(PlayError::CheckinFailed)?;
        let device = parse_checkin(&message)?;

        thread::sleep(self.checkin_delay);
        Ok(device)
    }

    /// Exchange account credentials for a Play-scoped bearer token.
    ///
    /// Two sequential round-trips: credentials to master token, then master
    /// token to a bearer for the Play Store audience.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<AuthToken, PlayError> {
        let response = self
            .http
            .post(AUTH_URL)
            .form(&[
                ("Email", email),
                ("Passwd", password),
                ("client_sig", ""),
                ("droidguard_results", ""),
            ])
            .send()?;
        self.debug_log(format!("[AUTH] {} master token", response.status()));
        let body = response.text()?;
        let token = parse_auth(&body)?
            .remove("token")
            .ok_or(PlayError::AuthFailed)?;

        let response = self
            .http
            .post(AUTH_URL)
            .form(&[
                ("Token", token.as_str()),
                ("app", VENDING_APP),
                ("client_sig", VENDING_SIG),
                ("service", PLAY_SCOPE),
            ])
            .send()?;
        self.debug_log(format!("[AUTH] {} bearer token", response.status()));
        let body = response.text()?;
        let auth = parse_auth(&body)?
            .remove("auth")
            .ok_or(PlayError::AuthFailed)?;

        Ok(AuthToken { auth, token })
    }

    /// Look up app metadata.
    pub fn details(&self, session: &Session, package_id: &str) -> Result<AppDetails, PlayError> {
        let request = self.http.get(DETAILS_URL).query(&[("doc", package_id)]);
        let message = self.send_fdfe(session, request, "details", PlayError::Unavailable)?;
        parse_details(&message)
    }

    /// Acquire a free app for the account. Only needs to succeed once per
    /// account; repeating it for an owned app is not an error.
    pub fn purchase(&self, session: &Session, package_id: &str) -> Result<(), PlayError> {
        let request = self.http.post(PURCHASE_URL).form(&[("doc", package_id)]);
        self.send_fdfe(session, request, "purchase", PlayError::PaymentRequired)?;
        Ok(())
    }

    /// Resolve download URLs for an app version the account owns.
    ///
    /// `version_code` must be a version the backend currently offers (see
    /// `details()`); otherwise [`PlayError::VersionNotOffered`].
    pub fn delivery(
        &self,
        session: &Session,
        package_id: &str,
        version_code: u64,
    ) -> Result<DeliveryManifest, PlayError> {
        let request = self.http.get(DELIVERY_URL).query(&[
            ("doc", package_id.to_string()),
            ("vc", version_code.to_string()),
        ]);
        let message = self.send_fdfe(session, request, "delivery", PlayError::Unavailable)?;
        parse_delivery(&message)
    }

    // Shared shape of the three authenticated calls: bearer + device headers,
    // status mapping, then a decoded response wrapper.
    fn send_fdfe(
        &self,
        session: &Session,
        request: RequestBuilder,
        operation: &str,
        forbidden: PlayError,
    ) -> Result<Message, PlayError> {
        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", session.token.auth))
            .header("X-DFE-Device-ID", format!("{:x}", session.android_id))
            .header(USER_AGENT, session.user_agent())
            .send()?;

        self.debug_log(format!("[PLAY] {} {}", response.status(), operation));

        if !response.status().is_success() {
            return Err(match response.status() {
                StatusCode::UNAUTHORIZED => PlayError::AuthFailed,
                StatusCode::NOT_FOUND => PlayError::NotFound,
                StatusCode::FORBIDDEN => forbidden,
                StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => PlayError::Unavailable,
                _ => match response.error_for_status() {
                    Err(err) => PlayError::Transport(err),
                    Ok(_) => PlayError::Unavailable,
                },
            });
        }

        let body = response.bytes()?;
        Message::decode(&body).ok_or(PlayError::SchemaMismatch("responseWrapper"))
    }

    fn debug_log(&self, line: String) {
        if self.debug {
            println!("{}", line.gradient_with_color(Color::Cyan, Color::SpringGreen4));
        }
    }
}

// Checkin request: version marker (14), a minimal build sub-message carrying
// only an SDK version (4 -> 1 -> 10), and the full device configuration (18).
// Every configuration field must be present even at its default value.
pub(crate) fn checkin_request(profile: &HardwareProfile) -> Message {
    let mut build = Message::new();
    build.add_varint(10, SDK_VERSION);

    let mut checkin = Message::new();
    checkin.add_message(1, build);

    let mut config = Message::new();
    config.add_varint(1, profile.touch_screen);
    config.add_varint(2, profile.keyboard);
    config.add_varint(3, profile.navigation);
    config.add_varint(4, profile.screen_layout);
    config.add_varint(5, profile.has_hard_keyboard.into());
    config.add_varint(6, profile.has_five_way_navigation.into());
    config.add_varint(7, profile.screen_density);
    config.add_varint(8, profile.gles_version);
    config.add_string(9, &profile.system_shared_library);
    config.add_string(15, &profile.gl_extension);
    for platform in &profile.native_platforms {
        config.add_string(11, platform);
    }
    for name in &profile.device_features {
        let mut feature = Message::new();
        feature.add_string(1, name);
        config.add_message(26, feature);
    }

    let mut request = Message::new();
    request.add_message(4, checkin);
    request.add_varint(14, 3);
    request.add_message(18, config);
    request
}

pub(crate) fn parse_checkin(message: &Message) -> Result<DeviceIdentity, PlayError> {
    let android_id = message
        .get_fixed64(7)
        .filter(|id| *id != 0)
        .ok_or(PlayError::CheckinFailed)?;
    Ok(DeviceIdentity {
        android_id,
        time_msec: message.get_varint(3).unwrap_or(0) as i64,
    })
}

// Auth responses are text bodies of `Key=value` lines. Keys are matched
// case-insensitively; `Error=NeedsBrowser` is the challenge/captcha signal.
pub(crate) fn parse_auth(body: &str) -> Result<BTreeMap<String, String>, PlayError> {
    let mut params = BTreeMap::new();
    for line in body.lines() {
        if let Some((key, value)) = line.split_once('=') {
            params.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }
    match params.get("error").map(String::as_str) {
        Some("NeedsBrowser") => Err(PlayError::ChallengeRequired),
        Some(_) => Err(PlayError::AuthFailed),
        None => Ok(params),
    }
}

pub(crate) fn parse_details(wrapper: &Message) -> Result<AppDetails, PlayError> {
    let doc = wrapper
        .get(1)
        .and_then(|payload| payload.get(2))
        .and_then(|details| details.get(4))
        .ok_or(PlayError::NotFound)?;
    let offer = doc.get(8).ok_or(PlayError::SchemaMismatch("offer"))?;
    let app = doc
        .get(13)
        .and_then(|details| details.get(1))
        .ok_or(PlayError::SchemaMismatch("appDetails"))?;
    Ok(AppDetails {
        title: doc.get_string(5).ok_or(PlayError::SchemaMismatch("title"))?,
        version_code: app
            .get_varint(3)
            .ok_or(PlayError::SchemaMismatch("versionCode"))?,
        version_string: app
            .get_string(4)
            .ok_or(PlayError::SchemaMismatch("versionString"))?,
        size: app
            .get_varint(9)
            .ok_or(PlayError::SchemaMismatch("installationSize"))?,
        num_downloads: app
            .get_varint(70)
            .ok_or(PlayError::SchemaMismatch("downloadCount"))?,
        currency_code: offer
            .get_string(2)
            .ok_or(PlayError::SchemaMismatch("currencyCode"))?,
        upload_date: app
            .get_string(16)
            .ok_or(PlayError::SchemaMismatch("uploadDate"))?,
        package_id: app
            .get_string(14)
            .ok_or(PlayError::SchemaMismatch("packageName"))?,
    })
}

pub(crate) fn parse_delivery(wrapper: &Message) -> Result<DeliveryManifest, PlayError> {
    let data = wrapper
        .get(1)
        .and_then(|payload| payload.get(21))
        .and_then(|delivery| delivery.get(2))
        .ok_or(PlayError::VersionNotOffered)?;
    let base = data
        .get_string(3)
        .filter(|url| !url.is_empty())
        .ok_or(PlayError::VersionNotOffered)?;

    let mut entries = vec![DeliveryEntry {
        url: base,
        is_split: false,
        split_name: String::new(),
    }];
    for split in data.get_messages(15) {
        entries.push(DeliveryEntry {
            split_name: split
                .get_string(1)
                .ok_or(PlayError::SchemaMismatch("splitId"))?,
            url: split
                .get_string(5)
                .ok_or(PlayError::SchemaMismatch("splitDownloadUrl"))?,
            is_split: true,
        });
    }
    Ok(DeliveryManifest { entries })
}
