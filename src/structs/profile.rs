use serde::{Deserialize, Serialize};

/// A named bundle of device-configuration attributes presented at checkin.
///
/// Every attribute here maps to a field the checkin schema requires. All of
/// them must be sent, even when the value is the documented default; leaving
/// one out changes what the backend offers the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub name: String,
    pub touch_screen: u64,
    pub keyboard: u64,
    pub navigation: u64,
    pub screen_layout: u64,
    pub has_hard_keyboard: bool,
    pub has_five_way_navigation: bool,
    pub screen_density: u64,
    pub gles_version: u64,
    pub system_shared_library: String,
    pub gl_extension: String,
    /// Supported native ABIs, most preferred first.
    pub native_platforms: Vec<String>,
    /// `android.hardware.*` and vendor feature strings.
    pub device_features: Vec<String>,
}

/// Ordered set of hardware profiles, selected by integer index.
///
/// The default registry carries one profile per ABI: 0 = x86,
/// 1 = armeabi-v7a, 2 = arm64-v8a.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<HardwareProfile>,
}

impl ProfileRegistry {
    pub fn get(&self, index: usize) -> Option<&HardwareProfile> {
        self.profiles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HardwareProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        let profiles = ["x86", "armeabi-v7a", "arm64-v8a"]
            .into_iter()
            .map(phone)
            .collect();
        Self { profiles }
    }
}

// Attribute values known to pass checkin for a generic phone. Each feature is
// required by at least one widely installed app; dropping one hides that app
// from the device.
fn phone(abi: &str) -> HardwareProfile {
    HardwareProfile {
        name: abi.to_string(),
        // com.valvesoftware.android.steam.community
        touch_screen: 3,
        keyboard: 0,
        navigation: 0,
        screen_layout: 0,
        has_hard_keyboard: false,
        has_five_way_navigation: false,
        screen_density: 0,
        // com.axis.drawingdesk.v3
        gles_version: 0x0003_0001,
        // com.miui.weather2
        system_shared_library: "global-miui11-empty.jar".to_string(),
        // com.instagram.android
        gl_extension: "GL_OES_compressed_ETC1_RGB8_texture".to_string(),
        native_platforms: vec![abi.to_string()],
        device_features: [
            // com.google.android.GoogleCamera
            "android.hardware.camera.level.full",
            "com.google.android.feature.GOOGLE_EXPERIENCE",
            // com.google.android.apps.walletnfcrel
            "android.software.device_admin",
            // com.google.android.youtube
            "android.hardware.touchscreen",
            "android.hardware.wifi",
            // com.pinterest
            "android.hardware.camera",
            "android.hardware.location",
            "android.hardware.screen.portrait",
            // com.smarty.voomvoom
            "android.hardware.location.gps",
            "android.hardware.sensor.accelerometer",
            // com.tgc.sky.android
            "android.hardware.touchscreen.multitouch",
            "android.hardware.touchscreen.multitouch.distinct",
            "android.hardware.vulkan.level",
            "android.hardware.vulkan.version",
            // org.videolan.vlc
            "android.hardware.screen.landscape",
            // com.vimeo.android.videoapp
            "android.hardware.microphone",
            // com.xiaomi.smarthome
            "android.hardware.bluetooth",
            "android.hardware.bluetooth_le",
            "android.hardware.camera.autofocus",
            "android.hardware.usb.host",
            // org.thoughtcrime.securesms
            "android.hardware.telephony",
            // se.pax.calima
            "android.hardware.location.network",
        ]
        .into_iter()
        .map(str::to_string)
        .collect(),
    }
}
