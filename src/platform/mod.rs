//! Platform identification.
//!
//! The `platform` header tells the server which client target issued a call.

/// Reports a stable identifier of the host OS or app target.
pub trait PlatformInfo: Send + Sync {
    fn current_platform(&self) -> String;
}

/// Reports the operating system the crate was compiled for (`linux`, `macos`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPlatform;

impl PlatformInfo for HostPlatform {
    fn current_platform(&self) -> String {
        std::env::consts::OS.to_string()
    }
}

/// Reports a fixed identifier, e.g. `android` or `ios` for embedded clients.
#[derive(Debug, Clone)]
pub struct StaticPlatform(String);

impl StaticPlatform {
    pub fn new(platform: impl Into<String>) -> Self {
        Self(platform.into())
    }
}

impl PlatformInfo for StaticPlatform {
    fn current_platform(&self) -> String {
        self.0.clone()
    }
}
