//! Static API endpoint table.
//!
//! Base URLs are selected per deployment environment and client platform
//! family. Selection is a lookup, never a runtime probe.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Pro,
    Beta,
    Test,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Dev,
        Environment::Pro,
        Environment::Beta,
        Environment::Test,
    ];
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "dev"),
            Environment::Pro => write!(f, "pro"),
            Environment::Beta => write!(f, "beta"),
            Environment::Test => write!(f, "test"),
        }
    }
}

/// Client platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformFamily {
    /// Browser build.
    #[default]
    H5,
    /// Mini-program build.
    MiniProgram,
}

impl PlatformFamily {
    pub const ALL: [PlatformFamily; 2] = [PlatformFamily::H5, PlatformFamily::MiniProgram];
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformFamily::H5 => write!(f, "h5"),
            PlatformFamily::MiniProgram => write!(f, "mini-program"),
        }
    }
}

/// Base URLs of one environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BaseUrls {
    pub h5: String,
    pub mini_program: String,
}

impl BaseUrls {
    fn new(h5: &str, mini_program: &str) -> Self {
        Self {
            h5: h5.to_string(),
            mini_program: mini_program.to_string(),
        }
    }

    pub fn for_family(&self, family: PlatformFamily) -> &str {
        match family {
            PlatformFamily::H5 => &self.h5,
            PlatformFamily::MiniProgram => &self.mini_program,
        }
    }
}

/// Endpoint selection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Active environment.
    pub environment: Environment,

    /// Active platform family.
    pub family: PlatformFamily,

    pub dev: BaseUrls,
    pub pro: BaseUrls,
    pub beta: BaseUrls,
    pub test: BaseUrls,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Dev,
            family: PlatformFamily::H5,
            dev: BaseUrls::new(
                "https://dev-h5-api.example.com",
                "https://dev-miniapp-api.example.com",
            ),
            pro: BaseUrls::new("https://h5-api.example.com", "https://miniapp-api.example.com"),
            beta: BaseUrls::new(
                "https://beta-h5-api.example.com",
                "https://beta-miniapp-api.example.com",
            ),
            test: BaseUrls::new(
                "https://test-h5-api.example.com",
                "https://test-miniapp-api.example.com",
            ),
        }
    }
}

impl EndpointConfig {
    pub fn urls(&self, environment: Environment) -> &BaseUrls {
        match environment {
            Environment::Dev => &self.dev,
            Environment::Pro => &self.pro,
            Environment::Beta => &self.beta,
            Environment::Test => &self.test,
        }
    }

    pub fn base_url_for(&self, environment: Environment, family: PlatformFamily) -> &str {
        self.urls(environment).for_family(family)
    }

    /// Base URL of the active environment and family.
    pub fn base_url(&self) -> &str {
        self.base_url_for(self.environment, self.family)
    }

    /// Absolute URL for `path` under the active base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn login_url(&self) -> String {
        self.url("login")
    }
}
