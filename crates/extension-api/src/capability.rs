//! Typed capability interfaces for extensions.
//!
//! An extension is a trait object implementing [`Extension`]. The host asks
//! it for the capability views it needs; a view it does not offer is simply
//! `None`. Within a view, each optional operation returns `None` when the
//! extension does not offer it.

use crate::error::ExtensionResult;
use serde_json::{Map, Value};

/// A live extension instance.
pub trait Extension: Send + Sync {
    /// Configuration hook. Extensions accepting persisted settings return
    /// themselves here.
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        None
    }

    /// Verification view (CAPTCHA and similar).
    fn as_verification(&self) -> Option<&dyn VerificationCapability> {
        None
    }

    /// Third-party login provider view.
    fn as_login_provider(&self) -> Option<&dyn LoginProviderCapability> {
        None
    }
}

/// Accepts a decoded, non-empty configuration object.
pub trait Configurable {
    fn configure(&mut self, config: &Map<String, Value>) -> ExtensionResult<()>;
}

/// Operations a verification extension may offer.
pub trait VerificationCapability {
    /// Markup for the challenge widget.
    fn widget(&self) -> Option<String> {
        None
    }

    /// Check a submitted `value` against `token`.
    fn verify(&self, _value: &str, _token: &str) -> Option<bool> {
        None
    }

    /// Produce a fresh challenge.
    fn generate(&self) -> Option<String> {
        None
    }
}

/// Operations a login provider extension may offer.
pub trait LoginProviderCapability {
    /// Markup for the provider's login button.
    fn login_button(&self) -> Option<String> {
        None
    }
}

/// A capability tag as written in manifests and registry rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CapabilityTag {
    /// Human verification (CAPTCHA).
    Verification,

    /// Third-party login providers.
    ThirdpartyLogin,

    /// Any other extension point.
    Custom(String),
}

impl CapabilityTag {
    /// Parse a capability from a string.
    pub fn parse(s: &str) -> Self {
        match s {
            "verification" => CapabilityTag::Verification,
            "thirdparty_login" => CapabilityTag::ThirdpartyLogin,
            other => CapabilityTag::Custom(other.to_string()),
        }
    }

    /// Convert capability to string representation.
    pub fn as_str(&self) -> &str {
        match self {
            CapabilityTag::Verification => "verification",
            CapabilityTag::ThirdpartyLogin => "thirdparty_login",
            CapabilityTag::Custom(s) => s,
        }
    }

    /// Whether `extension` exposes the typed view this tag expects.
    /// Custom tags have no typed view and always report `true`.
    pub fn is_offered_by(&self, extension: &dyn Extension) -> bool {
        match self {
            CapabilityTag::Verification => extension.as_verification().is_some(),
            CapabilityTag::ThirdpartyLogin => extension.as_login_provider().is_some(),
            CapabilityTag::Custom(_) => true,
        }
    }
}

impl std::fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
