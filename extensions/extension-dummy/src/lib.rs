//! # extension-dummy
//!
//! Dummy extension implementations for testing and development.
//!
//! These extensions return static markup and never talk to a real service.
//! They implement the verification and login-provider capabilities to
//! demonstrate the extension pattern and to exercise the host end to end.

use extension_api::{
    Configurable, Extension, ExtensionError, ExtensionResult, FactoryRegistry,
    LoginProviderCapability, VerificationCapability,
};
use serde_json::{Map, Value};

/// Type name an entry file declares for [`DummyVerification`].
pub const VERIFICATION_TYPE: &str = "Dummy\\Verification";

/// Type name an entry file declares for [`DummyLoginProvider`].
pub const LOGIN_PROVIDER_TYPE: &str = "Dummy\\LoginProvider";

/// Register every dummy extension type.
pub fn register(factories: &mut FactoryRegistry) {
    factories.register_default::<DummyVerification>(VERIFICATION_TYPE);
    factories.register_default::<DummyLoginProvider>(LOGIN_PROVIDER_TYPE);
}

/// A verification extension with a fixed challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct DummyVerification {
    challenge: String,
}

impl Default for DummyVerification {
    fn default() -> Self {
        Self {
            challenge: "1234".to_string(),
        }
    }
}

impl DummyVerification {
    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

impl Configurable for DummyVerification {
    fn configure(&mut self, config: &Map<String, Value>) -> ExtensionResult<()> {
        match config.get("challenge") {
            None => Ok(()),
            Some(Value::String(challenge)) if !challenge.is_empty() => {
                self.challenge = challenge.clone();
                Ok(())
            }
            Some(other) => Err(ExtensionError::ConfigRejected(format!(
                "challenge must be a non-empty string, got {}",
                other
            ))),
        }
    }
}

impl VerificationCapability for DummyVerification {
    fn widget(&self) -> Option<String> {
        Some(format!(
            r#"<input type="text" name="captcha" placeholder="Type {}">"#,
            self.challenge
        ))
    }

    fn verify(&self, value: &str, _token: &str) -> Option<bool> {
        Some(value.trim() == self.challenge)
    }

    fn generate(&self) -> Option<String> {
        Some(self.challenge.clone())
    }
}

impl Extension for DummyVerification {
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        Some(self)
    }

    fn as_verification(&self) -> Option<&dyn VerificationCapability> {
        Some(self)
    }
}

/// A login provider rendering a static button.
#[derive(Debug, Clone, PartialEq)]
pub struct DummyLoginProvider {
    label: String,
}

impl Default for DummyLoginProvider {
    fn default() -> Self {
        Self {
            label: "Sign in with Dummy".to_string(),
        }
    }
}

impl Configurable for DummyLoginProvider {
    fn configure(&mut self, config: &Map<String, Value>) -> ExtensionResult<()> {
        if let Some(label) = config.get("label").and_then(Value::as_str) {
            self.label = label.to_string();
        }
        Ok(())
    }
}

impl LoginProviderCapability for DummyLoginProvider {
    fn login_button(&self) -> Option<String> {
        Some(format!(
            r#"<a class="login-button login-dummy" href="/login/dummy">{}</a>"#,
            self.label
        ))
    }
}

impl Extension for DummyLoginProvider {
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        Some(self)
    }

    fn as_login_provider(&self) -> Option<&dyn LoginProviderCapability> {
        Some(self)
    }
}
