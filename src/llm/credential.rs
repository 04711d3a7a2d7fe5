//! Opaque provider credentials.

use std::fmt;

/// Prefixes and fragments of template values that are not real keys.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "your_",
    "your-",
    "sk-proj-your",
    "sk-ant-your",
    "api_key_here",
    "key_here",
    "changeme",
    "<",
];

/// An API key or token, resolved from the environment at startup.
///
/// The value is never printed: `Debug` is redacted and there is no
/// `Display`. Adapters read it through [`Credential::expose`] when building
/// request headers.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a credential value if it looks usable.
    ///
    /// Returns `None` for empty or whitespace-only values and for values
    /// copied unchanged from configuration templates.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return None;
        }
        let lower = value.to_ascii_lowercase();
        if PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m)) {
            return None;
        }
        Some(Self(value))
    }

    /// Resolve a credential from the environment variable `var`.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().and_then(Self::new)
    }

    /// The raw secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("your_openai_api_key")]
    #[case("sk-proj-your-key")]
    #[case("sk-ant-your-key-here")]
    #[case("api_key_here")]
    #[case("<OPENAI_KEY>")]
    fn test_rejects_placeholders(#[case] value: &str) {
        assert!(Credential::new(value).is_none());
    }

    #[test]
    fn test_accepts_real_looking_key() {
        let cred = Credential::new("  sk-abc123def456  ").unwrap();
        assert_eq!(cred.expose(), "sk-abc123def456");
    }

    #[test]
    fn test_debug_is_redacted() {
        let cred = Credential::new("sk-abc123def456").unwrap();
        assert_eq!(format!("{:?}", cred), "Credential(***)");
    }
}
