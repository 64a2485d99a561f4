//! Diagnostic severity configuration.
//!
//! A configuration starts from a preset and overrides individual codes:
//!
//! ```toml
//! preset = "lenient"
//!
//! [severities]
//! "Ruby::NoMethod" = "error"
//! "Ruby::FallbackAny" = "ignore"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
    Ignore,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    Default,
    Strict,
    Lenient,
    AllError,
    Silent,
}

impl Preset {
    pub fn severity(self, code: &str) -> Severity {
        match self {
            Preset::AllError => Severity::Error,
            Preset::Silent => Severity::Ignore,
            Preset::Default => default_severity(code),
            Preset::Strict => match code {
                "Ruby::FallbackAny" | "Ruby::UnsupportedSyntax" => Severity::Warning,
                _ => Severity::Error,
            },
            Preset::Lenient => match default_severity(code) {
                Severity::Error => match code {
                    "Ruby::UnexpectedError" | "Ruby::AnnotationSyntaxError" | "RBS::UnknownTypeName" => {
                        Severity::Error
                    }
                    _ => Severity::Warning,
                },
                Severity::Warning => Severity::Information,
                _ => Severity::Ignore,
            },
        }
    }
}

fn default_severity(code: &str) -> Severity {
    match code {
        "Ruby::UnreachableBranch"
        | "Ruby::UnreachableValueBranch"
        | "Ruby::ElseOnExhaustiveCase"
        | "Ruby::UnannotatedEmptyCollection"
        | "Ruby::FalseAssertion"
        | "Ruby::UnexpectedJumpValue"
        | "Ruby::ImplicitBreakValueMismatch"
        | "Ruby::UnexpectedDynamicMethod" => Severity::Warning,
        "Ruby::UnsupportedSyntax" => Severity::Information,
        "Ruby::FallbackAny" => Severity::Hint,
        _ => Severity::Error,
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Severity per diagnostic code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticConfig {
    #[serde(default)]
    pub preset: Preset,
    #[serde(default)]
    pub severities: BTreeMap<String, Severity>,
}

impl DiagnosticConfig {
    pub fn preset(preset: Preset) -> Self {
        DiagnosticConfig {
            preset,
            severities: BTreeMap::new(),
        }
    }

    pub fn strict() -> Self {
        Self::preset(Preset::Strict)
    }

    pub fn lenient() -> Self {
        Self::preset(Preset::Lenient)
    }

    pub fn all_error() -> Self {
        Self::preset(Preset::AllError)
    }

    pub fn silent() -> Self {
        Self::preset(Preset::Silent)
    }

    pub fn with(mut self, code: &str, severity: Severity) -> Self {
        self.severities.insert(code.to_string(), severity);
        self
    }

    pub fn severity(&self, code: &str) -> Severity {
        self.severities
            .get(code)
            .copied()
            .unwrap_or_else(|| self.preset.severity(code))
    }

    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(src)?)
    }

    pub fn from_json_str(src: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(src)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(DiagnosticConfig::default().severity("Ruby::NoMethod"), Severity::Error);
        assert_eq!(DiagnosticConfig::default().severity("Ruby::FallbackAny"), Severity::Hint);
        assert_eq!(DiagnosticConfig::lenient().severity("Ruby::NoMethod"), Severity::Warning);
        assert_eq!(DiagnosticConfig::lenient().severity("Ruby::FallbackAny"), Severity::Ignore);
        assert_eq!(DiagnosticConfig::strict().severity("Ruby::UnreachableBranch"), Severity::Error);
        assert_eq!(DiagnosticConfig::all_error().severity("Ruby::FallbackAny"), Severity::Error);
        assert_eq!(DiagnosticConfig::silent().severity("Ruby::NoMethod"), Severity::Ignore);
    }

    #[test]
    fn toml_overrides() {
        let config = DiagnosticConfig::from_toml_str(
            r#"
            preset = "silent"

            [severities]
            "Ruby::NoMethod" = "warning"
            "#,
        )
        .unwrap();
        assert_eq!(config.preset, Preset::Silent);
        assert_eq!(config.severity("Ruby::NoMethod"), Severity::Warning);
        assert_eq!(config.severity("Ruby::ArgumentTypeMismatch"), Severity::Ignore);
    }

    #[test]
    fn json_round_trip() {
        let config = DiagnosticConfig::strict().with("Ruby::FallbackAny", Severity::Ignore);
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(text, r#"{"preset":"strict","severities":{"Ruby::FallbackAny":"ignore"}}"#);
        assert_eq!(DiagnosticConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn bad_severity_is_an_error() {
        let err = DiagnosticConfig::from_toml_str("[severities]\n\"Ruby::NoMethod\" = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
