//! Rule severity levels and their raw document forms

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical rule severity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Disable the rule
    Off,
    /// Warning (doesn't fail the run)
    Warn,
    /// Error (fails the run)
    Error,
}

impl Severity {
    /// Canonicalize a raw severity token
    ///
    /// Accepts `"off" | "warn" | "error"` (any ASCII case) and `0 | 1 | 2`.
    pub fn from_raw(raw: &RawSeverity) -> Option<Self> {
        match raw {
            RawSeverity::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "off" => Some(Severity::Off),
                "warn" => Some(Severity::Warn),
                "error" => Some(Severity::Error),
                _ => None,
            },
            RawSeverity::Code(number) => {
                let code = number
                    .as_i64()
                    .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?;
                match code {
                    0 => Some(Severity::Off),
                    1 => Some(Severity::Warn),
                    2 => Some(Severity::Error),
                    _ => None,
                }
            }
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Severity::Off
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Off => "off",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity exactly as written in a document, validated later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawSeverity {
    Code(serde_json::Number),
    Text(String),
}

impl fmt::Display for RawSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawSeverity::Code(number) => write!(f, "{number}"),
            RawSeverity::Text(text) => f.write_str(text),
        }
    }
}

impl From<Severity> for RawSeverity {
    fn from(severity: Severity) -> Self {
        RawSeverity::Text(severity.as_str().to_string())
    }
}

impl From<&str> for RawSeverity {
    fn from(text: &str) -> Self {
        RawSeverity::Text(text.to_string())
    }
}

impl From<i64> for RawSeverity {
    fn from(code: i64) -> Self {
        RawSeverity::Code(code.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textual_and_numeric_forms_agree() {
        for (text, code, expected) in [
            ("off", 0i64, Severity::Off),
            ("warn", 1, Severity::Warn),
            ("error", 2, Severity::Error),
        ] {
            assert_eq!(Severity::from_raw(&text.into()), Some(expected));
            assert_eq!(Severity::from_raw(&code.into()), Some(expected));
        }
    }

    #[test]
    fn test_unknown_tokens_are_rejected() {
        assert_eq!(Severity::from_raw(&"warning".into()), None);
        assert_eq!(Severity::from_raw(&3i64.into()), None);
        assert_eq!(Severity::from_raw(&(-1i64).into()), None);
    }

    #[test]
    fn test_case_insensitive_text() {
        assert_eq!(Severity::from_raw(&"Error".into()), Some(Severity::Error));
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Warn).unwrap(), r#""warn""#);
        let raw: RawSeverity = serde_json::from_str("2").unwrap();
        assert_eq!(Severity::from_raw(&raw), Some(Severity::Error));
    }
}
