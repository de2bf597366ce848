//! Configuration types: LLM connection settings and the persisted document.
//!
//! [`Config`] is the single logical document persisted by
//! [`crate::store::ConfigStore`]: the document-type registry plus
//! [`LlmSettings`], serialized flat:
//!
//! ```json
//! {
//!   "doc_types": { "ECG standard": "Tu es un cardiologue…" },
//!   "base_url": "http://127.0.0.1:1234",
//!   "model_name": "model",
//!   "api_key": "lm-studio",
//!   "temperature": 0.2,
//!   "max_tokens": 1500,
//!   "max_chars": 20000
//! }
//! ```
//!
//! Loading goes through [`PartialConfig`], where every field is optional and
//! a field with the wrong JSON type counts as missing. [`complete_with_defaults`]
//! then fills the gaps field by field. It is a pure function so the defaulting
//! rules are testable without touching the file system.

use crate::registry::DocumentTypeRegistry;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Allowed sampling temperature.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Allowed response length, in tokens.
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 256..=4096;

/// Allowed extracted-text budget, in characters.
pub const MAX_CHARS_RANGE: RangeInclusive<usize> = 5_000..=100_000;

/// Connection and sampling parameters for the chat-completion endpoint.
///
/// Built via [`LlmSettings::builder()`] or [`LlmSettings::default()`].
/// The builder clamps numeric fields into their documented ranges; values
/// loaded from disk are kept verbatim.
///
/// # Example
/// ```rust
/// use pdf2report::LlmSettings;
///
/// let settings = LlmSettings::builder()
///     .base_url("http://localhost:11434")
///     .model_name("llama-3.1-8b-instruct")
///     .temperature(0.1)
///     .build();
/// assert_eq!(settings.max_chars, 20_000);
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Server root, e.g. `http://127.0.0.1:1234`. `/v1/chat/completions` is appended.
    pub base_url: String,

    /// Model identifier as loaded on the server.
    pub model_name: String,

    /// Bearer credential. Local servers accept anything; an empty key is sent
    /// as [`FALLBACK_API_KEY`].
    pub api_key: String,

    /// Sampling temperature, 0.0–1.0. Default: 0.2.
    ///
    /// Kept low so the model stays close to the figures in the export.
    pub temperature: f64,

    /// Maximum response length in tokens, 256–4096. Default: 1500.
    pub max_tokens: u32,

    /// Maximum number of extracted characters sent to the model, 5000–100000.
    /// Default: 20000. Longer text is cut, see [`crate::pipeline::compose`].
    pub max_chars: usize,
}

/// Credential sent when [`LlmSettings::api_key`] is empty.
pub const FALLBACK_API_KEY: &str = "lm-studio";

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:1234".to_string(),
            model_name: "model".to_string(),
            api_key: FALLBACK_API_KEY.to_string(),
            temperature: 0.2,
            max_tokens: 1500,
            max_chars: 20_000,
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_chars", &self.max_chars)
            .finish()
    }
}

impl LlmSettings {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> LlmSettingsBuilder {
        LlmSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Full chat-completion URL for these settings.
    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// The credential actually sent in the `Authorization` header.
    pub fn bearer(&self) -> &str {
        if self.api_key.is_empty() {
            FALLBACK_API_KEY
        } else {
            &self.api_key
        }
    }

    pub fn set_temperature(&mut self, t: f64) {
        self.temperature = t.clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end());
    }

    pub fn set_max_tokens(&mut self, n: u32) {
        self.max_tokens = n.clamp(*MAX_TOKENS_RANGE.start(), *MAX_TOKENS_RANGE.end());
    }

    pub fn set_max_chars(&mut self, n: usize) {
        self.max_chars = n.clamp(*MAX_CHARS_RANGE.start(), *MAX_CHARS_RANGE.end());
    }
}

/// Builder for [`LlmSettings`].
#[derive(Debug)]
pub struct LlmSettingsBuilder {
    settings: LlmSettings,
}

impl LlmSettingsBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.settings.base_url = url.into();
        self
    }

    pub fn model_name(mut self, model: impl Into<String>) -> Self {
        self.settings.model_name = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.settings.api_key = key.into();
        self
    }

    pub fn temperature(mut self, t: f64) -> Self {
        self.settings.set_temperature(t);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.settings.set_max_tokens(n);
        self
    }

    pub fn max_chars(mut self, n: usize) -> Self {
        self.settings.set_max_chars(n);
        self
    }

    pub fn build(self) -> LlmSettings {
        self.settings
    }
}

// ── Persisted document ───────────────────────────────────────────────────

/// The complete persisted configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    pub doc_types: DocumentTypeRegistry,
    #[serde(flatten)]
    pub settings: LlmSettings,
}

/// A configuration document as found on disk: any field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialConfig {
    #[serde(default, deserialize_with = "lenient")]
    pub doc_types: Option<DocumentTypeRegistry>,
    #[serde(default, deserialize_with = "lenient")]
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub model_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_tokens: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_chars: Option<usize>,
}

/// A field that does not deserialize as `T` is treated as absent.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Parse a configuration document. `None` if it is not a JSON object.
pub fn parse_config(raw: &str) -> Option<PartialConfig> {
    match serde_json::from_str::<serde_json::Value>(raw).ok()? {
        doc @ serde_json::Value::Object(_) => serde_json::from_value(doc).ok(),
        _ => None,
    }
}

/// Fill every missing field of `partial` from the defaults.
///
/// Present fields are kept verbatim, including out-of-range numbers.
pub fn complete_with_defaults(partial: PartialConfig) -> Config {
    let d = LlmSettings::default();
    Config {
        doc_types: partial.doc_types.unwrap_or_default(),
        settings: LlmSettings {
            base_url: partial.base_url.unwrap_or(d.base_url),
            model_name: partial.model_name.unwrap_or(d.model_name),
            api_key: partial.api_key.unwrap_or(d.api_key),
            temperature: partial.temperature.unwrap_or(d.temperature),
            max_tokens: partial.max_tokens.unwrap_or(d.max_tokens),
            max_chars: partial.max_chars.unwrap_or(d.max_chars),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = LlmSettings::default();
        assert_eq!(s.base_url, "http://127.0.0.1:1234");
        assert_eq!(s.model_name, "model");
        assert_eq!(s.api_key, "lm-studio");
        assert_eq!(s.temperature, 0.2);
        assert_eq!(s.max_tokens, 1500);
        assert_eq!(s.max_chars, 20_000);
    }

    #[test]
    fn builder_clamps() {
        let s = LlmSettings::builder()
            .temperature(1.7)
            .max_tokens(10)
            .max_chars(1_000_000)
            .build();
        assert_eq!(s.temperature, 1.0);
        assert_eq!(s.max_tokens, 256);
        assert_eq!(s.max_chars, 100_000);
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let s = LlmSettings::builder().base_url("http://host:8080/").build();
        assert_eq!(s.endpoint(), "http://host:8080/v1/chat/completions");
    }

    #[test]
    fn bearer_falls_back_when_empty() {
        let s = LlmSettings::builder().api_key("").build();
        assert_eq!(s.bearer(), FALLBACK_API_KEY);
        let s = LlmSettings::builder().api_key("sk-test").build();
        assert_eq!(s.bearer(), "sk-test");
    }

    #[test]
    fn debug_redacts_api_key() {
        let s = LlmSettings::builder().api_key("sk-secret").build();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = complete_with_defaults(parse_config("{}").unwrap());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn missing_fields_filled_present_fields_kept() {
        let raw = r#"{
            "doc_types": {"IRM cardiaque": "Tu es radiologue."},
            "model_name": "llama-3.1-8b-instruct",
            "temperature": 0.65,
            "max_chars": 3000
        }"#;
        let cfg = complete_with_defaults(parse_config(raw).unwrap());
        let d = LlmSettings::default();

        assert_eq!(cfg.doc_types.names().collect::<Vec<_>>(), vec!["IRM cardiaque"]);
        assert_eq!(cfg.settings.model_name, "llama-3.1-8b-instruct");
        assert_eq!(cfg.settings.temperature, 0.65);
        // Out of the UI range, but present: kept verbatim.
        assert_eq!(cfg.settings.max_chars, 3000);
        assert_eq!(cfg.settings.base_url, d.base_url);
        assert_eq!(cfg.settings.api_key, d.api_key);
        assert_eq!(cfg.settings.max_tokens, d.max_tokens);
    }

    #[test]
    fn wrong_typed_field_falls_back_alone() {
        let raw = r#"{"temperature": "hot", "max_tokens": 2048, "doc_types": {}}"#;
        let cfg = complete_with_defaults(parse_config(raw).unwrap());
        assert_eq!(cfg.settings.temperature, 0.2);
        assert_eq!(cfg.settings.max_tokens, 2048);
        assert_eq!(cfg.doc_types, DocumentTypeRegistry::default());
    }

    #[test]
    fn doc_types_keep_file_order() {
        let raw = r#"{"doc_types": {"Zèbre": "z", "Holter ECG": "h", "Alpha": "a"}}"#;
        let cfg = complete_with_defaults(parse_config(raw).unwrap());
        assert_eq!(
            cfg.doc_types.names().collect::<Vec<_>>(),
            vec!["Zèbre", "Holter ECG", "Alpha"]
        );
        assert_eq!(cfg.doc_types.active().name, "Zèbre");

        let defaults = serde_json::to_string(&Config::default()).unwrap();
        let reloaded = complete_with_defaults(parse_config(&defaults).unwrap());
        assert_eq!(reloaded, Config::default());
    }

    #[test]
    fn invalid_doc_type_entries_skipped_individually() {
        let raw = r#"{"doc_types": {
            "IRM cardiaque": "Tu es radiologue.",
            "Scanner": null,
            "   ": "blank name",
            "Épreuve d'effort": 42,
            "Holter ECG": "h"
        }}"#;
        let cfg = complete_with_defaults(parse_config(raw).unwrap());
        assert_eq!(
            cfg.doc_types.names().collect::<Vec<_>>(),
            vec!["IRM cardiaque", "Holter ECG"]
        );
        assert_eq!(cfg.doc_types.get("IRM cardiaque").unwrap(), "Tu es radiologue.");
    }

    #[test]
    fn doc_types_without_valid_entry_fall_back() {
        let raw = r#"{"doc_types": {"Scanner": null, "": "x"}, "model_name": "m"}"#;
        let cfg = complete_with_defaults(parse_config(raw).unwrap());
        assert_eq!(cfg.doc_types, DocumentTypeRegistry::default());
        assert_eq!(cfg.settings.model_name, "m");
    }

    #[test]
    fn stored_temperature_kept_exactly() {
        let raw = r#"{"temperature": 0.15000000000000002}"#;
        let cfg = complete_with_defaults(parse_config(raw).unwrap());
        assert_eq!(cfg.settings.temperature, 0.15000000000000002);
        let out = serde_json::to_string(&cfg).unwrap();
        assert!(out.contains("\"temperature\":0.15000000000000002"), "got: {out}");
    }

    #[test]
    fn unparseable_document_is_none() {
        assert!(parse_config("not json at all").is_none());
        assert!(parse_config("[1, 2, 3]").is_none());
    }

    #[test]
    fn serializes_flat() {
        let v = serde_json::to_value(Config::default()).unwrap();
        let obj = v.as_object().unwrap();
        for key in [
            "doc_types",
            "base_url",
            "model_name",
            "api_key",
            "temperature",
            "max_tokens",
            "max_chars",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 7);
    }
}
