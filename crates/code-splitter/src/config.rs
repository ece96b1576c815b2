use crate::error::{self, SplitterError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default marker substituted for a decomposed child
pub const DEFAULT_PLACEHOLDER: &str = "<BLOCK>";

/// Configuration for bounded decomposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Budget for a whole unit (method body), measured pre-expansion
    pub unit_budget: usize,

    /// Budget for any individually emitted chunk
    pub chunk_budget: usize,

    /// How text length is measured
    pub metric: MetricKind,

    /// How over-budget text is cut down
    pub truncation: TruncationStrategy,

    /// Literal marker inserted in place of a decomposed child
    pub placeholder: String,

    /// Maximum recursion depth before children are left inline
    pub max_depth: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            unit_budget: 2048,
            chunk_budget: 512,
            metric: MetricKind::ApproxTokens,
            truncation: TruncationStrategy::Hard,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            max_depth: 64,
        }
    }
}

impl SplitterConfig {
    /// Create config sized for LLM summarization with exact token counts
    pub fn for_llm_context() -> Self {
        Self {
            unit_budget: 2048,
            chunk_budget: 1024,
            metric: MetricKind::Bpe,
            ..Default::default()
        }
    }

    /// Create config sized for embedding models (smaller, focused chunks)
    pub fn for_embeddings() -> Self {
        Self {
            unit_budget: 512,
            chunk_budget: 384,
            truncation: TruncationStrategy::WordBoundary,
            ..Default::default()
        }
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(raw: &str) -> error::Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate().map_err(SplitterError::invalid_config)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> error::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.unit_budget == 0 {
            return Err("unit_budget must be > 0".to_string());
        }

        if self.chunk_budget == 0 {
            return Err("chunk_budget must be > 0".to_string());
        }

        if self.chunk_budget > self.unit_budget {
            return Err(format!(
                "chunk_budget ({}) cannot exceed unit_budget ({})",
                self.chunk_budget, self.unit_budget
            ));
        }

        if self.placeholder.is_empty() {
            return Err("placeholder must not be empty".to_string());
        }

        if self.placeholder.chars().any(char::is_whitespace) {
            return Err(format!(
                "placeholder {:?} must not contain whitespace",
                self.placeholder
            ));
        }

        if self.max_depth == 0 {
            return Err("max_depth must be > 0".to_string());
        }

        Ok(())
    }
}

/// Length metric used by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Unicode scalar values
    Chars,

    /// Rough token estimate (~4 bytes per token)
    ApproxTokens,

    /// Exact cl100k_base BPE tokens
    Bpe,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chars => "chars",
            Self::ApproxTokens => "approx_tokens",
            Self::Bpe => "bpe",
        }
    }
}

/// Strategy for cutting over-budget text down to a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationStrategy {
    /// Longest prefix that fits, cut on a char boundary
    #[default]
    Hard,

    /// Longest fitting prefix, backed off to the last whitespace
    WordBoundary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SplitterConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(SplitterConfig::for_llm_context().validate().is_ok());
        assert!(SplitterConfig::for_embeddings().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SplitterConfig::default();

        // Invalid: chunk > unit
        config.chunk_budget = 4096;
        assert!(config.validate().is_err());

        // Invalid: zero budgets
        config.chunk_budget = 0;
        assert!(config.validate().is_err());
        config.chunk_budget = 100;
        config.unit_budget = 0;
        assert!(config.validate().is_err());

        // Invalid placeholders
        config.unit_budget = 150;
        config.placeholder = String::new();
        assert!(config.validate().is_err());
        config.placeholder = "<A BLOCK>".to_string();
        assert!(config.validate().is_err());

        // Invalid depth
        config.placeholder = DEFAULT_PLACEHOLDER.to_string();
        config.max_depth = 0;
        assert!(config.validate().is_err());

        config.max_depth = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = SplitterConfig::from_toml_str(
            r#"
unit_budget = 150
chunk_budget = 100
metric = "chars"
truncation = "word_boundary"
"#,
        )
        .unwrap();

        assert_eq!(config.unit_budget, 150);
        assert_eq!(config.chunk_budget, 100);
        assert_eq!(config.metric, MetricKind::Chars);
        assert_eq!(config.truncation, TruncationStrategy::WordBoundary);
        assert_eq!(config.placeholder, DEFAULT_PLACEHOLDER);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let err = SplitterConfig::from_toml_str("unit_budget = 10\nchunk_budget = 20\n").unwrap_err();
        assert!(matches!(err, SplitterError::InvalidConfig(_)));

        let err = SplitterConfig::from_toml_str("metric = \"words\"\n").unwrap_err();
        assert!(matches!(err, SplitterError::ConfigParse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splitter.toml");
        std::fs::write(&path, "chunk_budget = 64\nplaceholder = \"<SNIP>\"\n").unwrap();

        let config = SplitterConfig::from_file(&path).unwrap();
        assert_eq!(config.chunk_budget, 64);
        assert_eq!(config.placeholder, "<SNIP>");

        let missing = SplitterConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(SplitterError::IoError(_))));
    }
}
