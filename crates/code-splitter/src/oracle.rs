//! Length oracle: budget checks, measurement and deterministic truncation.

use crate::config::{MetricKind, SplitterConfig, TruncationStrategy};
use crate::error::{Result, SplitterError};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Rough estimate used when no tokenizer is loaded
const APPROX_BYTES_PER_TOKEN: usize = 4;

/// Whole-unit and per-chunk length ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budgets {
    pub unit: usize,
    pub chunk: usize,
}

/// Policy answering "is this text within budget".
///
/// Implementations hold no mutable state and may be shared across threads.
pub trait LengthOracle: Send + Sync {
    /// Length metric used by every other method
    fn measure(&self, text: &str) -> usize;

    fn budgets(&self) -> Budgets;

    /// Prefix of `text` within the unit budget; `truncate(truncate(x)) == truncate(x)`
    fn truncate(&self, text: &str) -> String;

    fn is_within_unit_budget(&self, text: &str) -> bool {
        self.measure(text) <= self.budgets().unit
    }

    fn is_within_chunk_budget(&self, text: &str) -> bool {
        self.measure(text) <= self.budgets().chunk
    }
}

/// Measures text length
pub trait LengthMetric: Send + Sync {
    fn measure(&self, text: &str) -> usize;
}

/// Counts Unicode scalar values
#[derive(Debug, Clone, Copy, Default)]
pub struct CharMetric;

impl LengthMetric for CharMetric {
    fn measure(&self, text: &str) -> usize {
        text.chars().count()
    }
}

/// Rough token estimate: ~4 bytes per token for code
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenMetric;

impl LengthMetric for ApproxTokenMetric {
    fn measure(&self, text: &str) -> usize {
        text.len().div_ceil(APPROX_BYTES_PER_TOKEN)
    }
}

/// Exact token count with the cl100k_base BPE tokenizer
#[derive(Clone)]
pub struct BpeMetric {
    bpe: Arc<CoreBPE>,
}

impl BpeMetric {
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| SplitterError::tokenizer(format!("Failed to load cl100k_base: {e}")))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl LengthMetric for BpeMetric {
    fn measure(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Oracle combining a metric, two budgets and a truncation strategy
#[derive(Debug, Clone)]
pub struct BudgetOracle<M> {
    metric: M,
    budgets: Budgets,
    strategy: TruncationStrategy,
}

impl<M: LengthMetric> BudgetOracle<M> {
    #[must_use]
    pub const fn new(metric: M, budgets: Budgets, strategy: TruncationStrategy) -> Self {
        Self {
            metric,
            budgets,
            strategy,
        }
    }
}

impl<M: LengthMetric> LengthOracle for BudgetOracle<M> {
    fn measure(&self, text: &str) -> usize {
        self.metric.measure(text)
    }

    fn budgets(&self) -> Budgets {
        self.budgets
    }

    fn truncate(&self, text: &str) -> String {
        truncate_to_budget(text, self.budgets.unit, self.strategy, |s| self.metric.measure(s))
    }
}

impl std::fmt::Debug for BpeMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BpeMetric(cl100k_base)")
    }
}

/// Build the oracle described by `config`
pub fn oracle_from_config(config: &SplitterConfig) -> Result<Box<dyn LengthOracle>> {
    config.validate().map_err(SplitterError::invalid_config)?;

    let budgets = Budgets {
        unit: config.unit_budget,
        chunk: config.chunk_budget,
    };
    let strategy = config.truncation;

    Ok(match config.metric {
        MetricKind::Chars => Box::new(BudgetOracle::new(CharMetric, budgets, strategy)),
        MetricKind::ApproxTokens => Box::new(BudgetOracle::new(ApproxTokenMetric, budgets, strategy)),
        MetricKind::Bpe => Box::new(BudgetOracle::new(BpeMetric::cl100k()?, budgets, strategy)),
    })
}

/// Longest prefix of `text` whose measure is within `budget`.
///
/// Text already within budget is returned unchanged, which makes the
/// operation idempotent. The search assumes prefix length is monotone in
/// the metric and then steps back one char at a time for metrics (BPE) where
/// that only holds approximately.
pub fn truncate_to_budget(
    text: &str,
    budget: usize,
    strategy: TruncationStrategy,
    measure: impl Fn(&str) -> usize,
) -> String {
    if measure(text) <= budget {
        return text.to_string();
    }

    let boundaries: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();

    // boundaries[0] == 0 always fits; find the last boundary that does.
    let (mut lo, mut hi) = (0usize, boundaries.len());
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if measure(&text[..boundaries[mid]]) <= budget {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let mut end = boundaries.get(lo).copied().unwrap_or(0);

    if strategy == TruncationStrategy::WordBoundary {
        if let Some(space) = text[..end].rfind(char::is_whitespace) {
            if space > 0 {
                end = text[..space].trim_end().len();
            }
        }
    }

    let mut prefix = &text[..end];
    while measure(prefix) > budget {
        let mut chars = prefix.chars();
        chars.next_back();
        prefix = chars.as_str();
    }

    prefix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn char_oracle(unit: usize, chunk: usize) -> BudgetOracle<CharMetric> {
        BudgetOracle::new(CharMetric, Budgets { unit, chunk }, TruncationStrategy::Hard)
    }

    #[test]
    fn test_budget_checks() {
        let oracle = char_oracle(10, 5);
        assert!(oracle.is_within_chunk_budget("abcde"));
        assert!(!oracle.is_within_chunk_budget("abcdef"));
        assert!(oracle.is_within_unit_budget("abcdef"));
        assert!(!oracle.is_within_unit_budget("abcdefghijk"));
        assert_eq!(oracle.measure("héllo"), 5);
    }

    #[test]
    fn test_truncate_hard() {
        let oracle = char_oracle(10, 5);
        assert_eq!(oracle.truncate("short"), "short");
        assert_eq!(oracle.truncate("0123456789abcdef"), "0123456789");
        // Multi-byte chars are never split
        assert_eq!(oracle.truncate("ééééééééééééé"), "éééééééééé");
    }

    #[test]
    fn test_truncate_word_boundary() {
        let oracle = BudgetOracle::new(
            CharMetric,
            Budgets { unit: 12, chunk: 8 },
            TruncationStrategy::WordBoundary,
        );
        assert_eq!(oracle.truncate("call(a); call(b); call(c);"), "call(a);");
        // No whitespace: falls back to a hard cut
        assert_eq!(oracle.truncate("abcdefghijklmnopqrstuvwxyz"), "abcdefghijkl");
    }

    #[test]
    fn test_approx_tokens() {
        let oracle = BudgetOracle::new(ApproxTokenMetric, Budgets { unit: 3, chunk: 2 }, TruncationStrategy::Hard);
        assert_eq!(oracle.measure(""), 0);
        assert_eq!(oracle.measure("hi"), 1);
        assert_eq!(oracle.measure("hello world"), 3);
        assert_eq!(oracle.truncate("0123456789abcdef"), "0123456789ab");
    }

    #[test]
    fn test_oracle_from_config() {
        let config = SplitterConfig {
            unit_budget: 150,
            chunk_budget: 100,
            metric: MetricKind::Chars,
            ..Default::default()
        };
        let oracle = oracle_from_config(&config).unwrap();
        assert_eq!(oracle.budgets(), Budgets { unit: 150, chunk: 100 });
        assert_eq!(oracle.measure("abc"), 3);

        let invalid = SplitterConfig {
            chunk_budget: 200,
            ..config
        };
        assert!(matches!(oracle_from_config(&invalid), Err(SplitterError::InvalidConfig(_))));
    }

    #[test]
    fn test_bpe_truncation_fits() {
        let metric = BpeMetric::cl100k().unwrap();
        let oracle = BudgetOracle::new(metric, Budgets { unit: 8, chunk: 4 }, TruncationStrategy::Hard);
        let text = "for (int i = 0; i < items.size(); i++) { process(items.get(i)); }";
        let cut = oracle.truncate(text);
        assert!(oracle.is_within_unit_budget(&cut));
        assert!(text.starts_with(&cut));
        assert_eq!(oracle.truncate(&cut), cut);
    }

    proptest! {
        #[test]
        fn prop_truncate_idempotent(text in "\\PC{0,200}", unit in 1usize..80, word in any::<bool>()) {
            let strategy = if word { TruncationStrategy::WordBoundary } else { TruncationStrategy::Hard };
            let oracle = BudgetOracle::new(CharMetric, Budgets { unit, chunk: unit }, strategy);
            let once = oracle.truncate(&text);
            prop_assert!(oracle.is_within_unit_budget(&once));
            prop_assert!(text.starts_with(&once));
            prop_assert_eq!(oracle.truncate(&once), once);
        }

        #[test]
        fn prop_approx_truncate_fits(text in "[a-z ;(){}]{0,300}", unit in 1usize..40) {
            let oracle = BudgetOracle::new(ApproxTokenMetric, Budgets { unit, chunk: unit }, TruncationStrategy::Hard);
            let once = oracle.truncate(&text);
            prop_assert!(oracle.is_within_unit_budget(&once));
            prop_assert_eq!(oracle.truncate(&once), once);
        }
    }
}
