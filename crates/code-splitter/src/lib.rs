//! # Code Splitter
//!
//! Bounded, structure-aware decomposition of oversized method bodies.
//!
//! A unit whose text exceeds a length budget is split into a tree of chunks,
//! each within budget. Every decomposed statement is replaced in its parent
//! by a placeholder marker linked to a child chunk, so the original text can
//! be rebuilt by expanding markers depth-first.
//!
//! ## Architecture
//!
//! ```text
//! Unit (signature + body syntax tree, from an external parser)
//!     │
//!     ├──> Length Oracle: fits unit budget? ──yes──> single chunk
//!     │
//!     └──> Bounded Decomposer
//!          ├─> Flatten rendering (newlines/space runs → one space)
//!          ├─> Per direct child over the chunk budget:
//!          │    ├─> conditional: then only, or then + else
//!          │    ├─> switch: each oversized entry statement
//!          │    ├─> exception guard: protected block only
//!          │    ├─> loops / lock: the single body
//!          │    └─> other: diagnostic + generic split
//!          ├─> Literal replace-first with a placeholder
//!          └─> Still over the unit budget? truncate + record the loss
//! ```
//!
//! ## Example
//!
//! ```rust
//! use code_splitter::{oracle_from_config, Decomposer, DecompositionStats, SplitterConfig, Statement};
//!
//! let config = SplitterConfig {
//!     unit_budget: 150,
//!     chunk_budget: 100,
//!     metric: code_splitter::MetricKind::Chars,
//!     ..Default::default()
//! };
//! let oracle = oracle_from_config(&config).unwrap();
//! let decomposer = Decomposer::new(oracle.as_ref(), &config);
//!
//! let body = Statement::conditional(
//!     "x > 0",
//!     Statement::block(vec![Statement::plain("x = step(x);"); 10]),
//!     Some(Statement::plain("reset();")),
//! );
//!
//! let mut stats = DecompositionStats::new();
//! let chunk = decomposer.decompose(&body, &body.render(), &mut stats);
//! assert_eq!(chunk.content, "if (x > 0) <BLOCK> else reset();");
//! assert_eq!(chunk.children.len(), 1);
//! ```

mod config;
mod decomposer;
mod error;
mod oracle;
mod stats;
mod syntax;
pub mod text;
mod types;

pub use config::{MetricKind, SplitterConfig, TruncationStrategy, DEFAULT_PLACEHOLDER};
pub use decomposer::Decomposer;
pub use error::{Result, SplitterError};
pub use oracle::{
    oracle_from_config, truncate_to_budget, ApproxTokenMetric, BpeMetric, BudgetOracle, Budgets, CharMetric,
    LengthMetric, LengthOracle,
};
pub use stats::{DecompositionStats, Diagnostic, Location, StatsSummary};
pub use syntax::{CatchClause, Position, SourceSpan, Statement, StatementKind, StructuralKind, SwitchEntry, Unit};
pub use types::Chunk;
