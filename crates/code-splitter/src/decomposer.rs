use crate::config::SplitterConfig;
use crate::oracle::LengthOracle;
use crate::stats::{DecompositionStats, Location};
use crate::syntax::{Statement, StatementKind, Unit};
use crate::text::{flatten, locate, replace_first};
use crate::types::Chunk;
use std::borrow::Cow;

/// Recursively splits over-budget statements into placeholder-linked chunks.
///
/// Never fails: whatever structural splitting cannot fit is cut down by the
/// oracle and reported through [`DecompositionStats`].
pub struct Decomposer<'o> {
    oracle: &'o dyn LengthOracle,
    placeholder: String,
    max_depth: usize,
    source: Option<String>,
}

/// Text being rewritten for one chunk
struct Frame {
    content: String,
    /// Byte offset after the last substitution; keeps markers in child order
    cursor: usize,
    /// Byte offset of each substituted marker, parallel to `children`
    markers: Vec<usize>,
    children: Vec<Chunk>,
}

impl<'o> Decomposer<'o> {
    #[must_use]
    pub fn new(oracle: &'o dyn LengthOracle, config: &SplitterConfig) -> Self {
        Self {
            oracle,
            placeholder: config.placeholder.clone(),
            max_depth: config.max_depth,
            source: None,
        }
    }

    /// Builder: name the source file reported in diagnostics
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Prepare one method body: a single chunk when `signature + body` fits
    /// the unit budget, a decomposed tree otherwise.
    pub fn split_unit(&self, unit: &Unit, stats: &mut DecompositionStats) -> Chunk {
        let body = flatten(&unit.body.render());

        if self
            .oracle
            .is_within_unit_budget(&format!("{} {}", unit.signature, body))
        {
            stats.record_chunk();
            return Chunk::leaf(body);
        }

        log::debug!("Unit {} exceeds the unit budget, decomposing", unit.name);
        // Diagnostics on the body fall back to the unit's location
        let node = match (unit.body.span, unit.span) {
            (None, Some(span)) => Cow::Owned(unit.body.clone().with_span(span)),
            _ => Cow::Borrowed(&unit.body),
        };
        self.decompose(&node, &body, stats)
    }

    /// Decompose `node`, whose rendering (possibly as part of a larger
    /// span) is `rendered`.
    pub fn decompose(&self, node: &Statement, rendered: &str, stats: &mut DecompositionStats) -> Chunk {
        self.decompose_at(node, flatten(rendered), 0, stats)
    }

    fn decompose_at(&self, node: &Statement, content: String, depth: usize, stats: &mut DecompositionStats) -> Chunk {
        let mut frame = Frame {
            content,
            cursor: 0,
            markers: Vec::new(),
            children: Vec::new(),
        };

        if !self.oracle.is_within_chunk_budget(&frame.content) {
            let children = node.direct_children();
            if depth >= self.max_depth {
                if !children.is_empty() {
                    log::warn!(
                        "Depth limit {} reached at {} statement, keeping children inline",
                        self.max_depth,
                        node.label()
                    );
                    stats.record_depth_limit(self.location(node), depth);
                }
            } else {
                log::debug!("Decomposing {} statement at depth {depth}", node.label());
                for child in children {
                    self.split_child(&mut frame, child, depth, stats);
                }
            }
        }

        let Frame {
            content,
            markers,
            mut children,
            ..
        } = frame;
        let content = self.enforce_unit_budget(node, content, &markers, &mut children, stats);

        stats.record_chunk();
        Chunk::new(content, children)
    }

    /// Apply the per-kind policy to one direct child of the node in `frame`
    fn split_child(&self, frame: &mut Frame, stmt: &Statement, depth: usize, stats: &mut DecompositionStats) {
        let text = span_text(&stmt.render());
        if self.oracle.is_within_chunk_budget(&text) {
            return;
        }

        match &stmt.kind {
            StatementKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let then_text = span_text(&format!("if ({condition}) {}", then_branch.render()));

                let Some(else_branch) = else_branch else {
                    self.substitute(frame, then_branch, then_text, depth, stats);
                    return;
                };

                // Keep a small else inline next to a single then-placeholder;
                // split both only when that still overflows.
                let probe = replace_first(&text, &then_text, &self.placeholder);
                if self.oracle.is_within_chunk_budget(&probe) {
                    self.substitute(frame, then_branch, text, depth, stats);
                } else {
                    let else_text = span_text(&format!("else {}", else_branch.render()));
                    self.substitute(frame, then_branch, then_text, depth, stats);
                    self.substitute(frame, else_branch, else_text, depth, stats);
                }
            }
            StatementKind::Switch { entries, .. } => {
                for statement in entries.iter().flat_map(|entry| &entry.statements) {
                    let statement_text = span_text(&statement.render());
                    if !self.oracle.is_within_chunk_budget(&statement_text) {
                        self.substitute(frame, statement, statement_text, depth, stats);
                    }
                }
            }
            // Recovery and cleanup blocks are never split; the truncation
            // backstop absorbs them.
            StatementKind::Try { block, .. } => self.substitute(frame, block, text, depth, stats),
            StatementKind::CountedLoop { body, .. }
            | StatementKind::ConditionLoop { body, .. }
            | StatementKind::PostTestLoop { body, .. }
            | StatementKind::CollectionLoop { body, .. }
            | StatementKind::Synchronized { body, .. } => self.substitute(frame, body, text, depth, stats),
            StatementKind::Block { .. } => self.substitute(frame, stmt, text, depth, stats),
            // A plain statement has nothing to split; it only reaches the
            // truncation backstop through its own chunk.
            StatementKind::Plain { .. } | StatementKind::Other { .. } => {
                let label = stmt.label();
                log::warn!("Unhandled long statement type: {label}");
                stats.record_unhandled_kind(self.location(stmt), label);
                self.substitute(frame, stmt, text, depth, stats);
            }
        }
    }

    /// Decompose `node` over `span` and swap the first occurrence of `span`
    /// after the cursor for one placeholder.
    fn substitute(
        &self,
        frame: &mut Frame,
        node: &Statement,
        span: String,
        depth: usize,
        stats: &mut DecompositionStats,
    ) {
        let Some(start) = locate(&frame.content, frame.cursor, &span) else {
            log::warn!("Rendered {} statement not found in parent text", node.label());
            stats.record_span_not_found(self.location(node), node.label());
            return;
        };

        let end = start + span.len();
        let child = self.decompose_at(node, span, depth + 1, stats);

        frame.content.replace_range(start..end, &self.placeholder);
        frame.cursor = start + self.placeholder.len();
        frame.markers.push(start);
        frame.children.push(child);
    }

    /// Final backstop: cut content that still exceeds the unit budget.
    ///
    /// A substituted marker cut partway is removed whole, and children whose
    /// marker did not survive the cut are dropped. `markers` holds the byte
    /// offset of each child's marker in `content`.
    fn enforce_unit_budget(
        &self,
        node: &Statement,
        content: String,
        markers: &[usize],
        children: &mut Vec<Chunk>,
        stats: &mut DecompositionStats,
    ) -> String {
        if self.oracle.is_within_unit_budget(&content) {
            return content;
        }

        let mut cut = self.oracle.truncate(&content);
        debug_assert!(content.starts_with(&cut), "truncate() must return a prefix");
        let marker_len = self.placeholder.len();
        if let Some(&start) = markers
            .iter()
            .find(|&&start| start < cut.len() && cut.len() < start + marker_len)
        {
            cut.truncate(start);
        }
        assert!(
            self.oracle.is_within_unit_budget(&cut),
            "length oracle contract violated: truncate() returned {} for a unit budget of {}",
            self.oracle.measure(&cut),
            self.oracle.budgets().unit
        );

        let kept = markers
            .iter()
            .filter(|&&start| start + marker_len <= cut.len())
            .count();
        children.truncate(kept);

        let lost = self
            .oracle
            .measure(&content)
            .saturating_sub(self.oracle.measure(&cut));
        log::warn!(
            "Truncated {} statement{} by {lost}",
            node.label(),
            self.source
                .as_deref()
                .map(|source| format!(" in {source}"))
                .unwrap_or_default()
        );
        stats.record_truncation(self.location(node), content, cut.clone(), lost);

        cut
    }

    fn location(&self, node: &Statement) -> Location {
        Location {
            source: self.source.clone(),
            span: node.span,
        }
    }
}

/// Flattened text of a rendering, as it appears inside its parent
fn span_text(rendered: &str) -> String {
    flatten(rendered).trim().to_string()
}
