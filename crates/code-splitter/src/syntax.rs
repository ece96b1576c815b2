//! Structural statement model handed over by an external parser.
//!
//! The tree is read-only to the splitter. Every node renders to canonical
//! C-family text; the flattened rendering of a child is always a literal
//! substring of the flattened rendering of its parent.

use serde::{Deserialize, Serialize};
use std::fmt;

const INDENT: &str = "    ";

/// Position in a source file (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Source range of a node, used only for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub begin: Position,
    pub end: Position,
}

impl SourceSpan {
    #[must_use]
    pub const fn new(begin_line: usize, begin_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            begin: Position {
                line: begin_line,
                column: begin_column,
            },
            end: Position {
                line: end_line,
                column: end_column,
            },
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(line {},col {})-(line {},col {})",
            self.begin.line, self.begin.column, self.end.line, self.end.column
        )
    }
}

/// Closed category of a statement, deciding its decomposition policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralKind {
    Plain,
    Conditional,
    MultiWaySwitch,
    ExceptionGuard,
    CountedLoop,
    ConditionLoop,
    PostTestLoop,
    CollectionLoop,
    MutualExclusionBlock,
    Other,
}

impl StructuralKind {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Conditional => "conditional",
            Self::MultiWaySwitch => "multi_way_switch",
            Self::ExceptionGuard => "exception_guard",
            Self::CountedLoop => "counted_loop",
            Self::ConditionLoop => "condition_loop",
            Self::PostTestLoop => "post_test_loop",
            Self::CollectionLoop => "collection_loop",
            Self::MutualExclusionBlock => "mutual_exclusion_block",
            Self::Other => "other",
        }
    }
}

/// One `case`/`default` arm of a switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchEntry {
    /// Case labels; empty means `default`
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl SwitchEntry {
    #[must_use]
    pub fn case(labels: Vec<String>, statements: Vec<Statement>) -> Self {
        Self { labels, statements }
    }

    #[must_use]
    pub fn default_arm(statements: Vec<Statement>) -> Self {
        Self {
            labels: Vec::new(),
            statements,
        }
    }

    fn header(&self) -> String {
        if self.labels.is_empty() {
            "default:".to_string()
        } else {
            format!("case {}:", self.labels.join(", "))
        }
    }
}

/// Recovery block of an exception guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchClause {
    pub parameter: String,
    pub body: Box<Statement>,
}

/// Kind-specific structure of a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatementKind {
    /// Simple statement with no statement children
    Plain { text: String },
    /// Braced statement list
    Block { statements: Vec<Statement> },
    Conditional {
        condition: String,
        then_branch: Box<Statement>,
        #[serde(default)]
        else_branch: Option<Box<Statement>>,
    },
    Switch {
        selector: String,
        entries: Vec<SwitchEntry>,
    },
    Try {
        #[serde(default)]
        resources: Vec<String>,
        block: Box<Statement>,
        #[serde(default)]
        catches: Vec<CatchClause>,
        #[serde(default)]
        finally: Option<Box<Statement>>,
    },
    CountedLoop {
        #[serde(default)]
        init: String,
        #[serde(default)]
        condition: String,
        #[serde(default)]
        update: String,
        body: Box<Statement>,
    },
    ConditionLoop {
        condition: String,
        body: Box<Statement>,
    },
    PostTestLoop {
        body: Box<Statement>,
        condition: String,
    },
    CollectionLoop {
        variable: String,
        iterable: String,
        body: Box<Statement>,
    },
    Synchronized {
        lock: String,
        body: Box<Statement>,
    },
    /// Construct the parser could not classify; `label` names it
    Other {
        label: String,
        #[serde(default)]
        header: String,
        #[serde(default)]
        children: Vec<Statement>,
    },
}

/// A statement-like node of the syntax tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl Statement {
    #[must_use]
    pub const fn new(kind: StatementKind) -> Self {
        Self { kind, span: None }
    }

    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(StatementKind::Plain { text: text.into() })
    }

    #[must_use]
    pub fn block(statements: Vec<Statement>) -> Self {
        Self::new(StatementKind::Block { statements })
    }

    #[must_use]
    pub fn conditional(condition: impl Into<String>, then_branch: Statement, else_branch: Option<Statement>) -> Self {
        Self::new(StatementKind::Conditional {
            condition: condition.into(),
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        })
    }

    #[must_use]
    pub fn switch(selector: impl Into<String>, entries: Vec<SwitchEntry>) -> Self {
        Self::new(StatementKind::Switch {
            selector: selector.into(),
            entries,
        })
    }

    #[must_use]
    pub fn try_catch(block: Statement, catches: Vec<(String, Statement)>, finally: Option<Statement>) -> Self {
        Self::new(StatementKind::Try {
            resources: Vec::new(),
            block: Box::new(block),
            catches: catches
                .into_iter()
                .map(|(parameter, body)| CatchClause {
                    parameter,
                    body: Box::new(body),
                })
                .collect(),
            finally: finally.map(Box::new),
        })
    }

    #[must_use]
    pub fn counted_loop(
        init: impl Into<String>,
        condition: impl Into<String>,
        update: impl Into<String>,
        body: Statement,
    ) -> Self {
        Self::new(StatementKind::CountedLoop {
            init: init.into(),
            condition: condition.into(),
            update: update.into(),
            body: Box::new(body),
        })
    }

    #[must_use]
    pub fn while_loop(condition: impl Into<String>, body: Statement) -> Self {
        Self::new(StatementKind::ConditionLoop {
            condition: condition.into(),
            body: Box::new(body),
        })
    }

    #[must_use]
    pub fn do_while(body: Statement, condition: impl Into<String>) -> Self {
        Self::new(StatementKind::PostTestLoop {
            body: Box::new(body),
            condition: condition.into(),
        })
    }

    #[must_use]
    pub fn for_each(variable: impl Into<String>, iterable: impl Into<String>, body: Statement) -> Self {
        Self::new(StatementKind::CollectionLoop {
            variable: variable.into(),
            iterable: iterable.into(),
            body: Box::new(body),
        })
    }

    #[must_use]
    pub fn synchronized(lock: impl Into<String>, body: Statement) -> Self {
        Self::new(StatementKind::Synchronized {
            lock: lock.into(),
            body: Box::new(body),
        })
    }

    #[must_use]
    pub fn other(label: impl Into<String>, header: impl Into<String>, children: Vec<Statement>) -> Self {
        Self::new(StatementKind::Other {
            label: label.into(),
            header: header.into(),
            children,
        })
    }

    /// Builder: attach a source span
    #[must_use]
    pub const fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Tag deciding how an oversized statement is decomposed
    #[must_use]
    pub const fn structural_kind(&self) -> StructuralKind {
        match &self.kind {
            StatementKind::Plain { .. } | StatementKind::Block { .. } => StructuralKind::Plain,
            StatementKind::Conditional { .. } => StructuralKind::Conditional,
            StatementKind::Switch { .. } => StructuralKind::MultiWaySwitch,
            StatementKind::Try { .. } => StructuralKind::ExceptionGuard,
            StatementKind::CountedLoop { .. } => StructuralKind::CountedLoop,
            StatementKind::ConditionLoop { .. } => StructuralKind::ConditionLoop,
            StatementKind::PostTestLoop { .. } => StructuralKind::PostTestLoop,
            StatementKind::CollectionLoop { .. } => StructuralKind::CollectionLoop,
            StatementKind::Synchronized { .. } => StructuralKind::MutualExclusionBlock,
            StatementKind::Other { .. } => StructuralKind::Other,
        }
    }

    /// Name used in diagnostics (the parser's label for unclassified nodes)
    #[must_use]
    pub fn label(&self) -> &str {
        match &self.kind {
            StatementKind::Other { label, .. } => label,
            _ => self.structural_kind().as_str(),
        }
    }

    /// The single body of a loop or lock statement
    #[must_use]
    pub fn body(&self) -> Option<&Statement> {
        match &self.kind {
            StatementKind::CountedLoop { body, .. }
            | StatementKind::ConditionLoop { body, .. }
            | StatementKind::PostTestLoop { body, .. }
            | StatementKind::CollectionLoop { body, .. }
            | StatementKind::Synchronized { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Statements whose structural parent is this node, in source order.
    ///
    /// Switch entry statements and recovery/cleanup blocks belong to their
    /// entry or clause, not to the statement itself.
    #[must_use]
    pub fn direct_children(&self) -> Vec<&Statement> {
        match &self.kind {
            StatementKind::Plain { .. } | StatementKind::Switch { .. } => Vec::new(),
            StatementKind::Block { statements } => statements.iter().collect(),
            StatementKind::Conditional {
                then_branch,
                else_branch,
                ..
            } => std::iter::once(then_branch.as_ref())
                .chain(else_branch.as_deref())
                .collect(),
            StatementKind::Try { block, .. } => vec![block.as_ref()],
            StatementKind::Other { children, .. } => children.iter().collect(),
            _ => self.body().into_iter().collect(),
        }
    }

    /// Canonical multi-line rendering (four-space indentation)
    #[must_use]
    pub fn render(&self) -> String {
        match &self.kind {
            StatementKind::Plain { text } => text.clone(),
            StatementKind::Block { statements } => render_block(statements.iter().map(Statement::render)),
            StatementKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out = format!("if ({condition}) {}", then_branch.render());
                if let Some(else_branch) = else_branch {
                    out.push_str(" else ");
                    out.push_str(&else_branch.render());
                }
                out
            }
            StatementKind::Switch { selector, entries } => {
                let arms = entries.iter().map(|entry| {
                    let mut arm = entry.header();
                    for statement in &entry.statements {
                        arm.push('\n');
                        arm.push_str(&indent(&statement.render()));
                    }
                    arm
                });
                format!("switch ({selector}) {}", render_block(arms))
            }
            StatementKind::Try {
                resources,
                block,
                catches,
                finally,
            } => {
                let mut out = String::from("try ");
                if !resources.is_empty() {
                    out.push_str(&format!("({}) ", resources.join("; ")));
                }
                out.push_str(&block.render());
                for clause in catches {
                    out.push_str(&format!(" catch ({}) {}", clause.parameter, clause.body.render()));
                }
                if let Some(finally) = finally {
                    out.push_str(" finally ");
                    out.push_str(&finally.render());
                }
                out
            }
            StatementKind::CountedLoop {
                init,
                condition,
                update,
                body,
            } => format!("for ({init}; {condition}; {update}) {}", body.render()),
            StatementKind::ConditionLoop { condition, body } => {
                format!("while ({condition}) {}", body.render())
            }
            StatementKind::PostTestLoop { body, condition } => {
                format!("do {} while ({condition});", body.render())
            }
            StatementKind::CollectionLoop {
                variable,
                iterable,
                body,
            } => format!("for ({variable} : {iterable}) {}", body.render()),
            StatementKind::Synchronized { lock, body } => {
                format!("synchronized ({lock}) {}", body.render())
            }
            StatementKind::Other { header, children, .. } => {
                let parts: Vec<String> = (!header.is_empty())
                    .then(|| header.clone())
                    .into_iter()
                    .chain(children.iter().map(Statement::render))
                    .collect();
                parts.join("\n")
            }
        }
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("{INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(items: impl Iterator<Item = String>) -> String {
    let body: Vec<String> = items.map(|item| indent(&item)).collect();
    if body.is_empty() {
        "{\n}".to_string()
    } else {
        format!("{{\n{}\n}}", body.join("\n"))
    }
}

/// One method/function body prepared for output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub signature: String,
    pub body: Statement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl Unit {
    #[must_use]
    pub fn new(name: impl Into<String>, signature: impl Into<String>, body: Statement) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            body,
            span: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::flatten;
    use pretty_assertions::assert_eq;

    fn sample() -> Statement {
        Statement::block(vec![
            Statement::plain("int total = 0;"),
            Statement::counted_loop(
                "int i = 0",
                "i < n",
                "i++",
                Statement::block(vec![Statement::conditional(
                    "i % 2 == 0",
                    Statement::block(vec![Statement::plain("total += i;")]),
                    Some(Statement::plain("continue;")),
                )]),
            ),
            Statement::switch(
                "mode",
                vec![
                    SwitchEntry::case(vec!["A".into()], vec![Statement::plain("run();"), Statement::plain("break;")]),
                    SwitchEntry::default_arm(vec![Statement::plain("skip();")]),
                ],
            ),
            Statement::try_catch(
                Statement::block(vec![Statement::plain("open();")]),
                vec![("IOException e".into(), Statement::block(vec![Statement::plain("log(e);")]))],
                Some(Statement::block(vec![Statement::plain("close();")])),
            ),
        ])
    }

    #[test]
    fn test_render_canonical() {
        let rendered = sample().render();
        assert_eq!(
            rendered,
            "{
    int total = 0;
    for (int i = 0; i < n; i++) {
        if (i % 2 == 0) {
            total += i;
        } else continue;
    }
    switch (mode) {
        case A:
            run();
            break;
        default:
            skip();
    }
    try {
        open();
    } catch (IOException e) {
        log(e);
    } finally {
        close();
    }
}"
        );
    }

    fn assert_children_embedded(node: &Statement) {
        let parent = flatten(&node.render());
        for child in node.direct_children() {
            let text = flatten(&child.render());
            assert!(parent.contains(&text), "{text:?} not found in {parent:?}");
            assert_children_embedded(child);
        }
    }

    #[test]
    fn test_child_rendering_is_substring_of_parent() {
        assert_children_embedded(&sample());
    }

    #[test]
    fn test_structural_kinds() {
        assert_eq!(Statement::plain("x;").structural_kind(), StructuralKind::Plain);
        assert_eq!(Statement::block(vec![]).structural_kind(), StructuralKind::Plain);
        assert_eq!(
            Statement::synchronized("lock", Statement::block(vec![])).structural_kind(),
            StructuralKind::MutualExclusionBlock
        );

        let labeled = Statement::other("LabeledStmt", "outer:", vec![Statement::plain("x;")]);
        assert_eq!(labeled.structural_kind(), StructuralKind::Other);
        assert_eq!(labeled.label(), "LabeledStmt");
        assert_eq!(Statement::plain("x;").label(), "plain");
    }

    #[test]
    fn test_direct_children() {
        let guard = Statement::try_catch(
            Statement::block(vec![Statement::plain("a();")]),
            vec![("E e".into(), Statement::block(vec![Statement::plain("b();")]))],
            Some(Statement::block(vec![Statement::plain("c();")])),
        );
        assert_eq!(guard.direct_children().len(), 1);

        let cond = Statement::conditional("x", Statement::plain("a();"), Some(Statement::plain("b();")));
        assert_eq!(cond.direct_children().len(), 2);

        let switch = Statement::switch("x", vec![SwitchEntry::default_arm(vec![Statement::plain("a();")])]);
        assert!(switch.direct_children().is_empty());

        let body = Statement::do_while(Statement::block(vec![]), "x");
        assert_eq!(body.direct_children(), vec![&Statement::block(vec![])]);
    }

    #[test]
    fn test_json_shape() {
        let raw = r#"{
            "kind": {
                "type": "conditional",
                "condition": "x > 0",
                "then_branch": { "kind": { "type": "plain", "text": "go();" } }
            },
            "span": { "begin": { "line": 3, "column": 5 }, "end": { "line": 4, "column": 9 } }
        }"#;
        let node: Statement = serde_json::from_str(raw).unwrap();
        assert_eq!(node.render(), "if (x > 0) go();");
        assert_eq!(node.span.unwrap().to_string(), "(line 3,col 5)-(line 4,col 9)");
    }
}
