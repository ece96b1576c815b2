use serde::{Deserialize, Serialize};

/// A bounded piece of a unit.
///
/// Every placeholder marker in `content` stands for one element of
/// `children`, in left-to-right order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Chunk>,
}

impl Chunk {
    /// Create a new chunk
    #[must_use]
    pub const fn new(content: String, children: Vec<Chunk>) -> Self {
        Self { content, children }
    }

    /// Create a chunk with no children
    #[must_use]
    pub fn leaf(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of `marker` occurrences in this chunk's own content
    #[must_use]
    pub fn placeholder_count(&self, marker: &str) -> usize {
        if marker.is_empty() {
            return 0;
        }
        self.content.matches(marker).count()
    }

    /// Check the marker/children correspondence for the whole tree
    #[must_use]
    pub fn is_consistent(&self, marker: &str) -> bool {
        self.placeholder_count(marker) == self.children.len()
            && self.children.iter().all(|child| child.is_consistent(marker))
    }

    /// Total chunks in this tree, including this one
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Chunk::node_count).sum::<usize>()
    }

    /// Height of the tree (a leaf has depth 1)
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Chunk::depth).max().unwrap_or(0)
    }

    /// Reconstruct the text by substituting every marker with its child's
    /// expansion. Extra markers without a child are left as they are.
    #[must_use]
    pub fn expand(&self, marker: &str) -> String {
        if marker.is_empty() || self.children.is_empty() {
            return self.content.clone();
        }

        let mut out = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();
        let mut children = self.children.iter();

        while let Some(idx) = rest.find(marker) {
            let Some(child) = children.next() else {
                break;
            };
            out.push_str(&rest[..idx]);
            out.push_str(&child.expand(marker));
            rest = &rest[idx + marker.len()..];
        }
        out.push_str(rest);
        out
    }
}
