//! Edit scripts: the ordered equal/insert/delete sequence between two texts.

use serde::{Deserialize, Serialize};

/// How a token changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Equal,
    Insert,
    Delete,
}

/// One token paired with how it changed.
///
/// Serializes as `{"type": "insert", "token": "brave"}`, the shape document
/// renderers consume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOp {
    #[serde(rename = "type")]
    pub kind: OpKind,
    pub token: String,
}

impl EditOp {
    pub fn new(kind: OpKind, token: impl Into<String>) -> Self {
        Self {
            kind,
            token: token.into(),
        }
    }

    pub fn equal(token: impl Into<String>) -> Self {
        Self::new(OpKind::Equal, token)
    }

    pub fn insert(token: impl Into<String>) -> Self {
        Self::new(OpKind::Insert, token)
    }

    pub fn delete(token: impl Into<String>) -> Self {
        Self::new(OpKind::Delete, token)
    }

    /// Part of the old text (`Equal` or `Delete`).
    pub fn in_old(&self) -> bool {
        matches!(self.kind, OpKind::Equal | OpKind::Delete)
    }

    /// Part of the new text (`Equal` or `Insert`).
    pub fn in_new(&self) -> bool {
        matches!(self.kind, OpKind::Equal | OpKind::Insert)
    }
}

/// Ordered edit operations transforming one token sequence into another.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditScript(Vec<EditOp>);

impl EditScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, op: EditOp) {
        self.0.push(op);
    }

    pub fn ops(&self) -> &[EditOp] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EditOp> {
        self.0.iter()
    }

    /// Rebuild the text the script was diffed from.
    pub fn old_text(&self) -> String {
        self.0.iter().filter(|op| op.in_old()).map(|op| op.token.as_str()).collect()
    }

    /// Rebuild the text the script diffs to.
    pub fn new_text(&self) -> String {
        self.0.iter().filter(|op| op.in_new()).map(|op| op.token.as_str()).collect()
    }

    /// Inserted ops in script order.
    pub fn inserted(&self) -> impl Iterator<Item = &EditOp> {
        self.0.iter().filter(|op| op.kind == OpKind::Insert)
    }

    /// Deleted ops in script order.
    pub fn deleted(&self) -> impl Iterator<Item = &EditOp> {
        self.0.iter().filter(|op| op.kind == OpKind::Delete)
    }

    /// True when the script contains no inserts or deletes.
    pub fn is_unchanged(&self) -> bool {
        self.0.iter().all(|op| op.kind == OpKind::Equal)
    }

    /// `(inserted, deleted)` token counts.
    pub fn change_counts(&self) -> (usize, usize) {
        self.0.iter().fold((0, 0), |(ins, del), op| match op.kind {
            OpKind::Insert => (ins + 1, del),
            OpKind::Delete => (ins, del + 1),
            OpKind::Equal => (ins, del),
        })
    }

    pub fn into_ops(self) -> Vec<EditOp> {
        self.0
    }
}

impl FromIterator<EditOp> for EditScript {
    fn from_iter<I: IntoIterator<Item = EditOp>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for EditScript {
    type Item = EditOp;
    type IntoIter = std::vec::IntoIter<EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOp;
    type IntoIter = std::slice::Iter<'a, EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
