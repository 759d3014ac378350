//! Longest-common-subsequence diff.
//!
//! Classic O(m·n) dynamic program over token suffixes, walked forward from
//! the start. Ties prefer deletion so that replaced tokens read as
//! "old words out, new words in".

use tracing::trace;

use crate::script::{EditOp, EditScript};
use crate::tokenize::Token;
use crate::DiffAlgorithm;

/// The default exact diff engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct LcsDiff;

/// `table[i][j]` = LCS length of `old[i..]` and `new[j..]`, stored row-major
/// with an extra zero row and column.
struct SuffixTable {
    cols: usize,
    cells: Vec<u32>,
}

impl SuffixTable {
    fn build(old: &[Token], new: &[Token]) -> Self {
        let rows = old.len() + 1;
        let cols = new.len() + 1;
        let mut table = Self {
            cols,
            cells: vec![0; rows * cols],
        };
        for i in (0..old.len()).rev() {
            for j in (0..new.len()).rev() {
                let value = if old[i] == new[j] {
                    table.get(i + 1, j + 1) + 1
                } else {
                    table.get(i + 1, j).max(table.get(i, j + 1))
                };
                table.cells[i * cols + j] = value;
            }
        }
        table
    }

    fn get(&self, i: usize, j: usize) -> u32 {
        self.cells[i * self.cols + j]
    }
}

impl DiffAlgorithm for LcsDiff {
    fn diff_tokens(&self, old: &[Token], new: &[Token]) -> EditScript {
        let mut script = EditScript::with_capacity(old.len().max(new.len()));

        // A shared prefix walks straight down the diagonal, so it never needs
        // table cells. Streaming documents mostly grow at the end, which keeps
        // the table small.
        let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
        for token in &old[..prefix] {
            script.push(EditOp::equal(token.as_str()));
        }
        let old = &old[prefix..];
        let new = &new[prefix..];

        trace!(prefix, old = old.len(), new = new.len(), "building LCS table");
        let table = SuffixTable::build(old, new);

        let (m, n) = (old.len(), new.len());
        let (mut i, mut j) = (0, 0);
        while i < m && j < n {
            if old[i] == new[j] {
                script.push(EditOp::equal(old[i].as_str()));
                i += 1;
                j += 1;
            } else if table.get(i + 1, j) >= table.get(i, j + 1) {
                script.push(EditOp::delete(old[i].as_str()));
                i += 1;
            } else {
                script.push(EditOp::insert(new[j].as_str()));
                j += 1;
            }
        }
        for token in &old[i..] {
            script.push(EditOp::delete(token.as_str()));
        }
        for token in &new[j..] {
            script.push(EditOp::insert(token.as_str()));
        }
        script
    }
}
