//! Document view: diffs each new document text against the last settled one
//! and drives the highlight scheduler.

use std::sync::Arc;

use livedoc_diff::{DiffAlgorithm, EditScript, LcsDiff};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::render::{HighlightActivation, HighlightConfig, RenderScheduler, plan_highlights};
use crate::workspace::WorkspaceSnapshot;

/// What the renderer needs for one document change.
#[derive(Clone, Debug)]
pub struct RenderUpdate {
    /// The new settled text.
    pub text: String,
    /// Edit script from the previous settled text to `text`.
    pub script: EditScript,
    pub plan: Vec<HighlightActivation>,
    /// Highlight generation, or `None` when nothing was inserted.
    pub generation: Option<u64>,
}

pub struct DocumentView {
    settled: String,
    algorithm: Box<dyn DiffAlgorithm>,
    scheduler: RenderScheduler,
}

impl DocumentView {
    pub fn new(config: HighlightConfig) -> Self {
        Self::with_algorithm(LcsDiff, config)
    }

    pub fn with_algorithm(algorithm: impl DiffAlgorithm + 'static, config: HighlightConfig) -> Self {
        Self {
            settled: String::new(),
            algorithm: Box::new(algorithm),
            scheduler: RenderScheduler::new(config),
        }
    }

    /// The text the view last settled on.
    pub fn text(&self) -> &str {
        &self.settled
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// Diff `new_text` against the settled text, settle on it and schedule
    /// highlights for the inserted tokens.
    pub fn update(&mut self, new_text: &str) -> RenderUpdate {
        let script = self.algorithm.diff(&self.settled, new_text);
        let plan = plan_highlights(&script, new_text, self.scheduler.config());
        let generation = if plan.is_empty() {
            None
        } else {
            Some(self.scheduler.schedule(plan.clone()))
        };
        let (inserted, deleted) = script.change_counts();
        trace!(inserted, deleted, ?generation, "document view updated");

        self.settled.clear();
        self.settled.push_str(new_text);
        RenderUpdate {
            text: self.settled.clone(),
            script,
            plan,
            generation,
        }
    }

    /// Drive this view from a store's snapshot channel.
    ///
    /// Snapshots that arrive faster than they are consumed are coalesced, so
    /// each diff runs against the last settled text, never an intermediate
    /// one. The task ends when the store is dropped or `updates` is closed.
    pub fn follow(
        mut self,
        mut snapshots: watch::Receiver<Arc<WorkspaceSnapshot>>,
    ) -> (RenderScheduler, mpsc::UnboundedReceiver<RenderUpdate>, JoinHandle<()>) {
        let scheduler = self.scheduler.clone();
        let (tx, updates) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            loop {
                let text = snapshots.borrow_and_update().document_text().to_owned();
                if text != self.settled && tx.send(self.update(&text)).is_err() {
                    break;
                }
                if snapshots.changed().await.is_err() {
                    break;
                }
            }
            debug!("document view stopped following store");
        });
        (scheduler, updates, task)
    }
}

impl Default for DocumentView {
    fn default() -> Self {
        Self::new(HighlightConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceStore;
    use livedoc_diff::{EditOp, Token};
    use livedoc_types::StreamEvent;
    use serde_json::json;
    use std::time::Duration;

    fn doc(text: &str) -> StreamEvent {
        StreamEvent::new("document", json!(text), "")
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_diffs_against_settled_text() {
        let mut view = DocumentView::default();
        let first = view.update("hello world");
        assert_eq!(first.script.inserted().count(), 3);
        assert_eq!(first.generation, Some(1));

        let second = view.update("hello brave world");
        assert_eq!(
            second.script.ops(),
            &[
                EditOp::equal("hello"),
                EditOp::equal(" "),
                EditOp::insert("brave"),
                EditOp::insert(" "),
                EditOp::equal("world"),
            ]
        );
        assert_eq!(second.generation, Some(2));
        assert_eq!(view.text(), "hello brave world");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deletion_only_schedules_nothing() {
        let mut view = DocumentView::default();
        view.update("a b c");
        let update = view.update("a c");
        assert!(update.plan.is_empty());
        assert_eq!(update.generation, None);
        assert_eq!(view.scheduler().generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_algorithm_is_used() {
        struct Replace;

        impl DiffAlgorithm for Replace {
            fn diff_tokens(&self, old: &[Token], new: &[Token]) -> EditScript {
                old.iter()
                    .map(EditOp::delete)
                    .chain(new.iter().map(EditOp::insert))
                    .collect()
            }
        }

        let mut view = DocumentView::with_algorithm(Replace, HighlightConfig::default());
        view.update("x y");
        let update = view.update("x y z");
        assert_eq!(update.script.deleted().count(), 3);
        assert_eq!(update.plan.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_store() {
        let store = WorkspaceStore::new();
        let (scheduler, mut updates, _task) = DocumentView::default().follow(store.subscribe());

        store.apply(&doc("hello world"));
        let first = updates.recv().await.unwrap();
        assert_eq!(first.text, "hello world");

        store.apply(&doc("hello brave world"));
        let second = updates.recv().await.unwrap();
        assert_eq!(second.script.change_counts(), (2, 0));

        // Log events don't touch the document; no update is emitted.
        store.apply(&StreamEvent::new("log", json!("x"), ""));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(updates.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(scheduler.highlighted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_coalesces_to_latest() {
        let store = WorkspaceStore::new();
        store.apply(&doc("one"));
        store.apply(&doc("one two"));
        store.apply(&doc("one two three"));

        let (_scheduler, mut updates, _task) = DocumentView::default().follow(store.subscribe());
        let update = updates.recv().await.unwrap();
        assert_eq!(update.text, "one two three");
        assert_eq!(update.script.old_text(), "");
    }
}
