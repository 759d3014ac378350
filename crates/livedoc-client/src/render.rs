//! Inserted-token highlight scheduling.
//!
//! [`plan_highlights`] turns an edit script into a typewriter-ordered list of
//! activations. [`RenderScheduler`] runs a plan: each inserted token lights up
//! at its delay and goes dark `duration` later.
//!
//! Every plan runs under a generation number. Scheduling a new plan bumps the
//! generation and clears whatever older plans still have lit. A timer only
//! lights its token if its generation is still current, and only ever
//! removes its own `(position, generation)` entry, so overlapping updates
//! cannot leave a highlight behind.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use livedoc_diff::{EditScript, OpKind, Token, tokenize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::constants::{HIGHLIGHT_DURATION, HIGHLIGHT_STEP};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Delay added per inserted token.
    pub step: Duration,
    /// How long one token stays highlighted.
    pub duration: Duration,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            step: HIGHLIGHT_STEP,
            duration: HIGHLIGHT_DURATION,
        }
    }
}

/// One scheduled highlight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightActivation {
    /// Offset from scheduling time.
    pub delay: Duration,
    /// Index into the tokenization of the new text.
    pub position: usize,
    pub token: Token,
}

/// Plan one activation per inserted token.
///
/// The `n`th activation fires at `n * step`. Positions come from a single
/// forward walk over the script: every op present in the new text (equal or
/// insert) consumes one token of `new_text`, so an inserted token gets its
/// own position even when an identical token was kept earlier.
pub fn plan_highlights(
    script: &EditScript,
    new_text: &str,
    config: &HighlightConfig,
) -> Vec<HighlightActivation> {
    let tokens = tokenize(new_text);
    let mut position = 0;
    let mut plan = Vec::new();

    for op in script.iter().filter(|op| op.in_new()) {
        let current = position;
        position += 1;
        if op.kind != OpKind::Insert {
            continue;
        }
        if tokens.get(current) != Some(&op.token) {
            debug!(token = %op.token, position = current, "inserted token does not match new text");
            continue;
        }
        let delay = config.step.saturating_mul(plan.len() as u32);
        plan.push(HighlightActivation {
            delay,
            position: current,
            token: op.token.clone(),
        });
    }
    plan
}

// ============================================================================
// Highlights
// ============================================================================

/// Currently lit token positions, each tagged with the generation that lit it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Highlights(BTreeMap<usize, u64>);

impl Highlights {
    pub fn contains(&self, position: usize) -> bool {
        self.0.contains_key(&position)
    }

    /// Lit positions in ascending order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn generation_of(&self, position: usize) -> Option<u64> {
        self.0.get(&position).copied()
    }
}

// ============================================================================
// RenderScheduler
// ============================================================================

struct Inner {
    config: HighlightConfig,
    generation: AtomicU64,
    highlights: watch::Sender<Highlights>,
}

/// Runs highlight plans. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RenderScheduler {
    inner: Arc<Inner>,
}

impl RenderScheduler {
    pub fn new(config: HighlightConfig) -> Self {
        let (highlights, _) = watch::channel(Highlights::default());
        Self {
            inner: Arc::new(Inner {
                config,
                generation: AtomicU64::new(0),
                highlights,
            }),
        }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.inner.config
    }

    /// The generation of the most recently scheduled plan (0 before any).
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Start a plan, superseding any earlier one. Returns its generation.
    ///
    /// Must be called inside a tokio runtime. Timers of earlier plans keep
    /// running but can no longer light anything.
    pub fn schedule(&self, plan: Vec<HighlightActivation>) -> u64 {
        let mut generation = 0;
        self.inner.highlights.send_if_modified(|lit| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let before = lit.len();
            lit.0.retain(|_, g| *g >= generation);
            lit.len() != before
        });
        debug!(generation, activations = plan.len(), "scheduling highlights");

        let start = Instant::now();
        for activation in plan {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(run_activation(inner, activation, start, generation));
        }
        generation
    }

    /// Positions lit right now.
    pub fn highlighted(&self) -> Highlights {
        self.inner.highlights.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Highlights> {
        self.inner.highlights.subscribe()
    }

    /// Turn every highlight off and invalidate pending timers.
    pub fn clear(&self) {
        self.inner.highlights.send_if_modified(|lit| {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            let changed = !lit.is_empty();
            lit.0.clear();
            changed
        });
    }
}

async fn run_activation(
    inner: Arc<Inner>,
    activation: HighlightActivation,
    start: Instant,
    generation: u64,
) {
    let HighlightActivation {
        delay, position, ..
    } = activation;
    let lit_at = start + delay;
    tokio::time::sleep_until(lit_at).await;

    let lit = inner.highlights.send_if_modified(|lit| {
        if inner.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        lit.0.insert(position, generation);
        true
    });
    if !lit {
        trace!(position, generation, "stale highlight skipped");
        return;
    }

    tokio::time::sleep_until(lit_at + inner.config.duration).await;
    inner.highlights.send_if_modified(|lit| {
        if lit.0.get(&position) == Some(&generation) {
            lit.0.remove(&position);
            true
        } else {
            false
        }
    });
}
