use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use crate::catalog::{Catalog, RegisteredDetector};
use crate::config::{ResolverConfig, ResolverConfigUpdate, SelectionStrategy};
use crate::detectors::{DetectionContext, ElementSnapshot, run_detector};
use crate::schema::{DetectionResult, LabelCandidate, ResolvedLabel};

/// Orchestrates one end-to-end resolution: snapshot the enabled detector
/// set, run each detector under failure isolation, collect candidates,
/// and apply the configured selection strategy.
///
/// The catalog and resolver are plain owned values; callers decide
/// whether to share one or construct isolated instances.
pub struct Resolver {
    catalog: Catalog,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(catalog: Catalog, mut config: ResolverConfig) -> Self {
        config.min_confidence = config.min_confidence.clamp(0.0, 1.0);
        Self { catalog, config }
    }

    /// Convenience factory: default configuration over the full built-in
    /// detector set.
    pub fn with_builtins() -> Self {
        Self::new(Catalog::with_builtins())
    }

    /// Resolve a label for one element.
    ///
    /// Never fails: when no candidate clears the floor the outcome is an
    /// unsuccessful [`ResolvedLabel`] carrying the fallback label.
    pub fn resolve(&self, element: &ElementSnapshot) -> ResolvedLabel {
        self.resolve_context(&DetectionContext::new(element.clone()))
    }

    /// Resolve against a pre-built context (shadow-DOM/iframe flags,
    /// trigger event and extras supplied by the DOM layer).
    pub fn resolve_context(&self, ctx: &DetectionContext) -> ResolvedLabel {
        let started = Instant::now();

        if self.config.strategy == SelectionStrategy::FirstMatch {
            return self.resolve_first_match(ctx, started);
        }

        let (candidates, run, succeeded) = self.collect_candidates(ctx);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        // Disqualified candidates must never be selected, even
        // transiently: the floor applies before selection.
        let winner = select(
            candidates
                .iter()
                .filter(|c| c.confidence >= self.config.min_confidence),
            self.config.strategy,
        )
        .cloned();

        match winner {
            Some(best) => ResolvedLabel {
                label: best.label.clone(),
                confidence: best.confidence,
                detector: best.detector.clone(),
                strategy: self.config.strategy,
                success: true,
                result: Some(best.result),
                candidates,
                detectors_run: run,
                detectors_succeeded: succeeded,
                elapsed_ms,
            },
            None => ResolvedLabel::fallback(
                self.config.fallback_label.clone(),
                self.config.strategy,
                candidates,
                run,
                succeeded,
                elapsed_ms,
            ),
        }
    }

    /// Dump every candidate without selecting a winner.
    pub fn resolve_all(&self, element: &ElementSnapshot) -> Vec<LabelCandidate> {
        let ctx = DetectionContext::new(element.clone());
        let (candidates, _, _) = self.collect_candidates(&ctx);
        candidates
    }

    /// Just the label string (the fallback when unsuccessful).
    pub fn resolve_label(&self, element: &ElementSnapshot) -> String {
        self.resolve(element).label
    }

    /// Whether a label at or above `threshold` confidence exists.
    pub fn has_label(&self, element: &ElementSnapshot, threshold: f32) -> bool {
        let resolved = self.resolve(element);
        resolved.success && resolved.confidence >= threshold
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.config.strategy
    }

    pub fn set_strategy(&mut self, strategy: SelectionStrategy) {
        self.config.strategy = strategy;
    }

    pub fn min_confidence(&self) -> f32 {
        self.config.min_confidence
    }

    pub fn set_min_confidence(&mut self, min_confidence: f32) {
        self.config.min_confidence = min_confidence.clamp(0.0, 1.0);
    }

    pub fn set_max_detectors(&mut self, max_detectors: Option<usize>) {
        self.config.max_detectors = max_detectors;
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn update_config(&mut self, update: ResolverConfigUpdate) {
        self.config.merge(update);
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Swap the backing catalog at runtime, returning the old one.
    pub fn set_catalog(&mut self, catalog: Catalog) -> Catalog {
        std::mem::replace(&mut self.catalog, catalog)
    }

    // One consistent snapshot of the enabled set, then each detector in
    // priority order. The cap counts detectors considered: a detector
    // skipped by `can_detect` does not consume it.
    fn collect_candidates(&self, ctx: &DetectionContext) -> (Vec<LabelCandidate>, usize, usize) {
        let mut candidates = Vec::new();
        let mut run = 0usize;
        let mut succeeded = 0usize;

        for entry in self.catalog.get_enabled() {
            if self.config.max_detectors.is_some_and(|cap| run >= cap) {
                break;
            }
            if !self.can_detect_guarded(&entry, ctx) {
                continue;
            }
            run += 1;
            if let Some(result) = self.detect_guarded(&entry, ctx) {
                succeeded += 1;
                let mut candidate =
                    LabelCandidate::new(result, entry.name.clone(), entry.effective_priority);
                if self.config.strategy == SelectionStrategy::PriorityWeighted {
                    candidate.weighted_score =
                        Some(self.weighted_score(candidate.confidence, entry.effective_priority));
                }
                candidates.push(candidate);
            }
        }

        (candidates, run, succeeded)
    }

    fn resolve_first_match(&self, ctx: &DetectionContext, started: Instant) -> ResolvedLabel {
        let mut run = 0usize;
        let mut succeeded = 0usize;

        for entry in self.catalog.get_enabled() {
            if self.config.max_detectors.is_some_and(|cap| run >= cap) {
                break;
            }
            if !self.can_detect_guarded(&entry, ctx) {
                continue;
            }
            run += 1;
            let Some(result) = self.detect_guarded(&entry, ctx) else {
                continue;
            };
            succeeded += 1;
            if result.confidence < self.config.min_confidence {
                continue;
            }

            let candidate =
                LabelCandidate::new(result, entry.name.clone(), entry.effective_priority);
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            return ResolvedLabel {
                label: candidate.label.clone(),
                confidence: candidate.confidence,
                detector: candidate.detector.clone(),
                strategy: SelectionStrategy::FirstMatch,
                success: true,
                result: Some(candidate.result.clone()),
                candidates: vec![candidate],
                detectors_run: run,
                detectors_succeeded: succeeded,
                elapsed_ms,
            };
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        ResolvedLabel::fallback(
            self.config.fallback_label.clone(),
            SelectionStrategy::FirstMatch,
            Vec::new(),
            run,
            succeeded,
            elapsed_ms,
        )
    }

    // Higher-priority (lower-number) detectors get a proportional bonus,
    // capped by priority_weight and vanishing at priority >= 100.
    fn weighted_score(&self, confidence: f32, effective_priority: u32) -> f32 {
        let headroom = 100u32.saturating_sub(effective_priority) as f32 / 100.0;
        confidence * (1.0 + self.config.priority_weight * headroom)
    }

    fn can_detect_guarded(&self, entry: &RegisteredDetector, ctx: &DetectionContext) -> bool {
        match catch_unwind(AssertUnwindSafe(|| entry.detector.can_detect(ctx))) {
            Ok(applicable) => applicable,
            Err(_) => {
                tracing::warn!(detector = %entry.name, "can_detect panicked; skipping detector");
                false
            }
        }
    }

    // A faulting detector produces nothing; it never aborts the batch.
    fn detect_guarded(
        &self,
        entry: &RegisteredDetector,
        ctx: &DetectionContext,
    ) -> Option<DetectionResult> {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            run_detector(entry.detector.as_ref(), ctx, &self.config.detection_options)
        }));
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                tracing::warn!(detector = %entry.name, %error, "detector failed; skipping");
                None
            }
            Err(_) => {
                tracing::warn!(detector = %entry.name, "detector panicked; skipping");
                None
            }
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// Stable reduce: a later candidate wins only with a strictly greater
// score, so priority-order ties keep the first encountered.
fn select<'a>(
    candidates: impl Iterator<Item = &'a LabelCandidate>,
    strategy: SelectionStrategy,
) -> Option<&'a LabelCandidate> {
    let mut best: Option<&LabelCandidate> = None;
    for candidate in candidates {
        let better = match best {
            None => true,
            Some(current) => match strategy {
                SelectionStrategy::PriorityWeighted => candidate.score() > current.score(),
                _ => candidate.confidence > current.confidence,
            },
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}
