//! The engine facade: entry points for the ingestion side and the
//! reconciliation loop that keeps the arena in step with the state store.

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    analysis::{DetectionConfig, Move, MoveDetector},
    attempts::{Attempt, AttemptSimulator},
    boulder::BoulderRecord,
    geometry::{GenerationContext, GeometryGenerator},
    mapping::{Invalidation, MaterialParams},
    render::{NullRenderTarget, RenderTarget, ResourceArena},
    scene::{Scene, ScenePrimitive},
    state::{StateHandle, StateStore, VisualizationState},
    timeline::{AppliedChange, InvalidationScheduler, ReconcileTimer},
    EngineConfig, Result, SettingsPatch, VisualizerSettings,
};

/// What one reconciliation tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Regenerated,
    Patched,
    /// Only the liquid wave advanced; rings were rebuilt in place.
    Animated,
    Rendered,
    Idle,
}

/// Work counters, mostly for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub regenerations: u64,
    pub material_patches: u64,
    pub render_passes: u64,
    pub animation_frames: u64,
    /// Primitives released by the arena over the engine's lifetime.
    pub disposals: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SeenVersions {
    structural: u64,
    material: u64,
    render: u64,
}

impl SeenVersions {
    fn of(state: &VisualizationState) -> Self {
        Self {
            structural: state.structural_version(),
            material: state.material_version(),
            render: state.render_version(),
        }
    }
}

pub struct VisualizerEngine<T: RenderTarget = NullRenderTarget> {
    store: StateStore,
    handle: StateHandle,
    scheduler: InvalidationScheduler,
    timer: ReconcileTimer,
    arena: ResourceArena,
    simulator: AttemptSimulator,
    target: T,
    seen: SeenVersions,
    stats: EngineStats,
    disposed: bool,
}

impl VisualizerEngine<NullRenderTarget> {
    /// Headless engine; the scene is only kept in the arena.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_target(config, NullRenderTarget)
    }
}

impl<T: RenderTarget> VisualizerEngine<T> {
    pub fn with_target(config: EngineConfig, target: T) -> Self {
        let store = StateStore::new(config.settings.clone());
        let handle = store.handle();
        info!(
            debounce = ?config.debounce(),
            reconcile = ?config.reconcile_interval(),
            "visualizer engine ready"
        );
        Self {
            handle,
            scheduler: InvalidationScheduler::new(config.settings.clone(), config.debounce()),
            timer: ReconcileTimer::new(config.reconcile_interval()),
            store,
            arena: ResourceArena::new(),
            simulator: AttemptSimulator::new(),
            target,
            seen: SeenVersions::default(),
            stats: EngineStats::default(),
            disposed: false,
        }
    }

    /// Replaces the current boulder. Moves are detected from the samples
    /// unless the record only carries pre-detected moves.
    pub fn on_boulder_loaded(&mut self, record: Arc<BoulderRecord>, now: Duration) -> Result<()> {
        if self.disposed {
            warn!(boulder = %record.id, "ignoring boulder load on a disposed engine");
            return Ok(());
        }
        let settings = self.scheduler.last_applied();
        let moves = detect_moves(&record, settings);
        let attempts = self
            .simulator
            .simulate(&record.id, settings.max_attempts as usize);
        info!(
            boulder = %record.id,
            samples = record.samples.len(),
            moves = moves.len(),
            attempts = attempts.len(),
            "boulder loaded"
        );
        self.store.load_boulder(record, moves, attempts, now)?;
        Ok(())
    }

    /// Queues a partial settings update behind the debounce window.
    pub fn on_settings_changed(&mut self, patch: SettingsPatch, now: Duration) {
        if self.disposed {
            warn!("ignoring settings change on a disposed engine");
            return;
        }
        self.scheduler.submit(patch, now);
    }

    /// Applies `patch` immediately, bypassing the debounce window.
    pub fn apply_settings_now(&mut self, patch: &SettingsPatch, now: Duration) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        let change = self.scheduler.apply_now(patch);
        self.commit(change, now)
    }

    /// Commits the pending settings update if its window has closed.
    /// Returns whether anything was committed.
    pub fn pump(&mut self, now: Duration) -> Result<bool> {
        match self.scheduler.poll(now) {
            Some(change) => {
                self.commit(change, now)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Called by the host at any rate. Commits due settings updates, then
    /// reconciles at the configured cadence.
    pub fn tick(&mut self, now: Duration) -> Result<TickOutcome> {
        if self.disposed {
            return Ok(TickOutcome::Idle);
        }
        self.pump(now)?;
        if !self.timer.due(now) {
            return Ok(TickOutcome::Idle);
        }
        self.timer.advance(now);
        self.reconcile(now)
    }

    /// Commits any pending update and reconciles right away.
    pub fn flush(&mut self, now: Duration) -> Result<TickOutcome> {
        if self.disposed {
            return Ok(TickOutcome::Idle);
        }
        if let Some(change) = self.scheduler.flush() {
            self.commit(change, now)?;
        }
        self.reconcile(now)
    }

    /// Drops the boulder and returns to `settings`. The next reconcile
    /// clears the scene.
    pub fn reset(&mut self, settings: VisualizerSettings, now: Duration) -> Result<()> {
        self.scheduler.reset(settings.clone());
        self.store.reset(settings, now)?;
        Ok(())
    }

    /// Cancels pending work, stops the reconciliation timer and releases
    /// every primitive. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let cancelled = self.scheduler.cancel();
        self.timer.stop();
        let released = self.arena.dispose_all();
        self.disposed = true;
        info!(cancelled, released, "visualizer engine disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            disposals: self.arena.disposed_total(),
            ..self.stats
        }
    }

    pub fn settings(&self) -> &VisualizerSettings {
        self.scheduler.last_applied()
    }

    pub fn has_pending_update(&self) -> bool {
        self.scheduler.has_pending()
    }

    pub fn state(&self) -> Result<VisualizationState> {
        self.handle.snapshot()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.handle.clone()
    }

    pub fn moves(&self) -> Result<Arc<Vec<Move>>> {
        Ok(self.handle.snapshot()?.processed_moves().clone())
    }

    pub fn arena(&self) -> &ResourceArena {
        &self.arena
    }

    pub fn primitives(&self) -> impl Iterator<Item = &ScenePrimitive> + '_ {
        self.arena.iter()
    }

    /// Copy of the live scene, in draw order.
    pub fn scene(&self) -> Scene {
        let mut scene = Scene::new();
        for primitive in self.arena.iter() {
            scene.push(primitive.clone());
        }
        scene
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn commit(&mut self, change: AppliedChange, now: Duration) -> Result<()> {
        let mut moves = None;
        let mut attempts = None;
        if let Invalidation::Regenerate {
            redetect,
            resimulate,
        } = change.invalidation
        {
            let state = self.handle.snapshot()?;
            if let Some(record) = state.current_boulder() {
                if redetect {
                    moves = Some(detect_moves(record, &change.settings));
                }
                if resimulate {
                    attempts = Some(simulate_attempts(
                        &self.simulator,
                        record,
                        &change.settings,
                    ));
                }
            }
        }
        debug!(
            invalidation = ?change.invalidation,
            redetected = moves.is_some(),
            resimulated = attempts.is_some(),
            "committing settings"
        );
        self.store
            .commit_settings(change.settings, change.invalidation, moves, attempts, now)?;
        Ok(())
    }

    /// Compares the state versions against the last reconciled ones and does
    /// the cheapest work that brings the arena up to date. With nothing to
    /// catch up on, a live liquid wave still advances to `now`.
    fn reconcile(&mut self, now: Duration) -> Result<TickOutcome> {
        let state = self.handle.snapshot()?;
        let versions = SeenVersions::of(&state);
        let outcome = if versions.structural != self.seen.structural {
            self.regenerate(&state, now);
            TickOutcome::Regenerated
        } else if versions.material != self.seen.material {
            let patched = self
                .arena
                .apply_materials(&MaterialParams::from(state.current_settings().as_ref()));
            self.stats.material_patches += 1;
            debug!(patched, "patched materials in place");
            TickOutcome::Patched
        } else if versions.render != self.seen.render {
            TickOutcome::Rendered
        } else if self.animate(&state, now) {
            TickOutcome::Animated
        } else {
            return Ok(TickOutcome::Idle);
        };
        self.seen = versions;
        self.draw()?;
        Ok(outcome)
    }

    fn regenerate(&mut self, state: &VisualizationState, now: Duration) {
        let handles = GeometryGenerator::new(state.current_settings()).generate_into(
            state.processed_moves(),
            state.attempts(),
            &generation_context(state, now),
            &mut self.arena,
        );
        self.stats.regenerations += 1;
        debug!(primitives = handles.len(), "regenerated scene");
    }

    /// Advances the liquid wave on the live rings. Returns whether any ring
    /// moved.
    fn animate(&mut self, state: &VisualizationState, now: Duration) -> bool {
        let settings = state.current_settings();
        if settings.liquid_effect <= 0.0 || state.current_boulder().is_none() {
            return false;
        }
        let replaced = GeometryGenerator::new(settings).animate_rings(
            state.processed_moves(),
            &generation_context(state, now),
            &mut self.arena,
        );
        if replaced == 0 {
            return false;
        }
        self.stats.animation_frames += 1;
        true
    }

    fn draw(&mut self) -> Result<()> {
        let primitives: Vec<&ScenePrimitive> = self.arena.iter().collect();
        self.target.draw(&primitives)?;
        self.stats.render_passes += 1;
        Ok(())
    }
}

impl<T: RenderTarget> Drop for VisualizerEngine<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: RenderTarget> std::fmt::Debug for VisualizerEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualizerEngine")
            .field("primitives", &self.arena.len())
            .field("stats", &self.stats)
            .field("disposed", &self.disposed)
            .finish()
    }
}

fn generation_context(state: &VisualizationState, now: Duration) -> GenerationContext {
    GenerationContext {
        seed: state
            .current_boulder()
            .map(|record| record.id.seed())
            .unwrap_or_default(),
        time: now.as_secs_f64(),
    }
}

fn detect_moves(record: &BoulderRecord, settings: &VisualizerSettings) -> Vec<Move> {
    if record.samples.is_empty() && !record.moves.is_empty() {
        return record.moves.clone();
    }
    MoveDetector::new(DetectionConfig::new(
        settings.move_threshold,
        settings.min_move_duration,
    ))
    .detect(&record.samples)
}

fn simulate_attempts(
    simulator: &AttemptSimulator,
    record: &BoulderRecord,
    settings: &VisualizerSettings,
) -> Vec<Attempt> {
    simulator.simulate(&record.id, settings.max_attempts as usize)
}
