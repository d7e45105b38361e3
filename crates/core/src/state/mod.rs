//! Process-wide visualization state.
//!
//! All mutation goes through [`StateStore`] setters, which bump monotonic
//! version counters alongside the data they describe. Readers hold a
//! [`StateHandle`] and compare versions by equality.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crate::{
    analysis::Move, attempts::Attempt, boulder::BoulderRecord, mapping::Invalidation,
    BoulderVizError, Result, VisualizerSettings,
};

/// Immutable view of the shared state, cheap to clone.
#[derive(Debug, Clone)]
pub struct VisualizationState {
    current_boulder: Option<Arc<BoulderRecord>>,
    current_settings: Arc<VisualizerSettings>,
    processed_moves: Arc<Vec<Move>>,
    attempts: Arc<Vec<Attempt>>,
    version: u64,
    structural_version: u64,
    material_version: u64,
    render_version: u64,
    last_update_time: Option<Duration>,
}

impl VisualizationState {
    fn new(settings: VisualizerSettings) -> Self {
        Self {
            current_boulder: None,
            current_settings: Arc::new(settings),
            processed_moves: Arc::new(Vec::new()),
            attempts: Arc::new(Vec::new()),
            version: 0,
            structural_version: 0,
            material_version: 0,
            render_version: 0,
            last_update_time: None,
        }
    }

    pub fn current_boulder(&self) -> Option<&Arc<BoulderRecord>> {
        self.current_boulder.as_ref()
    }

    pub fn current_settings(&self) -> &Arc<VisualizerSettings> {
        &self.current_settings
    }

    pub fn processed_moves(&self) -> &Arc<Vec<Move>> {
        &self.processed_moves
    }

    pub fn attempts(&self) -> &Arc<Vec<Attempt>> {
        &self.attempts
    }

    /// Bumped by every setter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Bumped whenever previously generated geometry became stale.
    pub fn structural_version(&self) -> u64 {
        self.structural_version
    }

    /// Bumped whenever only primitive appearance changed.
    pub fn material_version(&self) -> u64 {
        self.material_version
    }

    /// Bumped when a render pass was requested without any scene change.
    pub fn render_version(&self) -> u64 {
        self.render_version
    }

    pub fn last_update_time(&self) -> Option<Duration> {
        self.last_update_time
    }

    fn touch(&mut self, now: Duration) {
        self.version += 1;
        self.last_update_time = Some(now);
    }
}

/// Writer side of the shared state.
#[derive(Debug)]
pub struct StateStore {
    shared: Arc<Mutex<VisualizationState>>,
}

impl StateStore {
    pub fn new(settings: VisualizerSettings) -> Self {
        Self {
            shared: Arc::new(Mutex::new(VisualizationState::new(settings))),
        }
    }

    pub fn handle(&self) -> StateHandle {
        StateHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn snapshot(&self) -> Result<VisualizationState> {
        Ok(self.lock()?.clone())
    }

    /// Replaces the current boulder together with its moves and attempts.
    pub fn load_boulder(
        &self,
        record: Arc<BoulderRecord>,
        moves: Vec<Move>,
        attempts: Vec<Attempt>,
        now: Duration,
    ) -> Result<u64> {
        let mut state = self.lock()?;
        state.current_boulder = Some(record);
        state.processed_moves = Arc::new(moves);
        state.attempts = Arc::new(attempts);
        state.structural_version += 1;
        state.touch(now);
        Ok(state.version)
    }

    /// Commits a settings snapshot, recording the invalidation it causes.
    /// `moves` and `attempts` replace the processed data when present.
    pub fn commit_settings(
        &self,
        settings: VisualizerSettings,
        invalidation: Invalidation,
        moves: Option<Vec<Move>>,
        attempts: Option<Vec<Attempt>>,
        now: Duration,
    ) -> Result<u64> {
        let mut state = self.lock()?;
        state.current_settings = Arc::new(settings);
        if let Some(moves) = moves {
            state.processed_moves = Arc::new(moves);
        }
        if let Some(attempts) = attempts {
            state.attempts = Arc::new(attempts);
        }
        match invalidation {
            Invalidation::Regenerate { .. } => state.structural_version += 1,
            Invalidation::PatchMaterials => state.material_version += 1,
            Invalidation::RenderOnly => state.render_version += 1,
        }
        state.touch(now);
        Ok(state.version)
    }

    /// Drops the boulder and returns to `settings`, as on a full reset.
    pub fn reset(&self, settings: VisualizerSettings, now: Duration) -> Result<u64> {
        let mut state = self.lock()?;
        let structural = state.structural_version + 1;
        let version = state.version;
        *state = VisualizationState::new(settings);
        state.structural_version = structural;
        state.version = version;
        state.touch(now);
        Ok(state.version)
    }

    fn lock(&self) -> Result<MutexGuard<'_, VisualizationState>> {
        self.shared
            .lock()
            .map_err(|_| BoulderVizError::StatePoisoned("visualization state"))
    }
}

/// Read-only view handed to the reconciliation loop.
#[derive(Clone)]
pub struct StateHandle {
    shared: Arc<Mutex<VisualizationState>>,
}

impl StateHandle {
    pub fn snapshot(&self) -> Result<VisualizationState> {
        Ok(self.lock()?.clone())
    }

    pub fn version(&self) -> Result<u64> {
        Ok(self.lock()?.version)
    }

    fn lock(&self) -> Result<MutexGuard<'_, VisualizationState>> {
        self.shared
            .lock()
            .map_err(|_| BoulderVizError::StatePoisoned("visualization state"))
    }
}

impl std::fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHandle").finish()
    }
}
