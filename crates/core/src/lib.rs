//! Core library for the Boulder Visualiser.
//!
//! Turns a tri-axial acceleration trace recorded on a boulder problem into a
//! sequence of detected moves, and turns those moves plus a settings
//! snapshot into an abstract scene of rings, move markers and simulated
//! attempt paths. Settings changes are debounced and classified so the
//! engine only regenerates geometry when the layout actually changed.

pub mod analysis;
pub mod attempts;
pub mod boulder;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod mapping;
pub mod persist;
pub mod prng;
pub mod render;
pub mod scene;
pub mod state;
pub mod timeline;

pub use analysis::{
    analyse, detect, summarize, AnalysisReport, DetectionConfig, Move, MoveDetector, MoveSummary,
};
pub use attempts::{simulate, Attempt, AttemptSimulator};
pub use boulder::{BoulderId, BoulderLibrary, BoulderRecord, Sample};
pub use config::{EngineConfig, SettingsPatch, VisualizerSettings};
pub use engine::{EngineStats, TickOutcome, VisualizerEngine};
pub use error::{BoulderVizError, Result};
pub use geometry::{GenerationContext, GeometryGenerator};
pub use mapping::{ChangeClass, ChangeSet, Invalidation, MaterialParams, SettingKey};
pub use persist::{JsonFileSettingsStore, MemorySettingsStore, PersistedSettings, SettingsStore};
pub use prng::{random_at, SeededRandom, SineHash};
pub use render::{NullRenderTarget, PrimitiveHandle, RenderTarget, ResourceArena};
pub use scene::{PrimitiveKind, Scene, ScenePrimitive};
pub use state::{StateHandle, StateStore, VisualizationState};
pub use timeline::{AppliedChange, EngineClock, InvalidationScheduler, ReconcileTimer};
