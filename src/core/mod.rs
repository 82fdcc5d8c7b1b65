pub mod dom;
pub mod fixture;
pub mod geometry;
pub mod host;
pub mod mutation;
pub mod network;
pub mod resolver;
pub mod scoring;
pub mod stability;

pub use geometry::{DOMRect, Viewport, WeightClass};
pub use host::{Clock, ContentTree, ManualClock, MonotonicClock, ResourceTimingSource};
pub use mutation::{MutationTracker, SnapshotRecord};
pub use network::{PerformanceTimeline, ResourceTimeIndex, ResourceTiming};
pub use resolver::{ResolvedElement, TimeResolver};
pub use scoring::{filter_result, ScoreResult, TreeScorer, WinningElement};
pub use stability::{FinalizeReason, GateDecision, StabilityGate};
