//! Core change detection workflow modules

pub mod accumulator;
pub mod aoi;
pub mod change_map;
pub mod collection;
pub mod detection;
pub mod export;
pub mod expression;
pub mod metadata;
pub mod refine;
pub mod speckle_filter;
pub mod state;
pub mod workflow;

// Re-export main types
pub use accumulator::{Accumulation, AccumulatorState, SeriesAccumulator};
pub use aoi::AreaOfInterest;
pub use change_map::{ChangeFractions, ChangeMapSelector, MapMode, Palette, RenderDescriptor};
pub use collection::{CollectionBuilder, OpticalScene, SeriesQuery, DEFAULT_COLLECTION};
pub use detection::{ChangeDetectionInvoker, ChangeDetector, ChangeResult, DetectionParams};
pub use export::{ExportJob, ExportKind, ExportPipeline, ExportPlan, JobId, JobStatus, SubmittedJob};
pub use expression::{ImageSeries, SeriesExpr, SeriesFilter, SortKey};
pub use metadata::{ExportTarget, RunMetadata};
pub use refine::{Refiner, SpeckleRefiner};
pub use speckle_filter::{SpeckleFilter, SpeckleFilterParams};
pub use state::{Action, WorkflowState, WorkflowStateController};
pub use workflow::{CollectSummary, OutputLog, Session, WorkflowContext, WorkflowController};
