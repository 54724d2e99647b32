//! sarseq: sequential SAR change detection workflow
//!
//! Drives a Sentinel-1 change detection run over an area of interest:
//! query and sort the radar series, fold it into a stride-sampled working
//! list, hand it to an external omnibus detector, pick a change layer for
//! display and submit export jobs. The remote archive, the detector and
//! the export executor are traits; in-memory implementations are provided.

pub mod config;
pub mod core;
pub mod image;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use crate::config::{DisplayOptions, ExportNames, ProcessingParams, WorkflowParams};
pub use crate::core::{
    AreaOfInterest, ChangeDetector, ChangeResult, MapMode, RenderDescriptor, WorkflowController,
};
pub use crate::image::Image;
pub use crate::io::{DirectoryExportService, ExportService, ImageArchive, MemoryArchive, RecordingExportService};
pub use crate::types::{
    ErrorKind, GeoTransform, OrbitPass, Platform, PlatformFilter, Polarization, Projection, SarError, SarResult,
};
