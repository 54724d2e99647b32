//! Boundaries to the remote image archive and the export executor

pub mod archive;
pub mod export_service;

pub use archive::{ImageArchive, MemoryArchive};
pub use export_service::{DirectoryExportService, ExportService, RecordingExportService};
