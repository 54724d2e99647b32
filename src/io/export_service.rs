use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::export::{file_prefix, ExportJob, ExportKind, ExportPayload, JobId};
use crate::types::{SarError, SarResult};

/// Asynchronous export executor. `submit` returns as soon as the job is
/// accepted; no completion is reported back.
pub trait ExportService {
    fn submit(&self, job: &ExportJob) -> SarResult<JobId>;
}

/// Keeps every accepted job in memory
#[derive(Debug, Default)]
pub struct RecordingExportService {
    jobs: RefCell<Vec<ExportJob>>,
    fail_at: Option<usize>,
}

impl RecordingExportService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the submission with the given 0-based index.
    pub fn failing_at(index: usize) -> Self {
        Self {
            jobs: RefCell::new(Vec::new()),
            fail_at: Some(index),
        }
    }

    pub fn jobs(&self) -> Vec<ExportJob> {
        self.jobs.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.jobs.borrow_mut().clear();
    }
}

impl ExportService for RecordingExportService {
    fn submit(&self, job: &ExportJob) -> SarResult<JobId> {
        let index = self.jobs.borrow().len();
        if self.fail_at == Some(index) {
            return Err(SarError::ExportSubmission(format!(
                "{} rejected by export service",
                job.description
            )));
        }
        self.jobs.borrow_mut().push(job.clone());
        Ok(JobId(format!("RECORDED_{:04}", index)))
    }
}

#[derive(Serialize)]
struct JobManifest<'a> {
    id: &'a JobId,
    kind: ExportKind,
    description: &'a str,
    destination: &'a str,
    folder: Option<&'a str>,
    scale: Option<f64>,
    crs: Option<&'a str>,
    band_names: &'a [String],
    max_pixels: Option<u64>,
    shape: Option<(usize, usize, usize)>,
    submitted_at: DateTime<Utc>,
}

/// Writes each job under `<root>/<folder>/`: a `<job id>.json` manifest
/// plus a `data` CSV for tables or a little-endian `f32` band stack for
/// rasters (masked pixels as NaN), both named after the destination.
#[derive(Debug)]
pub struct DirectoryExportService {
    root: PathBuf,
    counter: Cell<usize>,
}

impl DirectoryExportService {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            counter: Cell::new(0),
        }
    }

    /// `~/sarseq_exports`, or a relative directory when no home is known.
    pub fn in_home() -> Self {
        let root = dirs::home_dir()
            .map(|home| home.join("sarseq_exports"))
            .unwrap_or_else(|| PathBuf::from("sarseq_exports"));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn job_dir(&self, job: &ExportJob) -> PathBuf {
        match (&job.folder, job.kind) {
            (Some(folder), _) => self.root.join(folder),
            (None, ExportKind::Asset) => self.root.join("assets"),
            (None, _) => self.root.clone(),
        }
    }

    fn write_job(&self, job: &ExportJob, id: &JobId) -> SarResult<()> {
        let dir = self.job_dir(job);
        fs::create_dir_all(&dir)?;
        let stem = file_prefix(&job.destination);

        let shape = match &job.payload {
            ExportPayload::Table(rows) => {
                let mut writer = csv::WriterBuilder::new().from_path(dir.join(format!("{}.csv", stem)))?;
                writer.write_record(["data"])?;
                for row in rows {
                    writer.write_record([row])?;
                }
                writer.flush()?;
                None
            }
            ExportPayload::Image(image) => {
                let mut out = BufWriter::new(File::create(dir.join(format!("{}.f32", stem)))?);
                for band in image.bands.outer_iter() {
                    for (value, valid) in band.iter().zip(image.mask.iter()) {
                        let v = if *valid { *value } else { f32::NAN };
                        out.write_all(&v.to_le_bytes())?;
                    }
                }
                out.flush()?;
                Some(image.bands.dim())
            }
        };

        let manifest = JobManifest {
            id,
            kind: job.kind,
            description: &job.description,
            destination: &job.destination,
            folder: job.folder.as_deref(),
            scale: job.scale,
            crs: job.crs.as_deref(),
            band_names: &job.band_names,
            max_pixels: job.max_pixels,
            shape,
            submitted_at: Utc::now(),
        };
        let file = File::create(dir.join(format!("{}.json", id)))?;
        serde_json::to_writer_pretty(file, &manifest)?;
        Ok(())
    }
}

impl ExportService for DirectoryExportService {
    fn submit(&self, job: &ExportJob) -> SarResult<JobId> {
        let n = self.counter.get();
        let id = JobId(format!("{}_{:04}", job.description, n));
        self.write_job(job, &id)
            .map_err(|e| SarError::ExportSubmission(format!("{}: {}", job.description, e)))?;
        self.counter.set(n + 1);
        log::debug!("Wrote export {} under {}", id, self.root.display());
        Ok(id)
    }
}
