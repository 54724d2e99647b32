//! Export job construction and fire-and-forget submission.

use ndarray::Array2;
use serde::Serialize;

use crate::core::aoi::AreaOfInterest;
use crate::core::collection::OpticalScene;
use crate::core::detection::ChangeResult;
use crate::core::refine::Refiner;
use crate::image::Image;
use crate::io::export_service::ExportService;
use crate::types::{SarError, SarResult};

pub const ASSET_TASK: &str = "assetExportTask";
pub const DRIVE_TASK: &str = "driveExportTask";
pub const METADATA_TASK: &str = "driveExportTask_meta";
pub const SERIES_TASK_PREFIX: &str = "driveExportTask_series_";
pub const OPTICAL_TASK: &str = "driveExportTask_s2";
pub const ATSF_TASK: &str = "driveExportTask_atsf";
pub const ATSF_LOG_TASK: &str = "driveExportTask_atsf_log";
pub const HYBRID_TASK: &str = "driveExportTask_atsf_hybrid";
pub const LAST_TASK: &str = "driveExportTask_last";

/// Drive folder for series, filtered composites and asset metadata
pub const IMAGES_FOLDER: &str = "EarthEngineImages";
/// Drive folder for change map rasters and their metadata
pub const DRIVE_FOLDER: &str = "gee";

pub const RASTER_MAX_PIXELS: u64 = 1_000_000_000;
pub const SERIES_MAX_PIXELS: u64 = 10_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportKind {
    Asset,
    DriveRaster,
    DriveTable,
    PerDateSeries,
    FilteredComposite,
}

/// Submission state; completion is never tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Unknown,
    Submitted,
}

#[derive(Debug, Clone)]
pub enum ExportPayload {
    Image(Image),
    /// Single-column table, one `data` value per row
    Table(Vec<String>),
}

/// Opaque identifier returned by the export service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    pub kind: ExportKind,
    pub description: String,
    /// Asset id for asset exports, file name prefix otherwise
    pub destination: String,
    pub folder: Option<String>,
    pub scale: Option<f64>,
    pub crs: Option<String>,
    pub band_names: Vec<String>,
    pub max_pixels: Option<u64>,
    pub payload: ExportPayload,
    pub status: JobStatus,
}

impl ExportJob {
    fn raster(kind: ExportKind, description: impl Into<String>, destination: impl Into<String>, image: Image) -> Self {
        Self {
            kind,
            description: description.into(),
            destination: destination.into(),
            folder: None,
            scale: None,
            crs: None,
            band_names: image.band_names.clone(),
            max_pixels: None,
            payload: ExportPayload::Image(image),
            status: JobStatus::Unknown,
        }
    }

    fn in_folder(mut self, folder: &str) -> Self {
        self.folder = Some(folder.to_string());
        self
    }

    fn at_scale(mut self, scale: f64, max_pixels: u64) -> Self {
        self.scale = Some(scale);
        self.max_pixels = Some(max_pixels);
        self
    }

    fn in_crs(mut self, crs: &str) -> Self {
        self.crs = Some(crs.to_string());
        self
    }
}

/// Job descriptor of a per-date series export: indices below 10 are zero padded.
pub fn series_description(index: usize) -> String {
    let pad = if index < 10 { "0" } else { "" };
    format!("{}{}{}", SERIES_TASK_PREFIX, pad, index)
}

/// Export name with path separators flattened, usable as a file name prefix.
pub fn file_prefix(export_name: &str) -> String {
    export_name.replace('/', "-")
}

/// Context layer stored as the last band of an asset export
#[derive(Debug, Clone)]
pub struct Background {
    pub name: String,
    pub image: Image,
}

impl Background {
    /// Optical near-infrared band when a scene is available, series mean otherwise.
    pub fn choose(optical: Option<&OpticalScene>, collection_mean: &Image) -> SarResult<Self> {
        match optical {
            Some(scene) => Ok(Self {
                name: format!("sentinel-2 {}", scene.acquired.format("%Y-%m-%d")),
                image: scene.image.select_names(&["B8"])?.divide_scalar(5000.0),
            }),
            None => Ok(Self {
                name: "collectionmean".to_string(),
                image: collection_mean.select(&[0])?.add_scalar(15.0).divide_scalar(15.0),
            }),
        }
    }
}

/// Inputs of the filtered/hybrid composite export
pub struct FilteredInputs<'a> {
    pub result: &'a ChangeResult,
    /// Last element of the working list
    pub last_image: &'a Image,
    /// Land mask applied to the temporal filter output, if water masking is on
    pub land_mask: Option<&'a Array2<bool>>,
    /// `Some` only for the default radar archive
    pub refiner: Option<&'a dyn Refiner>,
}

/// Builds export jobs sharing one label list, AOI, CRS and scale
pub struct ExportPlan<'a> {
    labels: &'a [String],
    aoi: &'a AreaOfInterest,
    archive_crs: &'a str,
    scale: f64,
}

impl<'a> ExportPlan<'a> {
    pub fn new(labels: &'a [String], aoi: &'a AreaOfInterest, archive_crs: &'a str, scale: f64) -> Self {
        Self {
            labels,
            aoi,
            archive_crs,
            scale,
        }
    }

    /// `cmap, smap, fmap, <interval bands>` as bytes, interval bands named by their end label.
    pub fn change_stack(&self, result: &ChangeResult) -> SarResult<Image> {
        let stack = Image::cat(&[
            &result.cmap.to_byte(),
            &result.smap.to_byte(),
            &result.fmap.to_byte(),
            &result.bmap.to_byte(),
        ])?;
        let mut names = vec!["cmap".to_string(), "smap".to_string(), "fmap".to_string()];
        names.extend(self.labels.iter().skip(1).cloned());
        stack.rename(names)
    }

    pub fn asset(&self, result: &ChangeResult, background: &Background, asset_name: &str) -> SarResult<ExportJob> {
        let stack = self.change_stack(result)?;
        let background = background.image.clone().rename(vec!["background"])?;
        let composite = Image::cat(&[&stack, &background])?.clip(self.aoi);
        Ok(ExportJob::raster(ExportKind::Asset, ASSET_TASK, asset_name, composite)
            .at_scale(self.scale, RASTER_MAX_PIXELS))
    }

    /// Change stack and the raw p-values.
    pub fn drive_rasters(&self, result: &ChangeResult, drive_name: &str) -> SarResult<Vec<ExportJob>> {
        let prefix = file_prefix(drive_name);
        let stack = self.change_stack(result)?.clip(self.aoi);
        let p_values = result.p_values.clip(self.aoi);
        Ok(vec![
            ExportJob::raster(ExportKind::DriveRaster, DRIVE_TASK, prefix.clone(), stack)
                .in_folder(DRIVE_FOLDER)
                .at_scale(self.scale, RASTER_MAX_PIXELS),
            ExportJob::raster(ExportKind::DriveRaster, DRIVE_TASK, format!("{}_pvQ", prefix), p_values)
                .in_folder(DRIVE_FOLDER)
                .at_scale(self.scale, RASTER_MAX_PIXELS),
        ])
    }

    pub fn metadata(&self, rows: Vec<String>, export_name: &str, folder: &str) -> ExportJob {
        ExportJob {
            kind: ExportKind::DriveTable,
            description: METADATA_TASK.to_string(),
            destination: file_prefix(export_name),
            folder: Some(folder.to_string()),
            scale: None,
            crs: None,
            band_names: vec!["data".to_string()],
            max_pixels: None,
            payload: ExportPayload::Table(rows),
            status: JobStatus::Unknown,
        }
    }

    /// One job per working-list image, then the optical scene if present.
    pub fn series(&self, working_list: &[Image], optical: Option<&OpticalScene>) -> SarResult<Vec<ExportJob>> {
        if working_list.len() != self.labels.len() {
            return Err(SarError::Processing(format!(
                "{} images but {} labels",
                working_list.len(),
                self.labels.len()
            )));
        }
        let mut jobs: Vec<ExportJob> = working_list
            .iter()
            .zip(self.labels)
            .enumerate()
            .map(|(i, (image, label))| {
                ExportJob::raster(ExportKind::PerDateSeries, series_description(i), label.clone(), image.clone())
                    .in_folder(IMAGES_FOLDER)
                    .in_crs(self.archive_crs)
                    .at_scale(self.scale, SERIES_MAX_PIXELS)
            })
            .collect();

        if let Some(scene) = optical {
            jobs.push(
                ExportJob::raster(
                    ExportKind::PerDateSeries,
                    OPTICAL_TASK,
                    format!("T{}_s2", scene.date_label()),
                    scene.image.clone(),
                )
                .in_folder(IMAGES_FOLDER)
                .in_crs(self.archive_crs)
                .at_scale(self.scale, SERIES_MAX_PIXELS),
            );
        }
        Ok(jobs)
    }

    /// Temporal filter output, its log companion, the hybrid (if a refiner
    /// is given) and the last acquisition.
    pub fn filtered(&self, inputs: &FilteredInputs<'_>) -> SarResult<Vec<ExportJob>> {
        let last_label = self
            .labels
            .last()
            .ok_or_else(|| SarError::Processing("No labels to name filtered exports".to_string()))?;

        let mut atsf = inputs.result.last_filtered()?.clip(self.aoi);
        if let Some(mask) = inputs.land_mask {
            atsf = atsf.update_mask(mask)?;
        }
        let log_ratio = inputs.result.averaged_log.to_byte().clip(self.aoi);

        let job = |description: &str, suffix: &str, image: Image| {
            ExportJob::raster(
                ExportKind::FilteredComposite,
                description,
                format!("{}{}", last_label, suffix),
                image,
            )
            .in_folder(IMAGES_FOLDER)
            .in_crs(self.archive_crs)
            .at_scale(self.scale, SERIES_MAX_PIXELS)
        };

        let mut jobs = vec![job(ATSF_TASK, "_atsf", atsf.clone())];
        jobs.push(job(ATSF_LOG_TASK, "_atsf_log", log_ratio.clone()));

        if let Some(refiner) = inputs.refiner {
            let refined = refiner.refine(inputs.last_image)?;
            let threshold = self.labels.len() as f32 / 3.0;
            let low_samples = log_ratio.band_lt(0, threshold)?;
            let hybrid = atsf.where_mask(&low_samples, &refined)?;
            jobs.push(job(HYBRID_TASK, "_atsf_hybrid", hybrid));
        }

        jobs.push(job(LAST_TASK, "", inputs.last_image.clone()));
        Ok(jobs)
    }
}

/// A job accepted by the export service
#[derive(Debug, Clone)]
pub struct SubmittedJob {
    pub id: JobId,
    pub job: ExportJob,
}

/// Outcome of submitting several jobs in order
#[derive(Debug, Default)]
pub struct ExportBatch {
    pub submitted: Vec<SubmittedJob>,
    /// First failure; later jobs were not attempted
    pub failure: Option<SarError>,
}

impl ExportBatch {
    pub fn into_result(self) -> SarResult<Vec<SubmittedJob>> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.submitted),
        }
    }
}

/// Hands jobs to an [`ExportService`] without waiting for completion.
pub struct ExportPipeline<'a> {
    service: &'a dyn ExportService,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(service: &'a dyn ExportService) -> Self {
        Self { service }
    }

    pub fn submit(&self, mut job: ExportJob) -> SarResult<SubmittedJob> {
        let id = self.service.submit(&job)?;
        job.status = JobStatus::Submitted;
        log::info!("Submitted {} ({:?}) to '{}', task id: {}", job.description, job.kind, job.destination, id);
        Ok(SubmittedJob { id, job })
    }

    /// Submit in order, stopping at the first failure. Jobs already
    /// submitted stay submitted.
    pub fn submit_all(&self, jobs: Vec<ExportJob>) -> ExportBatch {
        let mut batch = ExportBatch::default();
        for job in jobs {
            let description = job.description.clone();
            match self.submit(job) {
                Ok(submitted) => batch.submitted.push(submitted),
                Err(e) => {
                    log::warn!(
                        "Export {} failed after {} submission(s): {}",
                        description,
                        batch.submitted.len(),
                        e
                    );
                    batch.failure = Some(e);
                    break;
                }
            }
        }
        batch
    }
}
