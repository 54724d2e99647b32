//! Workflow controller: one try-scope per user action.

use chrono::Utc;
use geo::Polygon;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{DisplayOptions, ExportNames, ProcessingParams, WorkflowParams};
use crate::core::accumulator::{dedupe_labels, index_labels, timestamp_label, SeriesAccumulator};
use crate::core::aoi::AreaOfInterest;
use crate::core::change_map::{ChangeFractions, ChangeMapSelector, RenderDescriptor};
use crate::core::collection::{
    CollectionBuilder, OpticalScene, SeriesQuery, DEFAULT_LIST_LIMIT, EXTERNAL_LIST_LIMIT, INCIDENCE_BAND,
};
use crate::core::detection::{ChangeDetectionInvoker, ChangeDetector, ChangeResult};
use crate::core::expression::{ImageSeries, SeriesExpr};
use crate::core::export::{
    Background, ExportBatch, ExportPipeline, ExportPlan, FilteredInputs, SubmittedJob, DRIVE_FOLDER, IMAGES_FOLDER,
};
use crate::core::metadata::{ExportTarget, RunMetadata};
use crate::core::refine::Refiner;
use crate::core::state::{Action, WorkflowState, WorkflowStateController};
use crate::image::Image;
use crate::io::archive::ImageArchive;
use crate::io::export_service::ExportService;
use crate::types::{SarError, SarResult};

/// User-facing action output. Lines are mirrored to the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    lines: Vec<String>,
}

impl OutputLog {
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::info!("{}", line);
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

/// Everything a successful collect produced
#[derive(Debug, Clone)]
pub struct Session {
    /// Processing parameters the session was collected with
    pub params: ProcessingParams,
    pub default_source: bool,
    pub labels: Vec<String>,
    pub working_list: Vec<Image>,
    pub export_scale: f64,
    pub archive_crs: String,
    pub relative_orbits: Vec<u32>,
    pub mean_incidence: Option<f64>,
    /// Series mean, first two bands renamed `b0`, `b1`, clipped to the AOI
    pub collection_mean: Image,
    /// 2nd and 98th percentile of `b0`
    pub preview_stretch: (Option<f32>, Option<f32>),
    pub optical: Option<OpticalScene>,
    pub result: ChangeResult,
}

/// Figures reported after a collect
#[derive(Debug, Clone, PartialEq)]
pub struct CollectSummary {
    pub images_found: usize,
    pub series_length: usize,
    pub pixel_count: u64,
    pub first_label: String,
    pub last_label: String,
    pub relative_orbits: Vec<u32>,
    pub mean_incidence: Option<f64>,
    pub export_scale: f64,
    pub archive_crs: String,
}

/// Mutable state owned by the controller
#[derive(Debug, Default)]
pub struct WorkflowContext {
    pub params: WorkflowParams,
    pub aoi: AreaOfInterest,
    pub state: WorkflowStateController,
    pub session: Option<Session>,
    pub output: OutputLog,
}

/// Drives collect, preview and export against external collaborators.
///
/// Every public action catches its own errors: the message is written to
/// the output log as `Error: <message>`, kept in [`Self::last_error`], and
/// the action returns `None`.
pub struct WorkflowController<'a> {
    archive: &'a dyn ImageArchive,
    detector: &'a dyn ChangeDetector,
    refiner: &'a dyn Refiner,
    exporter: &'a dyn ExportService,
    context: WorkflowContext,
    last_error: Option<SarError>,
}

impl<'a> WorkflowController<'a> {
    pub fn new(
        archive: &'a dyn ImageArchive,
        detector: &'a dyn ChangeDetector,
        refiner: &'a dyn Refiner,
        exporter: &'a dyn ExportService,
    ) -> Self {
        Self::with_params(archive, detector, refiner, exporter, WorkflowParams::default())
    }

    pub fn with_params(
        archive: &'a dyn ImageArchive,
        detector: &'a dyn ChangeDetector,
        refiner: &'a dyn Refiner,
        exporter: &'a dyn ExportService,
        params: WorkflowParams,
    ) -> Self {
        let mut context = WorkflowContext {
            params,
            ..WorkflowContext::default()
        };
        context.state.on_map_mode_changed(context.params.display.map_mode);
        context.output.push("Algorithm output");
        Self {
            archive,
            detector,
            refiner,
            exporter,
            context,
            last_error: None,
        }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.context
    }

    pub fn state(&self) -> WorkflowState {
        self.context.state.state()
    }

    pub fn permits(&self, action: Action) -> bool {
        self.context.state.permits(action)
    }

    pub fn output(&self) -> &OutputLog {
        &self.context.output
    }

    pub fn aoi(&self) -> &AreaOfInterest {
        &self.context.aoi
    }

    pub fn session(&self) -> Option<&Session> {
        self.context.session.as_ref()
    }

    pub fn last_error(&self) -> Option<&SarError> {
        self.last_error.as_ref()
    }

    fn run<T, F>(&mut self, name: &str, action: F) -> Option<T>
    where
        F: FnOnce(&mut Self) -> SarResult<T>,
    {
        self.last_error = None;
        match action(self) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("{} failed: {}", name, e);
                self.context.output.push(format!("Error: {}", e));
                self.last_error = Some(e);
                None
            }
        }
    }

    // ----- area of interest -----

    pub fn add_aoi(&mut self, polygon: Polygon<f64>) {
        self.context.aoi.add_polygon(polygon);
        self.context.session = None;
        self.context.state.on_aoi_added();
    }

    pub fn remove_aoi(&mut self, polygon: Polygon<f64>) {
        self.context.aoi.remove_polygon(polygon);
        let empty = self.context.aoi.is_empty();
        self.context.state.on_aoi_removed(empty);
    }

    pub fn clear_aoi(&mut self) {
        self.context.aoi.reset();
        self.reset_output();
        self.context.state.on_aoi_cleared();
    }

    /// Replace the AOI by the footprint of an exported asset.
    pub fn use_asset_bounds(&mut self, asset_id: &str) -> Option<()> {
        self.run("AssetPolyBounds", |ctl| {
            let asset = ctl.archive.load_asset(asset_id)?;
            let bounds = asset.select(&[0])?.footprint();
            ctl.context.aoi = AreaOfInterest::from_bounds(&bounds);
            ctl.context.output.clear();
            ctl.context.output.push(format!("{:?}", bounds));
            ctl.context.state.on_aoi_replaced();
            Ok(())
        })
    }

    pub fn reset_output(&mut self) {
        self.context.output.clear();
        self.context.output.push("Algorithm output");
    }

    // ----- parameters -----

    /// Replace the processing parameters; any change revokes preview and export.
    pub fn update_processing(&mut self, params: ProcessingParams) -> Option<()> {
        self.run("UpdateParameters", |ctl| {
            params.validate()?;
            if params != ctl.context.params.processing {
                ctl.context.params.processing = params;
                ctl.context.session = None;
                ctl.context.state.on_parameters_changed();
            }
            Ok(())
        })
    }

    pub fn update_display(&mut self, options: DisplayOptions) -> Option<()> {
        self.run("UpdateDisplay", |ctl| {
            if !(0.0..=1.0).contains(&options.opacity) {
                return Err(SarError::Validation(format!("Opacity {} outside [0, 1]", options.opacity)));
            }
            ctl.context.state.on_map_mode_changed(options.map_mode);
            ctl.context.params.display = options;
            Ok(())
        })
    }

    pub fn set_export_names(&mut self, names: ExportNames) {
        self.context.params.export = names;
    }

    // ----- collect -----

    /// Query the series, accumulate the working list and run detection.
    pub fn collect(&mut self) -> Option<CollectSummary> {
        self.run("Collect", Self::collect_inner)
    }

    fn collect_inner(&mut self) -> SarResult<CollectSummary> {
        self.context.state.require(Action::Collect)?;
        let params = self.context.params.processing.clone();
        params.validate()?;
        self.context.output.clear();
        self.discard_results();

        let (mut session_parts, summary) = if params.is_default_source() {
            self.collect_default(&params)?
        } else {
            self.collect_external(&params)?
        };
        self.context.state.on_collected();

        let invoker = ChangeDetectionInvoker::new(self.detector);
        let result = invoker.invoke(&session_parts.working_list, &params.detection())?;

        // the optical scene is a display extra, a failed lookup keeps the detection
        if self.context.params.display.show_optical {
            match self.optical_scene(&params) {
                Ok(Some(scene)) => {
                    self.context.output.push(format!("Sentinel-2 from {}", scene.date_label()));
                    session_parts.optical = Some(scene);
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Sentinel-2 lookup failed: {}", e);
                    self.context.output.push(format!("Sentinel-2 unavailable: {}", e));
                }
            }
        }

        self.context.session = Some(session_parts.into_session(params, result));
        self.context.state.on_detected();
        Ok(summary)
    }

    fn optical_scene(&self, params: &ProcessingParams) -> SarResult<Option<OpticalScene>> {
        let query = SeriesQuery::new(&self.context.aoi, params)?;
        CollectionBuilder::optical_scene(&query, &self.context.aoi, self.archive)
    }

    /// Drop the stored session together with the gate flags that vouch for it.
    fn discard_results(&mut self) {
        self.context.session = None;
        self.context.state.on_results_discarded();
    }

    fn collect_default(&mut self, params: &ProcessingParams) -> SarResult<(SessionParts, CollectSummary)> {
        let aoi = self.context.aoi.clone();
        self.context.output.push(format!(
            "Running on archive {} (please wait for raster overlay) ...",
            params.source_id()
        ));

        let query = SeriesQuery::new(&aoi, params)?;
        let series = CollectionBuilder::build(&query, self.archive)?;
        let images = series.to_ordered_list(DEFAULT_LIST_LIMIT);
        let times = series.acquisition_times();
        if times.len() != series.size() {
            return Err(SarError::RemoteQuery(
                "Acquisition time missing from archive images".to_string(),
            ));
        }
        let times = &times[..images.len()];

        let relative_orbits = series.relative_orbits();
        let mean_incidence = if relative_orbits.len() == 1 {
            incidence_angle(series.first()?, &aoi)?
        } else {
            None
        };

        let linear = linear_dual_pol(&images)?;
        let accumulation = SeriesAccumulator::new(params.stride, params.enl)?.accumulate(&linear, times, &aoi)?;

        let (collection_mean, preview_stretch) = preview_background(&series, &aoi, true)?;
        let archive_crs = CollectionBuilder::archive_crs(&query, self.archive)?
            .unwrap_or_else(|| accumulation.working_list()[0].crs().to_string());

        let labels = accumulation.labels.clone();
        let summary = CollectSummary {
            images_found: series.size(),
            series_length: labels.len(),
            pixel_count: (aoi.area_m2() / 100.0).floor() as u64,
            first_label: labels[0].clone(),
            last_label: labels[labels.len() - 1].clone(),
            relative_orbits: relative_orbits.clone(),
            mean_incidence,
            export_scale: accumulation.scale,
            archive_crs: archive_crs.clone(),
        };

        let out = &mut self.context.output;
        out.push(format!(
            "Images found: {}, platform: {}",
            summary.series_length, params.platform
        ));
        out.push(format!("Number of 10m pixels contained: {}", summary.pixel_count));
        out.push(format!(
            "Acquisition dates: {} to {}",
            summary.first_label, summary.last_label
        ));
        out.push(format!("Relative orbit numbers: {:?}", relative_orbits));
        match mean_incidence {
            Some(angle) => out.push(format!("Mean incidence angle: {:.2}", angle)),
            None => out.push("Mean incidence angle: (select one rel. orbit)"),
        }

        let parts = SessionParts {
            default_source: true,
            labels,
            export_scale: accumulation.scale,
            working_list: accumulation.state.working_list,
            archive_crs,
            relative_orbits,
            mean_incidence,
            collection_mean,
            preview_stretch,
            optical: None,
        };
        Ok((parts, summary))
    }

    /// External collections are used as-is: the AOI becomes the first
    /// image's footprint and dates, stride and ENL do not apply.
    fn collect_external(&mut self, params: &ProcessingParams) -> SarResult<(SessionParts, CollectSummary)> {
        let source = params.source_id().to_string();
        self.context.output.push(format!(
            "Running on local collection {}, ignoring start and end dates ...",
            source
        ));

        let series = SeriesExpr::new(source).evaluate(self.archive)?;
        self.context.output.push(format!("Images found: {}", series.size()));
        if series.size() < 2 {
            return Err(SarError::Validation("Less than 2 images found".to_string()));
        }

        let first = series.first()?;
        let aoi = AreaOfInterest::from_bounds(&first.footprint());
        let export_scale = first.nominal_scale();

        let times = series.acquisition_times();
        let labels = if first.properties.time_start.is_some() && times.len() == series.size() {
            let labels = dedupe_labels(times.iter().map(timestamp_label).collect());
            self.context
                .output
                .push(format!("Acquisition dates: {:?}", labels));
            labels
        } else {
            let labels = index_labels(series.size());
            self.context
                .output
                .push(format!("No time property available: acquisitions: {:?}", labels));
            labels
        };

        let working_list = series.to_ordered_list(EXTERNAL_LIST_LIMIT);
        let labels: Vec<String> = labels.into_iter().take(working_list.len()).collect();
        let (collection_mean, preview_stretch) = preview_background(&series, &aoi, false)?;

        let query = SeriesQuery::new(&aoi, params)?;
        let archive_crs = match CollectionBuilder::archive_crs(&query, self.archive) {
            Ok(Some(crs)) => crs,
            Ok(None) => working_list[0].crs().to_string(),
            Err(e) => {
                log::warn!("Radar archive CRS unavailable ({}), using the collection CRS", e);
                working_list[0].crs().to_string()
            }
        };

        self.context.aoi = aoi.clone();
        self.context.state.on_aoi_replaced();

        let summary = CollectSummary {
            images_found: series.size(),
            series_length: labels.len(),
            pixel_count: (aoi.area_m2() / 100.0).floor() as u64,
            first_label: labels[0].clone(),
            last_label: labels[labels.len() - 1].clone(),
            relative_orbits: Vec::new(),
            mean_incidence: None,
            export_scale,
            archive_crs: archive_crs.clone(),
        };
        let parts = SessionParts {
            default_source: false,
            labels,
            working_list,
            export_scale,
            archive_crs,
            relative_orbits: Vec::new(),
            mean_incidence: None,
            collection_mean,
            preview_stretch,
            optical: None,
        };
        Ok((parts, summary))
    }

    // ----- preview -----

    pub fn preview(&mut self) -> Option<RenderDescriptor> {
        self.run("Preview", Self::preview_inner)
    }

    fn preview_inner(&mut self) -> SarResult<RenderDescriptor> {
        self.context.state.require(Action::Preview)?;
        let session = active_session(&self.context.session)?;
        let display = &self.context.params.display;

        let land = if display.mask_water {
            Some(self.archive.land_mask(&session.result.smap)?)
        } else {
            None
        };
        let selector = ChangeMapSelector::new(
            &session.labels,
            &self.context.aoi,
            &session.archive_crs,
            session.export_scale,
        );
        let descriptor = selector.select(&session.result, display, land.as_ref())?;

        let out = &mut self.context.output;
        out.clear();
        out.push(format!(
            "Series length: {} images, previewing (please wait for raster overlay) ...",
            session.labels.len()
        ));
        if let Some(caption) = &descriptor.caption {
            out.push(format!("Bitemporal: {}", caption));
        }
        out.push(descriptor.legend.clone());

        self.context.state.on_previewed();
        Ok(descriptor)
    }

    // ----- exports -----

    pub fn export_to_assets(&mut self) -> Option<Vec<SubmittedJob>> {
        self.run("ExportToAssets", |ctl| {
            ctl.context.state.require(Action::ExportToAssets)?;
            let session = active_session(&ctl.context.session)?;
            let names = &ctl.context.params.export;

            let optical = if session.default_source {
                match &session.optical {
                    Some(scene) => Some(scene.clone()),
                    None => {
                        let query = SeriesQuery::new(&ctl.context.aoi, &session.params)?;
                        CollectionBuilder::optical_scene(&query, &ctl.context.aoi, ctl.archive)?
                    }
                }
            } else {
                None
            };
            let background = Background::choose(optical.as_ref(), &session.collection_mean)?;

            let plan = export_plan(session, &ctl.context.aoi);
            let asset = plan.asset(&session.result, &background, &names.asset)?;
            let target = ExportTarget::Asset {
                name: names.asset.clone(),
                background: background.name.clone(),
            };
            let rows = run_metadata(session, &ctl.context.aoi).rows(&target);
            let meta = plan.metadata(rows, &names.asset, IMAGES_FOLDER);

            let batch = ExportPipeline::new(ctl.exporter).submit_all(vec![asset, meta]);
            ctl.context.output.clear();
            ctl.report(batch)
        })
    }

    pub fn export_to_drive(&mut self) -> Option<Vec<SubmittedJob>> {
        self.run("ExportToDrive", |ctl| {
            ctl.context.state.require(Action::ExportToDrive)?;
            let session = active_session(&ctl.context.session)?;
            let names = &ctl.context.params.export;

            let plan = export_plan(session, &ctl.context.aoi);
            let mut jobs = plan.drive_rasters(&session.result, &names.drive)?;
            let target = ExportTarget::Drive {
                name: names.drive.clone(),
            };
            let rows = run_metadata(session, &ctl.context.aoi).rows(&target);
            jobs.push(plan.metadata(rows, &names.drive, DRIVE_FOLDER));

            let batch = ExportPipeline::new(ctl.exporter).submit_all(jobs);
            ctl.context.output.clear();
            ctl.report(batch)
        })
    }

    /// One export per working-list image, plus the optical scene.
    pub fn export_series(&mut self) -> Option<Vec<SubmittedJob>> {
        self.run("ExportSeries", |ctl| {
            ctl.context.state.require(Action::ExportSeries)?;
            let session = active_session(&ctl.context.session)?;
            let jobs = export_plan(session, &ctl.context.aoi).series(&session.working_list, session.optical.as_ref())?;
            let count = session.working_list.len();

            let batch = ExportPipeline::new(ctl.exporter).submit_all(jobs);
            ctl.context.output.clear();
            ctl.context
                .output
                .push(format!("Exporting time series of {} images to Drive", count));
            ctl.report(batch)
        })
    }

    pub fn export_filtered(&mut self) -> Option<Vec<SubmittedJob>> {
        self.run("ExportFiltered", |ctl| {
            ctl.context.state.require(Action::ExportFiltered)?;
            let session = active_session(&ctl.context.session)?;
            let last_image = session
                .working_list
                .last()
                .ok_or_else(|| SarError::Processing("Working list is empty".to_string()))?;

            let land = if ctl.context.params.display.mask_water {
                Some(ctl.archive.land_mask(session.result.last_filtered()?)?)
            } else {
                None
            };
            let inputs = FilteredInputs {
                result: &session.result,
                last_image,
                land_mask: land.as_ref(),
                refiner: session.default_source.then_some(ctl.refiner),
            };
            let jobs = export_plan(session, &ctl.context.aoi).filtered(&inputs)?;

            let batch = ExportPipeline::new(ctl.exporter).submit_all(jobs);
            ctl.context.output.clear();
            ctl.report(batch)
        })
    }

    /// Per-interval change class fractions of the exported asset.
    pub fn change_fractions(&mut self) -> Option<ChangeFractions> {
        self.run("PlotFromAsset", |ctl| {
            let asset = ctl.archive.load_asset(&ctl.context.params.export.asset)?;
            let fractions = ChangeFractions::from_asset(&asset)?;
            let out = &mut ctl.context.output;
            out.clear();
            out.push("Change fractions (posdef, negdef, indef):");
            for (i, interval) in fractions.intervals.iter().enumerate() {
                out.push(format!(
                    "{}: {:.4} {:.4} {:.4}",
                    interval, fractions.positive_definite[i], fractions.negative_definite[i], fractions.indefinite[i]
                ));
            }
            Ok(fractions)
        })
    }

    fn report(&mut self, batch: ExportBatch) -> SarResult<Vec<SubmittedJob>> {
        for submitted in &batch.submitted {
            let job = &submitted.job;
            let place = match &job.folder {
                Some(folder) => format!("Drive/{}/{}", folder, job.destination),
                None => job.destination.clone(),
            };
            self.context
                .output
                .push(format!("Exporting {} to {}\n task id: {}", job.description, place, submitted.id));
        }
        batch.into_result()
    }
}

/// Session fields known before detection runs
struct SessionParts {
    default_source: bool,
    labels: Vec<String>,
    working_list: Vec<Image>,
    export_scale: f64,
    archive_crs: String,
    relative_orbits: Vec<u32>,
    mean_incidence: Option<f64>,
    collection_mean: Image,
    preview_stretch: (Option<f32>, Option<f32>),
    optical: Option<OpticalScene>,
}

impl SessionParts {
    fn into_session(self, params: ProcessingParams, result: ChangeResult) -> Session {
        Session {
            params,
            default_source: self.default_source,
            labels: self.labels,
            working_list: self.working_list,
            export_scale: self.export_scale,
            archive_crs: self.archive_crs,
            relative_orbits: self.relative_orbits,
            mean_incidence: self.mean_incidence,
            collection_mean: self.collection_mean,
            preview_stretch: self.preview_stretch,
            optical: self.optical,
            result,
        }
    }
}

fn active_session(session: &Option<Session>) -> SarResult<&Session> {
    session
        .as_ref()
        .ok_or_else(|| SarError::Validation("No collected series, run Collect first".to_string()))
}

fn export_plan<'s>(session: &'s Session, aoi: &'s AreaOfInterest) -> ExportPlan<'s> {
    ExportPlan::new(&session.labels, aoi, &session.archive_crs, session.export_scale)
}

fn run_metadata(session: &Session, aoi: &AreaOfInterest) -> RunMetadata {
    let params = &session.params;
    RunMetadata {
        run_time: Utc::now(),
        collection: params.source_id().to_string(),
        default_source: session.default_source,
        enl: params.enl,
        export_scale: session.export_scale,
        nominal_scale: session.result.cmap.nominal_scale(),
        orbit_pass: params.orbit_pass,
        platform: params.platform,
        significance: params.significance,
        labels: session.labels.clone(),
        relative_orbits: session.relative_orbits.clone(),
        mean_incidence: session.mean_incidence,
        median_filter: params.median_filter,
        polygon: aoi.vertices(),
    }
}

/// Mean incidence angle over the AOI, or over the whole image when the
/// AOI holds no valid pixel. Rounded to 2 decimals.
fn incidence_angle(image: &Image, aoi: &AreaOfInterest) -> SarResult<Option<f64>> {
    let mean = match image.mean_within(INCIDENCE_BAND, Some(aoi))? {
        Some(mean) => Some(mean),
        None => image.mean_within(INCIDENCE_BAND, None)?,
    };
    Ok(mean.map(|m| (m * 100.0).round() / 100.0))
}

/// VV/VH bands of each acquisition in linear power
#[cfg(feature = "parallel")]
fn linear_dual_pol(images: &[Image]) -> SarResult<Vec<Image>> {
    images
        .par_iter()
        .map(|img| Ok(img.select_names(&["VV", "VH"])?.db_to_linear()))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn linear_dual_pol(images: &[Image]) -> SarResult<Vec<Image>> {
    images
        .iter()
        .map(|img| Ok(img.select_names(&["VV", "VH"])?.db_to_linear()))
        .collect()
}

/// Series mean clipped to the AOI and the 2/98 percentile stretch of its first band.
fn preview_background(
    series: &ImageSeries,
    aoi: &AreaOfInterest,
    dual_pol: bool,
) -> SarResult<(Image, (Option<f32>, Option<f32>))> {
    let mean = series.mean()?;
    let mean = if dual_pol {
        mean.select(&[0, 1])?.rename(vec!["b0", "b1"])?
    } else {
        let mut names: Vec<String> = mean.band_names.clone();
        match names.first_mut() {
            Some(first) => *first = "b0".to_string(),
            None => return Err(SarError::Processing("Series mean has no bands".to_string())),
        }
        mean.rename(names)?
    };
    let mean = mean.clip(aoi);
    let p = mean.percentiles(0, &[2.0, 98.0])?;
    Ok((mean, (p[0], p[1])))
}
