#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use ndarray::{Array2, Array3};
use std::cell::Cell;

use sarseq::core::aoi::polygon_from_coords;
use sarseq::core::collection::{DEFAULT_COLLECTION, OPTICAL_BANDS, OPTICAL_COLLECTION};
use sarseq::core::detection::{ChangeDetector, ChangeResult};
use sarseq::core::refine::Refiner;
use sarseq::types::{AcquisitionMode, ImageProperties, Platform};
use sarseq::{GeoTransform, Image, MemoryArchive, OrbitPass, Polarization, Projection, SarError, SarResult};

pub const ROWS: usize = 20;
pub const COLS: usize = 20;
pub const RADAR_CRS: &str = "EPSG:32632";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 20x20 grid covering lon 6.0..6.1, lat 50.9..51.0
pub fn projection(crs: &str) -> Projection {
    Projection {
        crs: crs.to_string(),
        transform: GeoTransform::north_up(6.0, 51.0, 0.005),
        nominal_scale: 10.0,
    }
}

pub fn aoi_polygon() -> geo::Polygon<f64> {
    polygon_from_coords(&[(6.02, 50.92), (6.08, 50.92), (6.08, 50.98), (6.02, 50.98)])
}

pub fn acquisition(index: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 4, 5, 17, 20, 0).unwrap() + Duration::days(12 * index as i64)
}

/// Dual-pol IW scene in dB with an incidence angle band
pub fn radar_image(id: &str, time: DateTime<Utc>, relative_orbit: u32) -> Image {
    let mut bands = Array3::<f32>::zeros((3, ROWS, COLS));
    bands.index_axis_mut(ndarray::Axis(0), 0).fill(-8.0);
    bands.index_axis_mut(ndarray::Axis(0), 1).fill(-15.0);
    bands
        .index_axis_mut(ndarray::Axis(0), 2)
        .assign(&Array2::from_shape_fn((ROWS, COLS), |(_, c)| 30.0 + c as f32 * 0.5));
    Image::new(
        id,
        bands,
        vec!["VV".into(), "VH".into(), "angle".into()],
        projection(RADAR_CRS),
    )
    .expect("Failed to build radar image")
    .with_properties(ImageProperties {
        time_start: Some(time),
        orbit_pass: Some(OrbitPass::Ascending),
        platform: Some(Platform::A),
        relative_orbit: Some(relative_orbit),
        polarizations: vec![Polarization::VV, Polarization::VH],
        resolution_meters: Some(10),
        instrument_mode: Some(AcquisitionMode::IW),
        cloud_percentage: None,
    })
}

pub fn radar_series(count: usize) -> Vec<Image> {
    // registered newest first; the collection query sorts by time
    (0..count)
        .rev()
        .map(|i| radar_image(&format!("S1A_{:02}", i), acquisition(i), 15))
        .collect()
}

pub fn optical_image(day: u32, cloud: f32) -> Image {
    Image::new(
        format!("S2_{}", day),
        Array3::from_elem((3, ROWS, COLS), 2500.0),
        OPTICAL_BANDS.iter().map(|b| b.to_string()).collect(),
        projection(RADAR_CRS),
    )
    .expect("Failed to build optical image")
    .with_properties(ImageProperties {
        time_start: Some(Utc.with_ymd_and_hms(2018, 7, day, 10, 30, 0).unwrap()),
        cloud_percentage: Some(cloud),
        ..ImageProperties::default()
    })
}

/// Archive with `count` radar acquisitions and an empty optical collection
pub fn archive_with(count: usize) -> MemoryArchive {
    let mut archive = MemoryArchive::new();
    archive.insert_collection(DEFAULT_COLLECTION, radar_series(count));
    archive.insert_collection(OPTICAL_COLLECTION, Vec::new());
    archive
}

/// Deterministic stand-in for the omnibus detector
pub struct FakeDetector {
    pub calls: Cell<usize>,
    pub log_value: f32,
    /// When set, every call fails with a detection error
    pub fail: Cell<bool>,
}

impl FakeDetector {
    pub fn new() -> Self {
        Self {
            calls: Cell::new(0),
            log_value: 2.0,
            fail: Cell::new(false),
        }
    }
}

impl ChangeDetector for FakeDetector {
    fn detect(&self, images: &[Image], _significance: f64, _enl: f64, _median: bool) -> SarResult<ChangeResult> {
        self.calls.set(self.calls.get() + 1);
        if self.fail.get() {
            return Err(SarError::Detection("omnibus computation timed out".to_string()));
        }
        let first = &images[0];
        let (rows, cols) = first.shape();
        let single = |name: &str, value: f32| {
            Image::from_band(name, name, Array2::from_elem((rows, cols), value), first.projection.clone())
        };
        let k = images.len() - 1;
        let bmap = Image::new(
            "bmap",
            Array3::from_shape_fn((k, rows, cols), |(b, r, _)| ((b + r) % 4) as f32),
            (0..k).map(|i| format!("bmap{}", i)).collect(),
            first.projection.clone(),
        )?;
        Ok(ChangeResult {
            smap: single("smap", 1.0),
            cmap: single("cmap", k as f32),
            fmap: single("fmap", 2.0),
            bmap,
            averaged_series: images.to_vec(),
            averaged_log: single("avimglog", self.log_value),
            p_values: single("pvQ", 0.2),
        })
    }
}

/// Refiner that rejects every image
pub struct FailingRefiner;

impl Refiner for FailingRefiner {
    fn refine(&self, image: &Image) -> SarResult<Image> {
        Err(SarError::Refinement(format!("no speckle statistics for '{}'", image.id)))
    }
}
