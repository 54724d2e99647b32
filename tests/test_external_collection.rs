mod common;

use ndarray::{s, Array3};

use common::*;
use sarseq::core::collection::OPTICAL_COLLECTION;
use sarseq::core::state::Action;
use sarseq::core::SpeckleRefiner;
use sarseq::types::ImageProperties;
use sarseq::{
    ErrorKind, ExportNames, Image, MemoryArchive, ProcessingParams, RecordingExportService, WorkflowController,
    WorkflowParams,
};

const LOCAL_SERIES: &str = "users/me/s1_series";
const LOCAL_CRS: &str = "EPSG:4326";

fn local_image(index: usize) -> Image {
    Image::new(
        format!("local_{}", index),
        Array3::from_elem((2, ROWS, COLS), 0.1 * (index + 1) as f32),
        vec!["VV".into(), "VH".into()],
        projection(LOCAL_CRS),
    )
    .expect("Failed to build local image")
}

fn local_params() -> WorkflowParams {
    WorkflowParams {
        processing: ProcessingParams {
            collection: LOCAL_SERIES.to_string(),
            ..ProcessingParams::default()
        },
        ..WorkflowParams::default()
    }
}

/// Local series only; the radar archive is not registered
fn local_archive(images: Vec<Image>) -> MemoryArchive {
    let mut archive = MemoryArchive::new();
    archive.insert_collection(LOCAL_SERIES, images);
    archive.insert_collection(OPTICAL_COLLECTION, Vec::new());
    archive
}

#[test]
fn test_local_series_without_times() {
    init_logging();
    let archive = local_archive((0..3).map(local_image).collect());
    let detector = FakeDetector::new();
    let refiner = SpeckleRefiner::default();
    let exporter = RecordingExportService::new();
    let mut ctl = WorkflowController::with_params(&archive, &detector, &refiner, &exporter, local_params());
    ctl.add_aoi(aoi_polygon());

    let summary = ctl.collect().expect("Collect should succeed");
    assert_eq!(summary.series_length, 3);
    assert_eq!(summary.first_label, "T1");
    assert_eq!(summary.last_label, "T3");
    // radar archive unavailable: fall back to the collection's own CRS
    assert_eq!(summary.archive_crs, LOCAL_CRS);
    assert!(summary.relative_orbits.is_empty());
    assert!(summary.mean_incidence.is_none());
    assert!(ctl.output().contains("No time property available"));

    // the AOI now covers the whole collection footprint
    assert!(ctl.aoi().contains(6.001, 50.901));
    assert!(ctl.permits(Action::Collect));

    let session = ctl.session().unwrap();
    assert!(!session.default_source);
    assert_eq!(session.collection_mean.band_names, vec!["b0", "VH"]);
    // used as-is: no ENL scaling
    assert_eq!(session.working_list[0].bands[[0, 0, 0]], 0.1);

    ctl.preview().expect("Preview should succeed");
    let submitted = ctl.export_filtered().expect("Filtered export should succeed");
    let destinations: Vec<&str> = submitted.iter().map(|s| s.job.destination.as_str()).collect();
    assert_eq!(destinations, vec!["T3_atsf", "T3_atsf_log", "T3"]);
}

#[test]
fn test_local_series_metadata_is_short() {
    let archive = local_archive((0..4).map(local_image).collect());
    let detector = FakeDetector::new();
    let refiner = SpeckleRefiner::default();
    let exporter = RecordingExportService::new();
    let mut ctl = WorkflowController::with_params(&archive, &detector, &refiner, &exporter, local_params());
    ctl.add_aoi(aoi_polygon());
    ctl.collect().expect("Collect should succeed");
    ctl.preview().expect("Preview should succeed");

    let submitted = ctl.export_to_assets().expect("Asset export should succeed");
    let asset = &submitted[0].job;
    assert_eq!(asset.band_names.last().map(String::as_str), Some("background"));
    match &submitted[1].job.payload {
        sarseq::core::export::ExportPayload::Table(rows) => {
            assert_eq!(rows.len(), 9);
            assert_eq!(rows[1], format!("Collection: {}", LOCAL_SERIES));
            assert_eq!(rows[7], "Series length: 4");
            assert_eq!(rows[8], "Used 3x3 median filter: true");
        }
        _ => panic!("Expected metadata table"),
    }
}

#[test]
fn test_local_series_with_times_uses_dates() {
    let images = (0..3)
        .map(|i| {
            local_image(i).with_properties(ImageProperties {
                time_start: Some(acquisition(i / 2)),
                ..ImageProperties::default()
            })
        })
        .collect();
    let archive = local_archive(images);
    let detector = FakeDetector::new();
    let refiner = SpeckleRefiner::default();
    let exporter = RecordingExportService::new();
    let mut ctl = WorkflowController::with_params(&archive, &detector, &refiner, &exporter, local_params());
    ctl.add_aoi(aoi_polygon());
    ctl.collect().expect("Collect should succeed");

    assert_eq!(
        ctl.session().unwrap().labels,
        vec!["T20180405_1", "T20180405_2", "T20180417"]
    );
}

#[test]
fn test_local_series_needs_two_images() {
    let archive = local_archive(vec![local_image(0)]);
    let detector = FakeDetector::new();
    let refiner = SpeckleRefiner::default();
    let exporter = RecordingExportService::new();
    let mut ctl = WorkflowController::with_params(&archive, &detector, &refiner, &exporter, local_params());
    ctl.add_aoi(aoi_polygon());

    assert!(ctl.collect().is_none());
    assert_eq!(ctl.output().last(), Some("Error: Less than 2 images found"));
    assert_eq!(detector.calls.get(), 0);
}

fn change_asset() -> Image {
    let mut bands = Array3::<f32>::zeros((6, 4, 4));
    bands.slice_mut(s![3, .., ..]).fill(1.0);
    bands.slice_mut(s![4, ..2, ..]).fill(2.0);
    bands.slice_mut(s![4, 2.., ..]).fill(3.0);
    Image::new(
        "users/me/change/run1",
        bands,
        ["cmap", "smap", "fmap", "T2", "T3", "background"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        projection(RADAR_CRS),
    )
    .expect("Failed to build change asset")
}

#[test]
fn test_change_fractions_from_asset() {
    let mut archive = MemoryArchive::new();
    archive.insert_asset("users/me/change/run1", change_asset());
    let detector = FakeDetector::new();
    let refiner = SpeckleRefiner::default();
    let exporter = RecordingExportService::new();
    let mut ctl = WorkflowController::new(&archive, &detector, &refiner, &exporter);
    ctl.set_export_names(ExportNames {
        asset: "users/me/change/run1".to_string(),
        ..ExportNames::default()
    });

    let fractions = ctl.change_fractions().expect("Fractions should be computed");
    assert_eq!(fractions.intervals, vec!["T2", "T3"]);
    assert_eq!(fractions.positive_definite, vec![1.0, 0.0]);
    assert_eq!(fractions.negative_definite, vec![0.0, 0.5]);
    assert_eq!(fractions.indefinite, vec![0.0, 0.5]);
    assert!(ctl.output().contains("T3: 0.0000 0.5000 0.5000"));

    ctl.set_export_names(ExportNames {
        asset: "users/me/missing".to_string(),
        ..ExportNames::default()
    });
    assert!(ctl.change_fractions().is_none());
    assert_eq!(ctl.last_error().map(|e| e.kind()), Some(ErrorKind::RemoteQuery));
}

#[test]
fn test_asset_bounds_replace_aoi() {
    let mut archive = MemoryArchive::new();
    archive.insert_asset("users/me/change/run1", change_asset());
    let detector = FakeDetector::new();
    let refiner = SpeckleRefiner::default();
    let exporter = RecordingExportService::new();
    let mut ctl = WorkflowController::new(&archive, &detector, &refiner, &exporter);

    assert!(!ctl.permits(Action::Collect));
    ctl.use_asset_bounds("users/me/change/run1").expect("Asset should load");
    assert!(ctl.permits(Action::Collect));
    // 4x4 pixels of 0.005 degrees from (6.0, 51.0)
    assert!(ctl.aoi().contains(6.01, 50.99));
    assert!(!ctl.aoi().contains(6.05, 50.95));
}
