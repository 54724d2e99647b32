//! Construction of the filtered, time-sorted radar series.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::config::ProcessingParams;
use crate::core::aoi::AreaOfInterest;
use crate::core::expression::{ImageSeries, SeriesExpr, SeriesFilter, SortKey};
use crate::image::Image;
use crate::io::archive::ImageArchive;
use crate::types::{AcquisitionMode, BoundingBox, OrbitPass, PlatformFilter, Polarization, SarError, SarResult};

/// Default radar archive
pub const DEFAULT_COLLECTION: &str = "COPERNICUS/S1_GRD";
/// Optical archive used for context scenes and export backgrounds
pub const OPTICAL_COLLECTION: &str = "COPERNICUS/S2";
/// Resolution mode required for the default archive
pub const RESOLUTION_METERS: u32 = 10;
/// Working-list cap for the default archive
pub const DEFAULT_LIST_LIMIT: usize = 500;
/// Working-list cap for external collections
pub const EXTERNAL_LIST_LIMIT: usize = 100;
/// Incidence angle band of default-archive images
pub const INCIDENCE_BAND: &str = "angle";
/// Near-infrared, red and green bands of an optical scene
pub const OPTICAL_BANDS: [&str; 3] = ["B8", "B4", "B3"];

/// Least-cloudy optical acquisition over the AOI
#[derive(Debug, Clone)]
pub struct OpticalScene {
    /// Bands [`OPTICAL_BANDS`], clipped to the AOI
    pub image: Image,
    pub acquired: DateTime<Utc>,
}

impl OpticalScene {
    /// `YYYYMMDD`
    pub fn date_label(&self) -> String {
        self.acquired.format("%Y%m%d").to_string()
    }
}

/// Immutable snapshot of everything a collect action queries with
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub bounds: BoundingBox,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub orbit_pass: OrbitPass,
    pub platform: PlatformFilter,
    pub relative_orbit: Option<u32>,
    pub source: String,
}

impl SeriesQuery {
    pub fn new(aoi: &AreaOfInterest, params: &ProcessingParams) -> SarResult<Self> {
        let bounds = aoi
            .bounds()
            .ok_or_else(|| SarError::Validation("Area of interest is empty".to_string()))?;
        Ok(Self {
            bounds,
            start: params.start_date,
            end: params.end_date,
            orbit_pass: params.orbit_pass,
            platform: params.platform,
            relative_orbit: (params.relative_orbit > 0).then_some(params.relative_orbit),
            source: params.source_id().to_string(),
        })
    }

    pub fn is_default_source(&self) -> bool {
        self.source == DEFAULT_COLLECTION
    }

    pub fn start_instant(&self) -> SarResult<DateTime<Utc>> {
        midnight_utc(self.start)
    }

    pub fn end_instant(&self) -> SarResult<DateTime<Utc>> {
        midnight_utc(self.end)
    }
}

fn midnight_utc(date: NaiveDate) -> SarResult<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .ok_or_else(|| SarError::Validation(format!("Invalid date {}", date)))
}

/// Builds series descriptions from a [`SeriesQuery`]
pub struct CollectionBuilder;

impl CollectionBuilder {
    /// Radar series restricted to the AOI corners, date window, dual
    /// polarisation, 10 m IW products and the requested pass.
    pub fn radar_expression(
        bounds: &BoundingBox,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        orbit_pass: OrbitPass,
    ) -> SeriesExpr {
        bounds
            .corners()
            .iter()
            .fold(SeriesExpr::new(DEFAULT_COLLECTION), |expr, &(lon, lat)| {
                expr.filter_bounds(lon, lat)
            })
            .filter_date(start, end)
            .filter(SeriesFilter::Polarizations(vec![Polarization::VV, Polarization::VH]))
            .filter(SeriesFilter::ResolutionMeters(RESOLUTION_METERS))
            .filter(SeriesFilter::InstrumentMode(AcquisitionMode::IW))
            .filter(SeriesFilter::OrbitPass(orbit_pass))
    }

    /// Full description for a query. External collections are used as-is.
    pub fn expression(query: &SeriesQuery) -> SarResult<SeriesExpr> {
        if !query.is_default_source() {
            return Ok(SeriesExpr::new(query.source.clone()));
        }

        let mut expr = Self::radar_expression(
            &query.bounds,
            query.start_instant()?,
            query.end_instant()?,
            query.orbit_pass,
        );
        if let Some(orbit) = query.relative_orbit {
            expr = expr.filter(SeriesFilter::RelativeOrbit(orbit));
        }
        if let Some(platform) = query.platform.platform() {
            expr = expr.filter(SeriesFilter::Platform(platform));
        }
        Ok(expr.sort(SortKey::TimeStart, true))
    }

    /// Least-cloudy-first optical scenes over the AOI corners and date window.
    pub fn optical_expression(query: &SeriesQuery) -> SarResult<SeriesExpr> {
        Ok(query
            .bounds
            .corners()
            .iter()
            .fold(SeriesExpr::new(OPTICAL_COLLECTION), |expr, &(lon, lat)| {
                expr.filter_bounds(lon, lat)
            })
            .filter_date(query.start_instant()?, query.end_instant()?)
            .sort(SortKey::CloudPercentage, true))
    }

    /// First scene of [`Self::optical_expression`], if any.
    pub fn optical_scene(
        query: &SeriesQuery,
        aoi: &AreaOfInterest,
        archive: &dyn ImageArchive,
    ) -> SarResult<Option<OpticalScene>> {
        let series = Self::optical_expression(query)?.limit(1).evaluate(archive)?;
        let Some(first) = series.images().first() else {
            log::debug!("No optical scene over the area of interest");
            return Ok(None);
        };
        let acquired = first.properties.time_start.ok_or_else(|| {
            SarError::RemoteQuery(format!("Optical scene '{}' has no acquisition time", first.id))
        })?;
        let image = first.select_names(&OPTICAL_BANDS)?.clip(aoi);
        log::info!("Optical scene '{}' from {}", first.id, acquired.format("%Y%m%d"));
        Ok(Some(OpticalScene { image, acquired }))
    }

    /// Native CRS of the radar archive over the query bounds, if any
    /// acquisition covers them. Relative orbit and platform are ignored.
    pub fn archive_crs(query: &SeriesQuery, archive: &dyn ImageArchive) -> SarResult<Option<String>> {
        let expr = Self::radar_expression(
            &query.bounds,
            query.start_instant()?,
            query.end_instant()?,
            query.orbit_pass,
        )
        .limit(1);
        let series = expr.evaluate(archive)?;
        Ok(series.images().first().map(|img| img.crs().to_string()))
    }

    /// Evaluate the query, failing when fewer than two acquisitions match.
    pub fn build(query: &SeriesQuery, archive: &dyn ImageArchive) -> SarResult<ImageSeries> {
        let series = Self::expression(query)?.evaluate(archive)?;
        if series.size() < 2 {
            return Err(SarError::Validation("Less than 2 images found".to_string()));
        }
        log::info!("Collection '{}' yields {} acquisition(s)", query.source, series.size());
        Ok(series)
    }
}
