//! Deferred series queries.
//!
//! A [`SeriesExpr`] only describes a computation against the archive. Nothing
//! is fetched until [`SeriesExpr::evaluate`] performs the blocking round trip
//! and hands back a materialized [`ImageSeries`].

use chrono::{DateTime, Utc};

use crate::image::Image;
use crate::io::archive::ImageArchive;
use crate::types::{AcquisitionMode, ImageProperties, OrbitPass, Platform, Polarization, SarError, SarResult};

/// Property constraint applied to every image of a source collection
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesFilter {
    /// Image footprint contains the point (lon, lat)
    Bounds { lon: f64, lat: f64 },
    /// Acquisition instant in `[start, end)`
    DateRange { start: DateTime<Utc>, end: DateTime<Utc> },
    /// Exact polarisation set, in order
    Polarizations(Vec<Polarization>),
    ResolutionMeters(u32),
    InstrumentMode(AcquisitionMode),
    OrbitPass(OrbitPass),
    RelativeOrbit(u32),
    Platform(Platform),
}

impl SeriesFilter {
    pub fn matches(&self, image: &Image) -> bool {
        let props = &image.properties;
        match self {
            SeriesFilter::Bounds { lon, lat } => image.footprint().contains(*lon, *lat),
            SeriesFilter::DateRange { start, end } => props
                .time_start
                .map_or(false, |t| t >= *start && t < *end),
            SeriesFilter::Polarizations(pols) => &props.polarizations == pols,
            SeriesFilter::ResolutionMeters(res) => props.resolution_meters == Some(*res),
            SeriesFilter::InstrumentMode(mode) => props.instrument_mode == Some(*mode),
            SeriesFilter::OrbitPass(pass) => props.orbit_pass == Some(*pass),
            SeriesFilter::RelativeOrbit(orbit) => props.relative_orbit == Some(*orbit),
            SeriesFilter::Platform(platform) => props.platform == Some(*platform),
        }
    }
}

/// Sort order applied after filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    TimeStart,
    CloudPercentage,
}

/// Description of a filtered, sorted view of a source collection
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesExpr {
    pub source: String,
    pub filters: Vec<SeriesFilter>,
    pub sort: Option<(SortKey, bool)>,
    pub limit: Option<usize>,
}

impl SeriesExpr {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            filters: Vec::new(),
            sort: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: SeriesFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filter_bounds(self, lon: f64, lat: f64) -> Self {
        self.filter(SeriesFilter::Bounds { lon, lat })
    }

    pub fn filter_date(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.filter(SeriesFilter::DateRange { start, end })
    }

    pub fn sort(mut self, key: SortKey, ascending: bool) -> Self {
        self.sort = Some((key, ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, image: &Image) -> bool {
        self.filters.iter().all(|f| f.matches(image))
    }

    /// Apply filters, sort and limit to a local collection.
    ///
    /// Archive implementations call this to evaluate the description; the
    /// sort is stable so acquisitions with equal keys keep archive order.
    pub fn apply<I>(&self, images: I) -> Vec<Image>
    where
        I: IntoIterator<Item = Image>,
    {
        let mut selected: Vec<Image> = images.into_iter().filter(|img| self.matches(img)).collect();

        if let Some((key, ascending)) = self.sort {
            selected.sort_by(|a, b| {
                let ordering = match key {
                    SortKey::TimeStart => cmp_option(&a.properties.time_start, &b.properties.time_start),
                    SortKey::CloudPercentage => cmp_option(
                        &a.properties.cloud_percentage,
                        &b.properties.cloud_percentage,
                    ),
                };
                if ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }

    /// Materialize the series. Blocks until the archive answers.
    pub fn evaluate(&self, archive: &dyn ImageArchive) -> SarResult<ImageSeries> {
        log::debug!(
            "Evaluating series '{}' with {} filter(s)",
            self.source,
            self.filters.len()
        );
        let series = archive.evaluate(self)?;
        log::debug!("Series '{}' materialized with {} image(s)", self.source, series.size());
        Ok(series)
    }
}

// Missing values sort last.
fn cmp_option<T: PartialOrd>(a: &Option<T>, b: &Option<T>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Materialized, ordered image series
#[derive(Debug, Clone, Default)]
pub struct ImageSeries {
    images: Vec<Image>,
}

impl ImageSeries {
    pub fn new(images: Vec<Image>) -> Self {
        Self { images }
    }

    pub fn size(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn first(&self) -> SarResult<&Image> {
        self.images
            .first()
            .ok_or_else(|| SarError::RemoteQuery("Series is empty".to_string()))
    }

    /// Collect one property over the series, skipping images that lack it.
    pub fn aggregate<T, F>(&self, field: F) -> Vec<T>
    where
        F: Fn(&ImageProperties) -> Option<T>,
    {
        self.images.iter().filter_map(|img| field(&img.properties)).collect()
    }

    pub fn acquisition_times(&self) -> Vec<DateTime<Utc>> {
        self.aggregate(|p| p.time_start)
    }

    /// Distinct relative orbit numbers, ascending.
    pub fn relative_orbits(&self) -> Vec<u32> {
        let mut orbits = self.aggregate(|p| p.relative_orbit);
        orbits.sort_unstable();
        orbits.dedup();
        orbits
    }

    pub fn mean(&self) -> SarResult<Image> {
        Image::mean(&self.images)
    }

    pub fn to_ordered_list(&self, limit: usize) -> Vec<Image> {
        self.images.iter().take(limit).cloned().collect()
    }

    pub fn map<F>(&self, f: F) -> SarResult<ImageSeries>
    where
        F: Fn(&Image) -> SarResult<Image>,
    {
        Ok(ImageSeries {
            images: self.images.iter().map(f).collect::<SarResult<Vec<_>>>()?,
        })
    }
}
