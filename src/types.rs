use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Real-valued intensity data
pub type SarReal = f32;

/// Polarization modes for Sentinel-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl Polarization {
    pub fn parse(value: &str) -> SarResult<Self> {
        match value.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            _ => Err(SarError::Validation(format!("Invalid polarization: {}", value))),
        }
    }
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

/// Sentinel-1 acquisition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionMode {
    IW, // Interferometric Wide swath
    EW, // Extra Wide swath
    SM, // StripMap
    WV, // Wave
}

/// Direction of the satellite pass over the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrbitPass {
    Ascending,
    Descending,
}

impl std::fmt::Display for OrbitPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitPass::Ascending => write!(f, "ASCENDING"),
            OrbitPass::Descending => write!(f, "DESCENDING"),
        }
    }
}

/// Sentinel-1 unit (S1A / S1B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    A,
    B,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::A => write!(f, "A"),
            Platform::B => write!(f, "B"),
        }
    }
}

/// Platform restriction applied when querying the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlatformFilter {
    #[default]
    Both,
    A,
    B,
}

impl PlatformFilter {
    /// The single platform to filter on, `None` for both units.
    pub fn platform(&self) -> Option<Platform> {
        match self {
            PlatformFilter::Both => None,
            PlatformFilter::A => Some(Platform::A),
            PlatformFilter::B => Some(Platform::B),
        }
    }
}

impl std::fmt::Display for PlatformFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformFilter::Both => write!(f, "Both"),
            PlatformFilter::A => write!(f, "A"),
            PlatformFilter::B => write!(f, "B"),
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Corner points as (lon, lat), counter-clockwise from the south-west corner.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_lon, self.min_lat),
            (self.max_lon, self.min_lat),
            (self.max_lon, self.max_lat),
            (self.min_lon, self.max_lat),
        ]
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// Geospatial transformation parameters
///
/// Pixel grids of the in-memory archive are georeferenced in geographic
/// coordinates (lon/lat); `Projection::crs` names the archive's native system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up grid with square pixels of `pixel_size` degrees.
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_size: f64) -> Self {
        Self {
            top_left_x,
            pixel_width: pixel_size,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height: -pixel_size,
        }
    }

    /// Geographic coordinates (lon, lat) of a pixel center.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let x = col as f64 + 0.5;
        let y = row as f64 + 0.5;
        (
            self.top_left_x + x * self.pixel_width + y * self.rotation_x,
            self.top_left_y + x * self.rotation_y + y * self.pixel_height,
        )
    }

    /// Bounding box of a `rows` x `cols` grid.
    pub fn bounds(&self, rows: usize, cols: usize) -> BoundingBox {
        let corners = [
            (self.top_left_x, self.top_left_y),
            (
                self.top_left_x + cols as f64 * self.pixel_width,
                self.top_left_y + cols as f64 * self.rotation_y,
            ),
            (
                self.top_left_x + rows as f64 * self.rotation_x,
                self.top_left_y + rows as f64 * self.pixel_height,
            ),
            (
                self.top_left_x + cols as f64 * self.pixel_width + rows as f64 * self.rotation_x,
                self.top_left_y + cols as f64 * self.rotation_y + rows as f64 * self.pixel_height,
            ),
        ];
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for (lon, lat) in corners {
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
        }
        bbox
    }
}

/// Coordinate system and pixel grid of an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Coordinate reference system identifier, e.g. `EPSG:32632`
    pub crs: String,
    pub transform: GeoTransform,
    /// Native ground resolution in meters
    pub nominal_scale: f64,
}

/// Archive metadata attached to each acquisition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageProperties {
    pub time_start: Option<DateTime<Utc>>,
    pub orbit_pass: Option<OrbitPass>,
    pub platform: Option<Platform>,
    pub relative_orbit: Option<u32>,
    pub polarizations: Vec<Polarization>,
    pub resolution_meters: Option<u32>,
    pub instrument_mode: Option<AcquisitionMode>,
    pub cloud_percentage: Option<f32>,
}

/// Coarse classification of [`SarError`], stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Detection,
    Refinement,
    RemoteQuery,
    ExportSubmission,
    Processing,
    Io,
}

/// Error types for the change detection workflow
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("{0}")]
    Validation(String),

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Refinement failed: {0}")]
    Refinement(String),

    #[error("Remote query failed: {0}")]
    RemoteQuery(String),

    #[error("Export submission failed: {0}")]
    ExportSubmission(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SarError::Validation(_) => ErrorKind::Validation,
            SarError::Detection(_) => ErrorKind::Detection,
            SarError::Refinement(_) => ErrorKind::Refinement,
            SarError::RemoteQuery(_) => ErrorKind::RemoteQuery,
            SarError::ExportSubmission(_) => ErrorKind::ExportSubmission,
            SarError::Processing(_) => ErrorKind::Processing,
            SarError::Io(_) | SarError::Json(_) | SarError::Csv(_) => ErrorKind::Io,
        }
    }
}

/// Result type for workflow operations
pub type SarResult<T> = Result<T, SarError>;
