//! User-tunable workflow parameters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::change_map::MapMode;
use crate::core::collection::DEFAULT_COLLECTION;
use crate::core::detection::DetectionParams;
use crate::types::{OrbitPass, PlatformFilter, SarError, SarResult};

pub const MIN_ENL: f64 = 3.0;
pub const MAX_ENL: f64 = 20.0;
pub const MAX_SIGNIFICANCE: f64 = 0.05;

/// Parameters whose change invalidates a previous detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingParams {
    /// Source collection id; empty means the default radar archive
    pub collection: String,
    pub start_date: NaiveDate,
    /// Exclusive end of the acquisition window
    pub end_date: NaiveDate,
    pub orbit_pass: OrbitPass,
    pub platform: PlatformFilter,
    /// Relative orbit number, 0 disables the filter
    pub relative_orbit: u32,
    pub stride: usize,
    pub enl: f64,
    pub significance: f64,
    pub median_filter: bool,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            start_date: NaiveDate::from_ymd_opt(2018, 4, 1).unwrap_or(NaiveDate::MIN),
            end_date: NaiveDate::from_ymd_opt(2018, 11, 1).unwrap_or(NaiveDate::MAX),
            orbit_pass: OrbitPass::Ascending,
            platform: PlatformFilter::Both,
            relative_orbit: 0,
            stride: 1,
            enl: 4.4,
            significance: 0.01,
            median_filter: true,
        }
    }
}

impl ProcessingParams {
    pub fn validate(&self) -> SarResult<()> {
        if self.stride < 1 {
            return Err(SarError::Validation("Stride must be at least 1".to_string()));
        }
        if !(MIN_ENL..=MAX_ENL).contains(&self.enl) {
            return Err(SarError::Validation(format!(
                "ENL {} outside [{}, {}]",
                self.enl, MIN_ENL, MAX_ENL
            )));
        }
        if !(self.significance > 0.0 && self.significance <= MAX_SIGNIFICANCE) {
            return Err(SarError::Validation(format!(
                "Significance {} outside (0, {}]",
                self.significance, MAX_SIGNIFICANCE
            )));
        }
        if self.start_date >= self.end_date {
            return Err(SarError::Validation(format!(
                "Start date {} is not before end date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }

    pub fn is_default_source(&self) -> bool {
        self.collection.is_empty() || self.collection == DEFAULT_COLLECTION
    }

    /// Collection id with the empty string resolved to the default archive.
    pub fn source_id(&self) -> &str {
        if self.collection.is_empty() {
            DEFAULT_COLLECTION
        } else {
            &self.collection
        }
    }

    pub fn detection(&self) -> DetectionParams {
        DetectionParams {
            significance: self.significance,
            enl: self.enl,
            median_filter: self.median_filter,
        }
    }
}

/// Export destinations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportNames {
    pub asset: String,
    pub drive: String,
}

impl Default for ExportNames {
    fn default() -> Self {
        Self {
            asset: "users/<username>/<path>".to_string(),
            drive: "gee/<path>".to_string(),
        }
    }
}

/// Preview settings; changing them never invalidates a detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub map_mode: MapMode,
    /// 1-based bitemporal interval, clamped at preview time
    pub interval: i64,
    pub mask_water: bool,
    pub mask_change: bool,
    pub quick_preview: bool,
    pub show_optical: bool,
    pub opacity: f64,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            map_mode: MapMode::First,
            interval: 1,
            mask_water: true,
            mask_change: false,
            quick_preview: true,
            show_optical: true,
            opacity: 1.0,
        }
    }
}

/// Complete workflow configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowParams {
    pub processing: ProcessingParams,
    pub export: ExportNames,
    pub display: DisplayOptions,
}

impl WorkflowParams {
    pub fn validate(&self) -> SarResult<()> {
        self.processing.validate()?;
        if !(0.0..=1.0).contains(&self.display.opacity) {
            return Err(SarError::Validation(format!(
                "Opacity {} outside [0, 1]",
                self.display.opacity
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> SarResult<Self> {
        let params: WorkflowParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SarResult<Self> {
        log::info!("Loading workflow parameters from {}", path.as_ref().display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::types::ErrorKind;

    #[test]
    fn test_defaults_are_valid() {
        let params = WorkflowParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.processing.source_id(), "COPERNICUS/S1_GRD");
        assert_eq!(params.processing.stride, 1);
        assert_relative_eq!(params.processing.enl, 4.4);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut p = ProcessingParams::default();
        p.enl = 2.5;
        assert_eq!(p.validate().unwrap_err().kind(), ErrorKind::Validation);

        let mut p = ProcessingParams::default();
        p.significance = 0.0;
        assert!(p.validate().is_err());
        p.significance = 0.06;
        assert!(p.validate().is_err());
        p.significance = 0.05;
        assert!(p.validate().is_ok());

        let mut p = ProcessingParams::default();
        p.stride = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let json = r#"{
            "processing": { "stride": 3, "orbit_pass": "DESCENDING", "start_date": "2019-01-01", "end_date": "2019-06-01" },
            "display": { "map_mode": "Bitemporal", "interval": 4 }
        }"#;
        let params = WorkflowParams::from_json_str(json).unwrap();
        assert_eq!(params.processing.stride, 3);
        assert_eq!(params.processing.orbit_pass, OrbitPass::Descending);
        assert_eq!(params.display.map_mode, MapMode::Bitemporal);
        assert_eq!(params.display.interval, 4);
        assert_eq!(params.export, ExportNames::default());
    }

    #[test]
    fn test_empty_collection_means_default_source() {
        let mut p = ProcessingParams::default();
        p.collection.clear();
        assert!(p.is_default_source());
        assert_eq!(p.source_id(), DEFAULT_COLLECTION);
        p.collection = "users/someone/series".to_string();
        assert!(!p.is_default_source());
    }
}
