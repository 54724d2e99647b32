//! Boundary to the external sequential omnibus change detector.

use serde::{Deserialize, Serialize};

use crate::config::{MAX_ENL, MAX_SIGNIFICANCE, MIN_ENL};
use crate::image::Image;
use crate::types::{SarError, SarResult};

/// Per-pixel layers produced by one detection run
#[derive(Debug, Clone)]
pub struct ChangeResult {
    /// Interval of first change
    pub smap: Image,
    /// Interval of last change
    pub cmap: Image,
    /// Change frequency
    pub fmap: Image,
    /// Bitemporal classification, one band per consecutive interval
    pub bmap: Image,
    /// Temporally filtered images, one per acquisition
    pub averaged_series: Vec<Image>,
    pub averaged_log: Image,
    pub p_values: Image,
}

impl ChangeResult {
    /// Filtered image at the last acquisition.
    pub fn last_filtered(&self) -> SarResult<&Image> {
        self.averaged_series
            .last()
            .ok_or_else(|| SarError::Detection("Detector returned no filtered images".to_string()))
    }
}

/// Sequential change detector over an ordered image series
pub trait ChangeDetector {
    fn detect(
        &self,
        images: &[Image],
        significance: f64,
        enl: f64,
        median_filter: bool,
    ) -> SarResult<ChangeResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    pub significance: f64,
    pub enl: f64,
    pub median_filter: bool,
}

impl DetectionParams {
    pub fn validate(&self) -> SarResult<()> {
        if !(self.significance > 0.0 && self.significance <= MAX_SIGNIFICANCE) {
            return Err(SarError::Validation(format!(
                "Significance {} outside (0, {}]",
                self.significance, MAX_SIGNIFICANCE
            )));
        }
        if !(MIN_ENL..=MAX_ENL).contains(&self.enl) {
            return Err(SarError::Validation(format!(
                "ENL {} outside [{}, {}]",
                self.enl, MIN_ENL, MAX_ENL
            )));
        }
        Ok(())
    }
}

/// Pass-through invocation of a [`ChangeDetector`], no retries.
pub struct ChangeDetectionInvoker<'a> {
    detector: &'a dyn ChangeDetector,
}

impl<'a> ChangeDetectionInvoker<'a> {
    pub fn new(detector: &'a dyn ChangeDetector) -> Self {
        Self { detector }
    }

    pub fn invoke(&self, images: &[Image], params: &DetectionParams) -> SarResult<ChangeResult> {
        params.validate()?;
        if images.len() < 2 {
            return Err(SarError::Detection(format!(
                "At least 2 images required, got {}",
                images.len()
            )));
        }

        log::info!(
            "Running sequential change detection on {} images (significance {}, ENL {}, median {})",
            images.len(),
            params.significance,
            params.enl,
            params.median_filter
        );
        let result = self
            .detector
            .detect(images, params.significance, params.enl, params.median_filter)?;

        let expected = images.len() - 1;
        if result.bmap.band_count() != expected {
            return Err(SarError::Detection(format!(
                "Bitemporal map has {} bands, expected {}",
                result.bmap.band_count(),
                expected
            )));
        }
        log::debug!("Change detection completed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, GeoTransform, Projection};
    use ndarray::Array3;
    use std::cell::Cell;

    struct CountingDetector {
        calls: Cell<usize>,
        bmap_bands: Option<usize>,
    }

    fn layer(bands: usize) -> Image {
        let projection = Projection {
            crs: "EPSG:32632".to_string(),
            transform: GeoTransform::north_up(6.0, 51.0, 0.01),
            nominal_scale: 10.0,
        };
        let names = (0..bands).map(|i| format!("b{}", i)).collect();
        Image::new("layer", Array3::zeros((bands, 2, 2)), names, projection).unwrap()
    }

    impl ChangeDetector for CountingDetector {
        fn detect(&self, images: &[Image], _: f64, _: f64, _: bool) -> SarResult<ChangeResult> {
            self.calls.set(self.calls.get() + 1);
            let k = self.bmap_bands.unwrap_or(images.len() - 1);
            Ok(ChangeResult {
                smap: layer(1),
                cmap: layer(1),
                fmap: layer(1),
                bmap: layer(k),
                averaged_series: images.to_vec(),
                averaged_log: layer(1),
                p_values: layer(1),
            })
        }
    }

    fn params() -> DetectionParams {
        DetectionParams {
            significance: 0.01,
            enl: 4.4,
            median_filter: true,
        }
    }

    #[test]
    fn test_invalid_params_never_reach_detector() {
        let detector = CountingDetector { calls: Cell::new(0), bmap_bands: None };
        let invoker = ChangeDetectionInvoker::new(&detector);
        let mut p = params();
        p.significance = 0.1;
        let err = invoker.invoke(&[layer(2), layer(2)], &p).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = invoker.invoke(&[layer(2)], &params()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Detection);
        assert_eq!(detector.calls.get(), 0);
    }

    #[test]
    fn test_invoke_passes_through() {
        let detector = CountingDetector { calls: Cell::new(0), bmap_bands: None };
        let invoker = ChangeDetectionInvoker::new(&detector);
        let result = invoker.invoke(&[layer(2), layer(2), layer(2)], &params()).unwrap();
        assert_eq!(result.bmap.band_count(), 2);
        assert_eq!(detector.calls.get(), 1);
        assert!(result.last_filtered().is_ok());
    }

    #[test]
    fn test_malformed_result_is_detection_error() {
        let detector = CountingDetector { calls: Cell::new(0), bmap_bands: Some(5) };
        let invoker = ChangeDetectionInvoker::new(&detector);
        let err = invoker.invoke(&[layer(2), layer(2)], &params()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Detection);
    }
}
