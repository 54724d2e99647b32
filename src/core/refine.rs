//! Spatial speckle refinement of dual-polarisation images.

use ndarray::{Array3, Axis};

use crate::core::speckle_filter::{SpeckleFilter, SpeckleFilterParams};
use crate::image::Image;
use crate::types::{SarError, SarResult};

/// Applies a spatial speckle filter to a two-band VV/VH image
pub trait Refiner {
    fn refine(&self, image: &Image) -> SarResult<Image>;
}

/// [`Refiner`] backed by the local [`SpeckleFilter`]
pub struct SpeckleRefiner {
    filter: SpeckleFilter,
}

impl SpeckleRefiner {
    pub fn new(num_looks: f32) -> Self {
        Self {
            filter: SpeckleFilter::with_params(SpeckleFilterParams {
                num_looks,
                ..SpeckleFilterParams::default()
            }),
        }
    }
}

impl Default for SpeckleRefiner {
    fn default() -> Self {
        Self::new(SpeckleFilterParams::default().num_looks)
    }
}

impl Refiner for SpeckleRefiner {
    fn refine(&self, image: &Image) -> SarResult<Image> {
        if image.band_count() != 2 {
            return Err(SarError::Refinement(format!(
                "Expected 2 bands (VV, VH), image '{}' has {}",
                image.id,
                image.band_count()
            )));
        }

        let (rows, cols) = image.shape();
        let mut bands = Array3::zeros((2, rows, cols));
        for (index, mut out) in bands.axis_iter_mut(Axis(0)).enumerate() {
            let band = image.band_at(index)?;
            let filtered = self
                .filter
                .apply_filter(&band)
                .map_err(|e| SarError::Refinement(e.to_string()))?;
            out.assign(&filtered);
        }

        log::debug!("Refined image '{}' with {:?}", image.id, self.filter.params());
        let mut refined = image.clone();
        refined.bands = bands;
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::types::{ErrorKind, GeoTransform, Projection};

    fn image(bands: usize) -> Image {
        let projection = Projection {
            crs: "EPSG:32632".to_string(),
            transform: GeoTransform::north_up(6.0, 51.0, 0.01),
            nominal_scale: 10.0,
        };
        let names = (0..bands).map(|i| format!("b{}", i)).collect();
        Image::new("img", Array3::from_elem((bands, 9, 9), 0.3), names, projection).unwrap()
    }

    #[test]
    fn test_requires_two_bands() {
        let refiner = SpeckleRefiner::default();
        let err = refiner.refine(&image(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Refinement);
        assert!(refiner.refine(&image(1)).is_err());
    }

    #[test]
    fn test_refine_keeps_header() {
        let input = image(2);
        let refined = SpeckleRefiner::new(4.4).refine(&input).unwrap();
        assert_eq!(refined.band_names, input.band_names);
        assert_eq!(refined.shape(), input.shape());
        assert_relative_eq!(refined.bands[[1, 4, 4]], 0.3, epsilon = 1e-6);
    }
}
