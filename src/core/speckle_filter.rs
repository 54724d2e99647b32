use crate::types::{SarError, SarResult};
use ndarray::{Array2, ArrayView2, Zip};

/// Speckle filtering parameters
#[derive(Debug, Clone)]
pub struct SpeckleFilterParams {
    /// Filter window size (must be odd)
    pub window_size: usize,
    /// Equivalent number of looks of the input intensities
    pub num_looks: f32,
}

impl Default for SpeckleFilterParams {
    fn default() -> Self {
        Self {
            window_size: 7,
            num_looks: 4.4,
        }
    }
}

/// Speckle filter processor
pub struct SpeckleFilter {
    params: SpeckleFilterParams,
}

impl SpeckleFilter {
    pub fn new() -> Self {
        Self {
            params: SpeckleFilterParams::default(),
        }
    }

    pub fn with_params(params: SpeckleFilterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SpeckleFilterParams {
        &self.params
    }

    /// Apply the refined Lee filter to one intensity band: a Lee estimate
    /// over the edge-aligned half of the window.
    pub fn apply_filter(&self, image: &ArrayView2<f32>) -> SarResult<Array2<f32>> {
        log::debug!("Applying refined Lee speckle filter with {:?}", self.params);

        if self.params.window_size % 2 == 0 || self.params.window_size < 3 {
            return Err(SarError::Processing(format!(
                "Window size must be odd and at least 3, got {}",
                self.params.window_size
            )));
        }
        if self.params.num_looks <= 0.0 {
            return Err(SarError::Processing(format!(
                "Number of looks must be positive, got {}",
                self.params.num_looks
            )));
        }

        Ok(self.filter_pixels(image, |i, j| self.refined_lee_pixel(image, i, j)))
    }

    #[cfg(feature = "parallel")]
    fn filter_pixels<F>(&self, image: &ArrayView2<f32>, pixel: F) -> Array2<f32>
    where
        F: Fn(usize, usize) -> f32 + Sync,
    {
        let mut filtered = Array2::zeros(image.dim());
        Zip::indexed(&mut filtered).par_for_each(|(i, j), out| *out = pixel(i, j));
        filtered
    }

    #[cfg(not(feature = "parallel"))]
    fn filter_pixels<F>(&self, image: &ArrayView2<f32>, pixel: F) -> Array2<f32>
    where
        F: Fn(usize, usize) -> f32,
    {
        let mut filtered = Array2::zeros(image.dim());
        Zip::indexed(&mut filtered).for_each(|(i, j), out| *out = pixel(i, j));
        filtered
    }

    /// Lee estimate restricted to the half window on the center's side of
    /// the strongest edge found among 3x3 sub-window means.
    fn refined_lee_pixel(&self, image: &ArrayView2<f32>, i: usize, j: usize) -> f32 {
        let center = image[[i, j]];
        if !center.is_finite() || center <= 0.0 {
            return center;
        }
        let half = (self.params.window_size / 2) as isize;
        let step = (half - 1).max(1);

        // 3x3 grid of sub-window means, centers spaced `step` apart
        let mut means = [[0.0f32; 3]; 3];
        for (a, row) in means.iter_mut().enumerate() {
            for (b, mean) in row.iter_mut().enumerate() {
                let oi = i as isize + (a as isize - 1) * step;
                let oj = j as isize + (b as isize - 1) * step;
                *mean = sub_window_mean(image, oi, oj).unwrap_or(center);
            }
        }

        // normals of the four edge orientations, as (row, col)
        let normals: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
        let (normal, _) = normals
            .iter()
            .map(|&(nr, nc)| {
                let pos = means[(1 + nr) as usize][(1 + nc) as usize];
                let neg = means[(1 - nr) as usize][(1 - nc) as usize];
                ((nr, nc), (pos - neg).abs())
            })
            .fold(((0, 1), f32::NEG_INFINITY), |best, cand| if cand.1 > best.1 { cand } else { best });

        let pos = means[(1 + normal.0) as usize][(1 + normal.1) as usize];
        let neg = means[(1 - normal.0) as usize][(1 - normal.1) as usize];
        let side = if (pos - means[1][1]).abs() <= (neg - means[1][1]).abs() { 1 } else { -1 };

        let stats = window_statistics(
            image,
            i,
            j,
            |dr, dc| side * (dr * normal.0 + dc * normal.1) >= 0,
            half,
        );
        self.lee_estimate(center, stats)
    }

    fn lee_estimate(&self, center: f32, (mean, variance): (f32, f32)) -> f32 {
        if mean <= 0.0 || variance <= 0.0 {
            return if mean > 0.0 { mean } else { center };
        }
        let sigma_v = 1.0 / self.params.num_looks;
        let var_x = ((variance - mean * mean * sigma_v) / (1.0 + sigma_v)).max(0.0);
        let weight = var_x / variance;
        mean + weight * (center - mean)
    }
}

impl Default for SpeckleFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean and sample variance of the valid pixels selected by `include`.
fn window_statistics<F>(image: &ArrayView2<f32>, i: usize, j: usize, include: F, half: isize) -> (f32, f32)
where
    F: Fn(isize, isize) -> bool,
{
    let (height, width) = image.dim();
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;

    for dr in -half..=half {
        for dc in -half..=half {
            if !include(dr, dc) {
                continue;
            }
            let ii = i as isize + dr;
            let jj = j as isize + dc;
            if ii < 0 || jj < 0 || ii >= height as isize || jj >= width as isize {
                continue;
            }
            let v = image[[ii as usize, jj as usize]];
            if v.is_finite() && v > 0.0 {
                sum += v as f64;
                sum_sq += (v as f64) * (v as f64);
                count += 1;
            }
        }
    }

    if count < 2 {
        return (if count == 1 { sum as f32 } else { 0.0 }, 0.0);
    }
    let mean = sum / count as f64;
    let variance = (sum_sq - count as f64 * mean * mean) / (count - 1) as f64;
    (mean as f32, variance.max(0.0) as f32)
}

fn sub_window_mean(image: &ArrayView2<f32>, ci: isize, cj: isize) -> Option<f32> {
    let (height, width) = image.dim();
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for ii in (ci - 1)..=(ci + 1) {
        for jj in (cj - 1)..=(cj + 1) {
            if ii < 0 || jj < 0 || ii >= height as isize || jj >= width as isize {
                continue;
            }
            let v = image[[ii as usize, jj as usize]];
            if v.is_finite() && v > 0.0 {
                sum += v;
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum / count as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::s;

    #[test]
    fn test_constant_image_is_unchanged() {
        let image = Array2::from_elem((12, 12), 0.25f32);
        let out = SpeckleFilter::new().apply_filter(&image.view()).unwrap();
        for &v in out.iter() {
            assert_abs_diff_eq!(v, 0.25, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_refined_lee_preserves_step_edge() {
        // left half dark, right half bright
        let image = Array2::from_shape_fn((14, 14), |(_, j)| if j < 7 { 0.05f32 } else { 1.0 });
        let out = SpeckleFilter::new().apply_filter(&image.view()).unwrap();
        assert_abs_diff_eq!(out[[7, 5]], 0.05, epsilon = 1e-3);
        assert_abs_diff_eq!(out[[7, 8]], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_speckle_is_smoothed_away_from_borders() {
        let image = Array2::from_shape_fn((16, 16), |(i, j)| if (i + j) % 2 == 0 { 0.5f32 } else { 1.5 });
        let out = SpeckleFilter::new().apply_filter(&image.view()).unwrap();
        let interior = out.slice(s![4..12, 4..12]);
        let max = interior.iter().cloned().fold(f32::MIN, f32::max);
        let min = interior.iter().cloned().fold(f32::MAX, f32::min);
        assert!(max - min < 0.5);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let filter = SpeckleFilter::with_params(SpeckleFilterParams {
            window_size: 6,
            num_looks: 4.4,
        });
        let image = Array2::from_elem((8, 8), 1.0f32);
        assert!(filter.apply_filter(&image.view()).is_err());
    }
}
