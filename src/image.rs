//! Band-stack raster used by the in-memory compute substrate.

use geo::{Contains, MultiPolygon, Point};
use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};

use crate::core::aoi::AreaOfInterest;
use crate::types::{BoundingBox, ImageProperties, Projection, SarError, SarResult};

/// Multi-band image: `bands` is indexed (band, row, col); `mask` marks valid pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    pub bands: Array3<f32>,
    pub band_names: Vec<String>,
    pub mask: Array2<bool>,
    pub projection: Projection,
    pub properties: ImageProperties,
}

impl Image {
    pub fn new(
        id: impl Into<String>,
        bands: Array3<f32>,
        band_names: Vec<String>,
        projection: Projection,
    ) -> SarResult<Self> {
        let (count, rows, cols) = bands.dim();
        if count != band_names.len() {
            return Err(SarError::Processing(format!(
                "Image has {} bands but {} band names",
                count,
                band_names.len()
            )));
        }
        Ok(Self {
            id: id.into(),
            bands,
            band_names,
            mask: Array2::from_elem((rows, cols), true),
            projection,
            properties: ImageProperties::default(),
        })
    }

    pub fn from_band(
        id: impl Into<String>,
        name: impl Into<String>,
        data: Array2<f32>,
        projection: Projection,
    ) -> Self {
        let (rows, cols) = data.dim();
        Self {
            id: id.into(),
            bands: data.insert_axis(Axis(0)),
            band_names: vec![name.into()],
            mask: Array2::from_elem((rows, cols), true),
            projection,
            properties: ImageProperties::default(),
        }
    }

    pub fn with_properties(mut self, properties: ImageProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn band_count(&self) -> usize {
        self.bands.len_of(Axis(0))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    pub fn nominal_scale(&self) -> f64 {
        self.projection.nominal_scale
    }

    pub fn crs(&self) -> &str {
        &self.projection.crs
    }

    pub fn footprint(&self) -> BoundingBox {
        let (rows, cols) = self.shape();
        self.projection.transform.bounds(rows, cols)
    }

    pub fn band_at(&self, index: usize) -> SarResult<ArrayView2<'_, f32>> {
        if index >= self.band_count() {
            return Err(SarError::Processing(format!(
                "Band index {} out of range for image '{}' with {} bands",
                index,
                self.id,
                self.band_count()
            )));
        }
        Ok(self.bands.index_axis(Axis(0), index))
    }

    pub fn band_index(&self, name: &str) -> SarResult<usize> {
        self.band_names
            .iter()
            .position(|b| b == name)
            .ok_or_else(|| SarError::Processing(format!("Image '{}' has no band '{}'", self.id, name)))
    }

    pub fn band(&self, name: &str) -> SarResult<ArrayView2<'_, f32>> {
        self.band_at(self.band_index(name)?)
    }

    pub fn select(&self, indices: &[usize]) -> SarResult<Image> {
        let (rows, cols) = self.shape();
        let mut bands = Array3::zeros((indices.len(), rows, cols));
        let mut names = Vec::with_capacity(indices.len());
        for (out, &index) in indices.iter().enumerate() {
            bands.index_axis_mut(Axis(0), out).assign(&self.band_at(index)?);
            names.push(self.band_names[index].clone());
        }
        Ok(Image {
            bands,
            band_names: names,
            ..self.clone_header()
        })
    }

    pub fn select_names(&self, names: &[&str]) -> SarResult<Image> {
        let indices = names
            .iter()
            .map(|name| self.band_index(name))
            .collect::<SarResult<Vec<_>>>()?;
        self.select(&indices)
    }

    pub fn rename<S: Into<String>>(mut self, names: Vec<S>) -> SarResult<Image> {
        if names.len() != self.band_count() {
            return Err(SarError::Processing(format!(
                "Cannot rename {} bands with {} names",
                self.band_count(),
                names.len()
            )));
        }
        self.band_names = names.into_iter().map(Into::into).collect();
        Ok(self)
    }

    /// Stack the bands of several images sharing one pixel grid.
    pub fn cat(images: &[&Image]) -> SarResult<Image> {
        let first = images
            .first()
            .ok_or_else(|| SarError::Processing("Cannot concatenate zero images".to_string()))?;
        let shape = first.shape();
        let views = images
            .iter()
            .map(|img| {
                if img.shape() != shape {
                    return Err(grid_mismatch(first, img));
                }
                Ok(img.bands.view())
            })
            .collect::<SarResult<Vec<_>>>()?;
        let bands = ndarray::concatenate(Axis(0), &views)
            .map_err(|e| SarError::Processing(format!("Band concatenation failed: {}", e)))?;

        let mut mask = first.mask.clone();
        for img in &images[1..] {
            Zip::from(&mut mask).and(&img.mask).for_each(|m, &other| *m = *m && other);
        }

        Ok(Image {
            id: first.id.clone(),
            bands,
            band_names: images.iter().flat_map(|img| img.band_names.clone()).collect(),
            mask,
            projection: first.projection.clone(),
            properties: first.properties.clone(),
        })
    }

    pub fn map_values<F>(&self, f: F) -> Image
    where
        F: Fn(f32) -> f32,
    {
        Image {
            bands: self.bands.mapv(f),
            band_names: self.band_names.clone(),
            ..self.clone_header()
        }
    }

    pub fn multiply(&self, factor: f32) -> Image {
        self.map_values(|v| v * factor)
    }

    pub fn add_scalar(&self, value: f32) -> Image {
        self.map_values(|v| v + value)
    }

    pub fn divide_scalar(&self, value: f32) -> Image {
        self.map_values(|v| v / value)
    }

    /// Restore linear intensities from dB values.
    pub fn db_to_linear(&self) -> Image {
        let factor = std::f32::consts::LN_10 / 10.0;
        self.map_values(|v| (v * factor).exp())
    }

    /// Truncate to the 0..=255 byte range.
    pub fn to_byte(&self) -> Image {
        self.map_values(|v| if v.is_finite() { v.clamp(0.0, 255.0).floor() } else { 0.0 })
    }

    /// Mask every pixel whose center lies outside the area of interest.
    pub fn clip(&self, aoi: &AreaOfInterest) -> Image {
        let inside = self.region_mask(aoi.geometry());
        let mut clipped = self.clone();
        Zip::from(&mut clipped.mask).and(&inside).for_each(|m, &i| *m = *m && i);
        clipped
    }

    pub fn update_mask(&self, mask: &Array2<bool>) -> SarResult<Image> {
        if mask.dim() != self.shape() {
            return Err(SarError::Processing(format!(
                "Mask shape {:?} does not match image '{}' shape {:?}",
                mask.dim(),
                self.id,
                self.shape()
            )));
        }
        let mut masked = self.clone();
        Zip::from(&mut masked.mask).and(mask).for_each(|m, &v| *m = *m && v);
        Ok(masked)
    }

    /// Take pixel values from `other` wherever `condition` holds.
    pub fn where_mask(&self, condition: &Array2<bool>, other: &Image) -> SarResult<Image> {
        if other.shape() != self.shape() || condition.dim() != self.shape() {
            return Err(grid_mismatch(self, other));
        }
        if other.band_count() != self.band_count() {
            return Err(SarError::Processing(format!(
                "Cannot substitute {} bands with {} bands",
                self.band_count(),
                other.band_count()
            )));
        }
        let mut merged = self.clone();
        for (mut band, other_band) in merged
            .bands
            .axis_iter_mut(Axis(0))
            .zip(other.bands.axis_iter(Axis(0)))
        {
            Zip::from(&mut band)
                .and(&other_band)
                .and(condition)
                .for_each(|v, &o, &c| {
                    if c {
                        *v = o;
                    }
                });
        }
        Zip::from(&mut merged.mask)
            .and(&other.mask)
            .and(condition)
            .for_each(|m, &o, &c| {
                if c {
                    *m = o;
                }
            });
        Ok(merged)
    }

    pub fn band_lt(&self, index: usize, threshold: f32) -> SarResult<Array2<bool>> {
        Ok(self.band_at(index)?.mapv(|v| v < threshold))
    }

    pub fn band_gt(&self, index: usize, threshold: f32) -> SarResult<Array2<bool>> {
        Ok(self.band_at(index)?.mapv(|v| v > threshold))
    }

    /// Per-pixel mean over a stack of images, ignoring masked pixels.
    pub fn mean(images: &[Image]) -> SarResult<Image> {
        let first = images
            .first()
            .ok_or_else(|| SarError::Processing("Cannot average an empty series".to_string()))?;
        let (count, rows, cols) = first.bands.dim();
        let mut sum = Array3::<f32>::zeros((count, rows, cols));
        let mut hits = Array2::<u32>::zeros((rows, cols));

        for img in images {
            if img.bands.dim() != first.bands.dim() {
                return Err(grid_mismatch(first, img));
            }
            for (mut acc, band) in sum.axis_iter_mut(Axis(0)).zip(img.bands.axis_iter(Axis(0))) {
                Zip::from(&mut acc).and(&band).and(&img.mask).for_each(|a, &v, &valid| {
                    if valid {
                        *a += v;
                    }
                });
            }
            Zip::from(&mut hits).and(&img.mask).for_each(|h, &valid| {
                if valid {
                    *h += 1;
                }
            });
        }

        for mut acc in sum.axis_iter_mut(Axis(0)) {
            Zip::from(&mut acc).and(&hits).for_each(|a, &h| {
                *a = if h > 0 { *a / h as f32 } else { 0.0 };
            });
        }

        Ok(Image {
            id: format!("{}_mean", first.id),
            bands: sum,
            band_names: first.band_names.clone(),
            mask: hits.mapv(|h| h > 0),
            projection: first.projection.clone(),
            properties: ImageProperties::default(),
        })
    }

    /// Nearest-rank percentiles of the valid pixels of one band.
    pub fn percentiles(&self, index: usize, percents: &[f64]) -> SarResult<Vec<Option<f32>>> {
        let band = self.band_at(index)?;
        let mut values: Vec<f32> = band
            .iter()
            .zip(self.mask.iter())
            .filter(|(v, valid)| **valid && v.is_finite())
            .map(|(&v, _)| v)
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Ok(percents
            .iter()
            .map(|p| {
                if values.is_empty() {
                    return None;
                }
                let rank = (p.clamp(0.0, 100.0) / 100.0 * (values.len() - 1) as f64).round() as usize;
                Some(values[rank])
            })
            .collect())
    }

    /// Mean of the valid pixels of one band, optionally restricted to a region.
    pub fn mean_within(&self, name: &str, aoi: Option<&AreaOfInterest>) -> SarResult<Option<f64>> {
        let band = self.band(name)?;
        let region = aoi.map(|a| self.region_mask(a.geometry()));
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for ((row, col), &v) in band.indexed_iter() {
            let inside = region.as_ref().map_or(true, |r| r[[row, col]]);
            if inside && self.mask[[row, col]] && v.is_finite() {
                sum += v as f64;
                count += 1;
            }
        }
        Ok(if count > 0 { Some(sum / count as f64) } else { None })
    }

    /// Fraction of valid pixels of one band equal to `value`.
    pub fn fraction_equal(&self, index: usize, value: f32) -> SarResult<f64> {
        let band = self.band_at(index)?;
        let (mut hits, mut total) = (0usize, 0usize);
        Zip::from(&band).and(&self.mask).for_each(|&v, &valid| {
            if valid {
                total += 1;
                if v == value {
                    hits += 1;
                }
            }
        });
        Ok(if total > 0 { hits as f64 / total as f64 } else { 0.0 })
    }

    /// Pixels whose centers fall inside `region`.
    #[cfg(feature = "parallel")]
    pub fn region_mask(&self, region: &MultiPolygon<f64>) -> Array2<bool> {
        let transform = self.projection.transform;
        let mut inside = Array2::from_elem(self.shape(), false);
        Zip::indexed(&mut inside).par_for_each(|(row, col), v| {
            let (lon, lat) = transform.pixel_center(row, col);
            *v = region.contains(&Point::new(lon, lat));
        });
        inside
    }

    #[cfg(not(feature = "parallel"))]
    pub fn region_mask(&self, region: &MultiPolygon<f64>) -> Array2<bool> {
        let transform = self.projection.transform;
        let mut inside = Array2::from_elem(self.shape(), false);
        Zip::indexed(&mut inside).for_each(|(row, col), v| {
            let (lon, lat) = transform.pixel_center(row, col);
            *v = region.contains(&Point::new(lon, lat));
        });
        inside
    }

    fn clone_header(&self) -> Image {
        Image {
            id: self.id.clone(),
            bands: Array3::zeros((0, 0, 0)),
            band_names: Vec::new(),
            mask: self.mask.clone(),
            projection: self.projection.clone(),
            properties: self.properties.clone(),
        }
    }
}

fn grid_mismatch(a: &Image, b: &Image) -> SarError {
    SarError::Processing(format!(
        "Image '{}' {:?} and image '{}' {:?} do not share a pixel grid",
        a.id,
        a.bands.dim(),
        b.id,
        b.bands.dim()
    ))
}
