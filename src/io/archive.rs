use geo::{BooleanOps, MultiPolygon, Polygon};
use ndarray::Array2;
use std::collections::HashMap;

use crate::core::expression::{ImageSeries, SeriesExpr};
use crate::image::Image;
use crate::types::{SarError, SarResult};

/// Remote image archive the workflow queries.
///
/// Every call is a blocking round trip; implementations decide how the
/// [`SeriesExpr`] description is executed.
pub trait ImageArchive {
    /// Materialize a series description.
    fn evaluate(&self, expr: &SeriesExpr) -> SarResult<ImageSeries>;

    /// Land/water mask on the pixel grid of `reference` (`true` = land).
    fn land_mask(&self, reference: &Image) -> SarResult<Array2<bool>>;

    /// Load a previously exported asset.
    fn load_asset(&self, asset_id: &str) -> SarResult<Image>;
}

/// In-memory archive serving registered collections and assets
#[derive(Debug)]
pub struct MemoryArchive {
    collections: HashMap<String, Vec<Image>>,
    assets: HashMap<String, Image>,
    water: MultiPolygon<f64>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
            assets: HashMap::new(),
            water: MultiPolygon::new(Vec::new()),
        }
    }

    pub fn insert_collection(&mut self, id: impl Into<String>, images: Vec<Image>) {
        let id = id.into();
        log::debug!("Registering collection '{}' with {} image(s)", id, images.len());
        self.collections.insert(id, images);
    }

    pub fn insert_asset(&mut self, id: impl Into<String>, image: Image) {
        self.assets.insert(id.into(), image);
    }

    /// Mark a region as water for [`ImageArchive::land_mask`].
    pub fn add_water(&mut self, polygon: Polygon<f64>) {
        self.water = self.water.union(&MultiPolygon::new(vec![polygon]));
    }
}

impl Default for MemoryArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageArchive for MemoryArchive {
    fn evaluate(&self, expr: &SeriesExpr) -> SarResult<ImageSeries> {
        let images = self
            .collections
            .get(&expr.source)
            .ok_or_else(|| SarError::RemoteQuery(format!("Collection '{}' not found", expr.source)))?;
        Ok(ImageSeries::new(expr.apply(images.iter().cloned())))
    }

    fn land_mask(&self, reference: &Image) -> SarResult<Array2<bool>> {
        Ok(reference.region_mask(&self.water).mapv(|water| !water))
    }

    fn load_asset(&self, asset_id: &str) -> SarResult<Image> {
        self.assets
            .get(asset_id)
            .cloned()
            .ok_or_else(|| SarError::RemoteQuery(format!("Asset '{}' not found", asset_id)))
    }
}
