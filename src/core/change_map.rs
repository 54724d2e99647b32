//! Selection of one detection layer for display.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::DisplayOptions;
use crate::core::aoi::AreaOfInterest;
use crate::core::detection::ChangeResult;
use crate::image::Image;
use crate::types::{SarError, SarResult};

/// Which change layer is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapMode {
    Bitemporal,
    #[default]
    First,
    Last,
    Frequency,
}

/// Ordered color stops of a display ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette(pub &'static [&'static str]);

impl Palette {
    /// Cold to hot ramp for interval and frequency layers
    pub const JET: Palette = Palette(&["black", "blue", "cyan", "yellow", "red"]);
    /// Bitemporal classes: none, positive definite, negative definite, indefinite
    pub const RGY: Palette = Palette(&["black", "red", "green", "yellow"]);

    pub fn stops(&self) -> &'static [&'static str] {
        self.0
    }
}

impl std::fmt::Display for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// Target grid for a full-resolution preview
#[derive(Debug, Clone, PartialEq)]
pub struct Reprojection {
    pub crs: String,
    pub scale: f64,
}

/// Everything the rendering component needs to draw one change layer
#[derive(Debug, Clone)]
pub struct RenderDescriptor {
    pub mode: MapMode,
    /// Byte-valued layer with water and change masks applied
    pub layer: Image,
    pub min: f64,
    pub max: f64,
    pub palette: Palette,
    pub opacity: f64,
    /// `None` for quick preview at screen resolution
    pub reprojection: Option<Reprojection>,
    pub legend: String,
    /// 1-based interval actually displayed in bitemporal mode
    pub interval: Option<usize>,
    /// `<label[k-1]>--><label[k]>` in bitemporal mode
    pub caption: Option<String>,
}

/// Maps a [`MapMode`] and display options to a [`RenderDescriptor`].
pub struct ChangeMapSelector<'a> {
    labels: &'a [String],
    aoi: &'a AreaOfInterest,
    archive_crs: &'a str,
    export_scale: f64,
}

impl<'a> ChangeMapSelector<'a> {
    pub fn new(labels: &'a [String], aoi: &'a AreaOfInterest, archive_crs: &'a str, export_scale: f64) -> Self {
        Self {
            labels,
            aoi,
            archive_crs,
            export_scale,
        }
    }

    pub fn series_length(&self) -> usize {
        self.labels.len()
    }

    /// Build the descriptor for the current options.
    ///
    /// `land_mask` is required when water masking is enabled.
    pub fn select(
        &self,
        result: &ChangeResult,
        options: &DisplayOptions,
        land_mask: Option<&Array2<bool>>,
    ) -> SarResult<RenderDescriptor> {
        let count = self.series_length();
        if count < 2 {
            return Err(SarError::Validation(format!(
                "Series length {} is too short to preview",
                count
            )));
        }

        let (layer, max, palette, legend, interval, caption) = match options.map_mode {
            MapMode::First => (
                result.smap.to_byte(),
                count as f64,
                Palette::JET,
                "Interval of first change:\n blue = early, red = late".to_string(),
                None,
                None,
            ),
            MapMode::Last => (
                result.cmap.to_byte(),
                count as f64,
                Palette::JET,
                "Interval of last change:\n blue = early, red = late".to_string(),
                None,
                None,
            ),
            MapMode::Frequency => (
                result.fmap.to_byte(),
                count as f64 / 2.0,
                Palette::JET,
                "Change frequency :\n blue = few, red = many".to_string(),
                None,
                None,
            ),
            MapMode::Bitemporal => {
                let sel = clamp_interval(options.interval, count);
                let band = result.bmap.to_byte().select(&[sel - 1])?.clip(self.aoi);
                (
                    band,
                    3.0,
                    Palette::RGY,
                    "red = positive definite, green = negative definite, yellow = indefinite".to_string(),
                    Some(sel),
                    Some(format!("{}-->{}", self.labels[sel - 1], self.labels[sel])),
                )
            }
        };

        let mut layer = layer;
        if options.mask_water {
            let mask = land_mask
                .ok_or_else(|| SarError::Processing("Water mask requested but not available".to_string()))?;
            layer = layer.update_mask(mask)?;
        }
        if options.mask_change {
            let changed = layer.band_gt(0, 0.0)?;
            layer = layer.update_mask(&changed)?;
        }

        let reprojection = (!options.quick_preview).then(|| Reprojection {
            crs: self.archive_crs.to_string(),
            scale: self.export_scale,
        });

        log::debug!("Selected {:?} layer with display range [0, {}]", options.map_mode, max);
        Ok(RenderDescriptor {
            mode: options.map_mode,
            layer,
            min: 0.0,
            max,
            palette,
            opacity: options.opacity,
            reprojection,
            legend,
            interval,
            caption,
        })
    }
}

/// Clamp a 1-based bitemporal interval into `[1, count - 1]`.
pub fn clamp_interval(requested: i64, count: usize) -> usize {
    let upper = count.saturating_sub(1).max(1) as i64;
    let clamped = requested.clamp(1, upper);
    if clamped != requested {
        log::warn!(
            "Bitemporal interval {} out of range, showing interval {} of {}",
            requested,
            clamped,
            upper
        );
    }
    clamped as usize
}

/// Per-interval fraction of pixels in each bitemporal class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeFractions {
    /// Band names of the bitemporal intervals, in order
    pub intervals: Vec<String>,
    pub positive_definite: Vec<f64>,
    pub negative_definite: Vec<f64>,
    pub indefinite: Vec<f64>,
}

impl ChangeFractions {
    /// Evaluate an exported change asset laid out as
    /// `cmap, smap, fmap, <k interval bands>, background`.
    pub fn from_asset(asset: &Image) -> SarResult<Self> {
        let bands = asset.band_count();
        if bands < 5 {
            return Err(SarError::Validation(format!(
                "Asset '{}' has {} bands, not a change map export",
                asset.id, bands
            )));
        }
        let k = bands - 4;
        let mut fractions = ChangeFractions {
            intervals: asset.band_names[3..3 + k].to_vec(),
            positive_definite: Vec::with_capacity(k),
            negative_definite: Vec::with_capacity(k),
            indefinite: Vec::with_capacity(k),
        };
        for index in 3..3 + k {
            fractions.positive_definite.push(asset.fraction_equal(index, 1.0)?);
            fractions.negative_definite.push(asset.fraction_equal(index, 2.0)?);
            fractions.indefinite.push(asset.fraction_equal(index, 3.0)?);
        }
        log::info!("Computed change fractions for {} intervals of '{}'", k, asset.id);
        Ok(fractions)
    }
}
