//! Stride-sampled accumulation of the sorted series into the working list.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::core::aoi::AreaOfInterest;
use crate::image::Image;
use crate::types::{SarError, SarResult};

/// Running state of the fold over the sorted series.
///
/// An image is appended iff `counter % stride == 0`; the counter advances
/// for every input image whether it was kept or not.
#[derive(Debug, Clone)]
pub struct AccumulatorState {
    pub working_list: Vec<Image>,
    pub aoi: AreaOfInterest,
    pub enl: f64,
    pub counter: usize,
    pub stride: usize,
}

impl AccumulatorState {
    pub fn new(aoi: AreaOfInterest, enl: f64, stride: usize) -> SarResult<Self> {
        if stride < 1 {
            return Err(SarError::Validation("Stride must be at least 1".to_string()));
        }
        Ok(Self {
            working_list: Vec::new(),
            aoi,
            enl,
            counter: 0,
            stride,
        })
    }

    pub fn push(&mut self, image: &Image) {
        if self.counter % self.stride == 0 {
            self.working_list.push(image.multiply(self.enl as f32).clip(&self.aoi));
        }
        self.counter += 1;
    }
}

/// Output of a successful accumulation
#[derive(Debug, Clone)]
pub struct Accumulation {
    pub state: AccumulatorState,
    /// One unique label per working-list entry, in acquisition order
    pub labels: Vec<String>,
    /// Native resolution of the first selected image, shared by every export
    pub scale: f64,
}

impl Accumulation {
    pub fn working_list(&self) -> &[Image] {
        &self.state.working_list
    }

    pub fn len(&self) -> usize {
        self.state.working_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.working_list.is_empty()
    }
}

pub struct SeriesAccumulator {
    stride: usize,
    enl: f64,
}

impl SeriesAccumulator {
    pub fn new(stride: usize, enl: f64) -> SarResult<Self> {
        if stride < 1 {
            return Err(SarError::Validation("Stride must be at least 1".to_string()));
        }
        Ok(Self { stride, enl })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Every `stride`-th element starting at index 0.
    pub fn subsample<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items.iter().step_by(self.stride).cloned().collect()
    }

    pub fn fold(&self, images: &[Image], aoi: &AreaOfInterest) -> SarResult<AccumulatorState> {
        let initial = AccumulatorState::new(aoi.clone(), self.enl, self.stride)?;
        Ok(images.iter().fold(initial, |mut state, image| {
            state.push(image);
            state
        }))
    }

    /// Fold the series and label the retained acquisitions.
    ///
    /// `times` holds the acquisition instants of `images` in the same order.
    pub fn accumulate(
        &self,
        images: &[Image],
        times: &[DateTime<Utc>],
        aoi: &AreaOfInterest,
    ) -> SarResult<Accumulation> {
        if times.len() != images.len() {
            return Err(SarError::Processing(format!(
                "{} acquisition times for {} images",
                times.len(),
                images.len()
            )));
        }

        let raw_labels: Vec<String> = self.subsample(times).iter().map(timestamp_label).collect();
        let labels = dedupe_labels(raw_labels);
        if labels.len() < 2 {
            return Err(SarError::Validation(
                "Less than 2 images found, decrease stride".to_string(),
            ));
        }

        let state = self.fold(images, aoi)?;
        let scale = state
            .working_list
            .first()
            .map(Image::nominal_scale)
            .ok_or_else(|| SarError::Validation("Working list is empty".to_string()))?;

        log::info!(
            "Accumulated {} of {} acquisitions (stride {}, ENL {})",
            state.working_list.len(),
            images.len(),
            self.stride,
            self.enl
        );
        Ok(Accumulation { state, labels, scale })
    }
}

/// `T` + 4-digit year + month + day, e.g. `T20180401`.
pub fn timestamp_label(time: &DateTime<Utc>) -> String {
    time.format("T%Y%m%d").to_string()
}

/// Labels for a series without acquisition times: `T1`, `T2`, ...
pub fn index_labels(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("T{}", i)).collect()
}

/// Suffix every member of a duplicate group with `_<1-based position>`.
pub fn dedupe_labels(labels: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in &labels {
        *counts.entry(label.as_str()).or_insert(0) += 1;
    }
    let duplicated: Vec<bool> = labels.iter().map(|l| counts[l.as_str()] > 1).collect();

    labels
        .into_iter()
        .zip(duplicated)
        .enumerate()
        .map(|(i, (label, dup))| if dup { format!("{}_{}", label, i + 1) } else { label })
        .collect()
}
