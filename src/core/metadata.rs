//! Human-readable run metadata exported alongside the change maps.

use chrono::{DateTime, Utc};

use crate::types::{OrbitPass, PlatformFilter};

/// Where the change maps of a run were sent
#[derive(Debug, Clone, PartialEq)]
pub enum ExportTarget {
    Asset { name: String, background: String },
    Drive { name: String },
}

/// Snapshot of a run, rendered as ordered `key: value` rows
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub run_time: DateTime<Utc>,
    pub collection: String,
    pub default_source: bool,
    pub enl: f64,
    pub export_scale: f64,
    pub nominal_scale: f64,
    pub orbit_pass: OrbitPass,
    pub platform: PlatformFilter,
    pub significance: f64,
    pub labels: Vec<String>,
    pub relative_orbits: Vec<u32>,
    pub mean_incidence: Option<f64>,
    pub median_filter: bool,
    /// First ring of the AOI as (lon, lat)
    pub polygon: Vec<(f64, f64)>,
}

impl RunMetadata {
    pub fn rows(&self, target: &ExportTarget) -> Vec<String> {
        let mut rows = vec![
            format!("SEQUENTIAL OMNIBUS: {}", self.run_time.format("%a %b %e %H:%M:%S %Y")),
            format!("Collection: {}", self.collection),
        ];
        rows.push(match target {
            ExportTarget::Asset { name, .. } => format!("Asset export name: {}", name),
            ExportTarget::Drive { name } => format!("Drive export name: {}", name),
        });
        rows.push(format!("ENL: {:?}", self.enl));
        rows.push(format!("Export scale (m): {:?}", self.export_scale));
        rows.push(format!("Nominal scale (m): {:?}", self.nominal_scale));

        if !self.default_source {
            rows.push(format!("Significance: {:?}", self.significance));
            rows.push(format!("Series length: {}", self.labels.len()));
            rows.push(format!("Used 3x3 median filter: {}", self.median_filter));
            return rows;
        }

        rows.push(format!("Orbit pass: {}", self.orbit_pass));
        rows.push(format!("Significance: {:?}", self.significance));
        rows.push(format!("Series length: {}", self.labels.len()));
        let quoted: Vec<String> = self.timestamps().iter().map(|t| format!("'{}'", t)).collect();
        rows.push(format!("Timestamps: {}", quoted.join(", ")));
        rows.push(match target {
            ExportTarget::Asset { .. } => format!("Rel orbit numbers: {:?}", self.relative_orbits),
            ExportTarget::Drive { .. } => format!("Rel orbit number(s): {:?}", self.relative_orbits),
        });
        rows.push(format!("Platform: {}", self.platform));
        if let ExportTarget::Asset { background, .. } = target {
            rows.push(format!("Background image: {}", background));
        }
        rows.push(format!(
            "Mean incidence angles: {}",
            self.mean_incidence
                .map(|a| format!("{:.2}", a))
                .unwrap_or_else(|| "undefined".to_string())
        ));
        rows.push(format!("Used 3x3 median filter: {}", self.median_filter));
        rows.push("Polygon:".to_string());
        rows.extend(self.polygon.iter().map(|(lon, lat)| format!("[{:?}, {:?}]", lon, lat)));
        rows
    }

    /// `YYYYMMDD` part of each label
    fn timestamps(&self) -> Vec<String> {
        self.labels
            .iter()
            .map(|label| label.chars().skip(1).take(8).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata(default_source: bool) -> RunMetadata {
        RunMetadata {
            run_time: Utc.with_ymd_and_hms(2018, 12, 3, 9, 5, 0).unwrap(),
            collection: "COPERNICUS/S1_GRD".to_string(),
            default_source,
            enl: 4.4,
            export_scale: 10.0,
            nominal_scale: 10.0,
            orbit_pass: OrbitPass::Ascending,
            platform: PlatformFilter::Both,
            significance: 0.01,
            labels: vec!["T20180401".into(), "T20180413_2".into(), "T20180413_3".into()],
            relative_orbits: vec![15, 88],
            mean_incidence: None,
            median_filter: true,
            polygon: vec![(6.0, 50.9), (6.1, 50.9), (6.1, 51.0), (6.0, 50.9)],
        }
    }

    #[test]
    fn test_asset_rows_in_order() {
        let target = ExportTarget::Asset {
            name: "users/me/run1".into(),
            background: "collectionmean".into(),
        };
        let rows = metadata(true).rows(&target);
        assert_eq!(rows[0], "SEQUENTIAL OMNIBUS: Mon Dec  3 09:05:00 2018");
        assert_eq!(rows[2], "Asset export name: users/me/run1");
        assert_eq!(rows[3], "ENL: 4.4");
        assert_eq!(rows[4], "Export scale (m): 10.0");
        assert_eq!(rows[6], "Orbit pass: ASCENDING");
        assert_eq!(rows[9], "Timestamps: '20180401', '20180413', '20180413'");
        assert_eq!(rows[10], "Rel orbit numbers: [15, 88]");
        assert_eq!(rows[12], "Background image: collectionmean");
        assert_eq!(rows[13], "Mean incidence angles: undefined");
        assert_eq!(rows[15], "Polygon:");
        assert_eq!(rows.len(), 16 + 4);
        assert_eq!(rows[16], "[6.0, 50.9]");
    }

    #[test]
    fn test_drive_rows_skip_background() {
        let mut meta = metadata(true);
        meta.mean_incidence = Some(38.456);
        let rows = meta.rows(&ExportTarget::Drive { name: "gee/run1".into() });
        assert_eq!(rows[2], "Drive export name: gee/run1");
        assert_eq!(rows[10], "Rel orbit number(s): [15, 88]");
        assert!(!rows.iter().any(|r| r.starts_with("Background image")));
        assert_eq!(rows[12], "Mean incidence angles: 38.46");
    }

    #[test]
    fn test_external_source_rows() {
        let rows = metadata(false).rows(&ExportTarget::Drive { name: "gee/run1".into() });
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[6], "Significance: 0.01");
        assert_eq!(rows[7], "Series length: 3");
        assert_eq!(rows[8], "Used 3x3 median filter: true");
    }
}
