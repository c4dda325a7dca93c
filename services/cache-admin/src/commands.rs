//! Cache maintenance commands.

use std::io;
use std::path::{Path, PathBuf};

use climate_common::{infer_scenario, parse_date, validate_all, Resolution, ValidationResult};
use serde::Serialize;
use slice_cache::{
    blob_file_name, npy, BlobError, CacheConfig, DiskCache, DiskScan, FetchKey, NanStatistics,
    VerifyReport,
};
use tracing::info;

/// Open the disk tier described by `config` (disabled if turned off).
pub fn open_disk(config: &CacheConfig) -> io::Result<DiskCache> {
    if config.disk_enabled {
        DiskCache::new(config.data_dir())
    } else {
        Ok(DiskCache::disabled())
    }
}

/// Cache identity of one slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyReport {
    pub variable: String,
    pub model: String,
    pub scenario: String,
    pub date: String,
    pub resolution: Resolution,
    pub field: String,
    pub timestep: i64,
    pub quality: i32,
    pub file_name: String,
    pub path: Option<PathBuf>,
    pub cached: bool,
}

/// Validate slice parameters and report the key and blob location they
/// map to.
pub fn describe_key(
    disk: &DiskCache,
    variable: &str,
    model: &str,
    date: &str,
    scenario: Option<&str>,
    resolution: Resolution,
) -> ValidationResult<KeyReport> {
    let date = parse_date(date)?;
    let scenario = infer_scenario(date, scenario)?;
    validate_all(variable, model, &scenario, date, resolution)?;
    let key = FetchKey::for_slice(variable, model, &scenario, date, resolution)?;

    Ok(KeyReport {
        variable: variable.to_string(),
        model: model.to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        resolution,
        field: key.field().to_string(),
        timestep: key.timestep(),
        quality: key.quality(),
        file_name: blob_file_name(&key),
        path: disk.path_for(&key),
        cached: disk.contains(&key),
        scenario,
    })
}

/// Header and content summary of one blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub path: PathBuf,
    pub dtype: String,
    pub rows: usize,
    pub cols: usize,
    pub header_bytes: usize,
    pub payload_bytes: usize,
    pub memory_mapped: bool,
    pub nan_statistics: NanStatistics,
}

pub fn inspect_blob(path: &Path) -> Result<InspectReport, BlobError> {
    let header = npy::read_header(path)?;
    let raster = npy::load(path)?;

    Ok(InspectReport {
        path: path.to_path_buf(),
        dtype: header.dtype.to_string(),
        rows: header.rows,
        cols: header.cols,
        header_bytes: header.data_offset,
        payload_bytes: raster.nbytes(),
        memory_mapped: raster.is_memory_mapped(),
        nan_statistics: raster.nan_statistics(),
    })
}

/// Size of the disk tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub enabled: bool,
    pub root: Option<PathBuf>,
    #[serde(flatten)]
    pub scan: DiskScan,
}

pub fn disk_stats(disk: &DiskCache) -> io::Result<StatsReport> {
    Ok(StatsReport {
        enabled: disk.is_enabled(),
        root: disk.root().map(Path::to_path_buf),
        scan: disk.scan()?,
    })
}

/// Check every blob; unless `dry_run`, delete corrupt blobs and leftover
/// temp files.
pub fn verify_disk(disk: &DiskCache, dry_run: bool) -> io::Result<VerifyReport> {
    let report = disk.verify(dry_run)?;
    info!(
        checked = report.checked,
        valid = report.valid,
        corrupt = report.corrupt.len(),
        temp_files = report.temp_files.len(),
        dry_run,
        "Cache verification finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slice_cache::Raster;

    #[test]
    fn test_describe_reference_key() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskCache::new(dir.path()).unwrap();

        let report = describe_key(&disk, "tas", "ACCESS-CM2", "1999-12-20", None, Resolution::Medium)
            .unwrap();
        assert_eq!(report.field, "tas_day_ACCESS-CM2_historical_r1i1p1f1_gn");
        assert_eq!(report.timestep, 18250);
        assert_eq!(report.quality, -2);
        assert_eq!(report.scenario, "historical");
        assert!(report.file_name.ends_with(".npy"));
        assert_eq!(report.path, Some(dir.path().join(&report.file_name)));
        assert!(!report.cached);
    }

    #[test]
    fn test_describe_rejects_invalid_input() {
        let disk = DiskCache::disabled();
        assert!(describe_key(&disk, "tas", "ACCESS-CM2", "20-12-1999", None, Resolution::Low).is_err());
        assert!(describe_key(&disk, "tas", "ACCESS-CM2", "2101-01-01", Some("ssp245"), Resolution::Low).is_err());
    }

    #[test]
    fn test_inspect_blob() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskCache::new(dir.path()).unwrap();
        let key = FetchKey::new("pr_day_MIROC6_ssp245_r1i1p1f1_gn", 40000, 0);
        let raster = Raster::from_f64(2, 3, vec![1.0, 2.0, 3.0, f64::NAN, 5.0, 6.0]).unwrap();
        disk.write(&key, &raster).unwrap();

        let report = inspect_blob(&disk.path_for(&key).unwrap()).unwrap();
        assert_eq!(report.dtype, "float64");
        assert_eq!((report.rows, report.cols), (2, 3));
        assert_eq!(report.header_bytes % 64, 0);
        assert_eq!(report.payload_bytes, 48);
        assert_eq!(report.nan_statistics.nan_count, 1);
        assert_eq!(report.nan_statistics.valid_count, 5);
    }

    #[test]
    fn test_stats_of_disabled_tier() {
        let stats = disk_stats(&DiskCache::disabled()).unwrap();
        assert!(!stats.enabled);
        assert_eq!(stats.scan.entries, 0);
    }
}
