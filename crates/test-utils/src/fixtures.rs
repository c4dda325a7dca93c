//! Common request parameters for climate slice tests.

/// Valid parameter combinations.
pub mod params {
    pub const VARIABLE: &str = "tas";
    pub const MODEL: &str = "ACCESS-CM2";
}

/// Dates as accepted by the loader.
pub mod dates {
    /// Maps to timestep 18250.
    pub const REFERENCE: &str = "1999-12-20";
    /// Last historical day; the next day is projection-only.
    pub const HISTORICAL_END: &str = "2014-12-31";
    pub const PROJECTION_START: &str = "2015-01-01";
    pub const PROJECTION_DAY: &str = "2050-07-01";
    pub const BEFORE_EPOCH: &str = "1949-12-31";
    pub const MALFORMED: &str = "1999/12/20";
}

/// Cache keys with known digests.
pub mod keys {
    pub const FIELD: &str = "tas_day_ACCESS-CM2_historical_r1i1p1f1_gn";
    pub const TIMESTEP: i64 = 18250;
    pub const QUALITY: i32 = -2;
    /// `FIELD|TIMESTEP|QUALITY`, the input of the blob file-name digest.
    pub const DISPLAY: &str = "tas_day_ACCESS-CM2_historical_r1i1p1f1_gn|18250|-2";
}

/// Small grid shape that keeps tests fast.
pub const SMALL_ROWS: usize = 6;
pub const SMALL_COLS: usize = 12;
