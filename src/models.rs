use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GPX 1.1 base schema namespace
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// Garmin TrackPointExtension schema carrying heart rate
pub const TRACKPOINT_EXTENSION_NAMESPACE: &str =
    "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";

/// Garmin GPX extensions schema, declared on generated documents
pub const GPX_EXTENSIONS_NAMESPACE: &str = "http://www.garmin.com/xmlschemas/GpxExtensions/v3";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Prefix used for the TrackPointExtension namespace when we have to declare it
pub const TRACKPOINT_EXTENSION_PREFIX: &str = "gpxtpx";

/// Smoothing factor used when nothing else is configured
pub const DEFAULT_ALPHA: f64 = 0.8;

/// Standard deviation of the Gaussian noise added to the base heart rate
pub const DEFAULT_NOISE_STD_DEV: f64 = 5.0;

/// Fixed position of every synthetic track point
pub const DEFAULT_LATITUDE: f64 = 49.427809;
pub const DEFAULT_LONGITUDE: f64 = 1.1038437;

/// Timestamp layout of `<time>` elements we write
pub const GPX_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Heart rate in beats per minute.
///
/// Signed on purpose: smoothing never clamps, so a wild base value or noise
/// can produce zero or negative rates and that is not an error.
pub type HeartRate = i32;

/// Fixed latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Coordinates {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
        }
    }
}

/// One timestamped position sample with its heart rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Sample instant, always UTC
    pub time: DateTime<Utc>,

    /// Position of the sample
    pub position: Coordinates,

    /// Smoothed heart rate attached to the point
    pub heart_rate: HeartRate,
}

impl TrackPoint {
    /// Timestamp in the `YYYY-MM-DDTHH:MM:SSZ` form used by GPX files
    pub fn timestamp(&self) -> String {
        self.time.format(GPX_TIME_FORMAT).to_string()
    }
}

/// Whether the last minute of a session gets its own track point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointPolicy {
    /// Points at minutes `0..=duration`, so `duration + 1` points. A zero
    /// duration still gets its start point; use [`EndpointPolicy::Exclusive`]
    /// for an empty track segment.
    #[default]
    Inclusive,
    /// Points at minutes `0..duration`, so `duration` points
    Exclusive,
}

impl EndpointPolicy {
    /// Number of track points a session of `duration_minutes` produces,
    /// saturating at `u32::MAX`
    pub fn point_count(&self, duration_minutes: u32) -> u32 {
        match self {
            EndpointPolicy::Inclusive => duration_minutes.saturating_add(1),
            EndpointPolicy::Exclusive => duration_minutes,
        }
    }
}

impl std::str::FromStr for EndpointPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inclusive" => Ok(EndpointPolicy::Inclusive),
            "exclusive" => Ok(EndpointPolicy::Exclusive),
            _ => Err(format!("Invalid endpoint policy: {}", s)),
        }
    }
}
