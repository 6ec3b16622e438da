//! Synthetic track generation
//!
//! Walks a session minute by minute, smoothing a noised heart rate around the
//! base value, and writes the result as a GPX document.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::export::gpx::{GpxExporter, GpxHeader};
use crate::models::{
    Coordinates, EndpointPolicy, HeartRate, TrackPoint, DEFAULT_ALPHA, DEFAULT_NOISE_STD_DEV,
};
use crate::noise::NoiseSource;
use crate::session::{SessionClock, TimezonePolicy};
use crate::smoothing::{validate_alpha, validate_std_dev, HrSmoother};

/// Knobs that stay fixed across generation runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSettings {
    pub position: Coordinates,
    pub noise_std_dev: f64,
    pub timezone: TimezonePolicy,
    pub endpoint: EndpointPolicy,
    pub creator: String,
    pub track_name: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        let header = GpxHeader::default();
        Self {
            position: Coordinates::default(),
            noise_std_dev: DEFAULT_NOISE_STD_DEV,
            timezone: TimezonePolicy::default(),
            endpoint: EndpointPolicy::default(),
            creator: header.creator,
            track_name: header.track_name,
        }
    }
}

/// What the user asks for on one run
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub date: String,
    pub time: String,
    pub base_hr: HeartRate,
    pub duration_minutes: i64,
    pub alpha: f64,
}

impl SessionRequest {
    pub fn new(
        date: impl Into<String>,
        time: impl Into<String>,
        base_hr: HeartRate,
        duration_minutes: i64,
    ) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            base_hr,
            duration_minutes,
            alpha: DEFAULT_ALPHA,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Builds synthetic sessions
#[derive(Debug, Clone, Default)]
pub struct TrackGenerator {
    settings: GeneratorSettings,
}

impl TrackGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Produce the track points of a session without serializing them
    #[instrument(skip(self, noise), fields(date = %request.date, time = %request.time))]
    pub fn track_points<N: NoiseSource + ?Sized>(
        &self,
        request: &SessionRequest,
        noise: &mut N,
    ) -> Result<Vec<TrackPoint>> {
        let alpha = validate_alpha(request.alpha)?;
        let std_dev = validate_std_dev(self.settings.noise_std_dev)?;
        let clock = SessionClock::resolve(
            &request.date,
            &request.time,
            request.duration_minutes,
            self.settings.timezone,
            self.settings.endpoint,
        )?;

        debug!(
            start = %clock.start,
            points = clock.point_count(),
            base_hr = request.base_hr,
            alpha,
            "Generating synthetic session"
        );

        let mut smoother = HrSmoother::new(request.base_hr, alpha, std_dev);
        let points = clock
            .instants()
            .map(|time| TrackPoint {
                time,
                position: self.settings.position,
                heart_rate: smoother.sample(&mut *noise),
            })
            .collect();

        Ok(points)
    }

    /// Generate a complete GPX document for the session
    pub fn generate<N: NoiseSource + ?Sized>(
        &self,
        request: &SessionRequest,
        noise: &mut N,
    ) -> Result<String> {
        let points = self.track_points(request, noise)?;
        let header = GpxHeader {
            creator: self.settings.creator.clone(),
            track_name: self.settings.track_name.clone(),
        };
        let xml = GpxExporter::generate_gpx_xml(&header, &points)?;

        info!(points = points.len(), bytes = xml.len(), "Synthetic GPX generated");
        Ok(xml)
    }
}

/// Generate a session with default settings
pub fn generate<N: NoiseSource + ?Sized>(
    date: &str,
    time: &str,
    base_hr: HeartRate,
    duration_minutes: i64,
    alpha: f64,
    noise: &mut N,
) -> Result<String> {
    let request = SessionRequest::new(date, time, base_hr, duration_minutes).with_alpha(alpha);
    TrackGenerator::default().generate(&request, noise)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GpxHrError;
    use crate::noise::{GaussianNoise, ScriptedNoise};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_inclusive_point_count() {
        let request = SessionRequest::new("2024-06-03", "19:30", 140, 75);
        let points = TrackGenerator::default()
            .track_points(&request, &mut GaussianNoise::seeded(1))
            .unwrap();

        assert_eq!(points.len(), 76);
        assert_eq!(points[0].time, Utc.with_ymd_and_hms(2024, 6, 3, 19, 30, 0).unwrap());
        assert_eq!(points[75].time - points[0].time, Duration::minutes(75));
    }

    #[test]
    fn test_exclusive_endpoint() {
        let generator = TrackGenerator::new(GeneratorSettings {
            endpoint: EndpointPolicy::Exclusive,
            ..GeneratorSettings::default()
        });
        let request = SessionRequest::new("2024-06-03", "19:30", 140, 3);
        let points = generator
            .track_points(&request, &mut ScriptedNoise::silent())
            .unwrap();
        assert_eq!(points.len(), 3);

        let request = SessionRequest::new("2024-06-03", "19:30", 140, 0);
        let xml = generator.generate(&request, &mut ScriptedNoise::silent()).unwrap();
        assert!(xml.contains("<trkseg/>"));
    }

    #[test]
    fn test_alpha_one_emits_raw_targets() {
        let mut noise = ScriptedNoise::new(vec![3.2, -6.7, 0.4]);
        let request = SessionRequest::new("2024-06-03", "19:30", 140, 2).with_alpha(1.0);
        let points = TrackGenerator::default()
            .track_points(&request, &mut noise)
            .unwrap();

        let rates: Vec<_> = points.iter().map(|p| p.heart_rate).collect();
        assert_eq!(rates, vec![143, 133, 140]);
    }

    #[test]
    fn test_smoothing_threads_previous_sample() {
        let mut noise = ScriptedNoise::new(vec![10.0, 10.0]);
        let request = SessionRequest::new("2024-06-03", "19:30", 140, 1).with_alpha(0.5);
        let points = TrackGenerator::default()
            .track_points(&request, &mut noise)
            .unwrap();

        // 140 -> 145 -> 147 (147.5 truncated)
        assert_eq!(points[0].heart_rate, 145);
        assert_eq!(points[1].heart_rate, 147);
    }

    #[test]
    fn test_rejects_bad_input() {
        let generator = TrackGenerator::default();
        let mut noise = ScriptedNoise::silent();

        let bad_date = SessionRequest::new("June 3rd", "19:30", 140, 5);
        assert!(matches!(
            generator.generate(&bad_date, &mut noise),
            Err(GpxHrError::InvalidInput { .. })
        ));

        let negative = SessionRequest::new("2024-06-03", "19:30", 140, -5);
        assert!(matches!(
            generator.generate(&negative, &mut noise),
            Err(GpxHrError::InvalidInput { .. })
        ));

        let bad_alpha = SessionRequest::new("2024-06-03", "19:30", 140, 5).with_alpha(0.0);
        assert!(matches!(
            generator.generate(&bad_alpha, &mut noise),
            Err(GpxHrError::InvalidInput { .. })
        ));
        assert_eq!(noise.drawn(), 0);
    }

    #[test]
    fn test_rejects_negative_noise_spread() {
        let generator = TrackGenerator::new(GeneratorSettings {
            noise_std_dev: -5.0,
            ..GeneratorSettings::default()
        });
        let request = SessionRequest::new("2024-06-03", "19:30", 140, 5);
        let mut noise = GaussianNoise::seeded(7);

        assert!(matches!(
            generator.generate(&request, &mut noise),
            Err(GpxHrError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_custom_position_and_header() {
        let generator = TrackGenerator::new(GeneratorSettings {
            position: Coordinates {
                latitude: 45.5,
                longitude: -73.25,
            },
            creator: "bench".to_string(),
            track_name: "Morning".to_string(),
            ..GeneratorSettings::default()
        });
        let request = SessionRequest::new("2024-06-03", "06:00", 120, 0);
        let xml = generator.generate(&request, &mut ScriptedNoise::silent()).unwrap();

        assert!(xml.contains(r#"<trkpt lat="45.5" lon="-73.25">"#));
        assert!(xml.contains(r#"creator="bench""#));
        assert!(xml.contains("<name>Morning</name>"));
        assert!(xml.contains("<gpxtpx:hr>120</gpxtpx:hr>"));
    }
}
