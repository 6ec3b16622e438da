//! Read a GPX file back and summarize what it contains
//!
//! Structure (tracks, segments, points, timestamps) comes from the `gpx`
//! crate; the heart-rate extensions it does not model are counted on our own
//! document tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::GpxDocument;
use crate::error::{ParseError, Result};
use crate::models::TRACKPOINT_EXTENSION_NAMESPACE;

/// Overview of one GPX document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub creator: Option<String>,
    pub tracks: usize,
    pub segments: usize,
    pub points: usize,
    pub first_time: Option<DateTime<Utc>>,
    pub last_time: Option<DateTime<Utc>>,
    pub heart_rates: usize,
    pub min_heart_rate: Option<i32>,
    pub max_heart_rate: Option<i32>,
}

impl TrackSummary {
    /// Session length between the first and last timestamped point
    pub fn duration_minutes(&self) -> Option<i64> {
        match (self.first_time, self.last_time) {
            (Some(first), Some(last)) => Some((last - first).num_minutes()),
            _ => None,
        }
    }
}

/// Summarize a GPX document held in a string
pub fn summarize(xml: &str) -> Result<TrackSummary> {
    let doc = GpxDocument::parse_str(xml)?;
    let parsed = gpx::read(xml.as_bytes()).map_err(|e| ParseError::Gpx(e.to_string()))?;

    let rates: Vec<i32> = doc
        .descendant_elements(doc.root())
        .into_iter()
        .filter(|&id| doc.is_element(id, TRACKPOINT_EXTENSION_NAMESPACE, "hr"))
        .filter_map(|id| doc.text(id).trim().parse().ok())
        .collect();

    let times: Vec<DateTime<Utc>> = parsed
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .filter_map(|point| point.time.as_ref())
        .filter_map(|time| time.format().ok())
        .filter_map(|text| DateTime::parse_from_rfc3339(&text).ok())
        .map(|time| time.with_timezone(&Utc))
        .collect();

    let summary = TrackSummary {
        creator: parsed.creator.clone(),
        tracks: parsed.tracks.len(),
        segments: parsed.tracks.iter().map(|t| t.segments.len()).sum(),
        points: parsed
            .tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .map(|s| s.points.len())
            .sum(),
        first_time: times.iter().min().copied(),
        last_time: times.iter().max().copied(),
        heart_rates: rates.len(),
        min_heart_rate: rates.iter().min().copied(),
        max_heart_rate: rates.iter().max().copied(),
    };

    tracing::debug!(?summary, "GPX summarized");
    Ok(summary)
}
