use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{GpxHrError, Result};
use crate::models::{
    TrackPoint, GPX_EXTENSIONS_NAMESPACE, GPX_NAMESPACE, TRACKPOINT_EXTENSION_NAMESPACE,
    XSI_NAMESPACE,
};

/// Header fields of a generated document
#[derive(Debug, Clone, PartialEq)]
pub struct GpxHeader {
    pub creator: String,
    pub track_name: String,
}

impl Default for GpxHeader {
    fn default() -> Self {
        Self {
            creator: "Generated GPX".to_string(),
            track_name: "Generated".to_string(),
        }
    }
}

/// Writes a single-track, single-segment GPX 1.1 document
pub struct GpxExporter;

impl GpxExporter {
    pub fn generate_gpx_xml(header: &GpxHeader, points: &[TrackPoint]) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
        writer.write_event(Event::Text(BytesText::new("\n")))?;

        let mut gpx = BytesStart::new("gpx");
        gpx.push_attribute(("xmlns", GPX_NAMESPACE));
        gpx.push_attribute(("xmlns:gpxtpx", TRACKPOINT_EXTENSION_NAMESPACE));
        gpx.push_attribute(("xmlns:gpxx", GPX_EXTENSIONS_NAMESPACE));
        gpx.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        gpx.push_attribute(("creator", header.creator.as_str()));
        gpx.push_attribute(("version", "1.1"));
        writer.write_event(Event::Start(gpx))?;

        writer.write_event(Event::Start(BytesStart::new("trk")))?;
        Self::write_text_element(&mut writer, "name", &header.track_name)?;

        if points.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new("trkseg")))?;
        } else {
            writer.write_event(Event::Start(BytesStart::new("trkseg")))?;
            for point in points {
                Self::write_track_point(&mut writer, point)?;
            }
            writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("trk")))?;
        writer.write_event(Event::End(BytesEnd::new("gpx")))?;

        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|err| GpxHrError::Serialization(err.to_string()))
    }

    fn write_track_point<W: Write>(writer: &mut Writer<W>, point: &TrackPoint) -> Result<()> {
        let latitude = point.position.latitude.to_string();
        let longitude = point.position.longitude.to_string();

        let mut trkpt = BytesStart::new("trkpt");
        trkpt.push_attribute(("lat", latitude.as_str()));
        trkpt.push_attribute(("lon", longitude.as_str()));
        writer.write_event(Event::Start(trkpt))?;

        Self::write_text_element(writer, "time", &point.timestamp())?;

        writer.write_event(Event::Start(BytesStart::new("extensions")))?;
        writer.write_event(Event::Start(BytesStart::new("gpxtpx:TrackPointExtension")))?;
        Self::write_text_element(writer, "gpxtpx:hr", &point.heart_rate.to_string())?;
        writer.write_event(Event::End(BytesEnd::new("gpxtpx:TrackPointExtension")))?;
        writer.write_event(Event::End(BytesEnd::new("extensions")))?;

        writer.write_event(Event::End(BytesEnd::new("trkpt")))?;
        Ok(())
    }

    fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use chrono::{TimeZone, Utc};

    fn sample_points() -> Vec<TrackPoint> {
        (0..2)
            .map(|i| TrackPoint {
                time: Utc.with_ymd_and_hms(2024, 6, 3, 19, 30 + i, 0).unwrap(),
                position: Coordinates::default(),
                heart_rate: 140 + i as i32,
            })
            .collect()
    }

    #[test]
    fn writes_namespaces_and_points() {
        let xml = GpxExporter::generate_gpx_xml(&GpxHeader::default(), &sample_points()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>"));
        assert!(xml.contains(r#"xmlns="http://www.topografix.com/GPX/1/1""#));
        assert!(xml.contains(
            r#"xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1""#
        ));
        assert!(xml.contains(r#"<trkpt lat="49.427809" lon="1.1038437">"#));
        assert!(xml.contains("<time>2024-06-03T19:31:00Z</time>"));
        assert!(xml.contains("<gpxtpx:hr>141</gpxtpx:hr>"));
        assert_eq!(xml.matches("<trkpt ").count(), 2);
    }

    #[test]
    fn empty_segment_is_self_closing() {
        let header = GpxHeader {
            creator: "test".to_string(),
            track_name: "Empty".to_string(),
        };
        let xml = GpxExporter::generate_gpx_xml(&header, &[]).unwrap();

        assert!(xml.contains("<trkseg/>"));
        assert!(xml.contains("<name>Empty</name>"));
        assert!(!xml.contains("<trkpt"));
    }
}
