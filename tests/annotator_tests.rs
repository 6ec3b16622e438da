//! Integration tests for heart-rate injection into uploaded GPX files

use gpxhr::document::GpxDocument;
use gpxhr::models::{GPX_NAMESPACE, TRACKPOINT_EXTENSION_NAMESPACE};
use gpxhr::{annotate, GaussianNoise, GpxHrError, ParseError, ScriptedNoise, TrackAnnotator};
use std::io::Cursor;

const RECORDED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" creator="StravaGPX" version="1.1">
 <metadata>
  <time>2024-06-03T17:30:00Z</time>
 </metadata>
 <trk>
  <name>Evening Ride</name>
  <type>cycling</type>
  <trkseg>
   <trkpt lat="49.4278090" lon="1.1038437">
    <ele>21.4</ele>
    <time>2024-06-03T17:30:00Z</time>
   </trkpt>
   <trkpt lat="49.4279010" lon="1.1039800">
    <ele>21.6</ele>
    <time>2024-06-03T17:30:05Z</time>
   </trkpt>
   <trkpt lat="49.4280150" lon="1.1041120">
    <ele>21.9</ele>
    <time>2024-06-03T17:30:10Z</time>
   </trkpt>
  </trkseg>
 </trk>
</gpx>
"#;

const ROUTE_ONLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" creator="planner" version="1.1">
 <metadata>
  <name>Planned loop</name>
  <time>2024-06-01T08:00:00Z</time>
 </metadata>
 <rte>
  <rtept lat="49.1" lon="1.1"/>
  <rtept lat="49.2" lon="1.2"/>
 </rte>
</gpx>
"#;

fn element_ids(doc: &GpxDocument, namespace: &str, local: &str) -> Vec<gpxhr::NodeId> {
    doc.descendant_elements(doc.root())
        .into_iter()
        .filter(|&id| doc.is_element(id, namespace, local))
        .collect()
}

#[test]
fn test_three_track_points_one_metadata_time() {
    let xml = annotate(RECORDED, 142, 0.8, &mut GaussianNoise::seeded(3)).unwrap();
    let doc = GpxDocument::parse_str(&xml).unwrap();

    let extensions = element_ids(&doc, GPX_NAMESPACE, "extensions");
    assert_eq!(extensions.len(), 3);

    let times = element_ids(&doc, GPX_NAMESPACE, "time");
    assert_eq!(times.len(), 4);

    // metadata timestamp: next sibling is whitespace, never an extension
    let after_metadata_time = doc.next_sibling(times[0]);
    assert!(after_metadata_time
        .map(|id| doc.element(id).is_none())
        .unwrap_or(true));

    for (&time, &extension) in times[1..].iter().zip(&extensions) {
        assert_eq!(doc.next_sibling(time), Some(extension));
        assert_eq!(doc.parent(time), doc.parent(extension));
    }

    let rates = element_ids(&doc, TRACKPOINT_EXTENSION_NAMESPACE, "hr");
    assert_eq!(rates.len(), 3);
    for id in rates {
        assert!(doc.text(id).parse::<i32>().is_ok());
    }
}

#[test]
fn test_document_without_track_points_round_trips() {
    let xml = annotate(ROUTE_ONLY, 142, 0.8, &mut ScriptedNoise::silent()).unwrap();

    assert_eq!(xml, ROUTE_ONLY);
    assert!(GpxDocument::parse_str(&xml).is_ok());
}

#[test]
fn test_missing_namespace_produces_no_output() {
    let input = RECORDED.replace(r#" xmlns="http://www.topografix.com/GPX/1/1""#, "");
    let result = annotate(&input, 142, 0.8, &mut ScriptedNoise::silent());

    assert!(matches!(result, Err(GpxHrError::MissingNamespace)));
}

#[test]
fn test_malformed_upload_is_parse_error() {
    let truncated = &RECORDED[..RECORDED.len() / 2];
    let result = annotate(truncated, 142, 0.8, &mut ScriptedNoise::silent());
    assert!(matches!(result, Err(GpxHrError::Parse(_))));

    let annotator = TrackAnnotator::new(142, 0.8).unwrap();
    let result = annotator.annotate_bytes(&[0xff, 0xfe, 0x00], &mut ScriptedNoise::silent());
    assert!(matches!(
        result,
        Err(GpxHrError::Parse(ParseError::Encoding(_)))
    ));
}

#[test]
fn test_formatting_outside_insertions_preserved() {
    let xml = annotate(RECORDED, 150, 1.0, &mut ScriptedNoise::silent()).unwrap();

    let insertion = "<extensions><gpxtpx:TrackPointExtension \
                     xmlns:gpxtpx=\"http://www.garmin.com/xmlschemas/TrackPointExtension/v1\">\
                     <gpxtpx:hr>150</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions>";
    assert_eq!(xml.replace(insertion, ""), RECORDED);
    assert_eq!(xml.matches(insertion).count(), 3);
}

#[test]
fn test_reader_input_and_in_place_mutation() {
    let annotator = TrackAnnotator::new(140, 1.0).unwrap();
    let xml = annotator
        .annotate_reader(Cursor::new(RECORDED.as_bytes()), &mut ScriptedNoise::new(vec![5.0]))
        .unwrap();
    assert!(xml.contains("<gpxtpx:hr>145</gpxtpx:hr>"));

    let mut doc = GpxDocument::parse_str(RECORDED).unwrap();
    let report = annotator
        .annotate_document(&mut doc, &mut ScriptedNoise::silent())
        .unwrap();
    assert_eq!(report.inserted, 3);
    assert_eq!(report.skipped_metadata, 1);
    assert_eq!(element_ids(&doc, GPX_NAMESPACE, "extensions").len(), 3);
}

#[test]
fn test_annotating_twice_appends_again() {
    let annotator = TrackAnnotator::new(140, 0.8).unwrap();
    let once = annotator
        .annotate_str(RECORDED, &mut ScriptedNoise::silent())
        .unwrap();
    let twice = annotator
        .annotate_str(&once, &mut ScriptedNoise::silent())
        .unwrap();

    let doc = GpxDocument::parse_str(&twice).unwrap();
    assert_eq!(element_ids(&doc, GPX_NAMESPACE, "extensions").len(), 6);
}
