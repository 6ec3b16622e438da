//! Heart-rate injection into existing GPX tracks
//!
//! Every `<time>` element of the document's default namespace, except the one
//! directly under `<metadata>`, gets an `<extensions>` sibling right after it
//! carrying a Garmin `TrackPointExtension` heart rate.

use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::document::{Element, GpxDocument, NodeId, NodeKind};
use crate::error::{GpxHrError, Result};
use crate::models::{
    HeartRate, DEFAULT_ALPHA, DEFAULT_NOISE_STD_DEV, TRACKPOINT_EXTENSION_NAMESPACE,
    TRACKPOINT_EXTENSION_PREFIX,
};
use crate::noise::NoiseSource;
use crate::smoothing::{validate_alpha, validate_std_dev, HrSmoother};

/// What one annotation pass did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationReport {
    /// Extension blocks inserted, one per track-point timestamp
    pub inserted: usize,

    /// Timestamps left alone because they belong to `<metadata>`
    pub skipped_metadata: usize,

    /// Heart rates written, in document order
    pub heart_rates: Vec<HeartRate>,
}

/// Annotates GPX documents with smoothed heart rates
#[derive(Debug, Clone)]
pub struct TrackAnnotator {
    base_hr: HeartRate,
    alpha: f64,
    noise_std_dev: f64,
}

impl TrackAnnotator {
    pub fn new(base_hr: HeartRate, alpha: f64) -> Result<Self> {
        Ok(Self {
            base_hr,
            alpha: validate_alpha(alpha)?,
            noise_std_dev: DEFAULT_NOISE_STD_DEV,
        })
    }

    pub fn with_noise_std_dev(mut self, std_dev: f64) -> Result<Self> {
        self.noise_std_dev = validate_std_dev(std_dev)?;
        Ok(self)
    }

    /// Insert heart-rate extensions into `doc` in place.
    ///
    /// Fails with [`GpxHrError::MissingNamespace`] before touching the tree
    /// when the root declares no default namespace.
    #[instrument(skip_all, fields(base_hr = self.base_hr, alpha = self.alpha))]
    pub fn annotate_document<N: NoiseSource + ?Sized>(
        &self,
        doc: &mut GpxDocument,
        noise: &mut N,
    ) -> Result<AnnotationReport> {
        let namespace = match doc.default_namespace() {
            Some(namespace) => namespace.to_string(),
            None => {
                warn!("Uploaded document has no default namespace");
                return Err(GpxHrError::MissingNamespace);
            }
        };

        let timestamps: Vec<NodeId> = doc
            .descendant_elements(doc.root())
            .into_iter()
            .filter(|&id| doc.is_element(id, &namespace, "time"))
            .collect();
        debug!(count = timestamps.len(), %namespace, "Located timestamp elements");

        let mut report = AnnotationReport::default();
        let mut smoother = HrSmoother::new(self.base_hr, self.alpha, self.noise_std_dev);

        for time in timestamps {
            let in_metadata = doc
                .parent(time)
                .map(|parent| doc.is_element(parent, &namespace, "metadata"))
                .unwrap_or(false);
            if in_metadata {
                report.skipped_metadata += 1;
                continue;
            }

            let heart_rate = smoother.sample(&mut *noise);
            let extensions = build_extension(doc, time, heart_rate);
            doc.insert_sibling_after(time, extensions)?;

            report.inserted += 1;
            report.heart_rates.push(heart_rate);
        }

        info!(
            inserted = report.inserted,
            skipped_metadata = report.skipped_metadata,
            "Heart-rate extensions inserted"
        );
        Ok(report)
    }

    /// Parse, annotate and serialize a document held in a string
    pub fn annotate_str<N: NoiseSource + ?Sized>(
        &self,
        input: &str,
        noise: &mut N,
    ) -> Result<String> {
        let mut doc = GpxDocument::parse_str(input)?;
        self.annotate_document(&mut doc, noise)?;
        doc.to_xml_string()
    }

    /// Parse, annotate and serialize an uploaded byte buffer
    pub fn annotate_bytes<N: NoiseSource + ?Sized>(
        &self,
        input: &[u8],
        noise: &mut N,
    ) -> Result<String> {
        let mut doc = GpxDocument::parse_bytes(input)?;
        self.annotate_document(&mut doc, noise)?;
        doc.to_xml_string()
    }

    /// Parse, annotate and serialize a stream
    pub fn annotate_reader<R: Read, N: NoiseSource + ?Sized>(
        &self,
        reader: R,
        noise: &mut N,
    ) -> Result<String> {
        let mut doc = GpxDocument::parse_reader(reader)?;
        self.annotate_document(&mut doc, noise)?;
        doc.to_xml_string()
    }
}

impl Default for TrackAnnotator {
    fn default() -> Self {
        Self {
            base_hr: 142,
            alpha: DEFAULT_ALPHA,
            noise_std_dev: DEFAULT_NOISE_STD_DEV,
        }
    }
}

/// Annotate a GPX document held in a string with default noise spread
pub fn annotate<N: NoiseSource + ?Sized>(
    input: &str,
    base_hr: HeartRate,
    alpha: f64,
    noise: &mut N,
) -> Result<String> {
    TrackAnnotator::new(base_hr, alpha)?.annotate_str(input, noise)
}

/// Build a detached `<extensions>` subtree for the timestamp at `time`.
///
/// `extensions` reuses the timestamp's own prefix so it lands in the same
/// namespace. The vendor prefix is reused when one is already bound to the
/// TrackPointExtension URI; otherwise it is declared locally.
fn build_extension(doc: &mut GpxDocument, time: NodeId, heart_rate: HeartRate) -> NodeId {
    let gpx_prefix = doc
        .element(time)
        .and_then(|element| element.prefix())
        .map(str::to_string);
    let vendor_prefix = doc.lookup_prefix(time, TRACKPOINT_EXTENSION_NAMESPACE);

    let qualify = |prefix: Option<&str>, local: &str| match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    };

    let extensions = doc.create(NodeKind::Element(Element::new(qualify(
        gpx_prefix.as_deref(),
        "extensions",
    ))));

    let prefix = vendor_prefix
        .as_deref()
        .unwrap_or(TRACKPOINT_EXTENSION_PREFIX);
    let mut container = Element::new(qualify(Some(prefix), "TrackPointExtension"));
    if vendor_prefix.is_none() {
        container = container.with_attribute(
            format!("xmlns:{}", TRACKPOINT_EXTENSION_PREFIX),
            TRACKPOINT_EXTENSION_NAMESPACE,
        );
    }
    let container = doc.create(NodeKind::Element(container));

    let hr = doc.create_text_element(
        Element::new(qualify(Some(prefix), "hr")),
        &heart_rate.to_string(),
    );

    doc.append_child(container, hr);
    doc.append_child(extensions, container);
    extensions
}
