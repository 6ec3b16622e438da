// Library interface for gpxhr modules
// This allows integration tests to access the core functionality

pub mod annotator;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod generator;
pub mod inspect;
pub mod logging;
pub mod models;
pub mod noise;
pub mod session;
pub mod smoothing;

// Re-export commonly used types for convenience
pub use annotator::{annotate, AnnotationReport, TrackAnnotator};
pub use config::AppConfig;
pub use document::{GpxDocument, NodeId};
pub use error::{GpxHrError, ParseError, Result};
pub use export::{GpxOutput, OutputKind};
pub use generator::{generate, GeneratorSettings, SessionRequest, TrackGenerator};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{EndpointPolicy, HeartRate, TrackPoint};
pub use noise::{GaussianNoise, NoiseSource, ScriptedNoise};
pub use session::TimezonePolicy;
pub use smoothing::{smooth, HrSmoother};
