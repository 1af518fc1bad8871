//! Automatic image annotation against a remote object detector.
//!
//! Given an image on disk, the pipeline sniffs its media type, posts the raw
//! bytes to a detection service, decodes the returned detection list and
//! writes a label file with one center-form box per line:
//!
//! ```text
//! class_index center_x center_y width height
//! ```
//!
//! # Module Structure
//!
//! - `sniff`: media type detection from magic bytes
//! - `client`: the `InferenceClient` seam and its HTTP implementation
//! - `detect`: detection types and response decoding
//! - `labels`: label file rendering, writing and reading
//! - `pipeline`: single-image orchestration and background jobs
//! - `config`: file + environment configuration for the binaries
//!
//! Every stage reports failures as [`AnnotateError`]. A failed run never
//! opens the label file.

pub mod client;
pub mod config;
pub mod detect;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod sniff;

pub use client::{HttpClientOptions, HttpInferenceClient, InferenceClient};
pub use config::AnnotatorConfig;
pub use detect::{Detection, DetectionList, DetectionParser, InferenceResult, MissingFields};
pub use error::{AnnotateError, AnnotateResult, ErrorKind};
pub use labels::{read_labels, render_labels, LabelRecord, LabelWriter, NumberFormat};
pub use pipeline::{
    annotate_image, auto_annotate, auto_annotate_with, label_path_for, AnnotateJob, AnnotateMode,
    Outcome,
};
pub use sniff::{sniff, MediaGuess};
