//! Label files.
//!
//! One record per line, space separated:
//! `class_index center_x center_y width height`, boxes in center form.
//! No header and no trailing metadata. A run always regenerates the whole
//! file; an empty detection list yields an empty file.

mod number;

use std::path::Path;

use crate::detect::Detection;
use crate::error::{AnnotateError, AnnotateResult};

pub use number::NumberFormat;

/// One line of a label file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelRecord {
    pub class_index: u32,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl LabelRecord {
    pub fn to_line(&self, format: NumberFormat) -> String {
        format!(
            "{} {} {} {} {}",
            self.class_index,
            format.format(self.center_x),
            format.format(self.center_y),
            format.format(self.width),
            format.format(self.height)
        )
    }

    /// Parse one record. `line_no` is 1-based and only used in errors.
    pub fn parse_line(line: &str, line_no: usize) -> AnnotateResult<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(AnnotateError::parse(format!(
                "line {}: expected 5 fields, found {}",
                line_no,
                fields.len()
            )));
        }
        let class_index = fields[0].parse::<u32>().map_err(|e| {
            AnnotateError::parse(format!("line {}: bad class index '{}': {}", line_no, fields[0], e))
        })?;
        let mut values = [0.0f64; 4];
        for (slot, raw) in values.iter_mut().zip(&fields[1..]) {
            *slot = raw.parse::<f64>().map_err(|e| {
                AnnotateError::parse(format!("line {}: bad number '{}': {}", line_no, raw, e))
            })?;
        }
        let [center_x, center_y, width, height] = values;
        Ok(Self {
            class_index,
            center_x,
            center_y,
            width,
            height,
        })
    }
}

impl From<&Detection> for LabelRecord {
    fn from(detection: &Detection) -> Self {
        Self {
            class_index: detection.class_index,
            center_x: detection.center_x(),
            center_y: detection.center_y(),
            width: detection.width,
            height: detection.height,
        }
    }
}

/// Render detections as label file text, newline-terminated, in order.
pub fn render_labels(detections: &[Detection], format: NumberFormat) -> String {
    let mut out = String::new();
    for detection in detections {
        out.push_str(&LabelRecord::from(detection).to_line(format));
        out.push('\n');
    }
    out
}

/// Writes detection lists to label files.
#[derive(Clone, Copy, Debug, Default)]
pub struct LabelWriter {
    format: NumberFormat,
}

impl LabelWriter {
    pub fn new(format: NumberFormat) -> Self {
        Self { format }
    }

    /// Replace `path` with the records for `detections`.
    ///
    /// The full text is rendered before the file is opened, so a failure
    /// during conversion never leaves a truncated file behind. Returns the
    /// number of records written.
    pub fn write(&self, path: &Path, detections: &[Detection]) -> AnnotateResult<usize> {
        let text = render_labels(detections, self.format);
        std::fs::write(path, text).map_err(|e| AnnotateError::io(path, e))?;
        log::info!(
            "wrote {} label record(s) to {}",
            detections.len(),
            path.display()
        );
        Ok(detections.len())
    }
}

/// Load a label file back. Blank lines are ignored.
pub fn read_labels(path: &Path) -> AnnotateResult<Vec<LabelRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| AnnotateError::io(path, e))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| LabelRecord::parse_line(line, index + 1))
        .collect()
}
