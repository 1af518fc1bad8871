use serde::Deserialize;
use serde_json::Value;

/// One object reported by the inference service, top-left anchored.
///
/// Coordinates are fractions of the image size as sent by the service; they
/// are not range-checked.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Detection {
    pub class_index: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Detection {
    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Detections in server response order.
pub type DetectionList = Vec<Detection>;

/// What to do when a detection object lacks one of its fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFields {
    /// Substitute zero and keep the detection.
    #[default]
    Zero,
    /// Fail the whole parse.
    Reject,
}

/// A decoded response: the JSON value as received plus the detections
/// extracted from it.
///
/// Owned by the call that produced it; dropping it releases the JSON tree.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceResult {
    raw: Value,
    detections: DetectionList,
}

impl InferenceResult {
    pub(crate) fn new(raw: Value, detections: DetectionList) -> Self {
        Self { raw, detections }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn into_detections(self) -> DetectionList {
        self.detections
    }
}
