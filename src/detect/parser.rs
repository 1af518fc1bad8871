//! Detection response decoding.
//!
//! The service answers with
//! `{ "detections": [ { "class_index", "left", "top", "width", "height" }, ... ] }`.
//!
//! Only a body that is not valid JSON fails the parse outright. A missing or
//! non-array `detections` entry means zero detections, and array elements
//! that are not objects (or carry unusable values) are skipped.

use serde_json::{Map, Value};

use super::result::{Detection, DetectionList, InferenceResult, MissingFields};
use crate::error::{AnnotateError, AnnotateResult};

const DETECTIONS_KEY: &str = "detections";

/// Decodes inference responses into detection lists.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetectionParser {
    missing_fields: MissingFields,
}

enum Field<T> {
    Present(T),
    Missing,
    Invalid,
}

impl DetectionParser {
    pub fn new(missing_fields: MissingFields) -> Self {
        Self { missing_fields }
    }

    /// Decode a response body into the detections it carries.
    pub fn parse(&self, body: &[u8]) -> AnnotateResult<DetectionList> {
        self.parse_response(body).map(InferenceResult::into_detections)
    }

    /// Decode a response body, keeping the raw JSON next to the detections.
    pub fn parse_response(&self, body: &[u8]) -> AnnotateResult<InferenceResult> {
        let raw = decode_json(body)?;
        let detections = self.extract(&raw)?;
        Ok(InferenceResult::new(raw, detections))
    }

    /// Pull the detection list out of an already decoded response.
    pub fn extract(&self, value: &Value) -> AnnotateResult<DetectionList> {
        let Some(object) = value.as_object() else {
            log::warn!("response is not a JSON object; treating as zero detections");
            return Ok(DetectionList::new());
        };
        let entries = match object.get(DETECTIONS_KEY) {
            None => {
                log::debug!("response has no '{}' key", DETECTIONS_KEY);
                return Ok(DetectionList::new());
            }
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                log::warn!("'{}' is not an array; treating as empty", DETECTIONS_KEY);
                return Ok(DetectionList::new());
            }
        };

        let mut detections = DetectionList::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let Some(fields) = entry.as_object() else {
                log::warn!("detection {}: not an object, skipped", index);
                continue;
            };
            if let Some(detection) = self.detection_from(index, fields)? {
                detections.push(detection);
            }
        }
        Ok(detections)
    }

    fn detection_from(
        &self,
        index: usize,
        fields: &Map<String, Value>,
    ) -> AnnotateResult<Option<Detection>> {
        let Some(class_index) = self.resolve(index, "class_index", class_field(fields))? else {
            return Ok(None);
        };
        let mut coords = [0.0f64; 4];
        for (slot, key) in coords.iter_mut().zip(["left", "top", "width", "height"]) {
            match self.resolve(index, key, float_field(fields, key))? {
                Some(value) => *slot = value,
                None => return Ok(None),
            }
        }
        let [left, top, width, height] = coords;
        Ok(Some(Detection {
            class_index,
            left,
            top,
            width,
            height,
        }))
    }

    /// `Ok(None)` means the element should be skipped.
    fn resolve<T: Default>(
        &self,
        index: usize,
        key: &str,
        field: Field<T>,
    ) -> AnnotateResult<Option<T>> {
        match field {
            Field::Present(value) => Ok(Some(value)),
            Field::Invalid => {
                log::warn!("detection {}: unusable '{}' value, skipped", index, key);
                Ok(None)
            }
            Field::Missing => match self.missing_fields {
                MissingFields::Zero => {
                    log::warn!("detection {}: missing '{}', using 0", index, key);
                    Ok(Some(T::default()))
                }
                MissingFields::Reject => Err(AnnotateError::parse(format!(
                    "detection {}: missing field '{}'",
                    index, key
                ))),
            },
        }
    }
}

/// Decode a body as JSON. Empty bodies are rejected.
pub fn decode_json(body: &[u8]) -> AnnotateResult<Value> {
    if body.is_empty() {
        return Err(AnnotateError::parse("empty response body"));
    }
    serde_json::from_slice(body).map_err(|e| AnnotateError::parse(format!("invalid JSON: {}", e)))
}

fn class_field(fields: &Map<String, Value>) -> Field<u32> {
    let Some(value) = fields.get("class_index") else {
        return Field::Missing;
    };
    if let Some(index) = value.as_u64() {
        return u32::try_from(index).map_or(Field::Invalid, Field::Present);
    }
    // Integral floats such as 3.0 are accepted.
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
            Field::Present(f as u32)
        }
        Some(_) => Field::Invalid,
        None if value.is_null() => Field::Missing,
        None => Field::Invalid,
    }
}

fn float_field(fields: &Map<String, Value>, key: &str) -> Field<f64> {
    match fields.get(key) {
        None | Some(Value::Null) => Field::Missing,
        Some(value) => value.as_f64().map_or(Field::Invalid, Field::Present),
    }
}
