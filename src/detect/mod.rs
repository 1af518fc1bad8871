mod parser;
mod result;

pub use parser::{decode_json, DetectionParser};
pub use result::{Detection, DetectionList, InferenceResult, MissingFields};
