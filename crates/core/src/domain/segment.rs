use serde::{Deserialize, Serialize};

/// A time-aligned text unit produced by the ASR adapter and augmented by the
/// translator engine. `index` is 0-based and contiguous within an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "id")]
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub translation: Option<String>,
}

impl Segment {
    #[must_use]
    pub const fn new(index: u32, start: f64, end: f64, text: String) -> Self {
        Self {
            index,
            start,
            end,
            text,
            translation: None,
        }
    }

    /// `0 ≤ start ≤ end` — invariant 1 from the testable-properties section.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.start >= 0.0 && self.start <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_id_start_end_text_translation_keys() {
        let mut seg = Segment::new(0, 0.0, 1.5, "hello".to_string());
        seg.translation = Some("你好".to_string());
        let value = serde_json::to_value(&seg).unwrap();
        assert_eq!(value["id"], 0);
        assert_eq!(value["start"], 0.0);
        assert_eq!(value["end"], 1.5);
        assert_eq!(value["text"], "hello");
        assert_eq!(value["translation"], "你好");
    }

    #[test]
    fn rejects_end_before_start() {
        let seg = Segment::new(0, 2.0, 1.0, "x".to_string());
        assert!(!seg.is_well_formed());
    }
}
