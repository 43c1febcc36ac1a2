//! Typed domain model for a generated metaphor.
//!
//! Field names mirror the JSON schema the generation prompt demands, so the
//! model round-trips through `serde_json` without renames. Nested fields are
//! `#[serde(default)]`: the parser only guarantees top-level key presence
//! (see [`crate::metaphor::parse`]), and sparsely filled steps are accepted
//! rather than rejected.

/// Literal reading of the user's situation (step 1 of the prompt contract).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Step1 {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub pressure: String,
    #[serde(default)]
    pub conflict: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub emotion: String,
}

/// The object's causal rule and its two situational mappings.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Mechanic {
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub x_maps_to: String,
    #[serde(default)]
    pub y_maps_to: String,
}

/// The selected quote. `line2` is empty for single-line quotes.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuoteLines {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
}

impl QuoteLines {
    /// Lines actually set, in order. An empty `line2` yields a single line.
    pub fn lines(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(2);
        if !self.line1.trim().is_empty() {
            out.push(self.line1.as_str());
        }
        if !self.line2.trim().is_empty() {
            out.push(self.line2.as_str());
        }
        out
    }
}

/// Validated output of the generation step.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetaphorResult {
    #[serde(default)]
    pub step1: Step1,
    #[serde(default)]
    pub step2_object: String,
    #[serde(default)]
    pub step3_mechanic: Mechanic,
    #[serde(default)]
    pub step4_quotes: Vec<String>,
    #[serde(default)]
    pub step4_best: QuoteLines,
    #[serde(default)]
    pub step5_visual: String,
    #[serde(default)]
    pub step5_dalle_prompt: String,
}

/// Outcome of parsing model output: exactly one of the two variants.
#[derive(Clone, Debug, PartialEq)]
pub enum MetaphorResponse {
    Metaphor(MetaphorResult),
    /// The model declined to produce a metaphor; a valid "no result"
    /// outcome, not an error.
    Rejection(String),
}

impl MetaphorResponse {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejection(_))
    }

    pub fn metaphor(&self) -> Option<&MetaphorResult> {
        match self {
            Self::Metaphor(m) => Some(m),
            Self::Rejection(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_lines_drop_empty_second_line() {
        let q = QuoteLines {
            line1: "The anchor holds the ship.".to_string(),
            line2: String::new(),
        };
        assert_eq!(q.lines(), vec!["The anchor holds the ship."]);
    }

    #[test]
    fn quote_lines_keep_both_when_set() {
        let q = QuoteLines {
            line1: "a".to_string(),
            line2: "b".to_string(),
        };
        assert_eq!(q.lines().len(), 2);
    }

    #[test]
    fn result_roundtrips_through_json() {
        let m = MetaphorResult {
            step2_object: "Candle".to_string(),
            step4_quotes: vec!["q1".into(), "q2".into(), "q3".into()],
            ..MetaphorResult::default()
        };
        let s = serde_json::to_string(&m).unwrap();
        let de: MetaphorResult = serde_json::from_str(&s).unwrap();
        assert_eq!(de, m);
    }

    #[test]
    fn sparse_nested_objects_deserialize() {
        // Top-level keys present, nested content partial: the model's
        // adherence to nested fields is trusted, not enforced.
        let raw = r#"{
            "step1": {"subject": "s"},
            "step2_object": "Ladder",
            "step3_mechanic": {},
            "step4_quotes": [],
            "step4_best": {"line1": "x"},
            "step5_visual": "",
            "step5_dalle_prompt": ""
        }"#;
        let de: MetaphorResult = serde_json::from_str(raw).unwrap();
        assert_eq!(de.step2_object, "Ladder");
        assert_eq!(de.step1.pressure, "");
    }
}
