//! Analysis request model and body validation.

use crate::error::AnalysisError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Requested report shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    SectionDeepDive,
    FullReport,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::SectionDeepDive => "section_deep_dive",
            Mode::FullReport => "full_report",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "section_deep_dive" => Ok(Mode::SectionDeepDive),
            "full_report" => Ok(Mode::FullReport),
            other => Err(AnalysisError::UnsupportedMode(format!("{:?}", other))),
        }
    }
}

/// A validated analysis request.
///
/// `bta_payload` is opaque: it is forwarded to generation exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub mode: Mode,
    pub section_id: Option<String>,
    pub bta_payload: Value,
}

impl AnalysisRequest {
    /// Validate a raw request body.
    ///
    /// Checks run in a fixed order so the same body always yields the same
    /// classification: JSON syntax, presence of `mode` and `bta_payload`,
    /// known mode, then `section_id` for deep dives.
    pub fn from_slice(body: &[u8]) -> Result<Self, AnalysisError> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| AnalysisError::InvalidBody(e.to_string()))?;

        // Arrays, scalars and `null` have no fields to read.
        let mut fields = match document {
            Value::Object(fields) => fields,
            _ => return Err(AnalysisError::MissingField),
        };

        let mode = take_present(&mut fields, "mode");
        let bta_payload = take_present(&mut fields, "bta_payload");
        let (mode, bta_payload) = match (mode, bta_payload) {
            (Some(mode), Some(bta_payload)) => (mode, bta_payload),
            _ => return Err(AnalysisError::MissingField),
        };

        let mode = match mode {
            Value::String(s) => s.parse::<Mode>()?,
            other => return Err(AnalysisError::UnsupportedMode(other.to_string())),
        };

        let section_id = match fields.remove("section_id") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };

        if mode == Mode::SectionDeepDive && section_id.is_none() {
            return Err(AnalysisError::MissingSectionId);
        }

        Ok(Self {
            mode,
            section_id,
            bta_payload,
        })
    }
}

/// Remove `key` if its value counts as supplied. `null`, `false`, `0` and
/// `""` count as absent; empty objects and arrays are supplied.
fn take_present(fields: &mut Map<String, Value>, key: &str) -> Option<Value> {
    fields.remove(key).filter(|value| match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<AnalysisRequest, AnalysisError> {
        AnalysisRequest::from_slice(value.to_string().as_bytes())
    }

    #[test]
    fn accepts_full_report() {
        let request = parse(json!({"mode": "full_report", "bta_payload": {"score": 42}})).unwrap();

        assert_eq!(request.mode, Mode::FullReport);
        assert_eq!(request.section_id, None);
        assert_eq!(request.bta_payload, json!({"score": 42}));
    }

    #[test]
    fn accepts_section_deep_dive_with_section() {
        let request = parse(json!({
            "mode": "section_deep_dive",
            "section_id": "sleep",
            "bta_payload": {}
        }))
        .unwrap();

        assert_eq!(request.mode, Mode::SectionDeepDive);
        assert_eq!(request.section_id.as_deref(), Some("sleep"));
    }

    #[test]
    fn malformed_json_is_invalid_body() {
        let err = AnalysisRequest::from_slice(b"{\"mode\": ").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBody(_)));

        let err = AnalysisRequest::from_slice(b"").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBody(_)));
    }

    #[test]
    fn missing_mode_or_payload() {
        for body in [
            json!({"bta_payload": {}}),
            json!({"mode": "full_report"}),
            json!({"mode": "", "bta_payload": {}}),
            json!({"mode": "full_report", "bta_payload": null}),
            json!([1, 2, 3]),
            json!("full_report"),
            Value::Null,
        ] {
            let err = parse(body.clone()).unwrap_err();
            assert!(matches!(err, AnalysisError::MissingField), "{}", body);
        }
    }

    #[test]
    fn deep_dive_requires_non_blank_section() {
        for section in [None, Some(json!("")), Some(json!("   ")), Some(json!(7))] {
            let mut body = json!({"mode": "section_deep_dive", "bta_payload": {}});
            if let Some(section) = section {
                body["section_id"] = section;
            }
            let err = parse(body.clone()).unwrap_err();
            assert!(matches!(err, AnalysisError::MissingSectionId), "{}", body);
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = parse(json!({"mode": "weekly_digest", "bta_payload": {}})).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedMode(ref m) if m == "\"weekly_digest\""));

        let err = parse(json!({"mode": 3, "bta_payload": {}})).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedMode(ref m) if m == "3"));
    }

    #[test]
    fn missing_field_wins_over_unknown_mode() {
        let err = parse(json!({"mode": "weekly_digest"})).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingField));
    }

    #[test]
    fn full_report_keeps_optional_section() {
        let request = parse(json!({
            "mode": "full_report",
            "section_id": "cardio",
            "bta_payload": {"a": 1}
        }))
        .unwrap();

        assert_eq!(request.section_id.as_deref(), Some("cardio"));
    }

    #[test]
    fn classification_is_stable_across_resubmission() {
        let body = br#"{"mode":"section_deep_dive","bta_payload":{"x":1}}"#;
        let kinds: Vec<_> = (0..3)
            .map(|_| AnalysisRequest::from_slice(body).unwrap_err().kind())
            .collect();

        assert_eq!(kinds, vec!["missing_section_id"; 3]);
    }
}
