//! Response parsing for assessor output.
//!
//! The expected shape is a JSON object:
//!
//! ```text
//! {
//!   "truth": 0.1,
//!   "indeterminacy": 0.2,
//!   "falsehood": 0.8,
//!   "reasoning": "...",
//!   "patterns": ["optional", "cross-assessor observations"]
//! }
//! ```
//!
//! The object may be wrapped in a Markdown code fence. `justification`
//! is accepted in place of `reasoning`. Anything else is malformed.

use serde_json::{Map, Value};

use crate::assessment::{AssessorVerdict, Triple};
use crate::error::FailureKind;

/// Parses a raw assessor response into a verdict.
///
/// # Errors
///
/// Returns [`FailureKind::Malformed`] carrying the raw response when the
/// body is not a JSON object, a triple field is missing, non-numeric,
/// non-finite or outside `[0, 1]`, or the justification is missing.
pub fn parse_response(raw: &str) -> Result<AssessorVerdict, FailureKind> {
    let body = strip_code_fence(raw.trim());

    let value: Value = serde_json::from_str(body)
        .map_err(|e| FailureKind::malformed(raw, format!("not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| FailureKind::malformed(raw, "expected a JSON object"))?;

    let truth = bounded_field(object, "truth", raw)?;
    let indeterminacy = bounded_field(object, "indeterminacy", raw)?;
    let falsehood = bounded_field(object, "falsehood", raw)?;
    let triple = Triple::new(truth, indeterminacy, falsehood)
        .map_err(|e| FailureKind::malformed(raw, e.to_string()))?;

    let justification = object
        .get("reasoning")
        .or_else(|| object.get("justification"))
        .and_then(Value::as_str)
        .ok_or_else(|| FailureKind::malformed(raw, "missing string field 'reasoning'"))?
        .to_string();

    let patterns = match object.get("patterns") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| FailureKind::malformed(raw, "'patterns' must contain strings"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(FailureKind::malformed(raw, "'patterns' must be an array")),
    };

    Ok(AssessorVerdict {
        triple,
        justification,
        patterns,
    })
}

fn bounded_field(object: &Map<String, Value>, name: &str, raw: &str) -> Result<f64, FailureKind> {
    let value = object
        .get(name)
        .ok_or_else(|| FailureKind::malformed(raw, format!("missing field '{}'", name)))?
        .as_f64()
        .ok_or_else(|| FailureKind::malformed(raw, format!("field '{}' is not a number", name)))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(FailureKind::malformed(
            raw,
            format!("field '{}' out of range: {}", name, value),
        ));
    }
    Ok(value)
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_object() {
        let raw = r#"{"truth":0.2,"indeterminacy":0.1,"falsehood":0.8,"reasoning":"role reversal"}"#;
        let verdict = parse_response(raw).unwrap();
        assert!((verdict.triple.falsehood() - 0.8).abs() < f64::EPSILON);
        assert_eq!(verdict.justification, "role reversal");
        assert!(verdict.patterns.is_empty());
    }

    #[test]
    fn test_parse_fenced_object_with_patterns() {
        let raw = "```json\n{\"truth\":0.5,\"indeterminacy\":0.5,\"falsehood\":0.1,\
                   \"justification\":\"fine\",\"patterns\":[\"alpha softened\"]}\n```";
        let verdict = parse_response(raw).unwrap();
        assert_eq!(verdict.justification, "fine");
        assert_eq!(verdict.patterns, vec!["alpha softened".to_string()]);
    }

    #[test]
    fn test_missing_field_is_malformed_with_raw() {
        let raw = r#"{"truth":0.2,"falsehood":0.8,"reasoning":"x"}"#;
        match parse_response(raw) {
            Err(FailureKind::Malformed { raw: kept, detail }) => {
                assert_eq!(kept, raw);
                assert!(detail.contains("indeterminacy"));
            }
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_is_malformed() {
        let raw = r#"{"truth":0.2,"indeterminacy":0.1,"falsehood":1.8,"reasoning":"x"}"#;
        assert!(matches!(parse_response(raw), Err(FailureKind::Malformed { .. })));
    }

    #[test]
    fn test_non_numeric_is_malformed() {
        let raw = r#"{"truth":"high","indeterminacy":0.1,"falsehood":0.1,"reasoning":"x"}"#;
        assert!(matches!(parse_response(raw), Err(FailureKind::Malformed { .. })));
    }

    #[test]
    fn test_prose_is_malformed() {
        let raw = "I think this exchange is mostly fine.";
        assert!(matches!(parse_response(raw), Err(FailureKind::Malformed { .. })));
    }

    #[test]
    fn test_missing_reasoning_is_malformed() {
        let raw = r#"{"truth":0.2,"indeterminacy":0.1,"falsehood":0.1}"#;
        assert!(matches!(parse_response(raw), Err(FailureKind::Malformed { .. })));
    }

    #[test]
    fn test_bad_patterns_is_malformed() {
        let raw = r#"{"truth":0.2,"indeterminacy":0.1,"falsehood":0.1,"reasoning":"x","patterns":"one"}"#;
        assert!(matches!(parse_response(raw), Err(FailureKind::Malformed { .. })));
    }
}
