//! Turns raw model output into a typed [`MetaphorResponse`].
//!
//! Model output is supposed to be a single JSON object, but in practice it
//! arrives wrapped in prose, markdown fences, or with copy/paste damage
//! (smart quotes, stray control bytes). The parser runs an ordered fallback
//! chain and only gives up when no balanced JSON object can be recovered:
//!
//! 1. direct parse of the trimmed input
//! 2. extraction of a fenced ``` block (optionally tagged `json`)
//! 3. sanitization (ASCII-only normalization, see [`sanitize`])
//! 4. string-aware brace matching from the first `{`
//!
//! Validation after any successful parse is shallow on purpose: a
//! `rejection` string short-circuits, otherwise the seven top-level keys
//! must be present. Nested field types are trusted to the prompt contract.

use crate::metaphor::model::{MetaphorResponse, MetaphorResult};

/// Required top-level keys of a full metaphor object.
const REQUIRED_KEYS: [&str; 7] = [
    "step1",
    "step2_object",
    "step3_mechanic",
    "step4_quotes",
    "step4_best",
    "step5_visual",
    "step5_dalle_prompt",
];

/// How many characters of the offending text travel with a parse failure.
const EXCERPT_CHARS: usize = 100;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("nothing to parse: input is empty")]
    Empty,

    #[error("no JSON object found in model output (near: {excerpt:?})")]
    NoJsonFound { excerpt: String },

    #[error("unclosed JSON object in model output (near: {excerpt:?})")]
    UnclosedObject { excerpt: String },

    #[error("model output is not valid JSON (near: {excerpt:?})")]
    Invalid { excerpt: String },

    #[error("model output is missing required fields: {}", missing.join(", "))]
    MissingFields { missing: Vec<&'static str> },
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Parse raw model output into a metaphor or a rejection.
#[tracing::instrument(skip_all)]
pub fn parse(raw: &str) -> Result<MetaphorResponse, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    // Stage 1: the model obeyed the "JSON only" instruction exactly.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return validate(value, trimmed);
    }

    // Stage 2: a fenced code block, optionally tagged `json`.
    let working = match extract_fenced(trimmed) {
        Some(inner) => {
            let inner = inner.trim();
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(inner) {
                return validate(value, inner);
            }
            inner
        }
        None => trimmed,
    };

    // Stages 3+4: normalize to printable ASCII, then recover the first
    // balanced object with a scanner that ignores braces inside strings.
    tracing::debug!("direct parse failed, falling back to brace matching");
    let clean = sanitize(working);
    let object = match scan_balanced_object(&clean) {
        Scan::Found(slice) => slice,
        Scan::NoObject => {
            return Err(ParseError::NoJsonFound {
                excerpt: excerpt(&clean),
            });
        }
        Scan::Unclosed => {
            return Err(ParseError::UnclosedObject {
                excerpt: excerpt(&clean),
            });
        }
    };

    match serde_json::from_str::<serde_json::Value>(object) {
        Ok(value) => validate(value, object),
        Err(_) => Err(ParseError::Invalid {
            excerpt: excerpt(object),
        }),
    }
}

/// Normalize pasted text to printable ASCII.
///
/// Line breaks (CRLF, CR, LF) and tabs become single spaces so JSON string
/// values survive terminal copy/paste; smart quotes, dashes, and the
/// ellipsis character get ASCII equivalents; control characters and all
/// remaining non-ASCII are dropped.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' | '\t' => out.push(' '),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            ' '..='~' => out.push(c),
            _ => {}
        }
    }
    out
}

/// Interior of the first triple-backtick block, if any.
fn extract_fenced(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let mut body = &text[open + 3..];
    // Optional language tag on the fence line.
    if let Some(rest) = body.strip_prefix("json") {
        body = rest;
    }
    let close = body.find("```")?;
    Some(&body[..close])
}

enum Scan<'a> {
    Found(&'a str),
    NoObject,
    Unclosed,
}

/// Locate the first balanced `{...}` in `text`.
///
/// Brace depth is only tracked outside string literals; quote toggling and
/// backslash escapes are honored so a `}` inside a quoted value never closes
/// the object. Naive first-`{`/last-`}` matching gets this wrong as soon as
/// the model appends prose containing braces.
fn scan_balanced_object(text: &str) -> Scan<'_> {
    let bytes = text.as_bytes();
    let Some(start) = bytes.iter().position(|&b| b == b'{') else {
        return Scan::NoObject;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escape_next {
            escape_next = false;
            continue;
        }
        match b {
            b'\\' if in_string => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Scan::Found(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    Scan::Unclosed
}

/// Shallow validation of a parsed JSON value.
fn validate(value: serde_json::Value, source: &str) -> Result<MetaphorResponse, ParseError> {
    let Some(obj) = value.as_object() else {
        return Err(ParseError::Invalid {
            excerpt: excerpt(source),
        });
    };

    // A rejection short-circuits regardless of any other keys.
    if let Some(reason) = obj.get("rejection").and_then(|v| v.as_str()) {
        return Ok(MetaphorResponse::Rejection(reason.to_string()));
    }

    let missing: Vec<&'static str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|k| obj.get(*k).is_none_or(serde_json::Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::MissingFields { missing });
    }

    match serde_json::from_value::<MetaphorResult>(value) {
        Ok(result) => Ok(MetaphorResponse::Metaphor(result)),
        Err(_) => Err(ParseError::Invalid {
            excerpt: excerpt(source),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_metaphor_json() -> String {
        r#"{
            "step1": {"subject": "s", "pressure": "p", "conflict": "c", "cost": "x", "emotion": "e"},
            "step2_object": "Candle",
            "step3_mechanic": {"rule": "r", "x_maps_to": "x", "y_maps_to": "y"},
            "step4_quotes": ["a", "b", "c"],
            "step4_best": {"line1": "A flame spends itself.", "line2": ""},
            "step5_visual": "v",
            "step5_dalle_prompt": "d"
        }"#
        .to_string()
    }

    #[test]
    fn direct_parse_matches_serde_json() {
        let raw = full_metaphor_json();
        let parsed = parse(&raw).unwrap();
        let m = parsed.metaphor().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(m.step2_object, value["step2_object"].as_str().unwrap());
        assert_eq!(m.step4_quotes.len(), 3);
    }

    #[test]
    fn fenced_block_parses_like_interior() {
        let raw = format!("```json\n{}\n```", full_metaphor_json());
        let fenced = parse(&raw).unwrap();
        let plain = parse(&full_metaphor_json()).unwrap();
        assert_eq!(fenced, plain);
    }

    #[test]
    fn fence_without_tag_also_parses() {
        let raw = format!("```\n{}\n```", full_metaphor_json());
        assert!(parse(&raw).unwrap().metaphor().is_some());
    }

    #[test]
    fn brace_in_string_does_not_terminate_scan() {
        let text = r#"prefix {"a": "contains } brace"} suffix"#;
        let Scan::Found(slice) = scan_balanced_object(text) else {
            panic!("expected a balanced object");
        };
        assert_eq!(slice, r#"{"a": "contains } brace"}"#);
    }

    #[test]
    fn escaped_quote_inside_string_is_handled() {
        let text = r#"x {"a": "say \"hi\" {now}"} y"#;
        let Scan::Found(slice) = scan_balanced_object(text) else {
            panic!("expected a balanced object");
        };
        assert_eq!(slice, r#"{"a": "say \"hi\" {now}"}"#);
    }

    #[test]
    fn trailing_prose_with_braces_is_ignored() {
        let raw = format!(
            "Here is the result:\n{}\nNote: objects {{like this}} are tricky.",
            full_metaphor_json()
        );
        assert!(parse(&raw).unwrap().metaphor().is_some());
    }

    #[test]
    fn rejection_short_circuits_other_keys() {
        let raw = r#"{"rejection": "Too vague to visualize.", "step1": {}}"#;
        match parse(raw).unwrap() {
            MetaphorResponse::Rejection(reason) => {
                assert_eq!(reason, "Too vague to visualize.");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_distinct_from_invalid_json() {
        // Six of the seven required keys.
        let raw = r#"{
            "step1": {},
            "step2_object": "Candle",
            "step3_mechanic": {},
            "step4_quotes": [],
            "step4_best": {},
            "step5_visual": "v"
        }"#;
        match parse(raw) {
            Err(ParseError::MissingFields { missing }) => {
                assert_eq!(missing, vec!["step5_dalle_prompt"]);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }

        match parse("not json at all") {
            Err(ParseError::NoJsonFound { .. }) => {}
            other => panic!("expected NoJsonFound, got {other:?}"),
        }
    }

    #[test]
    fn null_required_key_counts_as_missing() {
        let mut value: serde_json::Value =
            serde_json::from_str(&full_metaphor_json()).unwrap();
        value["step4_best"] = serde_json::Value::Null;
        let raw = value.to_string();
        assert!(matches!(
            parse(&raw),
            Err(ParseError::MissingFields { .. })
        ));
    }

    #[test]
    fn empty_input_is_its_own_error() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   \n\t "), Err(ParseError::Empty));
    }

    #[test]
    fn quotes_without_braces_fail_with_no_object() {
        assert!(matches!(
            parse("\"just\" some \"quoted\" words"),
            Err(ParseError::NoJsonFound { .. })
        ));
    }

    #[test]
    fn unclosed_object_is_reported() {
        match parse(r#"{"a": {"b": 1}"#) {
            Err(ParseError::UnclosedObject { excerpt }) => {
                assert!(excerpt.starts_with('{'));
            }
            other => panic!("expected UnclosedObject, got {other:?}"),
        }
    }

    #[test]
    fn sanitize_strips_non_ascii_and_preserves_words() {
        let input = "a\r\nb \u{2018}c\u{2019} \u{201C}d\u{201D} e\u{2014}f g\u{2026}";
        let clean = sanitize(input);
        assert!(clean.is_ascii());
        assert_eq!(clean, "a b 'c' \"d\" e-f g...");
    }

    #[test]
    fn sanitize_drops_control_characters() {
        let input = "a\x00b\x07c\x7fd";
        assert_eq!(sanitize(input), "abcd");
    }

    #[test]
    fn smart_quoted_json_parses_after_sanitization() {
        // Smart double quotes around a value break the direct parse but
        // survive sanitization; the key quoting stays intact.
        let raw = "junk {\"step1\": {}, \"step2_object\": \u{201C}Candle\u{201D}, \"step3_mechanic\": {}, \"step4_quotes\": [], \"step4_best\": {}, \"step5_visual\": \"v\", \"step5_dalle_prompt\": \"d\"} tail";
        let parsed = parse(raw).unwrap();
        assert_eq!(parsed.metaphor().unwrap().step2_object, "Candle");
    }

    #[test]
    fn excerpt_is_capped() {
        let long = format!("{}{}", "x".repeat(300), "{unterminated");
        match parse(&long) {
            Err(ParseError::UnclosedObject { excerpt }) => {
                assert!(excerpt.chars().count() <= 100);
            }
            other => panic!("expected UnclosedObject, got {other:?}"),
        }
    }
}
