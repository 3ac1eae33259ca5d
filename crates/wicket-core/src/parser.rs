use serde_json::Value;

/// Subtype the CLI emits when it gives up before a final answer.
const MAX_TURNS_SUBTYPE: &str = "error_max_turns";

/// Some CLI builds signal turn exhaustion in prose rather than subtype. A
/// genuine answer containing the phrase is misclassified; this matches the
/// observed contract.
const MAX_TURNS_PHRASE: &str = "Reached max turns";

/// Normalised view of one child's stdout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutput {
    pub text: String,
    pub model: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub max_turns_exhausted: bool,
}

/// The output shapes the CLI has been observed to emit.
enum OutputShape<'a> {
    /// Not JSON at all; the trimmed text is used as-is.
    Plain(&'a str),
    /// A bare JSON string.
    Text(String),
    /// A JSON object, possibly selected out of an event array.
    Record(Value),
}

/// Normalise raw CLI stdout. Total: malformed input degrades to plain text,
/// never an error.
pub fn parse_agent_output(stdout: &str) -> ParsedOutput {
    let raw = stdout.trim();

    match classify(raw) {
        OutputShape::Plain(raw) => sniff_max_turns(ParsedOutput {
            text: raw.to_string(),
            ..Default::default()
        }),
        OutputShape::Text(text) => sniff_max_turns(ParsedOutput {
            text,
            ..Default::default()
        }),
        OutputShape::Record(value) => {
            if value.get("subtype").and_then(Value::as_str) == Some(MAX_TURNS_SUBTYPE) {
                return ParsedOutput {
                    max_turns_exhausted: true,
                    ..Default::default()
                };
            }

            sniff_max_turns(ParsedOutput {
                text: extract_text(&value, raw),
                model: value
                    .get("model")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                input_tokens: token_field(&value, "input_tokens", "inputTokens"),
                output_tokens: token_field(&value, "output_tokens", "outputTokens"),
                max_turns_exhausted: false,
            })
        }
    }
}

fn classify(raw: &str) -> OutputShape<'_> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return OutputShape::Plain(raw),
    };

    match value {
        Value::String(s) => OutputShape::Text(s),
        Value::Array(events) => match select_event(events) {
            Some(event) => OutputShape::Record(event),
            None => OutputShape::Plain(raw),
        },
        other => OutputShape::Record(other),
    }
}

/// From a conversation event array, take the last `result`, else the last
/// `assistant`, else the first element.
fn select_event(events: Vec<Value>) -> Option<Value> {
    let mut result_idx = None;
    let mut assistant_idx = None;
    for (i, event) in events.iter().enumerate() {
        match event.get("type").and_then(Value::as_str) {
            Some("result") => result_idx = Some(i),
            Some("assistant") => assistant_idx = Some(i),
            _ => {}
        }
    }

    let idx = result_idx.or(assistant_idx).unwrap_or(0);
    events.into_iter().nth(idx)
}

fn extract_text(value: &Value, raw: &str) -> String {
    match value.get("result") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => serde_json::to_string(other).unwrap_or_else(|_| raw.to_string()),
        None => match value.get("text").and_then(Value::as_str) {
            Some(s) => s.to_string(),
            None => raw.to_string(),
        },
    }
}

/// Accept both token naming conventions; snake_case wins on conflict.
fn token_field(value: &Value, snake: &str, camel: &str) -> Option<u64> {
    value
        .get(snake)
        .and_then(Value::as_u64)
        .or_else(|| value.get(camel).and_then(Value::as_u64))
}

fn sniff_max_turns(mut parsed: ParsedOutput) -> ParsedOutput {
    if parsed.text.contains(MAX_TURNS_PHRASE) {
        parsed.max_turns_exhausted = true;
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let parsed = parse_agent_output("  just some prose\n");
        assert_eq!(parsed.text, "just some prose");
        assert_eq!(parsed.model, None);
        assert!(!parsed.max_turns_exhausted);
    }

    #[test]
    fn bare_json_string() {
        let parsed = parse_agent_output(r#""hi""#);
        assert_eq!(parsed.text, "hi");
    }

    #[test]
    fn object_with_result_string() {
        let parsed = parse_agent_output(r#"{"result":"hi"}"#);
        assert_eq!(parsed.text, "hi");
    }

    #[test]
    fn object_with_text_field() {
        let parsed = parse_agent_output(r#"{"text":"hi"}"#);
        assert_eq!(parsed.text, "hi");
    }

    #[test]
    fn structured_result_is_serialized() {
        let parsed = parse_agent_output(r#"{"result":{"answer":42}}"#);
        assert_eq!(parsed.text, r#"{"answer":42}"#);
    }

    #[test]
    fn object_without_known_fields_falls_back_to_raw() {
        let parsed = parse_agent_output(r#"{"status":"done"}"#);
        assert_eq!(parsed.text, r#"{"status":"done"}"#);
    }

    #[test]
    fn array_takes_last_result_event() {
        let stdout = r#"[
            {"type":"assistant","text":"thinking"},
            {"type":"result","result":"first"},
            {"type":"result","result":"second"}
        ]"#;
        let parsed = parse_agent_output(stdout);
        assert_eq!(parsed.text, "second");
    }

    #[test]
    fn array_falls_back_to_last_assistant() {
        let stdout = r#"[
            {"type":"system","text":"init"},
            {"type":"assistant","text":"draft"},
            {"type":"assistant","text":"final"}
        ]"#;
        let parsed = parse_agent_output(stdout);
        assert_eq!(parsed.text, "final");
    }

    #[test]
    fn array_without_known_types_takes_first() {
        let stdout = r#"[{"text":"only"},{"note":"ignored"}]"#;
        let parsed = parse_agent_output(stdout);
        assert_eq!(parsed.text, "only");
    }

    #[test]
    fn empty_array_degrades_to_raw_text() {
        let parsed = parse_agent_output("[]");
        assert_eq!(parsed.text, "[]");
    }

    #[test]
    fn token_counts_snake_case() {
        let parsed =
            parse_agent_output(r#"{"result":"ok","input_tokens":10,"output_tokens":5}"#);
        assert_eq!(parsed.input_tokens, Some(10));
        assert_eq!(parsed.output_tokens, Some(5));
    }

    #[test]
    fn token_counts_camel_case() {
        let parsed = parse_agent_output(r#"{"result":"ok","inputTokens":7,"outputTokens":3}"#);
        assert_eq!(parsed.input_tokens, Some(7));
        assert_eq!(parsed.output_tokens, Some(3));
    }

    #[test]
    fn snake_case_wins_on_conflict() {
        let parsed = parse_agent_output(r#"{"result":"ok","input_tokens":10,"inputTokens":99}"#);
        assert_eq!(parsed.input_tokens, Some(10));
    }

    #[test]
    fn model_is_extracted() {
        let parsed = parse_agent_output(r#"{"result":"ok","model":"sonnet"}"#);
        assert_eq!(parsed.model, Some("sonnet".to_string()));
    }

    #[test]
    fn max_turns_subtype_short_circuits_extraction() {
        let parsed = parse_agent_output(
            r#"{"subtype":"error_max_turns","result":"partial","input_tokens":4}"#,
        );
        assert!(parsed.max_turns_exhausted);
        assert_eq!(parsed.text, "");
        assert_eq!(parsed.input_tokens, None);
    }

    #[test]
    fn max_turns_phrase_in_text_is_flagged() {
        let parsed = parse_agent_output(r#"{"result":"Reached max turns limit"}"#);
        assert!(parsed.max_turns_exhausted);
    }

    #[test]
    fn max_turns_phrase_in_plain_text_is_flagged() {
        let parsed = parse_agent_output("Reached max turns limit, giving up.");
        assert!(parsed.max_turns_exhausted);
    }

    #[test]
    fn empty_input_yields_empty_text() {
        let parsed = parse_agent_output("   \n");
        assert_eq!(parsed.text, "");
        assert!(!parsed.max_turns_exhausted);
    }

    #[test]
    fn malformed_json_never_errors() {
        let parsed = parse_agent_output(r#"{"result": unterminated"#);
        assert_eq!(parsed.text, r#"{"result": unterminated"#);
    }
}
