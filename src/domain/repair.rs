//! Recovery of a JSON array of objects from free-form model output.
//!
//! Model responses wrap the array in prose, truncate the last object, or leave
//! an unescaped character in one entry. Each top-level `{...}` between the
//! first `[` and the last `]` is parsed in isolation so one bad entry never
//! costs the rest of the batch.

use serde_json::{Map, Value};

use crate::domain::testcase::TestCase;

#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    /// The text contained no `[ ... ]` span.
    NoArrayFound,
    /// Objects that parsed, in the order they appeared.
    Repaired(Vec<Map<String, Value>>),
}

impl RepairOutcome {
    pub fn objects(&self) -> &[Map<String, Value>] {
        match self {
            RepairOutcome::NoArrayFound => &[],
            RepairOutcome::Repaired(objects) => objects,
        }
    }

    /// Serialized array text; `[]` when nothing was found.
    pub fn to_json(&self) -> String {
        let array = Value::Array(
            self.objects()
                .iter()
                .cloned()
                .map(Value::Object)
                .collect(),
        );
        serde_json::to_string_pretty(&array).unwrap_or_else(|_| "[]".to_string())
    }

    /// Converts the recovered objects into test cases, skipping any that lack the shape.
    pub fn test_cases(&self) -> Vec<TestCase> {
        self.objects()
            .iter()
            .enumerate()
            .filter_map(|(index, object)| {
                match serde_json::from_value::<TestCase>(Value::Object(object.clone())) {
                    Ok(case) => Some(case),
                    Err(err) => {
                        log::warn!("skipping entry {index}: not a test case ({err})");
                        None
                    }
                }
            })
            .collect()
    }
}

pub fn repair(raw: &str) -> RepairOutcome {
    let Some(start) = raw.find('[') else {
        return RepairOutcome::NoArrayFound;
    };
    let Some(end) = raw.rfind(']') else {
        return RepairOutcome::NoArrayFound;
    };
    if end < start {
        return RepairOutcome::NoArrayFound;
    }

    let span = &raw[start..=end];
    let mut objects = Vec::new();
    let mut depth: usize = 0;
    let mut object_start = 0;

    for (index, ch) in span.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    object_start = index;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    let candidate = &span[object_start..=index];
                    match serde_json::from_str::<Value>(candidate) {
                        Ok(Value::Object(object)) => objects.push(object),
                        Ok(_) => {}
                        Err(err) => {
                            log::debug!("dropping malformed object at offset {object_start}: {err}");
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        log::debug!("dropping unterminated object at offset {object_start}");
    }

    RepairOutcome::Repaired(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_brackets_is_not_found() {
        assert_eq!(repair("I could not think of any tests."), RepairOutcome::NoArrayFound);
        assert_eq!(repair("only an opener ["), RepairOutcome::NoArrayFound);
        assert_eq!(repair("] reversed ["), RepairOutcome::NoArrayFound);
        assert_eq!(RepairOutcome::NoArrayFound.to_json(), "[]");
    }

    #[test]
    fn keeps_well_formed_object_and_drops_truncated_one() {
        let raw = r#"Here you go:
[
  {"summary": "Login works", "steps": [{"action": "log in", "result": "ok"}]},
  {"summary": "Logout works", "steps": [{"action": "log out"
]"#;
        let outcome = repair(raw);
        assert_eq!(outcome.objects().len(), 1);
        assert_eq!(outcome.objects()[0]["summary"], "Login works");
    }

    #[test]
    fn drops_malformed_object_between_valid_ones() {
        let raw = r#"[{"summary": "a"}, {"summary": "b" "oops"}, {"summary": "c"}]"#;
        let outcome = repair(raw);
        let summaries: Vec<_> = outcome
            .objects()
            .iter()
            .map(|object| object["summary"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(summaries, vec!["a", "c"]);
    }

    #[test]
    fn nested_braces_stay_in_one_object() {
        let raw = r#"```json
[{"summary": "x", "meta": {"depth": {"level": 2}}}]
```"#;
        let outcome = repair(raw);
        assert_eq!(outcome.objects().len(), 1);
        assert_eq!(outcome.objects()[0]["meta"]["depth"]["level"], 2);
    }

    #[test]
    fn stray_closing_brace_is_ignored() {
        let outcome = repair(r#"[ } {"summary": "ok"} ]"#);
        assert_eq!(outcome.objects().len(), 1);
    }

    #[test]
    fn output_always_reparses() {
        let inputs = [
            "",
            "[]",
            "[{]",
            r#"[{"a": "unterminated}]"#,
            r#"prefix [{"summary": "one"}, garbage, {"summary": "two"}] suffix"#,
            "[{\"text\": \"tab\there\"}]",
        ];
        for input in inputs {
            let json = repair(input).to_json();
            let parsed: Value = serde_json::from_str(&json).unwrap();
            assert!(parsed.is_array(), "not an array for input {input:?}");
        }
    }

    #[test]
    fn converts_objects_into_test_cases() {
        let raw = r#"[
            {"summary": "Upload file", "description": "d", "precondition": "p",
             "steps": [{"action": "upload", "data": "a.pdf", "result": "stored"}]},
            {"title": "not a test case"}
        ]"#;
        let cases = repair(raw).test_cases();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].steps[0].data.as_deref(), Some("a.pdf"));
    }
}
