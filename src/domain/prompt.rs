use crate::domain::retrieval::{DocumentationSnippet, frame_snippets};
use crate::domain::ticket::{TicketContext, TicketField};

const USER_INPUT_PLACEHOLDER: &str = "user_prompt";

const TEST_CASE_TEMPLATE: &str = r#"The objective is to cover the following acceptance criteria: {{ac}} and validate the functionality of {{summary}} with {{description}}.
Refer to the workflow: {{workflow}} to add more details or preconditions to the test cases if necessary. {{user_prompt}}
Write at least 3 test cases.
Only provide "data" for a step when it is required, otherwise omit the "data" key.
Answer with a JSON array in exactly this shape and nothing else:
[
    {
        "summary": "Name of test case 1",
        "description": "Description of test case 1",
        "precondition": "Preconditions of test case 1",
        "steps": [
            {
                "action": "Action for step 1",
                "data": "Data for step 1",
                "result": "Expected result of step 1"
            },
            {
                "action": "Action for step 2",
                "result": "Expected result of step 2"
            }
        ]
    }
]
"#;

const STRATEGY_TEMPLATE: &str = "Generate a test strategy for the functionality of {{summary}} \
with Description: {{description}} and Acceptance Criteria: {{ac}}. {{user_prompt}} \
Please give scenario titles only.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    TestCases,
    Strategy,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::TestCases => "testcases",
            GenerationMode::Strategy => "workflow",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            GenerationMode::TestCases => TEST_CASE_TEMPLATE,
            GenerationMode::Strategy => STRATEGY_TEMPLATE,
        }
    }

    /// Only test-case prompts are augmented with documentation.
    pub fn uses_retrieval(&self) -> bool {
        matches!(self, GenerationMode::TestCases)
    }
}

/// Builds the user prompt sent to the model for one ticket.
pub fn assemble(
    ticket: &TicketContext,
    user_input: &str,
    mode: GenerationMode,
    snippets: &[DocumentationSnippet],
) -> String {
    let filled = fill_template(mode.template(), ticket, user_input);
    if !mode.uses_retrieval() {
        return filled;
    }
    match frame_snippets(snippets) {
        Some(context) => format!("{context}{filled}"),
        None => filled,
    }
}

/// Replaces every `{{name}}` in one pass. Absent or blank values remove the
/// placeholder; unknown placeholders are removed as well.
pub fn fill_template(template: &str, ticket: &TicketContext, user_input: &str) -> String {
    let mut output = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            output.push_str(&rest[open..]);
            return output;
        };

        let name = after_open[..close].trim();
        let value = if name == USER_INPUT_PLACEHOLDER {
            Some(user_input).filter(|text| !text.trim().is_empty())
        } else if let Some(field) = TicketField::from_placeholder(name) {
            ticket.field(field)
        } else {
            log::warn!("removing unknown placeholder {{{{{name}}}}} from prompt template");
            None
        };

        if let Some(value) = value {
            output.push_str(&neutralize_placeholders(value.trim()));
        }
        rest = &after_open[close + 2..];
    }

    output.push_str(rest);
    output
}

/// Splits doubled braces so inserted text can never form a placeholder.
fn neutralize_placeholders(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut previous = None;
    for ch in value.chars() {
        if (ch == '{' || ch == '}') && previous == Some(ch) {
            result.push(' ');
        }
        result.push(ch);
        previous = Some(ch);
    }
    result
}
