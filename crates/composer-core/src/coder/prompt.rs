//! Prompt construction and code extraction for the coding collaborators

use super::{GenerationRequest, RepairRequest};
use crate::orchestration::ErrorRecord;

/// Test logs fed back to the model are cut to their last characters
const MAX_LOG_CHARS: usize = 4000;

pub(crate) const CODER_SYSTEM_PROMPT: &str = "You are a senior software engineer. \
Write complete, production-grade source files with error handling. \
Never use eval, exec, shell invocation or unsafe deserialization. \
Return the full file in a single fenced code block and nothing else.";

pub(crate) fn generation_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Implement the component `{}`.\n\nRequirements:\n{}\n\nTech stack: {}\n",
        request.component.name,
        request.component.description,
        request.tech_stack.join(", ")
    );

    if !request.previous_errors.is_empty() {
        prompt.push_str("\nPrevious attempts failed with these errors (oldest first):\n");
        for record in &request.previous_errors {
            push_error(&mut prompt, record);
        }
        prompt.push_str("Avoid repeating them.\n");
    }
    prompt
}

pub(crate) fn security_prompt(code: &str, issues: &[String], tech_stack: &[String]) -> String {
    let mut prompt = format!(
        "The following code was rejected by a security check.\nTech stack: {}\n\nIssues:\n",
        tech_stack.join(", ")
    );
    for issue in issues {
        prompt.push_str(&format!("- {}\n", issue));
    }
    prompt.push_str(&format!(
        "\nRewrite the code so none of the issues remain, keeping its behavior.\n\n```\n{}\n```\n",
        code
    ));
    prompt
}

pub(crate) fn repair_prompt(request: &RepairRequest) -> String {
    let failure = &request.failure;
    let mut prompt = format!(
        "The component `{}` failed its tests.\n\nRequirements:\n{}\n\nTech stack: {}\n\nError: {}\n",
        request.component.name,
        request.component.description,
        request.tech_stack.join(", "),
        failure.error.as_deref().unwrap_or("tests failed"),
    );
    if failure.timed_out {
        prompt.push_str("The test run timed out.\n");
    }
    if !failure.logs.trim().is_empty() {
        prompt.push_str(&format!(
            "\nTest output:\n{}\n",
            tail(&failure.logs, MAX_LOG_CHARS)
        ));
    }
    if !request.reference_solutions.is_empty() {
        prompt.push_str("\nSolutions that worked for similar problems:\n");
        for solution in &request.reference_solutions {
            prompt.push_str(&format!("```\n{}\n```\n", solution));
        }
    }
    prompt.push_str(&format!(
        "\nFix the code so the tests pass.\n\n```\n{}\n```\n",
        request.code
    ));
    prompt
}

fn push_error(prompt: &mut String, record: &ErrorRecord) {
    prompt.push_str(&format!(
        "- iteration {} ({}): {}\n",
        record.iteration, record.component, record.error
    ));
    if !record.logs.trim().is_empty() {
        prompt.push_str(&format!("{}\n", tail(&record.logs, MAX_LOG_CHARS / 4)));
    }
}

/// Last `max_chars` characters of `text`
fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    match text.char_indices().nth(count - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Pull the source out of a model response
///
/// Takes the body of the first fenced block when there is one, the trimmed
/// text otherwise.
pub fn extract_code(response: &str) -> String {
    let Some(start) = response.find("```") else {
        return response.trim().to_string();
    };

    let after_fence = &response[start + 3..];
    // Skip the language tag on the opening fence line
    let body = match after_fence.find('\n') {
        Some(newline) => &after_fence[newline + 1..],
        None => return response.trim().to_string(),
    };

    let code = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    code.trim_end().to_string()
}
