use crate::log_util::log_debug;
use crate::question::{RawAnswer, RawQuestion};

const CHOICE_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

type Matcher = fn(&RawQuestion, &[String]) -> Option<usize>;

/// Matchers are tried in order; the first hit wins.
const MATCHERS: [Matcher; 4] = [
    match_explicit_index,
    match_numeric_answer,
    match_letter_answer,
    match_text_answer,
];

/// Resolve the zero-based index of the correct choice from whichever legacy
/// encoding the record uses. `None` means no choice could be identified: the
/// question stays displayable, but no selection will ever register as
/// correct. That outcome is flagged for test-authoring feedback rather than
/// treated as an error.
pub fn resolve(raw: &RawQuestion, choices: &[String]) -> Option<usize> {
    let resolved = MATCHERS.iter().find_map(|matcher| matcher(raw, choices));
    if resolved.is_none() {
        log_debug(&format!(
            "answer_resolver: no choice matched for record {}",
            raw.id.as_deref().unwrap_or("<no id>")
        ));
    }
    resolved
}

fn in_range(index: i64, choice_count: usize) -> Option<usize> {
    if index >= 0 && (index as usize) < choice_count {
        Some(index as usize)
    } else {
        None
    }
}

fn match_explicit_index(raw: &RawQuestion, choices: &[String]) -> Option<usize> {
    raw.answer_index
        .and_then(|index| in_range(index, choices.len()))
}

fn match_numeric_answer(raw: &RawQuestion, choices: &[String]) -> Option<usize> {
    match raw.answer {
        Some(RawAnswer::Index(index)) => in_range(index, choices.len()),
        _ => None,
    }
}

fn match_letter_answer(raw: &RawQuestion, choices: &[String]) -> Option<usize> {
    let Some(RawAnswer::Text(text)) = &raw.answer else {
        return None;
    };
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let (Some(letter), None) = (chars.next(), chars.next()) else {
        return None;
    };
    let position = CHOICE_LETTERS
        .iter()
        .position(|candidate| *candidate == letter.to_ascii_uppercase())?;
    if position < choices.len() {
        Some(position)
    } else {
        None
    }
}

fn match_text_answer(raw: &RawQuestion, choices: &[String]) -> Option<usize> {
    let Some(RawAnswer::Text(text)) = &raw.answer else {
        return None;
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(position) = choices.iter().position(|choice| choice.trim() == trimmed) {
        return Some(position);
    }
    let stripped = strip_letter_prefix(trimmed);
    choices
        .iter()
        .position(|choice| strip_letter_prefix(choice.trim()) == stripped)
}

/// Remove a leading `X)` marker, e.g. `"C) Paris"` becomes `"Paris"`.
fn strip_letter_prefix(value: &str) -> &str {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(')')) if letter.is_ascii_alphabetic() => chars.as_str().trim_start(),
        _ => value,
    }
}
