use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::repr::{ReprMode, represent};
use crate::spec::answer::Answer;
use crate::spec::question::{Question, QuestionType};
use crate::visibility::visibility_map;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^\+?[0-9][0-9\s\-()]{5,}$";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub answer_id: String,
    pub question_id: Option<String>,
    pub message: String,
    pub code: String,
}

/// Outcome of checking a set of answers before they are flagged valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    /// Answer ids of required, visible questions without a usable answer.
    pub missing_required: Vec<String>,
    /// Answer ids whose question is currently hidden and therefore skipped.
    pub skipped: Vec<String>,
}

/// Checks every visible answer. Hidden and `info` questions are never blocking.
pub fn validate(answers: &[Answer]) -> ValidationResult {
    let visibility = visibility_map(answers);

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();
    let mut skipped = Vec::new();

    for answer in answers {
        let Some(question) = answer.expanded_question() else {
            continue;
        };
        if question.kind == QuestionType::Info {
            continue;
        }
        if !visibility.get(&answer.id).copied().unwrap_or(true) {
            skipped.push(answer.id.clone());
            continue;
        }

        let text = represent(Some(answer), ReprMode::Plain);
        if text.trim().is_empty() {
            if question.required {
                missing_required.push(answer.id.clone());
            }
            continue;
        }

        if let Some(error) = validate_text(answer, question, text.trim()) {
            errors.push(error);
        }
    }

    ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty(),
        errors,
        missing_required,
        skipped,
    }
}

/// Whether a single answer passes on its own, ignoring visibility.
pub fn answer_is_valid(answer: &Answer) -> bool {
    let Some(question) = answer.expanded_question() else {
        return false;
    };
    if question.kind == QuestionType::Info {
        return true;
    }
    let text = represent(Some(answer), ReprMode::Plain);
    if text.trim().is_empty() {
        return !question.required;
    }
    validate_text(answer, question, text.trim()).is_none()
}

fn validate_text(answer: &Answer, question: &Question, text: &str) -> Option<ValidationError> {
    let (pattern, message, code) = match question.kind {
        QuestionType::Email => (EMAIL_PATTERN, "not a valid email address", "email_format"),
        QuestionType::Phone => (PHONE_PATTERN, "not a valid phone number", "phone_format"),
        QuestionType::Budget if text == "ERROR" => {
            return Some(base_error(
                answer,
                question,
                "budget contains an item that cannot be calculated",
                "budget_error",
            ));
        }
        _ => return None,
    };

    if let Ok(regex) = Regex::new(pattern)
        && !regex.is_match(text)
    {
        return Some(base_error(answer, question, message, code));
    }

    None
}

fn base_error(answer: &Answer, question: &Question, message: &str, code: &str) -> ValidationError {
    ValidationError {
        answer_id: answer.id.clone(),
        question_id: Some(question.id.clone()),
        message: message.into(),
        code: code.into(),
    }
}
