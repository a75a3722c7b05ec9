use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::budget::{budget_csv_block, budget_total_text};
use crate::spec::answer::Answer;
use crate::spec::lenient::{display_value, is_truthy};
use crate::spec::question::{Question, QuestionType};
use crate::spec::response::{ActivityRow, MemberRow, MultipleChoice, Response, SingleChoice};

pub const MEMBER_HEADER: &str = r#""Name","Username","Email","Phone","Department","Country""#;
pub const ACTIVITY_HEADER: &str = r#""Date","Time","Topic","Format","Location","Notes""#;

/// Output shape requested from [`represent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReprMode {
    /// Single-cell text used for validation and quick display.
    #[default]
    Plain,
    /// Multi-row CSV blocks for table-shaped answers.
    Csv,
}

impl ReprMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReprMode::Plain => "plain",
            ReprMode::Csv => "csv",
        }
    }
}

/// Canonical text for an answer. Missing answers, questions or payloads give `""`.
pub fn represent(answer: Option<&Answer>, mode: ReprMode) -> String {
    let Some(answer) = answer else {
        return String::new();
    };
    let Some(question) = answer.expanded_question() else {
        return String::new();
    };
    let response = Response::decode(question.kind, &answer.response);
    render(question, &response, mode)
}

/// Renders an already decoded payload.
pub fn render(question: &Question, response: &Response, mode: ReprMode) -> String {
    match response {
        Response::Empty => String::new(),
        Response::Text(text) => text.clone(),
        Response::Single(choice) => render_single(question, choice),
        Response::Multiple(choice) => render_multiple(question, choice),
        Response::Files(names) => names.join(", "),
        Response::Members(rows) => match mode {
            ReprMode::Csv => member_csv(rows),
            ReprMode::Plain => rows
                .iter()
                .map(|row| {
                    non_empty(&row.username)
                        .or_else(|| non_empty(&row.id))
                        .unwrap_or("")
                })
                .collect::<Vec<_>>()
                .join("|"),
        },
        Response::Activities(rows) => match mode {
            ReprMode::Csv => activity_csv(rows),
            ReprMode::Plain => rows.len().to_string(),
        },
        Response::Budget(items) => match mode {
            ReprMode::Csv => budget_csv_block(items),
            ReprMode::Plain => budget_total_text(items),
        },
        Response::Other(raw) => render_other(raw),
        Response::Mismatched(kind) => match (kind, mode) {
            (QuestionType::Activity | QuestionType::Budget, ReprMode::Plain) => "0".to_string(),
            _ => String::new(),
        },
    }
}

fn render_single(question: &Question, choice: &SingleChoice) -> String {
    let (Some(choices), Some(selected)) = (question.choices(), choice.selected) else {
        return String::new();
    };
    if selected == choices.len() as f64 {
        return choice.others.clone().unwrap_or_default();
    }
    if selected < 0.0 || selected.fract() != 0.0 {
        return String::new();
    }
    choices.get(selected as usize).cloned().unwrap_or_default()
}

fn render_multiple(question: &Question, choice: &MultipleChoice) -> String {
    let Some(choices) = question.choices() else {
        return String::new();
    };
    let others = choice.others.as_deref().unwrap_or("");
    choice
        .selected
        .iter()
        .filter_map(|index| {
            let index = (*index)?;
            let text = if index == choices.len() {
                others
            } else {
                choices.get(index)?.as_str()
            };
            (!text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn member_csv(rows: &[MemberRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut lines = vec![MEMBER_HEADER.to_string()];
    lines.extend(rows.iter().map(|row| {
        csv_row(&[
            text(&row.name),
            text(&row.username),
            text(&row.email),
            text(&row.phone),
            text(&row.department),
            text(&row.country),
        ])
    }));
    lines.join("\n")
}

fn activity_csv(rows: &[ActivityRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut lines = vec![ACTIVITY_HEADER.to_string()];
    lines.extend(rows.iter().map(|row| {
        let date = non_empty(&row.date).map(format_date).unwrap_or_default();
        let time_range = match (non_empty(&row.start_time), non_empty(&row.end_time)) {
            (Some(start), Some(end)) => format!("{start} - {end}"),
            _ => String::new(),
        };
        csv_row(&[
            date.as_str(),
            time_range.as_str(),
            text(&row.topic),
            text(&row.form),
            text(&row.location),
            text(&row.note),
        ])
    }));
    lines.join("\n")
}

fn render_other(raw: &Value) -> String {
    match raw {
        Value::Object(_) | Value::Array(_) => raw.to_string().replace(',', "|"),
        scalar if is_truthy(scalar) => display_value(scalar),
        _ => String::new(),
    }
}

/// Formats an activity date as `Jan 15, 2024`. Unparseable dates are kept verbatim.
pub fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let date = DateTime::parse_from_rfc3339(trimmed)
        .map(|moment| moment.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.fZ").map(|dt| dt.date())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
        });
    match date {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// One CSV line with every field double-quoted. Embedded quotes are doubled.
pub fn csv_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}
