use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::lenient::{id_list, lenient};

/// Field types an event form can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    ShortText,
    LongText,
    Email,
    Phone,
    File,
    Radio,
    Checkbox,
    Member,
    Activity,
    Budget,
    Info,
    /// Any tag this crate does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::ShortText => "shortText",
            QuestionType::LongText => "longText",
            QuestionType::Email => "email",
            QuestionType::Phone => "phone",
            QuestionType::File => "file",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Member => "member",
            QuestionType::Activity => "activity",
            QuestionType::Budget => "budget",
            QuestionType::Info => "info",
            QuestionType::Unknown => "unknown",
        }
    }

    /// Types whose answer renders as a multi-row table.
    pub fn is_tabular(&self) -> bool {
        matches!(
            self,
            QuestionType::Member | QuestionType::Activity | QuestionType::Budget
        )
    }
}

/// Type-specific configuration. Only `choices` is interpreted here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct QuestionOptions {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub choices: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A form field definition, as stored by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: QuestionType,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub options: QuestionOptions,
    #[serde(default, deserialize_with = "lenient")]
    pub conditional: bool,
    /// Questions this one depends on.
    #[serde(
        default,
        deserialize_with = "id_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub conditionquestion: Option<Vec<String>>,
    /// Required answer per dependency id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditionanswer: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub page: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub required: bool,
}

impl Question {
    pub fn new(id: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            id: id.into(),
            kind,
            title: String::new(),
            options: QuestionOptions::default(),
            conditional: false,
            conditionquestion: None,
            conditionanswer: None,
            page: 0,
            required: false,
        }
    }

    pub fn choices(&self) -> Option<&[String]> {
        self.options.choices.as_deref()
    }

    /// Title with markup removed, as shown in exports and emails.
    pub fn plain_title(&self) -> String {
        strip_tags(&self.title)
    }
}

/// Removes anything that looks like an HTML tag and trims the result.
pub fn strip_tags(html: &str) -> String {
    match Regex::new(r"<[^>]*>") {
        Ok(tags) => tags.replace_all(html, "").trim().to_string(),
        Err(_) => html.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_tags_deserialize() {
        let question: Question =
            serde_json::from_value(json!({"id": "q", "type": "signature"})).expect("question");
        assert_eq!(question.kind, QuestionType::Unknown);
    }

    #[test]
    fn malformed_fields_fall_back_to_defaults() {
        let question: Question = serde_json::from_value(json!({
            "id": "q",
            "type": "radio",
            "options": "broken",
            "conditional": "yes",
            "conditionquestion": "q0",
            "page": "two"
        }))
        .expect("question");
        assert_eq!(question.choices(), None);
        assert!(!question.conditional);
        assert_eq!(question.conditionquestion, Some(vec!["q0".to_string()]));
        assert_eq!(question.page, 0);
    }

    #[test]
    fn strips_markup_from_titles() {
        let mut question = Question::new("q", QuestionType::ShortText);
        question.title = "<p>Team <b>name</b></p> ".into();
        assert_eq!(question.plain_title(), "Team name");
    }
}
