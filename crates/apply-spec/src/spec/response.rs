use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::budget::{BudgetItem, items_from_value};
use crate::spec::lenient::{display_value, is_truthy, lenient, number_text};
use crate::spec::question::QuestionType;

/// Radio answer: an index into the choices, where `choices.len()` means "other".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SingleChoice {
    pub selected: Option<f64>,
    pub others: Option<String>,
}

/// Checkbox answer. Entries that are not valid indexes are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultipleChoice {
    pub selected: Vec<Option<usize>>,
    pub others: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemberRow {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRow {
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub form: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub note: Option<String>,
}

/// An answer payload interpreted through its question's type.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// No payload was stored.
    Empty,
    Text(String),
    Single(SingleChoice),
    Multiple(MultipleChoice),
    /// Every uploaded file name, flattened across upload entries.
    Files(Vec<String>),
    Members(Vec<MemberRow>),
    Activities(Vec<ActivityRow>),
    Budget(Vec<BudgetItem>),
    /// Info and unknown question types keep the raw payload.
    Other(Value),
    /// The payload does not have the shape its question type needs.
    Mismatched(QuestionType),
}

impl Response {
    pub fn decode(kind: QuestionType, raw: &Value) -> Response {
        if raw.is_null() {
            return Response::Empty;
        }
        match kind {
            QuestionType::ShortText
            | QuestionType::LongText
            | QuestionType::Email
            | QuestionType::Phone => decode_text(kind, raw),
            QuestionType::Radio => match raw {
                Value::Object(map) if map.contains_key("selected") => {
                    Response::Single(SingleChoice {
                        selected: map.get("selected").and_then(Value::as_f64),
                        others: others_text(map.get("others")),
                    })
                }
                _ => Response::Mismatched(kind),
            },
            QuestionType::Checkbox => match raw {
                Value::Object(map) => match map.get("selected") {
                    Some(Value::Array(selected)) => Response::Multiple(MultipleChoice {
                        selected: selected.iter().map(choice_index).collect(),
                        others: others_text(map.get("others")),
                    }),
                    _ => Response::Mismatched(kind),
                },
                _ => Response::Mismatched(kind),
            },
            QuestionType::File => match raw {
                Value::Array(uploads) => Response::Files(
                    uploads
                        .iter()
                        .filter_map(|upload| upload.get("files").and_then(Value::as_array))
                        .flatten()
                        .map(display_value)
                        .collect(),
                ),
                _ => Response::Mismatched(kind),
            },
            QuestionType::Member => match raw {
                Value::Array(rows) => Response::Members(rows.iter().map(read_row).collect()),
                _ => Response::Mismatched(kind),
            },
            QuestionType::Activity => match raw {
                Value::Array(rows) => Response::Activities(rows.iter().map(read_row).collect()),
                _ => Response::Mismatched(kind),
            },
            QuestionType::Budget => match raw {
                Value::Array(_) | Value::Object(_) => Response::Budget(items_from_value(raw)),
                _ => Response::Mismatched(kind),
            },
            QuestionType::Info | QuestionType::Unknown => Response::Other(raw.clone()),
        }
    }
}

fn decode_text(kind: QuestionType, raw: &Value) -> Response {
    match raw {
        Value::String(text) => Response::Text(text.clone()),
        Value::Number(number) if is_truthy(raw) => {
            Response::Text(number_text(number.as_f64().unwrap_or(f64::NAN)))
        }
        Value::Bool(true) => Response::Text("true".to_string()),
        Value::Number(_) | Value::Bool(false) => Response::Text(String::new()),
        _ => Response::Mismatched(kind),
    }
}

fn others_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text.clone()),
        _ => None,
    }
}

fn choice_index(value: &Value) -> Option<usize> {
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|n| n.fract() == 0.0 && *n >= 0.0)
                .map(|n| n as u64)
        })
        .and_then(|n| usize::try_from(n).ok())
}

fn read_row<T: serde::de::DeserializeOwned + Default>(row: &Value) -> T {
    serde_json::from_value(row.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_payload_is_empty_for_every_type() {
        for kind in [
            QuestionType::ShortText,
            QuestionType::Radio,
            QuestionType::Budget,
            QuestionType::Unknown,
        ] {
            assert_eq!(Response::decode(kind, &Value::Null), Response::Empty);
        }
    }

    #[test]
    fn checkbox_keeps_invalid_indexes_as_holes() {
        let response = Response::decode(
            QuestionType::Checkbox,
            &json!({"selected": [0, "x", 2.0, -1], "others": "Other"}),
        );
        let Response::Multiple(choice) = response else {
            panic!("expected multiple choice");
        };
        assert_eq!(choice.selected, vec![Some(0), None, Some(2), None]);
        assert_eq!(choice.others.as_deref(), Some("Other"));
    }

    #[test]
    fn list_types_reject_scalars() {
        assert_eq!(
            Response::decode(QuestionType::Member, &json!("alice")),
            Response::Mismatched(QuestionType::Member)
        );
        assert_eq!(
            Response::decode(QuestionType::Budget, &json!(12)),
            Response::Mismatched(QuestionType::Budget)
        );
    }

    #[test]
    fn files_are_flattened() {
        let response = Response::decode(
            QuestionType::File,
            &json!([{"files": ["a.pdf", "b.pdf"]}, {"id": "x"}, null, {"files": ["c.png"]}]),
        );
        assert_eq!(
            response,
            Response::Files(vec!["a.pdf".into(), "b.pdf".into(), "c.png".into()])
        );
    }

    #[test]
    fn text_accepts_numbers() {
        assert_eq!(
            Response::decode(QuestionType::Phone, &json!(912345678)),
            Response::Text("912345678".into())
        );
    }
}
