use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::lenient::lenient;
use crate::spec::question::Question;

/// Related records the store inlines into an answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnswerExpand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
}

/// The value an applicant entered for one question.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Answer {
    #[serde(default)]
    pub id: String,
    /// Owning application id.
    #[serde(default, deserialize_with = "lenient")]
    pub application: String,
    /// Question id.
    #[serde(default, deserialize_with = "lenient")]
    pub question: String,
    /// Raw payload; its shape depends on the question type.
    #[serde(default)]
    pub response: Value,
    #[serde(default, deserialize_with = "lenient")]
    pub valid: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<AnswerExpand>,
}

impl Answer {
    /// Builds an answer with its question already expanded.
    pub fn for_question(id: impl Into<String>, question: Question, response: Value) -> Self {
        Self {
            id: id.into(),
            question: question.id.clone(),
            response,
            expand: Some(AnswerExpand {
                question: Some(question),
            }),
            ..Self::default()
        }
    }

    pub fn expanded_question(&self) -> Option<&Question> {
        self.expand.as_ref().and_then(|expand| expand.question.as_ref())
    }
}
