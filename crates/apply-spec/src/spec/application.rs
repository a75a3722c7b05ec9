use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::answer::Answer;
use crate::spec::lenient::lenient;

/// Lifecycle state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationStatus {
    #[default]
    Draft,
    Submitted,
    Resubmitted,
    EditsRequested,
    Withdrawn,
    Approved,
    Rejected,
    #[serde(other)]
    Other,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Resubmitted => "resubmitted",
            ApplicationStatus::EditsRequested => "editsRequested",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Other => "other",
        }
    }

    /// Whether the applicant may still submit from this state.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Draft | ApplicationStatus::EditsRequested
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub response_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Responder {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ApplicationExpand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder: Option<Responder>,
    /// Answers in form order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Vec<Answer>>,
}

/// One applicant's response to an event's question set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Application {
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub serial: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<ApplicationExpand>,
}

impl Application {
    pub fn answers(&self) -> Option<&[Answer]> {
        self.expand
            .as_ref()
            .and_then(|expand| expand.response.as_deref())
    }

    pub fn event(&self) -> Option<&EventSummary> {
        self.expand.as_ref().and_then(|expand| expand.event.as_ref())
    }

    /// Human-facing reference: event prefix plus the zero-padded serial, or the record id.
    pub fn reference(&self) -> String {
        match self.serial {
            Some(serial) if serial > 0 => {
                let prefix = self
                    .event()
                    .and_then(|event| event.response_prefix.as_deref())
                    .unwrap_or("");
                format!("{prefix}{serial:03}")
            }
            _ => self.id.clone(),
        }
    }
}
