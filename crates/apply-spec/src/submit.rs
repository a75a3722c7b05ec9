use thiserror::Error;

use crate::spec::answer::Answer;
use crate::spec::application::{Application, ApplicationStatus};
use crate::spec::question::QuestionType;
use crate::visibility::reconcile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("application cannot be submitted while {}", .0.as_str())]
    InvalidStatus(ApplicationStatus),
    #[error("responses could not be fetched")]
    MissingResponses,
    #[error("some responses are invalid: {}", .answer_ids.join(", "))]
    InvalidResponses { answer_ids: Vec<String> },
}

/// Ids of answers that would block submission: invalid and not an `info` field.
pub fn blocking_answers(answers: &[Answer]) -> Vec<String> {
    answers
        .iter()
        .filter(|answer| !answer.valid)
        .filter(|answer| {
            answer
                .expanded_question()
                .is_none_or(|question| question.kind != QuestionType::Info)
        })
        .map(|answer| answer.id.clone())
        .collect()
}

/// Checks that an application may be submitted and returns the status it moves to.
///
/// Hidden conditional answers are reconciled first, so only visible answers
/// can block.
pub fn check_submission(application: &Application) -> Result<ApplicationStatus, SubmitError> {
    if !application.status.is_open() {
        return Err(SubmitError::InvalidStatus(application.status));
    }
    let answers = application.answers().ok_or(SubmitError::MissingResponses)?;

    let answer_ids = blocking_answers(&reconcile(answers));
    if !answer_ids.is_empty() {
        return Err(SubmitError::InvalidResponses { answer_ids });
    }

    Ok(match application.status {
        ApplicationStatus::EditsRequested => ApplicationStatus::Resubmitted,
        _ => ApplicationStatus::Submitted,
    })
}
