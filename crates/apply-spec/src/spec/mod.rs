pub mod answer;
pub mod application;
pub mod lenient;
pub mod question;
pub mod response;

pub use answer::{Answer, AnswerExpand};
pub use application::{Application, ApplicationExpand, ApplicationStatus, EventSummary, Responder};
pub use question::{Question, QuestionOptions, QuestionType};
pub use response::{ActivityRow, MemberRow, MultipleChoice, Response, SingleChoice};
