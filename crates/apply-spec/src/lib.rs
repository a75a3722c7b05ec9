#![allow(missing_docs)]

pub mod budget;
pub mod email;
pub mod export;
pub mod expr;
pub mod repr;
pub mod spec;
pub mod submit;
pub mod validate;
pub mod visibility;

pub use budget::{BudgetItem, RangeTable, budget_csv, budget_total, item_value};
pub use email::{EmailError, SummaryMailer, application_summary_email, csv_to_html_table};
pub use export::{ExportColumn, ExportError, export_columns, export_csv, export_file_name};
pub use expr::{Formula, FormulaError};
pub use repr::{ReprMode, render, represent};
pub use spec::{
    Answer, Application, ApplicationStatus, Question, QuestionOptions, QuestionType, Response,
};
pub use submit::{SubmitError, blocking_answers, check_submission};
pub use validate::{ValidationError, ValidationResult, answer_is_valid, validate};
pub use visibility::{VisibilityMap, reconcile, should_show, visibility_map};
