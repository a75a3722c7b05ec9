use std::collections::HashMap;
use std::io;

use chrono::NaiveDate;
use thiserror::Error;

use crate::repr::{ReprMode, represent};
use crate::spec::answer::Answer;
use crate::spec::application::Application;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush export: {0}")]
    Io(#[from] io::Error),
}

/// A spreadsheet column backed by one question.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportColumn {
    pub question_id: String,
    pub title: String,
    pub page: i64,
}

/// Columns for every question answered in any application, ordered by
/// page and then by first appearance.
pub fn export_columns(applications: &[Application]) -> Vec<ExportColumn> {
    let mut columns: Vec<ExportColumn> = Vec::new();
    for answer in applications
        .iter()
        .filter_map(Application::answers)
        .flatten()
    {
        let Some(question) = answer.expanded_question() else {
            continue;
        };
        if columns.iter().any(|column| column.question_id == question.id) {
            continue;
        }
        let title = question.plain_title();
        columns.push(ExportColumn {
            question_id: question.id.clone(),
            title: if title.is_empty() {
                question.id.clone()
            } else {
                title
            },
            page: question.page,
        });
    }
    columns.sort_by_key(|column| column.page);
    columns
}

/// Writes one row per application with one column per question.
pub fn export_csv<W: io::Write>(applications: &[Application], writer: W) -> Result<(), ExportError> {
    let columns = export_columns(applications);
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["Application".to_string(), "Status".to_string()];
    header.extend(columns.iter().map(|column| column.title.clone()));
    csv_writer.write_record(&header)?;

    for application in applications {
        let mut by_question: HashMap<&str, &Answer> = HashMap::new();
        for answer in application.answers().unwrap_or_default() {
            if let Some(question) = answer.expanded_question() {
                by_question.entry(question.id.as_str()).or_insert(answer);
            }
        }

        let mut record = vec![
            application.reference(),
            application.status.as_str().to_string(),
        ];
        record.extend(columns.iter().map(|column| {
            represent(
                by_question.get(column.question_id.as_str()).copied(),
                ReprMode::Csv,
            )
        }));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Download name for an export, e.g. `applications_export_3_items_2024-05-01.csv`.
pub fn export_file_name(count: usize, date: NaiveDate) -> String {
    format!(
        "applications_export_{count}_items_{}.csv",
        date.format("%Y-%m-%d")
    )
}
