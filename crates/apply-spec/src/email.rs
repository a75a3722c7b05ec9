//! HTML confirmation email listing an application's answers.

use std::collections::BTreeMap;

use handlebars::{Handlebars, RenderError, TemplateError, html_escape};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::budget::GRAND_TOTAL_LABEL;
use crate::repr::{ReprMode, represent};
use crate::spec::application::Application;

const SUMMARY_TEMPLATE_NAME: &str = "application-summary";

const SUMMARY_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1.0">
	<title>Application Submitted</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
	<div style="text-align: center; margin-bottom: 30px; padding-bottom: 20px; border-bottom: 2px solid #007bff;">
		<h1 style="color: #007bff; margin-bottom: 10px;">Application Submitted Successfully</h1>
		<p style="color: #666; font-size: 16px;">Your application has been received and is now under review</p>
	</div>
	<div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px; margin-bottom: 30px;">
		<h2 style="color: #333; margin-top: 0; margin-bottom: 15px;">Event</h2>
		<div style="font-size: 18px; font-weight: 600; color: #007bff;">{{event_name}}</div>
		<div style="color: #666; margin-top: 8px;">Reference: {{reference}}</div>
	</div>
	<div style="margin-bottom: 30px;">
		<h2 style="color: #333; margin-bottom: 20px;">Your Responses</h2>
		{{#each pages}}
		{{#unless @first}}<div style="margin: 20px 0; border-top: 1px solid #ddd;"></div>{{/unless}}
		{{#each entries}}
		<div style="margin-bottom: 20px;">
			<div style="font-weight: bold; color: #333; margin-bottom: 8px; padding: 8px; background-color: #f8f9fa; border-left: 3px solid #007bff;">{{title}}</div>
			<div style="padding: 8px; background-color: #fff; border: 1px solid #e9ecef; border-radius: 4px; overflow-x: auto;">{{{body}}}</div>
		</div>
		{{/each}}
		{{else}}
		<p style="color: #666; font-style: italic;">No responses recorded.</p>
		{{/each}}
	</div>
	<div style="margin-top: 40px; text-align: center; color: #666; font-size: 14px; border-top: 1px solid #e9ecef; padding-top: 20px;">
		<p>This is an automated message. Please do not reply to this email.</p>
		<p style="margin: 5px 0;">If you have any questions, please contact the event organizers.</p>
	</div>
</body>
</html>"#;

const TABLE_TEMPLATE_NAME: &str = "answer-table";

const TABLE_TEMPLATE: &str = r#"<table style="width: 100%; border-collapse: collapse; margin: 10px 0;"><thead><tr style="background-color: #f8f9fa;">{{#each header}}<th style="border: 1px solid #dee2e6; padding: 8px; text-align: left; font-weight: 600;">{{this}}</th>{{/each}}</tr></thead><tbody>{{#each rows}}<tr style="background-color: {{background}};{{#if grand_total}} border-top: 2px solid #007bff;{{/if}}">{{#each cells}}<td style="border: 1px solid #dee2e6; padding: 8px;{{#if bold}} font-weight: 700;{{/if}}">{{text}}</td>{{/each}}</tr>{{/each}}</tbody></table>"#;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("invalid email template: {0}")]
    Template(#[from] Box<TemplateError>),
    #[error("failed to render email: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Serialize)]
struct SummaryEntry {
    title: String,
    /// Pre-escaped HTML.
    body: String,
}

#[derive(Debug, Serialize)]
struct SummaryPage {
    entries: Vec<SummaryEntry>,
}

#[derive(Debug, Serialize)]
struct SummaryContext {
    event_name: String,
    reference: String,
    pages: Vec<SummaryPage>,
}

#[derive(Debug, Serialize)]
struct TableCell {
    text: String,
    bold: bool,
}

#[derive(Debug, Serialize)]
struct TableRow {
    background: &'static str,
    grand_total: bool,
    cells: Vec<TableCell>,
}

#[derive(Debug, Serialize)]
struct TableContext {
    header: Vec<String>,
    rows: Vec<TableRow>,
}

/// Renders submission confirmation emails.
pub struct SummaryMailer {
    registry: Handlebars<'static>,
}

impl SummaryMailer {
    pub fn new() -> Result<Self, EmailError> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string(SUMMARY_TEMPLATE_NAME, SUMMARY_TEMPLATE)
            .map_err(Box::new)?;
        registry
            .register_template_string(TABLE_TEMPLATE_NAME, TABLE_TEMPLATE)
            .map_err(Box::new)?;
        Ok(Self { registry })
    }

    /// Answers are grouped by page; answers that render to nothing are left out.
    pub fn render(&self, application: &Application) -> Result<String, EmailError> {
        let context = SummaryContext {
            event_name: application
                .event()
                .and_then(|event| event.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Unknown Event".to_string()),
            reference: application.reference(),
            pages: self.summary_pages(application)?,
        };
        Ok(self.registry.render(SUMMARY_TEMPLATE_NAME, &context)?)
    }

    /// Turns a CSV block (header line plus rows) into an inline-styled HTML table.
    ///
    /// Blocks with fewer than two lines give `""`. A `Grand Total` row is emphasized.
    pub fn table(&self, block: &str) -> Result<String, EmailError> {
        let Some(context) = table_context(block) else {
            return Ok(String::new());
        };
        Ok(self.registry.render(TABLE_TEMPLATE_NAME, &context)?)
    }

    fn summary_pages(&self, application: &Application) -> Result<Vec<SummaryPage>, EmailError> {
        let mut pages: BTreeMap<i64, Vec<SummaryEntry>> = BTreeMap::new();

        for answer in application.answers().unwrap_or_default() {
            let Some(question) = answer.expanded_question() else {
                continue;
            };
            let title = question.plain_title();
            let text = represent(Some(answer), ReprMode::Csv);
            if title.is_empty() || text.trim().is_empty() {
                continue;
            }
            let body = if question.kind.is_tabular() {
                self.table(&text)?
            } else {
                escape_text(&text)
            };
            if body.is_empty() {
                continue;
            }
            pages
                .entry(question.page)
                .or_default()
                .push(SummaryEntry { title, body });
        }

        Ok(pages
            .into_values()
            .map(|entries| SummaryPage { entries })
            .collect())
    }
}

/// Builds the summary email with a one-off [`SummaryMailer`].
pub fn application_summary_email(application: &Application) -> Result<String, EmailError> {
    SummaryMailer::new()?.render(application)
}

/// [`SummaryMailer::table`] with a one-off mailer.
pub fn csv_to_html_table(block: &str) -> Result<String, EmailError> {
    SummaryMailer::new()?.table(block)
}

fn table_context(block: &str) -> Option<TableContext> {
    let block = block.trim();
    if block.is_empty() {
        return None;
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(block.as_bytes());
    let mut records = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => records.push(record),
            Err(error) => debug!(%error, "skipping unreadable csv row"),
        }
    }
    let (header, rows) = records.split_first()?;
    if rows.is_empty() {
        return None;
    }

    let rows = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let grand_total = row.get(0) == Some(GRAND_TOTAL_LABEL);
            let background = if grand_total {
                "#e3f2fd"
            } else if index % 2 == 0 {
                "#ffffff"
            } else {
                "#f8f9fa"
            };
            TableRow {
                background,
                grand_total,
                cells: row
                    .iter()
                    .map(|cell| TableCell {
                        text: cell.to_string(),
                        bold: grand_total,
                    })
                    .collect(),
            }
        })
        .collect();

    Some(TableContext {
        header: header.iter().map(str::to_string).collect(),
        rows,
    })
}

/// Escaped answer text with line breaks kept.
fn escape_text(text: &str) -> String {
    html_escape(text).replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_blocks_are_not_tables() {
        assert_eq!(csv_to_html_table(r#""Item","Price""#).expect("table"), "");
        assert_eq!(csv_to_html_table("   ").expect("table"), "");
    }

    #[test]
    fn grand_total_rows_are_emphasized() {
        let table = csv_to_html_table(
            "\"Item\",\"Price\",\"Quantity\",\"Total\"\n\"Room\",\"100\",\"2\",\"200\"\n\"Grand Total\",\"\",\"\",\"200\"",
        )
        .expect("table");
        assert!(table.starts_with("<table"));
        assert!(table.contains(">Room</td>"));
        assert!(table.contains("#e3f2fd"));
        assert!(table.contains("font-weight: 700;\">200</td>"));
    }

    #[test]
    fn cells_are_escaped_and_quotes_unescaped() {
        let table = csv_to_html_table("\"Name\"\n\"Ann \"\"AJ\"\" <b>\"").expect("table");
        assert!(table.contains("Ann &quot;AJ&quot; &lt;b&gt;"));
        assert!(!table.contains("<b>"));
    }

    #[test]
    fn table_rows_alternate_and_total_is_bold() {
        let mailer = SummaryMailer::new().expect("mailer");
        let table = mailer
            .table("\"Item\",\"Total\"\n\"A\",\"1\"\n\"B\",\"2\"\n\"Grand Total\",\"3\"")
            .expect("table");
        assert_eq!(table.matches("<th ").count(), 2);
        assert!(table.contains(r#"<tr style="background-color: #ffffff;">"#));
        assert!(table.contains(r#"<tr style="background-color: #f8f9fa;">"#));
        assert!(table.contains(r#"<tr style="background-color: #e3f2fd; border-top: 2px solid #007bff;">"#));
        assert_eq!(table.matches("font-weight: 700;").count(), 2);
    }

    #[test]
    fn plain_answers_keep_line_breaks() {
        assert_eq!(escape_text("a < b\nc & d"), "a &lt; b<br>c &amp; d");
    }
}
