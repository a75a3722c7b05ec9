use apply_spec::{
    Application, SummaryMailer, application_summary_email, export_columns, export_csv,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "application" => include_str!("../tests/fixtures/application.json"),
        "second_application" => include_str!("../tests/fixtures/second_application.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn load(name: &str) -> Application {
    serde_json::from_str(fixture(name)).expect("deserialize")
}

#[test]
fn summary_email_lists_visible_answers_by_page() {
    let html = application_summary_email(&load("application")).expect("render");

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Spring Hackathon"));
    assert!(html.contains("Reference: SH-012"));
    assert!(html.contains("Team name"));
    assert!(!html.contains("<b>name</b>"));
    assert!(html.contains("Night Owls"));
    assert!(!html.contains("Hardware needs"));
    assert!(!html.contains(">Rules<"));

    let team = html.find("Night Owls").expect("team");
    let tools = html.find("Rust, Elixir").expect("tools");
    let budget = html.find("Grand Total").expect("budget table");
    assert!(team < tools && tools < budget);
    assert_eq!(html.matches("<table").count(), 3);
    assert_eq!(html.matches("border-top: 1px solid #ddd;").count(), 2);
}

#[test]
fn summary_email_escapes_answer_text() {
    let mailer = SummaryMailer::new().expect("mailer");
    let html = mailer.render(&load("second_application")).expect("render");
    assert!(html.contains("Byte, &quot;Bandits&quot;"));
    assert!(html.contains("Reference: rec_app_02"));
}

#[test]
fn export_has_one_column_per_question() {
    let applications = vec![load("application"), load("second_application")];
    let titles: Vec<String> = export_columns(&applications)
        .into_iter()
        .map(|column| column.title)
        .collect();
    assert_eq!(
        titles,
        vec![
            "Team name",
            "Rules",
            "Track",
            "Hardware needs",
            "Tools",
            "Members",
            "Portfolio",
            "Schedule",
            "Budget",
        ]
    );

    let mut buffer = Vec::new();
    export_csv(&applications, &mut buffer).expect("export");
    let mut reader = csv::ReaderBuilder::new().from_reader(buffer.as_slice());
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(&headers[0], "Application");
    assert_eq!(&headers[1], "Status");

    let rows: Vec<csv::StringRecord> = reader.records().map(|row| row.expect("row")).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "SH-012");
    assert_eq!(&rows[0][1], "draft");
    assert_eq!(&rows[0][2], "Night Owls");
    assert!(rows[0][10].ends_with(r#""Grand Total","","","385""#));
    assert_eq!(&rows[1][0], "rec_app_02");
    assert_eq!(&rows[1][1], "editsRequested");
    assert_eq!(&rows[1][2], "Byte, \"Bandits\"");
    assert_eq!(&rows[1][4], "Hardware");
    assert_eq!(&rows[1][6], "");
}
