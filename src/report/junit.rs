use super::types::ChecklistResults;
use crate::runner::state::{CheckStatus, Outcome};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Generate JUnit XML report string from ChecklistResults
pub fn generate_junit_xml(results: &ChecklistResults) -> Result<String> {
    let report = &results.report;
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let tests = report.outcomes().len().to_string();
    let failures = report.failed_count().to_string();
    let skipped = report.skipped_count().to_string();
    let time = seconds(report.duration_ms());

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "lumi-checklist-run"));
    suites_start.push_attribute(("tests", tests.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("skipped", skipped.as_str()));
    suites_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // One suite per run
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", results.checklist.as_str()));
    suite_start.push_attribute(("tests", tests.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("skipped", skipped.as_str()));
    suite_start.push_attribute(("id", results.run_id.as_str()));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", report.started_at().to_rfc3339().as_str()));
    suite_start.push_attribute(("hostname", results.backend.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    let classname = results.checklist.replace(['/', ' '], ".");
    for outcome in report.outcomes() {
        write_test_case(&mut writer, &classname, outcome)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    classname: &str,
    outcome: &Outcome,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", outcome.check_name.as_str()));
    case_start.push_attribute(("classname", classname));
    case_start.push_attribute(("time", seconds(outcome.duration_ms).as_str()));

    match outcome.status {
        CheckStatus::Passed => {
            writer.write_event(Event::Start(case_start))?;
            writer.write_event(Event::Start(BytesStart::new("system-out")))?;
            writer.write_event(Event::Text(BytesText::new(&outcome.detail)))?;
            writer.write_event(Event::End(BytesEnd::new("system-out")))?;
        }
        CheckStatus::Failed => {
            writer.write_event(Event::Start(case_start))?;
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", outcome.detail.as_str()));
            fail_start.push_attribute(("type", "CheckFailed"));
            writer.write_event(Event::Start(fail_start))?;
            writer.write_event(Event::Text(BytesText::new(&outcome.detail)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        CheckStatus::Skipped => {
            writer.write_event(Event::Start(case_start))?;
            let mut skip = BytesStart::new("skipped");
            skip.push_attribute(("message", outcome.detail.as_str()));
            writer.write_event(Event::Empty(skip))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Generate JUnit report to a file or stdout
pub async fn generate(results: &ChecklistResults, output: Option<&Path>) -> Result<()> {
    let xml = generate_junit_xml(results)?;

    if let Some(path) = output {
        std::fs::write(path, xml)?;
        println!("JUnit report saved to: {}", path.display());
    } else {
        println!("{}", xml);
    }
    Ok(())
}

/// Write report to file
pub fn write_report(results: &ChecklistResults, output_dir: &Path) -> Result<std::path::PathBuf> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    Ok(path)
}
