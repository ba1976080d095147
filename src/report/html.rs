use super::types::ChecklistResults;
use crate::runner::state::CheckStatus;
use anyhow::Result;
use std::path::Path;

/// Generate HTML report
pub async fn generate(results: &ChecklistResults, output: Option<&Path>) -> Result<()> {
    let html = generate_html(results);

    if let Some(path) = output {
        std::fs::write(path, html)?;
        println!("HTML report saved to: {}", path.display());
    } else {
        println!("{}", html);
    }

    Ok(())
}

/// Write report.html into `output_dir`
pub fn write_report(results: &ChecklistResults, output_dir: &Path) -> Result<std::path::PathBuf> {
    let path = output_dir.join("report.html");
    std::fs::write(&path, generate_html(results))?;
    Ok(path)
}

pub fn generate_html(results: &ChecklistResults) -> String {
    let report = &results.report;
    let total = report.outcomes().len();
    let pass_rate = if total > 0 {
        (report.passed_count() as f64 / total as f64 * 100.0) as u32
    } else {
        0
    };
    let (run_status_text, run_status_class) = if report.all_passed() {
        ("Passed", "passed")
    } else {
        ("Failed", "failed")
    };

    let mut checks_html = String::new();
    for (i, outcome) in report.outcomes().iter().enumerate() {
        let (status_icon, status_class) = match outcome.status {
            CheckStatus::Passed => ("✓", "passed"),
            CheckStatus::Failed => ("✗", "failed"),
            CheckStatus::Skipped => ("○", "skipped"),
        };

        let detail_html = match outcome.status {
            CheckStatus::Passed => format!(
                r#"<div class="detail">{}</div>"#,
                html_escape(&outcome.detail)
            ),
            _ => format!(
                r#"<div class="error-message">{}</div>"#,
                html_escape(&outcome.detail)
            ),
        };

        checks_html.push_str(&format!(
            r#"
                <div class="check {status_class}">
                    <div class="check-icon">{status_icon}</div>
                    <div class="check-content">
                        <div class="check-name">{}. {}</div>
                        <div class="check-meta">
                            <span class="duration">{}ms</span>
                            <span class="timestamp">{}</span>
                        </div>
                        {detail_html}
                    </div>
                </div>
            "#,
            i + 1,
            html_escape(&outcome.check_name),
            outcome.duration_ms,
            outcome.timestamp.format("%H:%M:%S%.3f"),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Checklist Report - {checklist}</title>
    <style>
        :root {{
            --bg-primary: #0a0f1d;
            --bg-secondary: #141b2d;
            --bg-tertiary: #1f2937;
            --border: #374151;
            --text-primary: #f9fafb;
            --text-secondary: #9ca3af;
            --green: #10b981;
            --red: #ef4444;
            --yellow: #f59e0b;
            --purple: #8b5cf6;
        }}
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.5;
            padding: 3rem 1rem;
        }}
        .container {{ max-width: 1000px; margin: 0 auto; }}
        header {{
            margin-bottom: 2.5rem;
            display: flex;
            justify-content: space-between;
            align-items: flex-end;
        }}
        h1 {{ font-size: 2rem; font-weight: 800; }}
        .eyebrow {{
            font-size: 0.875rem;
            font-weight: 600;
            color: var(--purple);
            text-transform: uppercase;
            letter-spacing: 0.1em;
        }}
        .badge {{
            padding: 0.25rem 0.75rem;
            border-radius: 9999px;
            font-size: 0.75rem;
            font-weight: 600;
            text-transform: uppercase;
        }}
        .badge.passed {{ background: rgba(16, 185, 129, 0.1); color: var(--green); }}
        .badge.failed {{ background: rgba(239, 68, 68, 0.1); color: var(--red); }}
        .summary {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
            gap: 1.25rem;
            margin-bottom: 2.5rem;
        }}
        .stat {{
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            padding: 1.25rem;
            border-radius: 1rem;
        }}
        .stat-value {{ font-size: 2.25rem; font-weight: 800; }}
        .stat-label {{
            color: var(--text-secondary);
            font-size: 0.8125rem;
            text-transform: uppercase;
            letter-spacing: 0.05em;
        }}
        .stat.passed .stat-value {{ color: var(--green); }}
        .stat.failed .stat-value {{ color: var(--red); }}
        .stat.skipped .stat-value {{ color: var(--yellow); }}
        .progress-bar {{
            background: var(--bg-secondary);
            height: 12px;
            border-radius: 6px;
            overflow: hidden;
            border: 1px solid var(--border);
            margin-bottom: 3rem;
        }}
        .progress-fill {{
            height: 100%;
            background: linear-gradient(90deg, var(--green), #34d399);
        }}
        .checks {{
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            border-radius: 1.25rem;
            padding: 1rem 1.5rem;
        }}
        .check {{
            padding: 1rem;
            border-radius: 0.75rem;
            display: flex;
            align-items: flex-start;
            gap: 1rem;
        }}
        .check:hover {{ background: var(--bg-tertiary); }}
        .check-icon {{
            width: 2rem;
            height: 2rem;
            display: flex;
            align-items: center;
            justify-content: center;
            border-radius: 0.5rem;
            font-size: 1.25rem;
            flex-shrink: 0;
        }}
        .check.passed .check-icon {{ background: rgba(16, 185, 129, 0.1); color: var(--green); }}
        .check.failed .check-icon {{ background: rgba(239, 68, 68, 0.1); color: var(--red); }}
        .check.skipped .check-icon {{ background: rgba(245, 158, 11, 0.1); color: var(--yellow); }}
        .check-content {{ flex: 1; }}
        .check-name {{ font-family: monospace; font-size: 0.9375rem; font-weight: 500; }}
        .check-meta {{ display: flex; gap: 1rem; margin-top: 0.25rem; }}
        .duration {{ color: var(--text-secondary); font-size: 0.75rem; }}
        .timestamp {{ color: var(--text-secondary); font-size: 0.75rem; font-family: monospace; }}
        .detail {{ color: var(--text-secondary); font-size: 0.8125rem; margin-top: 0.5rem; word-break: break-all; }}
        .error-message {{
            background: rgba(239, 68, 68, 0.1);
            border-radius: 0.5rem;
            padding: 0.75rem;
            margin-top: 0.75rem;
            color: #fca5a5;
            font-size: 0.8125rem;
            font-family: monospace;
            border: 1px solid rgba(239, 68, 68, 0.2);
        }}
        .meta {{
            margin-top: 3rem;
            padding-top: 2rem;
            border-top: 1px solid var(--border);
            color: var(--text-secondary);
            font-size: 0.875rem;
            display: flex;
            justify-content: center;
            gap: 2rem;
        }}
    </style>
</head>
<body>
    <div class="container">
        <header>
            <div>
                <div class="eyebrow">Checklist on {backend}</div>
                <h1>{checklist} <span class="badge {run_status_class}">{run_status_text}</span></h1>
            </div>
            <div style="text-align: right;">
                <div style="font-size: 0.875rem; color: var(--text-secondary);">Run Duration</div>
                <div style="font-size: 1.25rem; font-weight: 700;">{duration}</div>
            </div>
        </header>

        <div class="summary">
            <div class="stat">
                <div class="stat-value">{total}</div>
                <div class="stat-label">Checks</div>
            </div>
            <div class="stat passed">
                <div class="stat-value">{passed}</div>
                <div class="stat-label">Passed</div>
            </div>
            <div class="stat failed">
                <div class="stat-value">{failed}</div>
                <div class="stat-label">Failed</div>
            </div>
            <div class="stat skipped">
                <div class="stat-value">{skipped}</div>
                <div class="stat-label">Skipped</div>
            </div>
        </div>

        <div class="progress-bar">
            <div class="progress-fill" style="width: {pass_rate}%"></div>
        </div>

        <div class="checks">
            {checks_html}
        </div>

        <div class="meta">
            <span>Run: {run_id}</span>
            <span>Started: {started}</span>
            <span>Generated: {generated}</span>
        </div>
    </div>
</body>
</html>"#,
        checklist = html_escape(&results.checklist),
        backend = html_escape(&results.backend),
        duration = format_duration(report.duration_ms()),
        passed = report.passed_count(),
        failed = report.failed_count(),
        skipped = report.skipped_count(),
        run_id = html_escape(&results.run_id),
        started = report.started_at().to_rfc3339(),
        generated = html_escape(&results.generated_at),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60000;
        let seconds = (ms % 60000) as f64 / 1000.0;
        format!("{}m {:.0}s", minutes, seconds)
    }
}
