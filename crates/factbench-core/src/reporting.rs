//! HTML report generator for a single run.
//!
//! Produces a standalone page with embedded CSS: summary cards, a table per
//! classification axis, and every example with its response and fact verdicts.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::domain::{Breakdown, ExampleResult, RunRecord};

/// Commit hashes are shortened to this many characters for display.
const SHORT_COMMIT_CHARS: usize = 12;

/// File name the CLI uses for a run's HTML report.
pub fn report_file_name(agent_name: &str, at: DateTime<Local>) -> String {
    format!("test-results-{agent_name}-{}.html", at.format("%Y%m%d-%H%M%S"))
}

/// Render a run record as an HTML page.
pub fn render_html_report(record: &RunRecord) -> String {
    let mut html = String::new();
    let title = format!("Test Results - {}", record.agent_name);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&title)));
    html.push_str("<style>\n");
    html.push_str(CSS_STYLES);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&title)));
    html.push_str(&format!(
        "<p class=\"meta\">Run <code>{}</code> | {} | {}</p>\n",
        escape_html(&record.id),
        record.timestamp.to_rfc3339(),
        record.status
    ));

    // Summary cards
    let summary = &record.summary;
    html.push_str("<div class=\"cards\">\n");
    for (label, value) in [
        ("Examples", summary.total_examples.to_string()),
        ("Passed", summary.passed_examples.to_string()),
        (
            "Facts verified",
            format!("{}/{}", summary.llm_verified_facts, summary.total_facts),
        ),
        ("Accuracy", format!("{:.1}%", summary.accuracy)),
    ] {
        html.push_str(&format!(
            "<div class=\"card\"><div class=\"value\">{value}</div><div class=\"label\">{label}</div></div>\n"
        ));
    }
    html.push_str("</div>\n");

    push_breakdown(&mut html, "By type", &record.results_by_type);
    push_breakdown(&mut html, "By difficulty", &record.results_by_difficulty);
    push_breakdown(&mut html, "By scope", &record.results_by_scope);

    html.push_str("<h2>Examples</h2>\n");
    if record.examples.is_empty() {
        html.push_str("<p class=\"empty\">No examples were evaluated.</p>\n");
    }
    for example in &record.examples {
        push_example(&mut html, example);
    }

    html.push_str("<footer><p>Generated by factbench</p></footer>\n");
    html.push_str("</body>\n</html>\n");
    html
}

/// Render and write the report to `path`.
pub fn write_html_report(path: &Path, record: &RunRecord) -> std::io::Result<()> {
    fs::write(path, render_html_report(record))
}

fn push_breakdown(html: &mut String, heading: &str, breakdown: &Breakdown) {
    if breakdown.is_empty() {
        return;
    }
    html.push_str(&format!("<h2>{heading}</h2>\n"));
    html.push_str("<table>\n<thead><tr><th>Category</th><th>Examples</th><th>Passed</th><th>Facts</th><th>Accuracy</th></tr></thead>\n<tbody>\n");
    for (category, stats) in breakdown {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}/{}</td><td>{:.1}%</td></tr>\n",
            escape_html(category),
            stats.examples,
            stats.passed,
            stats.verified,
            stats.total,
            stats.accuracy_pct()
        ));
    }
    html.push_str("</tbody>\n</table>\n");
}

fn push_example(html: &mut String, example: &ExampleResult) {
    let class = if example.passed { "passed" } else { "failed" };
    let commit: String = example.commit.chars().take(SHORT_COMMIT_CHARS).collect();

    html.push_str(&format!("<div class=\"example {class}\">\n"));
    html.push_str(&format!(
        "<h3>Example {} <span class=\"score\">{}/{}</span></h3>\n",
        example.index + 1,
        example.verified_count(),
        example.facts.len()
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Repo: <a href=\"{url}\">{url}</a> | Commit: <code>{}</code></p>\n",
        escape_html(&commit),
        url = escape_html(&example.repo_url),
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Type: {} | Difficulty: {} | Scope: {}</p>\n",
        escape_html(&example.metadata.kind),
        escape_html(&example.metadata.difficulty),
        escape_html(&example.metadata.scope)
    ));
    html.push_str(&format!(
        "<p class=\"question\">{}</p>\n",
        escape_html(&example.question)
    ));

    let response_class = if example.is_error() { " class=\"error-response\"" } else { "" };
    let response = if example.response.is_empty() {
        "(empty)".to_string()
    } else {
        escape_html(&example.response)
    };
    html.push_str(&format!("<pre{response_class}>{response}</pre>\n"));

    html.push_str("<ul class=\"facts\">\n");
    for (fact, verified) in example.facts.iter().zip(&example.judge_verdicts) {
        let (class, icon) = if *verified {
            ("verified", "&#10003;")
        } else {
            ("unverified", "&#10007;")
        };
        html.push_str(&format!(
            "<li class=\"{class}\"><span class=\"icon\">{icon}</span> {}</li>\n",
            escape_html(fact)
        ));
    }
    html.push_str("</ul>\n</div>\n");
}

/// Escape HTML special characters.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const CSS_STYLES: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 1100px; margin: 0 auto; padding: 20px; color: #333; background: #fafafa; }
h1 { border-bottom: 2px solid #333; padding-bottom: 10px; }
h2 { color: #555; }
table { border-collapse: collapse; width: 100%; margin: 10px 0; }
th, td { border: 1px solid #ddd; padding: 8px 12px; text-align: left; }
th { background: #f5f5f5; }
.cards { display: flex; gap: 12px; margin: 20px 0; }
.card { flex: 1; background: white; border: 1px solid #ddd; border-radius: 6px; padding: 15px; text-align: center; }
.card .value { font-size: 1.8em; font-weight: bold; }
.card .label { color: #666; font-size: 0.9em; }
.example { border: 1px solid #ddd; border-radius: 6px; padding: 15px; margin: 10px 0; background: white; }
.example.passed { border-left: 4px solid #388e3c; }
.example.failed { border-left: 4px solid #d32f2f; }
.example h3 { margin-top: 0; }
.score { color: #666; font-weight: normal; }
.meta { color: #666; font-size: 0.9em; }
.question { font-weight: 600; }
pre { white-space: pre-wrap; background: #f5f5f5; padding: 10px; border-radius: 4px; max-height: 400px; overflow-y: auto; }
pre.error-response { background: #ffebee; color: #b71c1c; }
.facts { list-style: none; padding-left: 0; }
.facts li { padding: 4px 0; }
.facts li.verified .icon { color: #388e3c; }
.facts li.unverified .icon { color: #d32f2f; }
.empty { color: #999; text-align: center; padding: 40px; }
footer { margin-top: 40px; padding-top: 10px; border-top: 1px solid #ddd; color: #999; font-size: 0.85em; text-align: center; }
a { color: #1976d2; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{error_sentinel, ExampleMetadata, RunResults, RunStatus};
    use chrono::TimeZone;

    fn record_with(response: &str, question: &str) -> RunRecord {
        let mut results = RunResults::new("ask-forge");
        results.record(ExampleResult {
            index: 0,
            repo_url: "https://github.com/org/repo".to_string(),
            commit: "0123456789abcdef0123".to_string(),
            question: question.to_string(),
            response: response.to_string(),
            facts: vec!["uses <Arc> for sharing".to_string()],
            judge_verdicts: vec![true],
            metadata: ExampleMetadata::default(),
            passed: true,
        });
        RunRecord::snapshot("20260101-000000-ask-forge", &results, RunStatus::Complete, None)
    }

    #[test]
    fn test_report_structure_and_escaping() {
        let html = render_html_report(&record_with("fine", "Why <script>alert(1)</script>?"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Test Results - ask-forge"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("uses &lt;Arc&gt; for sharing"));
        assert!(html.contains("<code>0123456789ab</code>"));
        assert!(html.contains("By type"));
        assert!(html.contains("100.0%"));
    }

    #[test]
    fn test_error_response_highlighted() {
        let html = render_html_report(&record_with(&error_sentinel("boom"), "q"));
        assert!(html.contains("<pre class=\"error-response\">[ERROR: boom]</pre>"));
    }

    #[test]
    fn test_empty_run() {
        let record = RunRecord::snapshot("r", &RunResults::new("ask-forge"), RunStatus::Complete, None);
        let html = render_html_report(&record);
        assert!(html.contains("No examples were evaluated."));
        assert!(!html.contains("By type"));
    }

    #[test]
    fn test_write_and_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let name = report_file_name("ask-forge", at);
        assert_eq!(name, "test-results-ask-forge-20260304-050607.html");

        let path = dir.path().join(name);
        write_html_report(&path, &record_with("ok", "q")).unwrap();
        assert!(fs::read_to_string(path).unwrap().contains("</html>"));
    }
}
