//! Markdown rendering of API payloads for the assistant.
//!
//! Everything here is pure: payload in, text out. Sections whose backing
//! sequence is empty are omitted entirely rather than rendered as bare
//! headings.

use std::cmp::Ordering;
use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::types::{AnalysisResult, HistoricalFinding, ScriptType};

/// Render a full analysis result.
pub fn format_analysis_result(result: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Analysis Results: {}\n", result.project_name);
    let _ = writeln!(out, "**Project Type**: {}", result.project_type);
    let _ = writeln!(out, "**Scan Date**: {}", format_timestamp(&result.scan_date));
    let _ = writeln!(out, "**Complexity Factor**: {}\n", result.complexity_factor);

    let stats = &result.stats;
    out.push_str("## Statistics\n\n");
    let _ = writeln!(out, "- **Total Issues**: {}", stats.total_issues);
    let _ = writeln!(out, "- **High Severity**: {}", stats.high_severity);
    let _ = writeln!(out, "- **Medium Severity**: {}", stats.medium_severity);
    let _ = writeln!(out, "- **Low Severity**: {}\n", stats.low_severity);

    if !result.summary.is_empty() {
        out.push_str("## Summary Findings\n\n");
        for (idx, finding) in result.summary.iter().enumerate() {
            let _ = writeln!(out, "### {}. {}", idx + 1, finding.category);
            let _ = writeln!(out, "- **Pattern**: {}", finding.pattern);
            let _ = writeln!(out, "- **Count**: {}", finding.count);
            let _ = writeln!(out, "- **Severity**: {}", finding.severity);
            let _ = writeln!(out, "- **Effort**: {} points\n", finding.effort);
        }
    }

    if !result.actions.is_empty() {
        out.push_str("## Recommended Actions\n\n");
        for (idx, action) in result.actions.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. **{}** ({} points)",
                idx + 1,
                action.category,
                action.effort_weight
            );
            for sub in &action.sub_actions {
                let _ = writeln!(out, "   - {} ({} points)", sub.action, sub.effort);
            }
            out.push('\n');
        }
    }

    out
}

/// Direction of the issue count between the first and last scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing(u64),
    Decreasing(u64),
    Stable,
}

impl Trend {
    /// Compare the earliest and latest scans. `None` with fewer than two.
    pub fn between(findings: &[HistoricalFinding]) -> Option<Self> {
        let (first, last) = match findings {
            [first, .., last] => (first, last),
            _ => return None,
        };
        let delta = last.total_issues.abs_diff(first.total_issues);
        Some(match last.total_issues.cmp(&first.total_issues) {
            Ordering::Greater => Self::Increasing(delta),
            Ordering::Less => Self::Decreasing(delta),
            Ordering::Equal => Self::Stable,
        })
    }

    fn describe(&self) -> String {
        match self {
            Self::Increasing(delta) => format!("📈 Increasing: {delta} issues added"),
            Self::Decreasing(delta) => format!("📉 Decreasing: {delta} issues resolved"),
            Self::Stable => "➡️ Stable: no change in issue count".to_string(),
        }
    }
}

/// Render the scan history of a project. Callers handle the empty case.
pub fn format_historical_findings(findings: &[HistoricalFinding], project_name: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Historical Findings: {project_name}\n");
    let _ = writeln!(out, "**Total Scans**: {}\n", findings.len());

    for (idx, finding) in findings.iter().enumerate() {
        let _ = writeln!(out, "## Scan {}: {}", idx + 1, format_date(&finding.scan_date));
        let _ = writeln!(out, "- **Total Issues**: {}", finding.total_issues);
        let _ = writeln!(out, "- **Complexity**: {}", finding.complexity_factor);
        let _ = writeln!(out, "- **Effort Required**: {} points\n", finding.total_effort);
    }

    if let Some(trend) = Trend::between(findings) {
        out.push_str("## Trend Analysis\n\n");
        let _ = writeln!(out, "{}", trend.describe());
    }

    out
}

/// Wrap a generated script with usage instructions.
pub fn format_script(script_type: ScriptType, script: &str) -> String {
    let instructions = match script_type {
        ScriptType::Bash => {
            "To use this script:\n\
             1. Save as analyze.sh\n\
             2. Make executable: chmod +x analyze.sh\n\
             3. Run: ./analyze.sh /path/to/project\n\
             4. Results will be saved as findings.json"
        }
        ScriptType::Powershell => {
            "To use this script:\n\
             1. Save as analyze.ps1\n\
             2. Run: .\\analyze.ps1 -ProjectPath \"C:\\path\\to\\project\"\n\
             3. Results will be saved as findings.json"
        }
    };
    format!(
        "# {} Analysis Script\n\n{instructions}\n\n```{}\n{}\n```",
        script_type.as_str().to_uppercase(),
        script_type.as_str(),
        script.trim_end_matches('\n'),
    )
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Interpret a wire timestamp: RFC 3339, naive ISO 8601 (taken as UTC), or
/// epoch milliseconds.
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn format_timestamp(value: &serde_json::Value) -> String {
    parse_timestamp(value)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| raw_timestamp(value))
}

fn format_date(value: &serde_json::Value) -> String {
    parse_timestamp(value)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw_timestamp(value))
}

fn raw_timestamp(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "unknown".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecommendedAction, Stats, SubAction, SummaryFinding};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            project_name: "orders-api".into(),
            project_type: ".NET".into(),
            scan_date: json!("2026-03-01T10:15:00Z"),
            complexity_factor: 1.5,
            stats: Stats {
                total_issues: 7,
                high_severity: 2,
                medium_severity: 4,
                low_severity: 1,
            },
            summary: vec![
                SummaryFinding {
                    category: "Session State".into(),
                    pattern: "HttpContext.Session".into(),
                    count: 5,
                    severity: "high".into(),
                    effort: 8.0,
                },
                SummaryFinding {
                    category: "Static Mutable Field".into(),
                    pattern: "static Dictionary".into(),
                    count: 2,
                    severity: "medium".into(),
                    effort: 3.0,
                },
            ],
            actions: vec![RecommendedAction {
                category: "Session State".into(),
                effort_weight: 8.0,
                sub_actions: vec![SubAction {
                    action: "Move session to Redis".into(),
                    effort: 5.0,
                    description: None,
                }],
            }],
        }
    }

    fn scan(total_issues: i64) -> HistoricalFinding {
        HistoricalFinding {
            scan_date: json!("2026-01-10T08:00:00Z"),
            total_issues,
            complexity_factor: 1.2,
            total_effort: 20.0,
        }
    }

    #[test]
    fn analysis_result_renders_all_sections() {
        let text = format_analysis_result(&sample_result());
        assert!(text.starts_with("# Analysis Results: orders-api\n"));
        assert!(text.contains("**Scan Date**: 2026-03-01 10:15:00 UTC"));
        assert!(text.contains("**Complexity Factor**: 1.5"));
        assert!(text.contains("- **Total Issues**: 7"));
        assert!(text.contains("### 1. Session State\n"));
        assert!(text.contains("### 2. Static Mutable Field\n"));
        assert!(text.contains("- **Effort**: 8 points"));
        assert!(text.contains("1. **Session State** (8 points)\n   - Move session to Redis (5 points)\n"));
    }

    #[test]
    fn empty_summary_omits_heading() {
        let mut result = sample_result();
        result.summary.clear();
        let text = format_analysis_result(&result);
        assert!(!text.contains("Summary Findings"));
        assert!(text.contains("## Recommended Actions"));
    }

    #[test]
    fn empty_actions_omits_heading() {
        let mut result = sample_result();
        result.actions.clear();
        let text = format_analysis_result(&result);
        assert!(!text.contains("Recommended Actions"));
        assert!(text.contains("## Summary Findings"));
    }

    #[test]
    fn statistics_block_always_present() {
        let text = format_analysis_result(&AnalysisResult::default());
        assert!(text.contains("## Statistics"));
        assert!(text.contains("**Scan Date**: unknown"));
    }

    #[test]
    fn increasing_trend_reports_delta() {
        let text = format_historical_findings(&[scan(10), scan(14)], "orders-api");
        assert!(text.contains("**Total Scans**: 2"));
        assert!(text.contains("## Trend Analysis"));
        assert!(text.contains("Increasing: 4 issues added"));
    }

    #[test]
    fn decreasing_trend_reports_absolute_delta() {
        let text = format_historical_findings(&[scan(14), scan(12), scan(9)], "orders-api");
        assert!(text.contains("Decreasing: 5 issues resolved"));
    }

    #[test]
    fn stable_trend_has_no_delta() {
        let text = format_historical_findings(&[scan(10), scan(10)], "orders-api");
        assert!(text.contains("Stable: no change in issue count"));
        assert!(!text.contains("issues added"));
        assert!(!text.contains("issues resolved"));
    }

    #[test]
    fn single_scan_has_no_trend() {
        let text = format_historical_findings(&[scan(10)], "orders-api");
        assert!(text.contains("## Scan 1: 2026-01-10"));
        assert!(!text.contains("Trend Analysis"));
    }

    #[test]
    fn trend_uses_first_and_last_only() {
        let findings = [scan(10), scan(50), scan(10)];
        assert_eq!(Trend::between(&findings), Some(Trend::Stable));
        assert_eq!(Trend::between(&findings[..1]), None);
        assert_eq!(Trend::between(&[]), None);
    }

    #[test]
    fn trend_handles_extreme_issue_counts() {
        assert_eq!(
            Trend::between(&[scan(i64::MIN), scan(1)]),
            Some(Trend::Increasing(i64::MAX as u64 + 2))
        );
        assert_eq!(
            Trend::between(&[scan(i64::MAX), scan(i64::MIN)]),
            Some(Trend::Decreasing(u64::MAX))
        );
        let text = format_historical_findings(&[scan(0), scan(i64::MIN)], "orders-api");
        assert!(text.contains("Decreasing: 9223372036854775808 issues resolved"));
    }

    #[test]
    fn timestamps_accept_several_encodings() {
        let expected = parse_timestamp(&json!("2026-03-01T10:15:00Z")).unwrap();
        assert_eq!(parse_timestamp(&json!("2026-03-01T10:15:00.000")), Some(expected));
        assert_eq!(parse_timestamp(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(parse_timestamp(&json!("last tuesday")), None);
        assert_eq!(format_date(&json!("last tuesday")), "last tuesday");
    }

    #[test]
    fn script_is_fenced_with_instructions() {
        let text = format_script(ScriptType::Bash, "#!/bin/bash\necho hi\n");
        assert!(text.starts_with("# BASH Analysis Script\n"));
        assert!(text.contains("chmod +x analyze.sh"));
        assert!(text.ends_with("```bash\n#!/bin/bash\necho hi\n```"));

        let ps = format_script(ScriptType::Powershell, "Write-Host hi");
        assert!(ps.starts_with("# POWERSHELL Analysis Script\n"));
        assert!(ps.contains(".\\analyze.ps1 -ProjectPath"));
        assert!(ps.contains("```powershell\nWrite-Host hi\n```"));
    }
}
