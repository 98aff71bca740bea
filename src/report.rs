use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::models::{Backend, StaleIssue, StaleKey};
use crate::rank::RankedAssignee;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
}

pub fn render_leaderboard(
    ranking: &[RankedAssignee<'_>],
    format: OutputFormat,
    show_urls: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(leaderboard_text(ranking, show_urls)),
        OutputFormat::Csv => leaderboard_csv(ranking),
        OutputFormat::Json => {
            serde_json::to_string_pretty(ranking).context("failed to encode leaderboard")
        }
    }
}

pub fn render_stale(
    stale: &BTreeMap<StaleKey, StaleIssue>,
    now: DateTime<Utc>,
    threshold_days: i64,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let rows = stale_rows(stale, now);
    match format {
        OutputFormat::Text => Ok(stale_text(&rows, threshold_days)),
        OutputFormat::Csv => stale_csv(&rows),
        OutputFormat::Json => serde_json::to_string_pretty(&rows).context("failed to encode stale issues"),
    }
}

pub fn leaderboard_text(ranking: &[RankedAssignee<'_>], show_urls: bool) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Workload Ranking (least loaded first)");
    let _ = writeln!(output);

    if ranking.is_empty() {
        let _ = writeln!(output, "No roster members configured.");
        return output;
    }

    for entry in ranking {
        let stats = entry.stats;
        let _ = writeln!(
            output,
            "{}. {} score {} across {} issues",
            entry.rank, entry.assignee, stats.score, stats.total_issues
        );
        let _ = writeln!(
            output,
            "   ovn {} | sdn {} | other {} | escalations {}",
            stats.ovn_issues, stats.sdn_issues, stats.other_issues, stats.escalations
        );
        let _ = writeln!(
            output,
            "   new {} | assigned {} | post {}",
            stats.by_status.new, stats.by_status.assigned, stats.by_status.post
        );
        if show_urls {
            for url in &stats.issue_urls {
                let _ = writeln!(output, "   - {url}");
            }
        }
    }

    output
}

fn leaderboard_csv(ranking: &[RankedAssignee<'_>]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "rank",
        "assignee",
        "score",
        "total_issues",
        "ovn_issues",
        "sdn_issues",
        "other_issues",
        "escalations",
        "new",
        "assigned",
        "post",
    ])?;

    for entry in ranking {
        let stats = entry.stats;
        writer.write_record([
            entry.rank.to_string(),
            entry.assignee.to_string(),
            stats.score.to_string(),
            stats.total_issues.to_string(),
            stats.ovn_issues.to_string(),
            stats.sdn_issues.to_string(),
            stats.other_issues.to_string(),
            stats.escalations.to_string(),
            stats.by_status.new.to_string(),
            stats.by_status.assigned.to_string(),
            stats.by_status.post.to_string(),
        ])?;
    }

    into_string(writer)
}

#[derive(Debug, Serialize)]
struct StaleRow<'a> {
    backend: Backend,
    id: &'a str,
    age_days: i64,
    #[serde(flatten)]
    issue: &'a StaleIssue,
}

/// Oldest first across both backends; equal ages fall back to backend, then id.
fn stale_rows(stale: &BTreeMap<StaleKey, StaleIssue>, now: DateTime<Utc>) -> Vec<StaleRow<'_>> {
    let mut rows: Vec<StaleRow<'_>> = stale
        .iter()
        .map(|(key, issue)| StaleRow {
            backend: key.backend,
            id: key.id.as_str(),
            age_days: (now - issue.created_at).num_days(),
            issue,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.issue
            .created_at
            .cmp(&b.issue.created_at)
            .then(a.backend.cmp(&b.backend))
            .then(a.id.cmp(b.id))
    });
    rows
}

fn stale_text(rows: &[StaleRow<'_>], threshold_days: i64) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "# Untriaged Issues (NEW for more than {threshold_days} days)"
    );
    let _ = writeln!(output);

    if rows.is_empty() {
        let _ = writeln!(output, "No stale issues.");
        return output;
    }

    for row in rows {
        let issue = row.issue;
        let _ = writeln!(
            output,
            "- [{}] {} ({} days, {}): {}",
            row.backend.label(),
            row.id,
            row.age_days,
            issue.status.label(),
            issue.summary
        );

        let mut component = issue.component.clone();
        if let Some(sub) = &issue.sub_component {
            let _ = write!(component, " / {sub}");
        }
        let release = if issue.target_release.is_empty() {
            "unset".to_string()
        } else {
            issue.target_release.join(", ")
        };
        let _ = writeln!(
            output,
            "  component {component} | target {release} | created {}",
            issue.created_at.format("%Y-%m-%d")
        );
        let _ = writeln!(output, "  {}", issue.url);
    }

    output
}

fn stale_csv(rows: &[StaleRow<'_>]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "backend",
        "id",
        "age_days",
        "status",
        "component",
        "sub_component",
        "target_release",
        "created_at",
        "summary",
        "url",
    ])?;

    for row in rows {
        let issue = row.issue;
        writer.write_record([
            row.backend.label().to_string(),
            row.id.to_string(),
            row.age_days.to_string(),
            issue.status.label().to_string(),
            issue.component.clone(),
            issue.sub_component.clone().unwrap_or_default(),
            issue.target_release.join(" "),
            issue.created_at.to_rfc3339(),
            issue.summary.clone(),
            issue.url.clone(),
        ])?;
    }

    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> anyhow::Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush csv output: {}", err.error()))?;
    String::from_utf8(bytes).context("csv output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssigneeStats, Status, StatusCounts};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    fn stats() -> AssigneeStats {
        AssigneeStats {
            score: 15,
            total_issues: 2,
            escalations: 1,
            ovn_issues: 1,
            sdn_issues: 0,
            other_issues: 1,
            by_status: StatusCounts {
                new: 1,
                assigned: 1,
                post: 0,
            },
            issue_urls: vec!["https://jira.example.com/browse/OCPBUGS-1".to_string()],
        }
    }

    fn stale_entry(id: &str, backend: Backend, age: i64) -> (StaleKey, StaleIssue) {
        (
            StaleKey {
                backend,
                id: id.to_string(),
            },
            StaleIssue {
                summary: format!("summary {id}"),
                url: format!("https://tracker.example.com/{id}"),
                created_at: now() - Duration::days(age),
                status: Status::New,
                component: "Networking".to_string(),
                target_release: vec!["4.18.0".to_string()],
                sub_component: (backend == Backend::Bugzilla).then(|| "ovn-kubernetes".to_string()),
            },
        )
    }

    #[test]
    fn text_leaderboard_lists_counters_and_optional_urls() {
        let stats = stats();
        let ranking = [RankedAssignee {
            rank: 1,
            assignee: "alice@example.com",
            stats: &stats,
        }];

        let text = leaderboard_text(&ranking, false);
        assert!(text.contains("1. alice@example.com score 15 across 2 issues"));
        assert!(text.contains("ovn 1 | sdn 0 | other 1 | escalations 1"));
        assert!(text.contains("new 1 | assigned 1 | post 0"));
        assert!(!text.contains("OCPBUGS-1"));

        let text = leaderboard_text(&ranking, true);
        assert!(text.contains("   - https://jira.example.com/browse/OCPBUGS-1"));
    }

    #[test]
    fn csv_leaderboard_has_header_and_rows() {
        let stats = stats();
        let ranking = [RankedAssignee {
            rank: 1,
            assignee: "alice@example.com",
            stats: &stats,
        }];

        let csv = render_leaderboard(&ranking, OutputFormat::Csv, false).expect("renders");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("rank,assignee,score"));
        assert_eq!(lines[1], "1,alice@example.com,15,2,1,0,1,1,1,1,0");
    }

    #[test]
    fn json_leaderboard_flattens_stats() {
        let stats = stats();
        let ranking = [RankedAssignee {
            rank: 1,
            assignee: "alice@example.com",
            stats: &stats,
        }];

        let json = render_leaderboard(&ranking, OutputFormat::Json, false).expect("renders");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value[0]["assignee"], "alice@example.com");
        assert_eq!(value[0]["score"], 15);
        assert_eq!(value[0]["by_status"]["new"], 1);
    }

    #[test]
    fn empty_outputs_say_so() {
        assert!(leaderboard_text(&[], false).contains("No roster members configured."));
        let text = render_stale(&BTreeMap::new(), now(), 30, OutputFormat::Text).expect("renders");
        assert!(text.contains("No stale issues."));
    }

    #[test]
    fn stale_list_is_oldest_first_across_backends() {
        let stale: BTreeMap<StaleKey, StaleIssue> = [
            stale_entry("OCPBUGS-2", Backend::Jira, 45),
            stale_entry("300", Backend::Bugzilla, 35),
            stale_entry("OCPBUGS-1", Backend::Jira, 90),
            stale_entry("200", Backend::Bugzilla, 60),
        ]
        .into_iter()
        .collect();

        let rows = stale_rows(&stale, now());
        let ids: Vec<&str> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, ["OCPBUGS-1", "200", "OCPBUGS-2", "300"]);
        assert_eq!(rows[0].age_days, 90);
        assert_eq!(rows[0].backend, Backend::Jira);

        let text = stale_text(&rows, 30);
        assert!(text.contains("NEW for more than 30 days"));
        assert!(text.contains("- [bugzilla] 200 (60 days, NEW): summary 200"));
        assert!(text.contains("component Networking / ovn-kubernetes | target 4.18.0"));
        assert!(text.contains("- [jira] OCPBUGS-1 (90 days, NEW): summary OCPBUGS-1"));
    }

    #[test]
    fn equal_ages_order_by_backend_then_id() {
        let stale: BTreeMap<StaleKey, StaleIssue> = [
            stale_entry("OCPBUGS-9", Backend::Jira, 50),
            stale_entry("9", Backend::Bugzilla, 50),
            stale_entry("10", Backend::Bugzilla, 50),
        ]
        .into_iter()
        .collect();

        let rows = stale_rows(&stale, now());
        let ids: Vec<&str> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, ["10", "9", "OCPBUGS-9"]);
    }

    #[test]
    fn stale_csv_leaves_missing_sub_component_blank() {
        let stale: BTreeMap<StaleKey, StaleIssue> =
            [stale_entry("OCPBUGS-7", Backend::Jira, 40)].into_iter().collect();

        let csv = render_stale(&stale, now(), 30, OutputFormat::Csv).expect("renders");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("jira,OCPBUGS-7,40,NEW,Networking,,4.18.0,"));
    }
}
