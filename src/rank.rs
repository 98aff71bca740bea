use serde::Serialize;

use crate::models::AssigneeStats;
use crate::roster::Workload;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAssignee<'a> {
    pub rank: usize,
    pub assignee: &'a str,
    #[serde(flatten)]
    pub stats: &'a AssigneeStats,
}

/// Least loaded first. The sort is stable, so equal scores keep roster order.
pub fn rank(workload: &Workload) -> Vec<RankedAssignee<'_>> {
    let mut entries: Vec<(&str, &AssigneeStats)> = Vec::with_capacity(workload.len());
    entries.extend(workload.iter());
    entries.sort_by_key(|(_, stats)| stats.score);

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (assignee, stats))| RankedAssignee {
            rank: index + 1,
            assignee,
            stats,
        })
        .collect()
}
