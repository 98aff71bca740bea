use std::collections::HashMap;

use crate::models::AssigneeStats;

/// The people whose workload is tracked, in the order they were listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    members: Vec<String>,
}

impl Roster {
    /// Blank entries are ignored and duplicates keep their first position.
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for member in members {
            let member = member.as_ref().trim();
            if member.is_empty() || unique.iter().any(|existing| existing == member) {
                continue;
            }
            unique.push(member.to_string());
        }
        Self { members: unique }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn zeroed_stats(&self) -> Workload {
        Workload {
            order: self.members.clone(),
            stats: self
                .members
                .iter()
                .map(|member| (member.clone(), AssigneeStats::default()))
                .collect(),
        }
    }
}

/// Per-assignee statistics for every roster member. Entries are created up
/// front and never added or removed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    order: Vec<String>,
    stats: HashMap<String, AssigneeStats>,
}

impl Workload {
    #[cfg(test)]
    pub(crate) fn contains(&self, assignee: &str) -> bool {
        self.stats.contains_key(assignee)
    }

    pub fn get(&self, assignee: &str) -> Option<&AssigneeStats> {
        self.stats.get(assignee)
    }

    pub(crate) fn get_mut(&mut self, assignee: &str) -> Option<&mut AssigneeStats> {
        self.stats.get_mut(assignee)
    }

    /// Iterates in roster order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssigneeStats)> {
        self.order
            .iter()
            .filter_map(|name| self.stats.get(name).map(|stats| (name.as_str(), stats)))
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
