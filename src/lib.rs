//! Folds open issues from Bugzilla and Jira into one per-person workload
//! ranking and a list of issues left untriaged too long.

pub mod aggregate;
pub mod bugzilla;
pub mod config;
pub mod error;
pub mod jira;
pub mod models;
pub mod normalize;
pub mod rank;
pub mod report;
pub mod roster;
pub mod sources;
pub mod telemetry;
pub mod weights;
