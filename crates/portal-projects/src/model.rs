//! Project 2025 Data Model

use chrono::{DateTime, Utc};
use portal_access::Sid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type StageId = u32;
pub type MilestoneId = u32;

/// Fixed project stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub stage_id: StageId,
    pub stage_name: String,
}

/// Fixed milestone within a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub milestone_id: MilestoneId,
    pub stage_id: StageId,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Complete,
    InProgress,
    Incomplete,
}

/// Raw per-account milestone columns as kept by the account team
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub sid: Option<Sid>,
    /// `milestone_<id>` column values; absent means NULL
    pub values: BTreeMap<MilestoneId, String>,
}

impl ProjectRecord {
    pub fn new(sid: Sid) -> Self {
        Self {
            sid: Some(sid),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, milestone_id: MilestoneId, value: &str) -> Self {
        self.values.insert(milestone_id, value.to_string());
        self
    }

    pub fn value(&self, milestone_id: MilestoneId) -> Option<&str> {
        self.values.get(&milestone_id).map(String::as_str)
    }
}

/// Free-text note on a milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note_id: u64,
    pub sid: Sid,
    pub milestone_id: MilestoneId,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Milestone with its derived status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneCard {
    pub milestone: Milestone,
    pub status: MilestoneStatus,
}

/// One stage column of the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageBoard {
    pub stage: Stage,
    pub completed: usize,
    pub total: usize,
    pub milestones: Vec<MilestoneCard>,
}

/// Full tracker view for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectBoard {
    pub sid: Sid,
    pub stages: Vec<StageBoard>,
}
