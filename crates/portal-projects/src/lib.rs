//! Project 2025 Tracker
//!
//! Fixed four-stage onboarding plan per client account. Milestone status is
//! derived from the account team's raw columns; free-text answers are kept
//! as milestone notes.

pub mod model;
pub mod repository;
pub mod status;
pub mod tracker;

pub use model::{
    Milestone, MilestoneCard, MilestoneId, MilestoneStatus, Note, ProjectBoard, ProjectRecord, Stage, StageBoard,
    StageId,
};
pub use repository::{standard_template, InMemoryProjectRepository, ProjectRepository};
pub use status::{derive_statuses, rule_for, status_of, MilestoneRule};
pub use tracker::{ProjectError, ProjectResult, ProjectTracker};
