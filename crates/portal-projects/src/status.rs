//! Milestone status derivation
//!
//! Each milestone column is filled in a different way by the account team,
//! so each milestone id maps to exactly one interpretation rule.

use crate::model::{MilestoneId, MilestoneStatus, ProjectRecord};
use std::collections::HashMap;

/// How a milestone column is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneRule {
    /// `Y` / `N` flag
    YesNo,
    /// Free text; any value completes the milestone and becomes a note
    Presence,
    /// Meeting progress dropdown
    Meeting,
    /// `Yes - Active` / `Yes - Not Active` / other dropdown
    ActiveDropdown,
    /// Not tracked by a column
    Untracked,
}

pub fn rule_for(milestone_id: MilestoneId) -> MilestoneRule {
    match milestone_id {
        1..=5 | 7 => MilestoneRule::YesNo,
        8 | 9 => MilestoneRule::ActiveDropdown,
        6 | 10 | 11 | 20 | 21 => MilestoneRule::Presence,
        19 => MilestoneRule::Meeting,
        _ => MilestoneRule::Untracked,
    }
}

/// Status of one milestone under `record`
pub fn status_of(record: &ProjectRecord, milestone_id: MilestoneId) -> MilestoneStatus {
    let value = record.value(milestone_id).map(str::trim).filter(|v| !v.is_empty());

    match (rule_for(milestone_id), value) {
        (MilestoneRule::YesNo, Some("Y")) => MilestoneStatus::Complete,
        (MilestoneRule::ActiveDropdown, Some("Yes - Active" | "Yes - Not Active")) => MilestoneStatus::Complete,
        (MilestoneRule::Presence, Some(_)) => MilestoneStatus::Complete,
        (MilestoneRule::Meeting, Some("Had Meeting" | "Not Required")) => MilestoneStatus::Complete,
        (MilestoneRule::Meeting, Some("Meeting Booked" | "Trying to Arrange")) => MilestoneStatus::InProgress,
        _ => MilestoneStatus::Incomplete,
    }
}

/// Statuses for `milestone_ids`; anything without a record is incomplete
pub fn derive_statuses(
    record: Option<&ProjectRecord>,
    milestone_ids: impl IntoIterator<Item = MilestoneId>,
) -> HashMap<MilestoneId, MilestoneStatus> {
    milestone_ids
        .into_iter()
        .map(|id| {
            let status = record
                .map(|r| status_of(r, id))
                .unwrap_or(MilestoneStatus::Incomplete);
            (id, status)
        })
        .collect()
}

/// Free-text values that should be kept as milestone notes
pub fn captured_notes(record: &ProjectRecord) -> Vec<(MilestoneId, String)> {
    record
        .values
        .iter()
        .filter(|(id, _)| rule_for(**id) == MilestoneRule::Presence)
        .map(|(id, v)| (*id, v.trim().to_string()))
        .filter(|(_, v)| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProjectRecord {
        ProjectRecord::new("SID-1".into())
            .with(1, "Y")
            .with(2, "N")
            .with(6, "Brand kit received 12/02")
            .with(8, "Yes - Not Active")
            .with(9, "No")
            .with(10, "   ")
            .with(19, "Meeting Booked")
    }

    #[test]
    fn test_yes_no_milestones() {
        let r = record();
        assert_eq!(status_of(&r, 1), MilestoneStatus::Complete);
        assert_eq!(status_of(&r, 2), MilestoneStatus::Incomplete);
        assert_eq!(status_of(&r, 3), MilestoneStatus::Incomplete);
    }

    #[test]
    fn test_dropdown_milestones_ignore_yes_no() {
        let r = ProjectRecord::new("SID-1".into()).with(8, "Y");
        assert_eq!(status_of(&r, 8), MilestoneStatus::Incomplete);
        assert_eq!(status_of(&record(), 8), MilestoneStatus::Complete);
        assert_eq!(status_of(&record(), 9), MilestoneStatus::Incomplete);
    }

    #[test]
    fn test_presence_milestones() {
        let r = record();
        assert_eq!(status_of(&r, 6), MilestoneStatus::Complete);
        assert_eq!(status_of(&r, 10), MilestoneStatus::Incomplete);
        assert_eq!(status_of(&r, 11), MilestoneStatus::Incomplete);
    }

    #[test]
    fn test_meeting_milestone() {
        assert_eq!(status_of(&record(), 19), MilestoneStatus::InProgress);
        let had = ProjectRecord::new("SID-1".into()).with(19, "Not Required");
        assert_eq!(status_of(&had, 19), MilestoneStatus::Complete);
        let other = ProjectRecord::new("SID-1".into()).with(19, "Cancelled");
        assert_eq!(status_of(&other, 19), MilestoneStatus::Incomplete);
    }

    #[test]
    fn test_untracked_and_missing_record() {
        assert_eq!(status_of(&record(), 14), MilestoneStatus::Incomplete);
        let statuses = derive_statuses(None, [1, 6, 19]);
        assert!(statuses.values().all(|s| *s == MilestoneStatus::Incomplete));
        assert_eq!(statuses.len(), 3);
    }

    #[test]
    fn test_captured_notes_only_for_presence_columns() {
        let notes = captured_notes(&record());
        assert_eq!(notes, vec![(6, "Brand kit received 12/02".to_string())]);
    }
}
