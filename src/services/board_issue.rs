//! Removing an issue from a board.
//!
//! Removal is optimistic: the issue disappears from every list on the board
//! as soon as the update request is on its way, and is put back into the
//! same lists if GitLab rejects the update.

use crate::error::AppError;
use crate::models::board::{Board, BoardState, Issue};
use crate::services::flash::{Flash, FlashSink};
use crate::services::gitlab_client::GitLabClient;
use futures::future::BoxFuture;
use serde::{Serialize, Serializer};
use std::collections::HashSet;

/// Placeholder in the update URL template replaced by the project path.
pub const PROJECT_PATH_PLACEHOLDER: &str = ":project_path";

/// Placeholder in the update URL template replaced by the issue IID.
pub const ISSUE_IID_PLACEHOLDER: &str = ":iid";

/// Milestone ID telling GitLab to remove the milestone.
pub const NO_MILESTONE: i64 = -1;

/// Message shown when the update request fails.
pub const REMOVE_FAILED_MESSAGE: &str = "Failed to remove issue from board, please try again.";

/// Label IDs the issue keeps after leaving the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelIds {
    Ids(Vec<i64>),
    /// Serialized as `[""]`, which clears every label.
    ClearAll,
}

impl Serialize for LabelIds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ids(ids) => serializer.collect_seq(ids),
            Self::ClearAll => [""].serialize(serializer),
        }
    }
}

/// Assignee IDs the issue keeps after leaving the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeIds {
    Ids(Vec<i64>),
    /// Serialized as `["0"]`, which explicitly unassigns.
    Unassign,
}

impl Serialize for AssigneeIds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ids(ids) => serializer.collect_seq(ids),
            Self::Unassign => ["0"].serialize(serializer),
        }
    }
}

/// Issue attributes sent with the update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueUpdateParams {
    pub label_ids: LabelIds,

    pub assignee_ids: AssigneeIds,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<i64>,

    /// `Some(None)` serializes as `"weight": null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Option<i64>>,
}

/// Body of the issue update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueUpdatePayload {
    pub issue: IssueUpdateParams,
}

/// Sends issue updates to GitLab.
pub trait IssueUpdater: Send + Sync {
    fn update_issue<'a>(
        &'a self,
        url: &'a str,
        payload: &'a IssueUpdatePayload,
    ) -> BoxFuture<'a, Result<(), AppError>>;
}

impl IssueUpdater for GitLabClient {
    fn update_issue<'a>(
        &'a self,
        url: &'a str,
        payload: &'a IssueUpdatePayload,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(self.patch_json(url, payload))
    }
}

/// Outcome of a successful removal.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedIssue {
    pub issue_id: i64,

    /// Lists the issue was taken out of, in board order.
    pub list_ids: Vec<i64>,

    pub payload: IssueUpdatePayload,
}

/// Build the update that strips the board's scope from an issue.
///
/// `list_ids` are the lists currently holding the issue; their labels are
/// dropped along with the board labels.
pub fn build_update_payload(board: &Board, issue: &Issue, list_ids: &[i64]) -> IssueUpdatePayload {
    let board_label_ids: HashSet<i64> = board.label_ids().collect();
    let list_label_ids: HashSet<i64> = list_ids
        .iter()
        .filter_map(|&id| board.list(id))
        .filter_map(|list| list.label.as_ref().map(|label| label.id))
        .collect();

    let kept_labels: Vec<i64> = issue
        .label_ids()
        .filter(|id| !list_label_ids.contains(id) && !board_label_ids.contains(id))
        .collect();

    let kept_assignees: Vec<i64> = issue
        .assignee_ids()
        .filter(|&id| Some(id) != board.assignee_id)
        .collect();

    IssueUpdatePayload {
        issue: IssueUpdateParams {
            label_ids: if kept_labels.is_empty() {
                LabelIds::ClearAll
            } else {
                LabelIds::Ids(kept_labels)
            },
            assignee_ids: if kept_assignees.is_empty() {
                AssigneeIds::Unassign
            } else {
                AssigneeIds::Ids(kept_assignees)
            },
            milestone_id: board.has_milestone().then_some(NO_MILESTONE),
            weight: board.tracks_weight().then_some(None),
        },
    }
}

/// Removes issues from the board they are shown on.
#[derive(Debug, Clone)]
pub struct BoardIssueRemover {
    update_template: String,
}

impl BoardIssueRemover {
    /// `update_template` is the issue update URL with `:project_path`
    /// (and optionally `:iid`) placeholders.
    pub fn new(update_template: impl Into<String>) -> Self {
        Self {
            update_template: update_template.into(),
        }
    }

    /// Update URL for a specific issue.
    pub fn update_url(&self, issue: &Issue) -> String {
        self.update_template
            .replace(PROJECT_PATH_PLACEHOLDER, &issue.project.path)
            .replace(ISSUE_IID_PLACEHOLDER, &issue.iid.to_string())
    }

    /// Apply the local half of a removal and return the pending update.
    ///
    /// The issue is taken out of every list that holds it and the sidebar
    /// detail is cleared before this returns, so the board can be rendered
    /// without the issue while the update is in flight. Send the update with
    /// [`PendingRemoval::dispatch`] and settle it with
    /// [`PendingRemoval::finish`].
    ///
    /// `list_id` is the list the user acted on. It must hold the issue:
    /// otherwise the call fails with `NotFound` and the board is left
    /// untouched, even when other lists do hold it. Beyond that check the
    /// issue leaves every list, not just `list_id`.
    pub fn begin_removal(
        &self,
        state: &mut BoardState,
        issue_id: i64,
        list_id: i64,
    ) -> Result<PendingRemoval, AppError> {
        let list = state
            .board
            .list(list_id)
            .ok_or_else(|| AppError::not_found_with_id("BoardList", list_id.to_string()))?;
        let issue = list
            .find_issue(issue_id)
            .cloned()
            .ok_or_else(|| AppError::not_found_with_id("Issue", issue_id.to_string()))?;

        let list_ids = state.lists_containing(issue_id);
        let payload = build_update_payload(&state.board, &issue, &list_ids);
        let url = self.update_url(&issue);

        let list_ids = state.remove_issue_from_lists(issue_id, &list_ids);
        state.clear_detail();
        log::debug!("[board] Removed issue {} from lists {:?}", issue_id, list_ids);

        Ok(PendingRemoval {
            issue,
            list_ids,
            url,
            payload,
        })
    }

    /// Remove an issue and wait for GitLab to confirm.
    ///
    /// Runs [`Self::begin_removal`], the update request and
    /// [`PendingRemoval::finish`] back to back. The state stays borrowed
    /// for the whole call; hosts that render while the request is pending
    /// drive the three steps themselves.
    ///
    /// Like [`Self::begin_removal`], this rejects a `list_id` that does not
    /// hold the issue instead of removing it from the board regardless.
    pub async fn remove_issue<U, F>(
        &self,
        state: &mut BoardState,
        issue_id: i64,
        list_id: i64,
        updater: &U,
        flash: &F,
    ) -> Result<RemovedIssue, AppError>
    where
        U: IssueUpdater + ?Sized,
        F: FlashSink + ?Sized,
    {
        let pending = self.begin_removal(state, issue_id, list_id)?;
        let result = pending.dispatch(updater).await;
        pending.finish(state, result, flash)
    }
}

/// A removal applied locally whose update request has not settled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRemoval {
    /// The issue as it was before removal, used for rollback.
    pub issue: Issue,

    /// Lists the issue was taken out of, in board order.
    pub list_ids: Vec<i64>,

    pub url: String,

    pub payload: IssueUpdatePayload,
}

impl PendingRemoval {
    /// Send the issue update.
    pub fn dispatch<'a, U>(&'a self, updater: &'a U) -> BoxFuture<'a, Result<(), AppError>>
    where
        U: IssueUpdater + ?Sized,
    {
        updater.update_issue(&self.url, &self.payload)
    }

    /// Settle the removal with the outcome of the update request.
    ///
    /// On failure the issue goes back into the lists it was removed from,
    /// an alert is flashed and the request error is returned. The sidebar
    /// detail stays cleared.
    pub fn finish<F>(
        self,
        state: &mut BoardState,
        result: Result<(), AppError>,
        flash: &F,
    ) -> Result<RemovedIssue, AppError>
    where
        F: FlashSink + ?Sized,
    {
        match result {
            Ok(()) => Ok(RemovedIssue {
                issue_id: self.issue.id,
                list_ids: self.list_ids,
                payload: self.payload,
            }),
            Err(err) => {
                log::warn!(
                    "[board] Failed to remove issue {} from board: {}",
                    self.issue.id,
                    err
                );
                flash.flash(Flash::alert(REMOVE_FAILED_MESSAGE));
                state.add_issue_to_lists(&self.issue, &self.list_ids);
                Err(err)
            }
        }
    }
}
