//! Issue board models.
//!
//! `BoardState` is the owned, in-memory store for a single board: its lists,
//! the issues shown in them and the issue currently open in the sidebar.
//! All mutations go through `&mut BoardState`.

use serde::{Deserialize, Serialize};

/// A project label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub title: String,
}

/// A user that can be assigned to issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Project reference carried by an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueProject {
    pub id: i64,

    /// Full namespaced path (e.g., "gitlab-org/gitlab").
    pub path: String,
}

/// An issue as displayed on a board card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Global issue ID.
    pub id: i64,

    /// Project-scoped issue number.
    pub iid: i64,

    pub title: String,

    pub project: IssueProject,

    #[serde(default)]
    pub labels: Vec<Label>,

    #[serde(default)]
    pub assignees: Vec<User>,
}

impl Issue {
    /// IDs of all labels on the issue, in display order.
    pub fn label_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.labels.iter().map(|label| label.id)
    }

    /// IDs of all assignees, in display order.
    pub fn assignee_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.assignees.iter().map(|user| user.id)
    }
}

/// A column on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: i64,

    pub title: String,

    /// Label backing this list. Backlog and closed lists have none.
    pub label: Option<Label>,

    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl BoardList {
    /// Find an issue in this list by ID.
    pub fn find_issue(&self, issue_id: i64) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.id == issue_id)
    }

    /// Append an issue unless it is already present.
    pub fn add_issue(&mut self, issue: Issue) {
        if self.find_issue(issue.id).is_none() {
            self.issues.push(issue);
        }
    }

    /// Remove an issue by ID. Returns whether anything was removed.
    pub fn remove_issue(&mut self, issue_id: i64) -> bool {
        let before = self.issues.len();
        self.issues.retain(|issue| issue.id != issue_id);
        self.issues.len() != before
    }
}

/// Board-level scope settings plus the lists shown on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,

    /// Labels every issue on the board is scoped to.
    #[serde(default)]
    pub labels: Vec<Label>,

    /// Milestone the board is scoped to.
    pub milestone_id: Option<i64>,

    /// Weight the board is scoped to.
    pub weight: Option<i64>,

    /// Assignee the board is scoped to.
    pub assignee_id: Option<i64>,

    #[serde(default)]
    pub lists: Vec<BoardList>,
}

impl Board {
    /// Whether the board is scoped to a milestone. Zero means unset.
    pub fn has_milestone(&self) -> bool {
        self.milestone_id.is_some_and(|id| id != 0)
    }

    /// Whether the board is scoped to a weight. Zero means unset.
    pub fn tracks_weight(&self) -> bool {
        self.weight.is_some_and(|weight| weight != 0)
    }

    pub fn label_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.labels.iter().map(|label| label.id)
    }

    pub fn list(&self, list_id: i64) -> Option<&BoardList> {
        self.lists.iter().find(|list| list.id == list_id)
    }

    pub fn list_mut(&mut self, list_id: i64) -> Option<&mut BoardList> {
        self.lists.iter_mut().find(|list| list.id == list_id)
    }
}

/// Sidebar detail state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueDetail {
    pub issue: Option<Issue>,
}

/// Owned state of the board currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    pub board: Board,

    #[serde(default)]
    pub detail: IssueDetail,
}

impl BoardState {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            detail: IssueDetail::default(),
        }
    }

    /// IDs of every list that currently holds the issue, in board order.
    pub fn lists_containing(&self, issue_id: i64) -> Vec<i64> {
        self.board
            .lists
            .iter()
            .filter(|list| list.find_issue(issue_id).is_some())
            .map(|list| list.id)
            .collect()
    }

    /// Find an issue anywhere on the board.
    pub fn find_issue(&self, issue_id: i64) -> Option<&Issue> {
        self.board
            .lists
            .iter()
            .find_map(|list| list.find_issue(issue_id))
    }

    /// Remove the issue from each of the given lists.
    ///
    /// Returns the IDs of the lists it was actually removed from.
    pub fn remove_issue_from_lists(&mut self, issue_id: i64, list_ids: &[i64]) -> Vec<i64> {
        let mut removed = Vec::with_capacity(list_ids.len());
        for &list_id in list_ids {
            if let Some(list) = self.board.list_mut(list_id) {
                if list.remove_issue(issue_id) {
                    removed.push(list_id);
                }
            }
        }
        removed
    }

    /// Add the issue to each of the given lists. Unknown list IDs are skipped.
    pub fn add_issue_to_lists(&mut self, issue: &Issue, list_ids: &[i64]) {
        for &list_id in list_ids {
            match self.board.list_mut(list_id) {
                Some(list) => list.add_issue(issue.clone()),
                None => log::warn!(
                    "[board] List {} disappeared before issue {} could be restored",
                    list_id,
                    issue.id
                ),
            }
        }
    }

    /// Open an issue in the sidebar.
    pub fn select_issue(&mut self, issue: Issue) {
        self.detail.issue = Some(issue);
    }

    /// Close the sidebar detail.
    pub fn clear_detail(&mut self) {
        self.detail.issue = None;
    }
}
