//! File-manager state and its reducer.
//!
//! Every change to [`ManagerState`] goes through [`ManagerState::apply`]. The
//! observable [`Phase`] is derived from the fields rather than stored, so an
//! error can never coexist with a stale "loading" flag.

use std::fmt;
use std::str::FromStr;

use fm_protocol::{path, FileEntry};
use serde::{Deserialize, Serialize};

use crate::notification::Notification;

/// Listing layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Grid,
    #[default]
    List,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Grid => f.write_str("grid"),
            ViewMode::List => f.write_str("list"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(ViewMode::Grid),
            "list" => Ok(ViewMode::List),
            other => Err(format!("unknown view mode: {}", other)),
        }
    }
}

/// Observable phase of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing outstanding, no error.
    Idle,
    /// At least one listing or mutating request is outstanding.
    Loading,
    /// The last operation failed.
    Error,
    /// A notification is waiting for acknowledgement.
    Notifying,
}

/// Tag attached to a listing request.
///
/// A listing response is applied only if its ticket still matches the
/// state's current generation and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTicket {
    pub generation: u64,
    pub path: String,
}

/// State transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Change the working directory. Clears the listing and selection and
    /// invalidates outstanding listings.
    Navigate(String),
    /// A listing request is about to be sent.
    BeginListing,
    /// A listing request completed.
    ListingLoaded {
        ticket: ListingTicket,
        entries: Vec<FileEntry>,
    },
    /// A listing request failed.
    ListingFailed {
        ticket: ListingTicket,
        message: String,
    },
    /// A mutating request is about to be sent.
    BeginOperation,
    /// A mutating request succeeded.
    OperationSucceeded { clear_selection: bool },
    /// A mutating request failed.
    OperationFailed { message: String },
    /// A mutating request failed with a known cause.
    OperationNotified { notification: Notification },
    /// An operation was refused before any request was sent.
    InputRejected { message: String },
    DismissNotification,
    Select(String),
    Deselect(String),
    ToggleSelection(String),
    SelectAll,
    ClearSelection,
    SetViewMode(ViewMode),
}

/// Result of applying an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed.
    Applied,
    /// A stale listing response was dropped.
    Discarded,
    /// The action was a no-op.
    Unchanged,
}

/// Client-side state of one file-manager view.
///
/// Equality compares what a view renders; the listing generation is left
/// out.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerState {
    working_dir: String,
    entries: Vec<FileEntry>,
    selected: Vec<String>,
    view_mode: ViewMode,
    in_flight: usize,
    error: Option<String>,
    notification: Option<Notification>,
    #[serde(skip)]
    generation: u64,
}

impl PartialEq for ManagerState {
    fn eq(&self, other: &Self) -> bool {
        self.working_dir == other.working_dir
            && self.entries == other.entries
            && self.selected == other.selected
            && self.view_mode == other.view_mode
            && self.in_flight == other.in_flight
            && self.error == other.error
            && self.notification == other.notification
    }
}

impl Default for ManagerState {
    fn default() -> Self {
        Self::new(path::ROOT, ViewMode::default())
    }
}

impl ManagerState {
    /// Create an empty state rooted at `working_dir`.
    pub fn new(working_dir: &str, view_mode: ViewMode) -> Self {
        Self {
            working_dir: path::normalize(working_dir),
            entries: Vec::new(),
            selected: Vec::new(),
            view_mode,
            in_flight: 0,
            error: None,
            notification: None,
            generation: 0,
        }
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    /// Current listing, in backend order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Selected entry names, in selection order.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.iter().any(|s| s == name)
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Look up an entry of the current listing by name.
    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Derived phase. A pending notification takes precedence over loading,
    /// and loading over a recorded error.
    pub fn phase(&self) -> Phase {
        if self.notification.as_ref().is_some_and(|n| n.open) {
            Phase::Notifying
        } else if self.in_flight > 0 {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Error
        } else {
            Phase::Idle
        }
    }

    /// Ticket identifying the newest listing request for the current path.
    pub fn listing_ticket(&self) -> ListingTicket {
        ListingTicket {
            generation: self.generation,
            path: self.working_dir.clone(),
        }
    }

    fn is_current(&self, ticket: &ListingTicket) -> bool {
        ticket.generation == self.generation && ticket.path == self.working_dir
    }

    fn settle(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn has_entry(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Apply an action.
    pub fn apply(&mut self, action: Action) -> Transition {
        match action {
            Action::Navigate(target) => {
                self.working_dir = path::normalize(&target);
                self.entries.clear();
                self.selected.clear();
                self.generation += 1;
                Transition::Applied
            }
            Action::BeginListing => {
                self.generation += 1;
                self.in_flight += 1;
                Transition::Applied
            }
            Action::ListingLoaded { ticket, entries } => {
                self.settle();
                if !self.is_current(&ticket) {
                    return Transition::Discarded;
                }
                self.entries = entries;
                let entries = &self.entries;
                self.selected
                    .retain(|name| entries.iter().any(|e| &e.name == name));
                self.error = None;
                Transition::Applied
            }
            Action::ListingFailed { ticket, message } => {
                self.settle();
                if !self.is_current(&ticket) {
                    return Transition::Discarded;
                }
                self.error = Some(message);
                Transition::Applied
            }
            Action::BeginOperation => {
                self.in_flight += 1;
                Transition::Applied
            }
            Action::OperationSucceeded { clear_selection } => {
                self.settle();
                self.error = None;
                if clear_selection {
                    self.selected.clear();
                }
                Transition::Applied
            }
            Action::OperationFailed { message } => {
                self.settle();
                self.error = Some(message);
                Transition::Applied
            }
            Action::OperationNotified { notification } => {
                self.settle();
                self.error = Some(notification.description.clone());
                self.notification = Some(notification);
                Transition::Applied
            }
            Action::InputRejected { message } => {
                self.error = Some(message);
                Transition::Applied
            }
            Action::DismissNotification => match self.notification.take() {
                Some(_) => Transition::Applied,
                None => Transition::Unchanged,
            },
            Action::Select(name) => {
                if self.is_selected(&name) || !self.has_entry(&name) {
                    return Transition::Unchanged;
                }
                self.selected.push(name);
                Transition::Applied
            }
            Action::Deselect(name) => {
                let before = self.selected.len();
                self.selected.retain(|s| s != &name);
                if self.selected.len() == before {
                    Transition::Unchanged
                } else {
                    Transition::Applied
                }
            }
            Action::ToggleSelection(name) => {
                if self.is_selected(&name) {
                    self.apply(Action::Deselect(name))
                } else {
                    self.apply(Action::Select(name))
                }
            }
            Action::SelectAll => {
                let all: Vec<String> = self.entries.iter().map(|e| e.name.clone()).collect();
                if all == self.selected {
                    return Transition::Unchanged;
                }
                self.selected = all;
                Transition::Applied
            }
            Action::ClearSelection => {
                if self.selected.is_empty() {
                    return Transition::Unchanged;
                }
                self.selected.clear();
                Transition::Applied
            }
            Action::SetViewMode(mode) => {
                if self.view_mode == mode {
                    return Transition::Unchanged;
                }
                self.view_mode = mode;
                Transition::Applied
            }
        }
    }
}
