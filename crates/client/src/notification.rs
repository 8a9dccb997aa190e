//! Blocking user notifications.

use serde::Serialize;

/// Title of the non-empty-directory notification.
pub const DIRECTORY_NOT_EMPTY_TITLE: &str = "Cannot delete";

/// Description of the non-empty-directory notification.
pub const DIRECTORY_NOT_EMPTY_DESCRIPTION: &str = "cannot delete: directory not empty";

/// Default acknowledgement label.
pub const DEFAULT_ACCEPT_LABEL: &str = "OK";

/// What accepting a notification does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptAction {
    /// Close the notification.
    Dismiss,
    /// Close the notification and reload the listing.
    Reload,
}

/// A notification waiting for acknowledgement.
///
/// A newer notification replaces the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub open: bool,
    pub title: String,
    pub description: String,
    pub accept_label: String,
    pub on_accept: AcceptAction,
}

impl Notification {
    /// Create an open notification that is dismissed on accept.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            open: true,
            title: title.into(),
            description: description.into(),
            accept_label: DEFAULT_ACCEPT_LABEL.to_string(),
            on_accept: AcceptAction::Dismiss,
        }
    }

    pub fn with_accept(mut self, label: impl Into<String>, action: AcceptAction) -> Self {
        self.accept_label = label.into();
        self.on_accept = action;
        self
    }

    /// Raised when the backend refuses to delete a folder with contents.
    ///
    /// Accepting it reloads the listing.
    pub fn directory_not_empty() -> Self {
        Self::new(DIRECTORY_NOT_EMPTY_TITLE, DIRECTORY_NOT_EMPTY_DESCRIPTION)
            .with_accept(DEFAULT_ACCEPT_LABEL, AcceptAction::Reload)
    }
}
