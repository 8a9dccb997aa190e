//! The file-manager client.
//!
//! [`FileManagerClient`] owns one [`ManagerState`] and turns each user action
//! into an API call. Whatever the backend answers is folded into one
//! [`Outcome`]:
//!
//! - **refresh**: the operation succeeded and the listing is reloaded
//! - **error**: the error is recorded in state (and, for known causes, a
//!   notification is raised)
//! - **binary result**: downloaded bytes are handed to a [`DownloadSink`]
//!
//! Failures are recorded in state rather than returned, except for uploads,
//! which also return the error to the caller.

use std::path::PathBuf;

use fm_protocol::{path, ApiRequest, FileEntry, ProtocolError, TransportError, UploadFile};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::notification::{AcceptAction, Notification};
use crate::sink::{DownloadSink, SinkError};
use crate::state::{Action, ManagerState, Transition, ViewMode};
use crate::transport::Transport;

/// Message recorded when a download does not complete.
pub const DOWNLOAD_FAILED: &str = "Download failed";

/// Message recorded when a multi-item operation gets no names.
pub const NO_ITEMS_SELECTED: &str = "no items selected";

/// HTTP status the backend answers with when deleting a non-empty folder.
const DIRECTORY_NOT_EMPTY_STATUS: u16 = 400;

/// Errors produced by file-manager operations.
///
/// The display text is what ends up in [`ManagerState::error`]: backend
/// rejections show the backend's own text.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("{0}")]
    InvalidInput(String),
}

/// How an operation settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded and the listing was reloaded. The reload's
    /// own result is recorded in state.
    Refreshed,
    /// The listing response arrived after a newer listing was requested and
    /// was dropped.
    Stale,
    /// The operation failed; the message is also recorded in state.
    Failed { message: String },
    /// The operation failed with a known cause and raised a notification.
    Notified(Notification),
    /// The download was saved to the given location.
    Downloaded(PathBuf),
    /// A notification was closed without further action.
    Dismissed,
}

impl Outcome {
    /// Whether the operation reached its goal.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Refreshed | Outcome::Downloaded(_) | Outcome::Dismissed
        )
    }
}

/// Client for the remote file manager.
pub struct FileManagerClient<T: Transport> {
    transport: T,
    state: RwLock<ManagerState>,
}

impl<T: Transport> FileManagerClient<T> {
    /// Create a client rooted at `/` in list view.
    pub fn new(transport: T) -> Self {
        Self::with_state(transport, ManagerState::default())
    }

    /// Create a client starting from the given directory and view mode.
    pub fn with_root(transport: T, root_dir: &str, view_mode: ViewMode) -> Self {
        Self::with_state(transport, ManagerState::new(root_dir, view_mode))
    }

    pub fn with_state(transport: T, state: ManagerState) -> Self {
        Self {
            transport,
            state: RwLock::new(state),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> ManagerState {
        self.state.read().await.clone()
    }

    async fn apply(&self, action: Action) -> Transition {
        self.state.write().await.apply(action)
    }

    async fn working_dir(&self) -> String {
        self.state.read().await.working_dir().to_string()
    }

    // ---- Listing and navigation ----

    /// Load the listing of the current directory.
    ///
    /// Safe to call while another listing is outstanding: only the response
    /// to the newest request for the current directory is applied.
    pub async fn load_files(&self) -> Outcome {
        let ticket = {
            let mut state = self.state.write().await;
            state.apply(Action::BeginListing);
            state.listing_ticket()
        };
        debug!(path = %ticket.path, generation = ticket.generation, "Loading listing");

        let result: Result<Vec<FileEntry>, ManagerError> =
            match self.transport.send(ApiRequest::list(&ticket.path)).await {
                Ok(payload) => payload.into_listing().map_err(ManagerError::from),
                Err(e) => Err(e.into()),
            };

        let path = ticket.path.clone();
        let mut state = self.state.write().await;
        match result {
            Ok(entries) => {
                let count = entries.len();
                match state.apply(Action::ListingLoaded { ticket, entries }) {
                    Transition::Discarded => {
                        warn!(path = %path, "Discarding stale listing");
                        Outcome::Stale
                    }
                    _ => {
                        info!(path = %path, count, "Listing loaded");
                        Outcome::Refreshed
                    }
                }
            }
            Err(e) => {
                let message = e.to_string();
                let transition = state.apply(Action::ListingFailed {
                    ticket,
                    message: message.clone(),
                });
                match transition {
                    Transition::Discarded => {
                        debug!(path = %path, "Discarding stale listing failure");
                        Outcome::Stale
                    }
                    _ => {
                        warn!(path = %path, error = %message, "Listing failed");
                        Outcome::Failed { message }
                    }
                }
            }
        }
    }

    /// Change the working directory and load it.
    pub async fn navigate(&self, target: &str) -> Outcome {
        let target = path::normalize(target);
        info!("Navigating to {}", target);
        self.apply(Action::Navigate(target)).await;
        self.load_files().await
    }

    /// Open a folder of the current listing.
    pub async fn open(&self, name: &str) -> Outcome {
        let (folder, working_dir) = {
            let state = self.state.read().await;
            (
                state.entry(name).map(FileEntry::is_folder),
                state.working_dir().to_string(),
            )
        };
        match folder {
            Some(true) => self.navigate(&path::join(&working_dir, name)).await,
            Some(false) => self.reject(format!("not a folder: {}", name)).await,
            None => self.reject(format!("no such entry: {}", name)).await,
        }
    }

    /// Navigate to the parent directory. At the root this reloads the root.
    pub async fn go_up(&self) -> Outcome {
        match path::parent(&self.working_dir().await) {
            Some(parent) => self.navigate(&parent).await,
            None => self.load_files().await,
        }
    }

    // ---- Mutations ----

    /// Upload a file into `destination`, or into the current directory.
    ///
    /// On failure the error is recorded in state and also returned.
    pub async fn upload_file(
        &self,
        file: UploadFile,
        destination: Option<&str>,
    ) -> Result<Outcome, ManagerError> {
        let working_dir = match destination {
            Some(dir) => path::normalize(dir),
            None => self.working_dir().await,
        };
        info!(name = %file.name, size = file.content.len(), dir = %working_dir, "Uploading file");

        self.apply(Action::BeginOperation).await;
        let result = match self
            .transport
            .send(ApiRequest::upload(file, &working_dir))
            .await
        {
            Ok(payload) => payload.into_upload_status().map_err(ManagerError::from),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => Ok(self.succeed(false).await),
            Err(e) => {
                self.fail(&e).await;
                Err(e)
            }
        }
    }

    /// Delete entries of the current directory.
    ///
    /// A 400 answer is reported as a non-empty directory: a notification is
    /// raised and the listing reloaded.
    pub async fn delete_files<S: AsRef<str>>(&self, names: &[S]) -> Outcome {
        if names.is_empty() {
            return self.reject(NO_ITEMS_SELECTED.to_string()).await;
        }
        let working_dir = self.working_dir().await;
        info!(count = names.len(), dir = %working_dir, "Deleting entries");

        self.apply(Action::BeginOperation).await;
        match self.send_ok(ApiRequest::delete(names, &working_dir)).await {
            Ok(()) => self.succeed(true).await,
            Err(ManagerError::Transport(e)) if e.has_status(DIRECTORY_NOT_EMPTY_STATUS) => {
                warn!(error = %e, "Delete refused, directory not empty");
                let notification = Notification::directory_not_empty();
                self.apply(Action::OperationNotified {
                    notification: notification.clone(),
                })
                .await;
                self.load_files().await;
                Outcome::Notified(notification)
            }
            Err(e) => self.fail(&e).await,
        }
    }

    /// Create a folder in the current directory.
    pub async fn create_folder(&self, name: &str) -> Outcome {
        if name.trim().is_empty() {
            return self.reject("folder name is empty".to_string()).await;
        }
        let working_dir = self.working_dir().await;
        info!(name, dir = %working_dir, "Creating folder");

        self.apply(Action::BeginOperation).await;
        match self.send_ok(ApiRequest::new_folder(name, &working_dir)).await {
            Ok(()) => self.succeed(false).await,
            Err(e) => self.fail(&e).await,
        }
    }

    /// Rename an entry of the current directory.
    pub async fn rename_file(&self, old_name: &str, new_name: &str) -> Outcome {
        if old_name.is_empty() || new_name.trim().is_empty() {
            return self.reject("file name is empty".to_string()).await;
        }
        let working_dir = self.working_dir().await;
        info!(from = old_name, to = new_name, dir = %working_dir, "Renaming entry");

        self.apply(Action::BeginOperation).await;
        match self
            .send_ok(ApiRequest::rename(old_name, new_name, &working_dir))
            .await
        {
            Ok(()) => self.succeed(false).await,
            Err(e) => self.fail(&e).await,
        }
    }

    /// Move entries to `destination`. Clears the selection on success.
    pub async fn move_files<S: AsRef<str>>(&self, names: &[S], destination: &str) -> Outcome {
        if names.is_empty() {
            return self.reject(NO_ITEMS_SELECTED.to_string()).await;
        }
        let working_dir = self.working_dir().await;
        info!(count = names.len(), destination, dir = %working_dir, "Moving entries");

        self.apply(Action::BeginOperation).await;
        match self
            .send_ok(ApiRequest::move_items(names, destination, &working_dir))
            .await
        {
            Ok(()) => self.succeed(true).await,
            Err(e) => self.fail(&e).await,
        }
    }

    /// Copy entries to `destination`. The selection is kept.
    pub async fn copy_files<S: AsRef<str>>(&self, names: &[S], destination: &str) -> Outcome {
        if names.is_empty() {
            return self.reject(NO_ITEMS_SELECTED.to_string()).await;
        }
        let working_dir = self.working_dir().await;
        info!(count = names.len(), destination, dir = %working_dir, "Copying entries");

        self.apply(Action::BeginOperation).await;
        match self
            .send_ok(ApiRequest::copy_items(names, destination, &working_dir))
            .await
        {
            Ok(()) => self.succeed(false).await,
            Err(e) => self.fail(&e).await,
        }
    }

    /// Download an entry of the current directory into `sink`.
    ///
    /// Any transport failure is recorded as [`DOWNLOAD_FAILED`]. The listing
    /// is not reloaded.
    pub async fn download_file(&self, entry: &FileEntry, sink: &dyn DownloadSink) -> Outcome {
        let working_dir = self.working_dir().await;
        info!(name = %entry.name, dir = %working_dir, "Downloading file");

        self.apply(Action::BeginOperation).await;
        let bytes = match self
            .transport
            .fetch_binary(ApiRequest::download(&entry.name, &working_dir))
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(name = %entry.name, error = %e, "Download failed");
                let message = DOWNLOAD_FAILED.to_string();
                self.apply(Action::OperationFailed {
                    message: message.clone(),
                })
                .await;
                return Outcome::Failed { message };
            }
        };

        match sink.save(&entry.name, &bytes) {
            Ok(location) => {
                self.apply(Action::OperationSucceeded {
                    clear_selection: false,
                })
                .await;
                info!(path = ?location, bytes = bytes.len(), "Download complete");
                Outcome::Downloaded(location)
            }
            Err(e) => self.fail(&ManagerError::from(e)).await,
        }
    }

    // ---- Selection, view and notifications ----

    pub async fn select(&self, name: &str) -> Transition {
        self.apply(Action::Select(name.to_string())).await
    }

    pub async fn deselect(&self, name: &str) -> Transition {
        self.apply(Action::Deselect(name.to_string())).await
    }

    pub async fn toggle_selection(&self, name: &str) -> Transition {
        self.apply(Action::ToggleSelection(name.to_string())).await
    }

    pub async fn select_all(&self) -> Transition {
        self.apply(Action::SelectAll).await
    }

    pub async fn clear_selection(&self) -> Transition {
        self.apply(Action::ClearSelection).await
    }

    pub async fn set_view_mode(&self, mode: ViewMode) -> Transition {
        self.apply(Action::SetViewMode(mode)).await
    }

    /// Close the current notification without running its action.
    pub async fn dismiss_notification(&self) -> Transition {
        self.apply(Action::DismissNotification).await
    }

    /// Close the current notification and run its accept action.
    ///
    /// Returns `None` when no notification is open.
    pub async fn accept_notification(&self) -> Option<Outcome> {
        let action = {
            let mut state = self.state.write().await;
            let action = state.notification()?.on_accept;
            state.apply(Action::DismissNotification);
            action
        };
        match action {
            AcceptAction::Dismiss => Some(Outcome::Dismissed),
            AcceptAction::Reload => Some(self.load_files().await),
        }
    }

    // ---- Helpers ----

    async fn send_ok(&self, request: ApiRequest) -> Result<(), ManagerError> {
        let payload = self.transport.send(request).await?;
        payload.into_ok_sentinel()?;
        Ok(())
    }

    async fn succeed(&self, clear_selection: bool) -> Outcome {
        self.apply(Action::OperationSucceeded { clear_selection }).await;
        self.load_files().await;
        Outcome::Refreshed
    }

    async fn fail(&self, error: &ManagerError) -> Outcome {
        let message = error.to_string();
        warn!(error = %message, "Operation failed");
        self.apply(Action::OperationFailed {
            message: message.clone(),
        })
        .await;
        Outcome::Failed { message }
    }

    async fn reject(&self, message: String) -> Outcome {
        debug!(reason = %message, "Operation rejected");
        self.apply(Action::InputRejected {
            message: message.clone(),
        })
        .await;
        Outcome::Failed { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use fm_protocol::{Endpoint, Payload, TransportErrorKind, ITEMS};
    use serde_json::json;
    use tokio::sync::Notify;
    use url::Url;

    use crate::notification::{DIRECTORY_NOT_EMPTY_DESCRIPTION, DIRECTORY_NOT_EMPTY_TITLE};
    use crate::sink::MemorySink;
    use crate::state::Phase;
    use crate::transport::TransportFuture;

    /// Holds a scripted response until released.
    #[derive(Clone, Default)]
    struct Gate {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    struct Scripted {
        response: Result<Payload, TransportError>,
        gate: Option<Gate>,
    }

    /// Transport answering from a script and recording every request.
    struct MockTransport {
        base_url: Url,
        responses: Mutex<VecDeque<Scripted>>,
        binaries: Mutex<VecDeque<Result<Bytes, TransportError>>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                base_url: Url::parse("http://mock.local/api").unwrap(),
                responses: Mutex::new(VecDeque::new()),
                binaries: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn push(&self, response: Result<Payload, TransportError>) {
            self.responses.lock().unwrap().push_back(Scripted {
                response,
                gate: None,
            });
        }

        fn push_gated(&self, gate: Gate, response: Result<Payload, TransportError>) {
            self.responses.lock().unwrap().push_back(Scripted {
                response,
                gate: Some(gate),
            });
        }

        fn push_binary(&self, response: Result<Bytes, TransportError>) {
            self.binaries.lock().unwrap().push_back(response);
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn count(&self, endpoint: Endpoint) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.endpoint == endpoint)
                .count()
        }
    }

    impl Transport for MockTransport {
        fn send(&self, request: ApiRequest) -> TransportFuture<'_, Payload> {
            self.requests.lock().unwrap().push(request);
            let scripted = self.responses.lock().unwrap().pop_front();
            Box::pin(async move {
                let scripted = scripted
                    .ok_or_else(|| TransportError::network("no scripted response"))?;
                if let Some(gate) = scripted.gate {
                    gate.entered.notify_one();
                    gate.release.notified().await;
                }
                scripted.response
            })
        }

        fn fetch_binary(&self, request: ApiRequest) -> TransportFuture<'_, Bytes> {
            self.requests.lock().unwrap().push(request);
            let response = self.binaries.lock().unwrap().pop_front();
            Box::pin(async move {
                response.unwrap_or_else(|| Err(TransportError::network("no scripted response")))
            })
        }

        fn base_url(&self) -> &Url {
            &self.base_url
        }
    }

    fn entry_json(name: &str, is_file: bool) -> serde_json::Value {
        json!({
            "name": name,
            "url": format!("https://cdn.moo.example/{}", name),
            "time": 1704067200,
            "icon": if is_file { "fa-file" } else { "fa-folder" },
            "is_file": is_file,
            "is_image": false
        })
    }

    fn listing(names: &[&str]) -> Result<Payload, TransportError> {
        let items: Vec<_> = names
            .iter()
            .map(|n| entry_json(n, !n.ends_with('/')))
            .map(|mut v| {
                let name = v["name"].as_str().unwrap().trim_end_matches('/').to_string();
                v["name"] = json!(name);
                v
            })
            .collect();
        Ok(Payload::Json(json!({ "items": items })))
    }

    fn text(body: &str) -> Result<Payload, TransportError> {
        Ok(Payload::PlainText(body.to_string()))
    }

    fn names(state: &ManagerState) -> Vec<&str> {
        state.entries().iter().map(|e| e.name.as_str()).collect()
    }

    /// Client with a loaded listing and the given names selected.
    async fn loaded_client(entries: &[&str], selected: &[&str]) -> FileManagerClient<MockTransport> {
        let client = FileManagerClient::new(MockTransport::new());
        client.transport().push(listing(entries));
        assert_eq!(client.load_files().await, Outcome::Refreshed);
        for name in selected {
            client.select(name).await;
        }
        client
    }

    #[tokio::test]
    async fn test_load_files_replaces_listing_in_order() {
        let client = FileManagerClient::new(MockTransport::new());
        client.transport().push(listing(&["c.txt", "a.txt", "photos/"]));

        let outcome = client.load_files().await;

        assert_eq!(outcome, Outcome::Refreshed);
        let state = client.state().await;
        assert_eq!(names(&state), vec!["c.txt", "a.txt", "photos"]);
        assert!(state.entries()[2].is_folder());
        assert_eq!(state.phase(), Phase::Idle);

        let requests = client.transport().requests();
        assert_eq!(requests[0].endpoint, Endpoint::JsonItems);
        assert_eq!(requests[0].working_dir(), Some("/"));
    }

    #[tokio::test]
    async fn test_load_files_twice_is_idempotent() {
        let client = loaded_client(&["a.txt", "b.txt"], &[]).await;
        let first = client.state().await;

        client.transport().push(listing(&["a.txt", "b.txt"]));
        client.load_files().await;

        assert_eq!(client.state().await, first);
    }

    #[tokio::test]
    async fn test_load_files_failure_keeps_listing() {
        let client = loaded_client(&["a.txt"], &[]).await;
        client
            .transport()
            .push(Err(TransportError::network("connection refused")));

        let outcome = client.load_files().await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                message: "connection refused".to_string()
            }
        );
        let state = client.state().await;
        assert_eq!(names(&state), vec!["a.txt"]);
        assert_eq!(state.error(), Some("connection refused"));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_load_files_rejects_text_payload() {
        let client = FileManagerClient::new(MockTransport::new());
        client.transport().push(text("<html>login</html>"));

        let outcome = client.load_files().await;

        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert!(client
            .state()
            .await
            .error()
            .unwrap()
            .contains("unexpected payload"));
    }

    #[tokio::test]
    async fn test_stale_listing_is_discarded() {
        let client = Arc::new(FileManagerClient::new(MockTransport::new()));
        let gate = Gate::default();
        client
            .transport()
            .push_gated(gate.clone(), listing(&["root-only.txt"]));
        client.transport().push(listing(&["steak.jpg"]));

        let slow = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.load_files().await })
        };
        gate.entered.notified().await;

        assert_eq!(client.navigate("/photos").await, Outcome::Refreshed);
        gate.release.notify_one();

        assert_eq!(slow.await.unwrap(), Outcome::Stale);
        let state = client.state().await;
        assert_eq!(state.working_dir(), "/photos");
        assert_eq!(names(&state), vec!["steak.jpg"]);
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_upload_success_reloads_once() {
        let client = loaded_client(&["a.txt"], &["a.txt"]).await;
        client.transport().push(Ok(Payload::Json(json!({"status": "success"}))));
        client.transport().push(listing(&["a.txt", "menu.pdf"]));

        let file = UploadFile::new("menu.pdf", b"%PDF-1.7".to_vec());
        let outcome = client.upload_file(file, None).await.unwrap();

        assert_eq!(outcome, Outcome::Refreshed);
        assert_eq!(client.transport().count(Endpoint::JsonItems), 2);
        let state = client.state().await;
        assert_eq!(names(&state), vec!["a.txt", "menu.pdf"]);
        assert!(state.is_selected("a.txt"));

        let upload = &client.transport().requests()[1];
        assert_eq!(upload.endpoint, Endpoint::Upload);
        assert_eq!(upload.working_dir(), Some("/"));
    }

    #[tokio::test]
    async fn test_upload_to_explicit_destination() {
        let client = loaded_client(&[], &[]).await;
        client.transport().push(Ok(Payload::Json(json!({"status": "success"}))));
        client.transport().push(listing(&[]));

        let file = UploadFile::new("steak.jpg", vec![0xff, 0xd8]);
        client.upload_file(file, Some("photos/2024/")).await.unwrap();

        let upload = &client.transport().requests()[1];
        assert_eq!(upload.working_dir(), Some("/photos/2024"));
    }

    #[tokio::test]
    async fn test_upload_failure_returns_error_without_reload() {
        let client = loaded_client(&["a.txt"], &[]).await;
        client.transport().push(Ok(Payload::Json(
            json!({"status": "error", "message": "File too large"}),
        )));

        let err = client
            .upload_file(UploadFile::new("big.bin", vec![0; 16]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::Protocol(ProtocolError::Rejected(_))));
        assert_eq!(err.to_string(), "File too large");
        assert_eq!(client.transport().count(Endpoint::JsonItems), 1);
        let state = client.state().await;
        assert_eq!(state.error(), Some("File too large"));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_upload_transport_failure_is_returned() {
        let client = loaded_client(&[], &[]).await;
        client
            .transport()
            .push(Err(TransportError::status(413, "Payload Too Large")));

        let err = client
            .upload_file(UploadFile::new("big.bin", vec![0; 16]), None)
            .await
            .unwrap_err();

        match err {
            ManagerError::Transport(e) => assert_eq!(e.http_status, Some(413)),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.transport().count(Endpoint::JsonItems), 1);
    }

    #[tokio::test]
    async fn test_delete_ok_clears_selection_and_reloads() {
        let client = loaded_client(&["a.txt", "b.txt"], &["a.txt"]).await;
        client.transport().push(text("OK"));
        client.transport().push(listing(&["b.txt"]));

        let outcome = client.delete_files(&["a.txt"]).await;

        assert_eq!(outcome, Outcome::Refreshed);
        let state = client.state().await;
        assert!(state.selected().is_empty());
        assert_eq!(names(&state), vec!["b.txt"]);
        assert_eq!(client.transport().count(Endpoint::JsonItems), 2);

        let delete = &client.transport().requests()[1];
        assert_eq!(delete.query_values(ITEMS).collect::<Vec<_>>(), vec!["a.txt"]);
        assert_eq!(delete.working_dir(), Some("/"));
    }

    #[tokio::test]
    async fn test_delete_other_text_sets_error_and_keeps_selection() {
        let client = loaded_client(&["a.txt"], &["a.txt"]).await;
        client.transport().push(text("Some other error"));

        let outcome = client.delete_files(&["a.txt"]).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                message: "Some other error".to_string()
            }
        );
        let state = client.state().await;
        assert_eq!(state.selected(), ["a.txt".to_string()]);
        assert_eq!(state.error(), Some("Some other error"));
        assert_eq!(state.phase(), Phase::Error);
        assert_eq!(client.transport().count(Endpoint::JsonItems), 1);
    }

    #[tokio::test]
    async fn test_delete_400_notifies_and_reloads() {
        let client = loaded_client(&["menus/"], &["menus"]).await;
        client
            .transport()
            .push(Err(TransportError::status(400, "Bad Request")));
        client.transport().push(listing(&["menus/"]));

        let outcome = client.delete_files(&["menus"]).await;

        let notification = match outcome {
            Outcome::Notified(n) => n,
            other => panic!("expected notification, got {:?}", other),
        };
        assert!(notification.open);
        assert_eq!(notification.title, DIRECTORY_NOT_EMPTY_TITLE);

        let state = client.state().await;
        assert_eq!(state.phase(), Phase::Notifying);
        assert_eq!(state.notification(), Some(&notification));
        assert!(matches!(
            state.error(),
            None | Some(DIRECTORY_NOT_EMPTY_DESCRIPTION)
        ));
        assert_eq!(client.transport().count(Endpoint::JsonItems), 2);
    }

    #[tokio::test]
    async fn test_delete_400_found_in_message_only() {
        let client = loaded_client(&["menus/"], &[]).await;
        client.transport().push(Err(TransportError::normalize(
            fm_protocol::FailureParts {
                message: "Request failed with status code 400".to_string(),
                ..Default::default()
            },
        )));
        client.transport().push(listing(&["menus/"]));

        let outcome = client.delete_files(&["menus"]).await;
        assert!(matches!(outcome, Outcome::Notified(_)));
    }

    #[tokio::test]
    async fn test_delete_other_status_is_plain_error() {
        let client = loaded_client(&["a.txt"], &[]).await;
        client
            .transport()
            .push(Err(TransportError::status(500, "Internal Server Error")));

        let outcome = client.delete_files(&["a.txt"]).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                message: "Internal Server Error".to_string()
            }
        );
        assert!(client.state().await.notification().is_none());
        assert_eq!(client.transport().count(Endpoint::JsonItems), 1);
    }

    #[tokio::test]
    async fn test_delete_without_names_sends_nothing() {
        let client = loaded_client(&["a.txt"], &[]).await;
        let empty: [&str; 0] = [];

        let outcome = client.delete_files(&empty).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                message: NO_ITEMS_SELECTED.to_string()
            }
        );
        assert_eq!(client.transport().requests().len(), 1);
        assert!(!client.state().await.is_loading());
    }

    #[tokio::test]
    async fn test_rename_ok_reloads() {
        let client = loaded_client(&["old.png"], &[]).await;
        client.transport().push(text("OK"));
        client.transport().push(listing(&["new.png"]));

        let outcome = client.rename_file("old.png", "new.png").await;

        assert_eq!(outcome, Outcome::Refreshed);
        assert_eq!(names(&client.state().await), vec!["new.png"]);
        let rename = &client.transport().requests()[1];
        assert_eq!(rename.query_values("file").next(), Some("old.png"));
        assert_eq!(rename.query_values("new_name").next(), Some("new.png"));
    }

    #[tokio::test]
    async fn test_create_folder_reloads_once_and_keeps_selection() {
        let client = loaded_client(&["a.txt"], &["a.txt"]).await;
        client.transport().push(text("OK"));
        client.transport().push(listing(&["a.txt", "2024/"]));

        let outcome = client.create_folder("2024").await;

        assert_eq!(outcome, Outcome::Refreshed);
        assert_eq!(client.transport().count(Endpoint::JsonItems), 2);
        assert_eq!(client.state().await.selected(), ["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_create_folder_error_text() {
        let client = loaded_client(&[], &[]).await;
        client.transport().push(text("Folder already exists"));

        client.create_folder("2024").await;

        assert_eq!(client.state().await.error(), Some("Folder already exists"));
    }

    #[tokio::test]
    async fn test_move_clears_selection_copy_keeps_it() {
        let client = loaded_client(&["x", "y"], &["x"]).await;
        client.transport().push(text("OK"));
        client.transport().push(listing(&["x", "y"]));

        let outcome = client.copy_files(&["x"], "dest").await;
        assert_eq!(outcome, Outcome::Refreshed);
        assert_eq!(client.state().await.selected(), ["x".to_string()]);

        client.transport().push(text("OK"));
        client.transport().push(listing(&["y"]));

        let outcome = client.move_files(&["x"], "dest").await;
        assert_eq!(outcome, Outcome::Refreshed);
        assert!(client.state().await.selected().is_empty());

        let requests = client.transport().requests();
        assert_eq!(requests[1].endpoint, Endpoint::Copy);
        assert_eq!(requests[3].endpoint, Endpoint::Move);
        assert_eq!(requests[3].query_values("destination").next(), Some("dest"));
        assert_eq!(client.transport().count(Endpoint::JsonItems), 3);
    }

    #[tokio::test]
    async fn test_download_saves_to_sink() {
        let client = loaded_client(&["steak.jpg"], &[]).await;
        client
            .transport()
            .push_binary(Ok(Bytes::from_static(b"\xff\xd8\xff\xe0")));
        let entry = client.state().await.entry("steak.jpg").cloned().unwrap();
        let sink = MemorySink::new();

        let outcome = client.download_file(&entry, &sink).await;

        assert_eq!(outcome, Outcome::Downloaded(PathBuf::from("steak.jpg")));
        assert_eq!(sink.get("steak.jpg").unwrap(), b"\xff\xd8\xff\xe0");
        assert_eq!(client.transport().count(Endpoint::JsonItems), 1);
        let download = &client.transport().requests()[1];
        assert_eq!(download.endpoint, Endpoint::Download);
        assert_eq!(download.query_values("file").next(), Some("steak.jpg"));
    }

    #[tokio::test]
    async fn test_download_failure_is_generic() {
        let client = loaded_client(&["steak.jpg"], &[]).await;
        client
            .transport()
            .push_binary(Err(TransportError::status(403, "Forbidden")));
        let entry = client.state().await.entry("steak.jpg").cloned().unwrap();
        let sink = MemorySink::new();

        let outcome = client.download_file(&entry, &sink).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                message: DOWNLOAD_FAILED.to_string()
            }
        );
        assert!(sink.is_empty());
        let state = client.state().await;
        assert_eq!(state.error(), Some(DOWNLOAD_FAILED));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_navigation() {
        let client = loaded_client(&["photos/", "menu.pdf"], &["menu.pdf"]).await;
        client.transport().push(listing(&["2024/"]));

        assert_eq!(client.open("photos").await, Outcome::Refreshed);
        let state = client.state().await;
        assert_eq!(state.working_dir(), "/photos");
        assert!(state.selected().is_empty());

        client.transport().push(listing(&["photos/", "menu.pdf"]));
        assert_eq!(client.go_up().await, Outcome::Refreshed);
        assert_eq!(client.state().await.working_dir(), "/");

        let outcome = client.open("menu.pdf").await;
        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert_eq!(client.transport().count(Endpoint::JsonItems), 3);
    }

    #[tokio::test]
    async fn test_operations_use_current_directory() {
        let client = FileManagerClient::with_root(MockTransport::new(), "/menus", ViewMode::Grid);
        client.transport().push(text("OK"));
        client.transport().push(listing(&[]));

        client.create_folder("specials").await;

        let request = &client.transport().requests()[0];
        assert_eq!(request.working_dir(), Some("/menus"));
        assert_eq!(client.state().await.view_mode(), ViewMode::Grid);
    }

    #[tokio::test]
    async fn test_accept_notification() {
        let client = loaded_client(&["menus/"], &[]).await;
        client
            .transport()
            .push(Err(TransportError::status(400, "")));
        client.transport().push(listing(&["menus/"]));
        client.delete_files(&["menus"]).await;
        assert_eq!(client.transport().count(Endpoint::JsonItems), 2);

        client.transport().push(listing(&["menus/"]));
        assert_eq!(client.accept_notification().await, Some(Outcome::Refreshed));
        assert_eq!(client.transport().count(Endpoint::JsonItems), 3);
        assert_eq!(client.accept_notification().await, None);

        let state = client.state().await;
        assert!(state.notification().is_none());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_accept_dismiss_notification_sends_nothing() {
        let mut state = ManagerState::new("/menus", ViewMode::List);
        state.apply(Action::BeginOperation);
        state.apply(Action::OperationNotified {
            notification: Notification::new("Upload finished", "1 file uploaded"),
        });
        let client = FileManagerClient::with_state(MockTransport::new(), state);

        assert_eq!(client.accept_notification().await, Some(Outcome::Dismissed));
        assert!(client.transport().requests().is_empty());
        assert!(client.state().await.notification().is_none());
    }

    #[tokio::test]
    async fn test_selection_and_view_mode() {
        let client = loaded_client(&["a", "b"], &[]).await;

        assert_eq!(client.select("ghost").await, Transition::Unchanged);
        client.select_all().await;
        assert_eq!(client.state().await.selected().len(), 2);
        client.toggle_selection("a").await;
        assert_eq!(client.state().await.selected(), ["b".to_string()]);
        client.deselect("b").await;
        assert_eq!(client.clear_selection().await, Transition::Unchanged);

        assert_eq!(client.set_view_mode(ViewMode::Grid).await, Transition::Applied);
        assert_eq!(client.state().await.view_mode(), ViewMode::Grid);
    }

    #[tokio::test]
    async fn test_unscripted_request_is_network_failure() {
        let client = FileManagerClient::new(MockTransport::new());
        let outcome = client.load_files().await;
        assert!(matches!(outcome, Outcome::Failed { .. }));

        let err = client
            .transport()
            .send(ApiRequest::list("/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Network);
    }
}
