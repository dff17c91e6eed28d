//! Client-side file manager state
//!
//! `StoreState` holds the listing the UI renders and the pure transitions
//! between `Idle`, `Loading`, `Ready` and `Error`. `FileManagerStore` drives
//! those transitions from API calls: one operation at a time, each bounded by
//! a timeout, and every successful mutation followed by a fresh listing.

use crate::{ClientError, FileManagerApi, Result, UploadFile};
use api_proto::{
    Breadcrumb, CreateDirectoryRequest, DirectoryEntry, FileEntry, ListResponse, UploadResponse,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Coarse store status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// The store's public operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    CreateDirectory,
    Upload,
    DeleteFile,
    DeleteDirectory,
}

impl Operation {
    /// Prefix of the error shown when this operation fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::List => "Failed to load files",
            Operation::CreateDirectory => "Failed to create directory",
            Operation::Upload => "Failed to upload files",
            Operation::DeleteFile => "Failed to delete file",
            Operation::DeleteDirectory => "Failed to delete directory",
        }
    }
}

/// Handle for the operation currently in flight
///
/// Transitions carrying a stale ticket are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    operation: Operation,
}

impl Ticket {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Same operation slot, now re-listing after a mutation
    fn relisting(self) -> Self {
        Self {
            seq: self.seq,
            operation: Operation::List,
        }
    }
}

/// Outcome of a store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Finished and the state is `Ready`
    Completed,
    /// Finished and the state is `Error`
    Failed,
    /// Rejected because another operation was in flight; state untouched
    Busy,
}

/// Everything the UI renders
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub status: Status,
    pub current_directory: String,
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirectoryEntry>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub parent_directory: Option<String>,
    pub error: Option<String>,
    /// Last success message from the server
    pub message: Option<String>,
    /// Per-file results of the last upload
    pub last_upload: Option<UploadResponse>,
    in_flight: Option<Ticket>,
    next_seq: u64,
}

impl StoreState {
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Enter `Loading`, or `None` if an operation is already running
    pub fn begin(&mut self, operation: Operation) -> Option<Ticket> {
        if self.in_flight.is_some() {
            return None;
        }

        self.next_seq += 1;
        let ticket = Ticket {
            seq: self.next_seq,
            operation,
        };
        self.in_flight = Some(ticket);
        self.status = Status::Loading;
        self.error = None;
        Some(ticket)
    }

    /// Replace the listing and finish the operation
    pub fn apply_listing(&mut self, ticket: Ticket, listing: ListResponse) -> bool {
        if !self.owns(ticket) {
            return false;
        }

        self.files = listing.files;
        self.directories = listing.directories;
        self.current_directory = listing.current_directory;
        self.breadcrumbs = listing.breadcrumbs;
        self.parent_directory = listing.parent_directory;
        self.finish(Status::Ready);
        true
    }

    /// Remember a mutation's success message; the operation stays open
    pub fn record_message(&mut self, ticket: Ticket, message: String) -> bool {
        if !self.owns(ticket) {
            return false;
        }
        self.message = Some(message);
        true
    }

    /// Remember per-file upload results; the operation stays open
    pub fn record_upload(&mut self, ticket: Ticket, outcome: UploadResponse) -> bool {
        if !self.owns(ticket) {
            return false;
        }
        self.last_upload = Some(outcome);
        true
    }

    /// Finish with an error, keeping the previous listing on screen
    pub fn fail(&mut self, ticket: Ticket, error: &ClientError) -> bool {
        if !self.owns(ticket) {
            return false;
        }

        let message = format!("{}: {}", ticket.operation.failure_message(), error);
        tracing::warn!("{}", message);
        self.error = Some(message);
        self.finish(Status::Error);
        true
    }

    /// The caller stopped waiting; no-op if the operation already finished
    pub fn abandon(&mut self, ticket: Ticket) -> bool {
        self.fail(ticket, &ClientError::Cancelled)
    }

    fn owns(&self, ticket: Ticket) -> bool {
        self.in_flight.map(|t| t.seq) == Some(ticket.seq)
    }

    fn finish(&mut self, status: Status) {
        self.in_flight = None;
        self.status = status;
    }
}

/// Marks the in-flight operation abandoned unless it completed
struct InFlight {
    state: Arc<Mutex<StoreState>>,
    ticket: Ticket,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state.lock().abandon(self.ticket);
    }
}

/// Mediates between a UI and the file manager API
pub struct FileManagerStore<A> {
    api: A,
    state: Arc<Mutex<StoreState>>,
    timeout: Duration,
}

impl<A: FileManagerApi> FileManagerStore<A> {
    pub fn new(api: A, timeout: Duration) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(StoreState::default())),
            timeout,
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> StoreState {
        self.state.lock().clone()
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn current_directory(&self) -> String {
        self.state.lock().current_directory.clone()
    }

    /// List `directory` and make it current
    pub async fn load(&self, directory: &str) -> Dispatch {
        let Some(guard) = self.begin(Operation::List) else {
            return Dispatch::Busy;
        };
        self.refresh(guard.ticket, directory).await
    }

    /// Create `name` inside the current directory
    pub async fn create_directory(&self, name: &str) -> Dispatch {
        let Some(guard) = self.begin(Operation::CreateDirectory) else {
            return Dispatch::Busy;
        };
        let current = self.current_directory();
        let request = CreateDirectoryRequest {
            name: name.to_string(),
            directory: Some(current.clone()),
        };

        match self.call(self.api.create_directory(&request)).await {
            Ok(response) => {
                self.state.lock().record_message(guard.ticket, response.message);
                self.refresh(guard.ticket.relisting(), &current).await
            }
            Err(e) => self.fail(guard.ticket, &e),
        }
    }

    /// Upload `files` into `directory`, then re-list the current directory
    ///
    /// Succeeds when at least one file was stored; the per-file outcome is
    /// kept in `last_upload` either way.
    pub async fn upload(&self, directory: &str, files: Vec<UploadFile>) -> Dispatch {
        let Some(guard) = self.begin(Operation::Upload) else {
            return Dispatch::Busy;
        };

        match self.call(self.api.upload(directory, files)).await {
            Ok(outcome) => {
                let first_error = outcome
                    .files
                    .iter()
                    .find_map(|f| f.error.clone());
                let stored = outcome.stored_count();
                self.state.lock().record_upload(guard.ticket, outcome);

                if stored == 0 {
                    let error = match first_error {
                        Some(e) => ClientError::Api {
                            kind: e.kind,
                            message: e.error,
                            status: e.kind.status_code(),
                        },
                        None => ClientError::Decode("no files in upload response".to_string()),
                    };
                    return self.fail(guard.ticket, &error);
                }

                let current = self.current_directory();
                self.refresh(guard.ticket.relisting(), &current).await
            }
            Err(e) => self.fail(guard.ticket, &e),
        }
    }

    pub async fn delete_file(&self, path: &str) -> Dispatch {
        let Some(guard) = self.begin(Operation::DeleteFile) else {
            return Dispatch::Busy;
        };

        match self.call(self.api.delete_file(path)).await {
            Ok(response) => {
                self.state.lock().record_message(guard.ticket, response.message);
                let current = self.current_directory();
                self.refresh(guard.ticket.relisting(), &current).await
            }
            Err(e) => self.fail(guard.ticket, &e),
        }
    }

    pub async fn delete_directory(&self, path: &str) -> Dispatch {
        let Some(guard) = self.begin(Operation::DeleteDirectory) else {
            return Dispatch::Busy;
        };

        match self.call(self.api.delete_directory(path)).await {
            Ok(response) => {
                self.state.lock().record_message(guard.ticket, response.message);
                let current = self.current_directory();
                self.refresh(guard.ticket.relisting(), &current).await
            }
            Err(e) => self.fail(guard.ticket, &e),
        }
    }

    fn begin(&self, operation: Operation) -> Option<InFlight> {
        let ticket = self.state.lock().begin(operation);
        match ticket {
            Some(ticket) => Some(InFlight {
                state: Arc::clone(&self.state),
                ticket,
            }),
            None => {
                tracing::debug!("{:?} rejected: another operation is in flight", operation);
                None
            }
        }
    }

    async fn refresh(&self, ticket: Ticket, directory: &str) -> Dispatch {
        match self.call(self.api.list(directory)).await {
            Ok(listing) => {
                self.state.lock().apply_listing(ticket, listing);
                Dispatch::Completed
            }
            Err(e) => self.fail(ticket, &e),
        }
    }

    fn fail(&self, ticket: Ticket, error: &ClientError) -> Dispatch {
        self.state.lock().fail(ticket, error);
        Dispatch::Failed
    }

    async fn call<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(self.timeout)),
        }
    }
}
