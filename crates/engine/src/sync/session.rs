// Document session: one tokio task per open document.
//
// The task owns the `DocumentSyncState`, the save debounce, the poll interval
// and every in-flight gateway request for the document. Closing stops the
// timers, cancels the pending poll and flushes unsaved edits once. Dropping
// the session aborts everything, so nothing from a previous document can fire
// against the next one.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinError, JoinHandle, JoinSet};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use folio_common::types::{PageDocument, PageId, PageNode};

use super::debounce::SaveDebounce;
use super::state::{DocumentSyncState, DocumentView, LocalEdit};
use super::SyncTiming;
use crate::gateway::{GatewayResult, PageGateway};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("document session is closed")]
pub struct SessionClosed;

#[derive(Debug)]
enum Command {
    Edit(LocalEdit),
    SetVisible(bool),
    RetrySave,
    Close(oneshot::Sender<()>),
}

#[derive(Debug)]
enum Outcome {
    Saved(GatewayResult<PageNode>),
    Polled(GatewayResult<PageDocument>),
}

// ── Handle ─────────────────────────────────────────────────────────

/// Handle to the sync task of one open document.
#[derive(Debug)]
pub struct DocumentSession {
    page_id: PageId,
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<DocumentView>,
    task: JoinHandle<()>,
}

impl DocumentSession {
    /// Fetch the document and start syncing it.
    pub async fn open<G>(gateway: Arc<G>, page_id: PageId, timing: SyncTiming) -> GatewayResult<Self>
    where
        G: PageGateway + ?Sized + 'static,
    {
        let document = gateway.get_page(&page_id).await?;
        let state = DocumentSyncState::new(&document, timing);
        let (view_tx, view_rx) = watch::channel(state.view());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        info!(page_id = %page_id, version = %document.updated_at(), "document session opened");
        let driver = Driver::new(gateway, state, timing, view_tx);
        let task = tokio::spawn(driver.run(command_rx));
        Ok(Self { page_id, commands: command_tx, view: view_rx, task })
    }

    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    /// Current snapshot of the document.
    pub fn view(&self) -> DocumentView {
        self.view.borrow().clone()
    }

    /// Receiver that is notified whenever the view changes.
    pub fn subscribe(&self) -> watch::Receiver<DocumentView> {
        self.view.clone()
    }

    pub fn edit(&self, edit: LocalEdit) -> Result<(), SessionClosed> {
        self.send(Command::Edit(edit))
    }

    /// Polling runs only while the document is visible.
    pub fn set_visible(&self, visible: bool) -> Result<(), SessionClosed> {
        self.send(Command::SetVisible(visible))
    }

    /// Re-arm the autosave after a failed save.
    pub fn retry_save(&self) -> Result<(), SessionClosed> {
        self.send(Command::RetrySave)
    }

    /// Stop syncing. Timers and the pending poll are cancelled; unsaved edits
    /// get one final save attempt.
    pub async fn close(mut self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Close(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        self.task.abort();
        if let Err(err) = (&mut self.task).await {
            log_join_error(&self.page_id, &err);
        }
        info!(page_id = %self.page_id, "document session closed");
    }

    fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.commands.send(command).map_err(|_| SessionClosed)
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn log_join_error(page_id: &PageId, err: &JoinError) {
    if err.is_panic() {
        warn!(page_id = %page_id, error = %err, "document session task panicked");
    }
}

// ── Driver ─────────────────────────────────────────────────────────

struct Driver<G: ?Sized> {
    gateway: Arc<G>,
    state: DocumentSyncState,
    debounce: SaveDebounce,
    poll: Interval,
    pending_poll: Option<AbortHandle>,
    requests: JoinSet<Outcome>,
    view: watch::Sender<DocumentView>,
}

impl<G> Driver<G>
where
    G: PageGateway + ?Sized + 'static,
{
    fn new(
        gateway: Arc<G>,
        state: DocumentSyncState,
        timing: SyncTiming,
        view: watch::Sender<DocumentView>,
    ) -> Self {
        let mut poll = time::interval_at(Instant::now() + timing.poll_interval, timing.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            gateway,
            state,
            debounce: SaveDebounce::new(timing.debounce),
            poll,
            pending_poll: None,
            requests: JoinSet::new(),
            view,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let save_at = self.debounce.deadline();
            let polling = self.state.is_visible() && self.pending_poll.is_none();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Close(done)) => {
                        self.finish().await;
                        let _ = done.send(());
                        return;
                    }
                    Some(command) => self.on_command(command),
                    None => return,
                },
                _ = time::sleep_until(save_at.unwrap_or_else(Instant::now)), if save_at.is_some() => {
                    self.debounce.cancel();
                    self.start_save();
                }
                _ = self.poll.tick(), if polling => self.start_poll(),
                Some(joined) = self.requests.join_next() => match joined {
                    Ok(outcome) => self.on_outcome(outcome),
                    Err(err) => log_join_error(self.state.page_id(), &err),
                },
            }
            self.publish();
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Edit(edit) => {
                self.state.record_edit(edit, Instant::now());
                self.debounce.arm();
            }
            Command::SetVisible(visible) => {
                if visible && !self.state.is_visible() {
                    self.poll.reset();
                }
                debug!(page_id = %self.state.page_id(), visible, "visibility changed");
                self.state.set_visible(visible);
            }
            Command::RetrySave => {
                if self.state.retry_save() {
                    self.debounce.arm();
                }
            }
            Command::Close(_) => {}
        }
    }

    fn start_save(&mut self) {
        let Some(patch) = self.state.take_save() else {
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let page_id = self.state.page_id().clone();
        debug!(page_id = %page_id, "autosave issued");
        self.requests.spawn(async move { Outcome::Saved(gateway.patch_page(&page_id, patch).await) });
    }

    fn start_poll(&mut self) {
        let gateway = Arc::clone(&self.gateway);
        let page_id = self.state.page_id().clone();
        let handle = self.requests.spawn(async move { Outcome::Polled(gateway.get_page(&page_id).await) });
        self.pending_poll = Some(handle);
    }

    fn on_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Saved(result) => self.on_saved(result),
            Outcome::Polled(result) => {
                self.pending_poll = None;
                match result {
                    Ok(document) => {
                        self.state.on_poll(&document, Instant::now());
                    }
                    Err(err) => {
                        warn!(page_id = %self.state.page_id(), error = %err, "poll failed");
                    }
                }
            }
        }
    }

    fn on_saved(&mut self, result: GatewayResult<PageNode>) {
        match result {
            Ok(node) => {
                self.state.on_save_success(&node);
                if self.state.needs_save() && !self.debounce.is_armed() {
                    self.debounce.arm();
                }
            }
            Err(err) => {
                warn!(page_id = %self.state.page_id(), error = %err, "autosave failed");
                self.state.on_save_failure();
            }
        }
    }

    /// Cancel the pending poll, wait for an in-flight save and push any
    /// unsaved edits one last time. Poll results are never applied here.
    async fn finish(&mut self) {
        self.debounce.cancel();
        if let Some(poll) = self.pending_poll.take() {
            poll.abort();
        }
        while let Some(joined) = self.requests.join_next().await {
            match joined {
                Ok(Outcome::Saved(result)) => self.on_saved(result),
                Ok(Outcome::Polled(_)) => {
                    debug!(page_id = %self.state.page_id(), "poll result dropped on close");
                }
                Err(err) => log_join_error(self.state.page_id(), &err),
            }
        }
        self.debounce.cancel();
        if let Some(patch) = self.state.take_save() {
            let result = self.gateway.patch_page(self.state.page_id(), patch).await;
            self.on_saved(result);
        }
        self.publish();
    }

    fn publish(&self) {
        let next = self.state.view();
        self.view.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

// ── Host ───────────────────────────────────────────────────────────

/// Owns the single open document session.
pub struct DocumentHost<G: ?Sized> {
    gateway: Arc<G>,
    timing: SyncTiming,
    current: Option<DocumentSession>,
}

impl<G> DocumentHost<G>
where
    G: PageGateway + ?Sized + 'static,
{
    pub fn new(gateway: Arc<G>, timing: SyncTiming) -> Self {
        Self { gateway, timing, current: None }
    }

    /// Close the current document (if any) and open `page_id`.
    pub async fn open(&mut self, page_id: PageId) -> GatewayResult<&DocumentSession> {
        self.close().await;
        let session = DocumentSession::open(Arc::clone(&self.gateway), page_id, self.timing).await?;
        let session = self.current.insert(session);
        Ok(&*session)
    }

    pub async fn close(&mut self) {
        if let Some(session) = self.current.take() {
            session.close().await;
        }
    }

    pub fn current(&self) -> Option<&DocumentSession> {
        self.current.as_ref()
    }
}
