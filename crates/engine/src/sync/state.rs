// Per-document sync state machine.
//
//   Clean ──edit──▶ Editing ──debounce──▶ SaveInFlight ──ok──▶ Clean | Editing
//                      ▲                        │
//                      └────────fail────────────┘  (dirty fields restored)
//
// Poll results only replace the draft when the server version is strictly
// newer than the last one observed, nothing local is unsaved, no save is in
// flight, and the suppression window since the last keystroke has lapsed.
// Everything here is synchronous; time is passed in by the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use folio_common::protocol::pages::PatchPageRequest;
use folio_common::types::{PageDocument, PageId, PageNode};

use super::SyncTiming;

// ── Types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Clean,
    Editing,
    SaveInFlight,
}

/// What a poll response did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollDecision {
    /// Server version is not newer than the one already known.
    UpToDate,
    /// Newer version withheld: local edits are unsaved, saving, or recent.
    Deferred,
    /// Server content replaced the draft.
    Applied,
}

/// A local change to the open document.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEdit {
    Content(Value),
    Title(String),
    Icon(String),
    Cover(String),
}

/// The editable payload as the user currently sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Draft {
    pub title: String,
    pub icon: Option<String>,
    pub cover: Option<String>,
    pub content: Value,
}

impl Draft {
    fn from_document(document: &PageDocument) -> Self {
        Self {
            title: document.page.title.clone(),
            icon: document.page.icon.clone(),
            cover: document.cover.clone(),
            content: document.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DirtyFields {
    title: bool,
    icon: bool,
    cover: bool,
    content: bool,
}

impl DirtyFields {
    fn any(&self) -> bool {
        self.title || self.icon || self.cover || self.content
    }

    fn merge(&mut self, other: DirtyFields) {
        self.title |= other.title;
        self.icon |= other.icon;
        self.cover |= other.cover;
        self.content |= other.content;
    }
}

/// Snapshot published to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    pub page_id: PageId,
    pub draft: Draft,
    pub saving: bool,
    pub unsaved: bool,
    pub save_failed: bool,
    pub server_version: DateTime<Utc>,
    /// Latest server title/icon, mirrored even while the draft is suppressed.
    pub server_title: String,
    pub server_icon: Option<String>,
    pub last_poll: Option<PollDecision>,
}

// ── State machine ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DocumentSyncState {
    page_id: PageId,
    timing: SyncTiming,
    draft: Draft,
    dirty: DirtyFields,
    in_flight: Option<DirtyFields>,
    last_local_edit_at: Option<Instant>,
    last_known_server_version: DateTime<Utc>,
    save_failed: bool,
    visible: bool,
    server_title: String,
    server_icon: Option<String>,
    last_poll: Option<PollDecision>,
}

impl DocumentSyncState {
    /// Start from a freshly fetched document.
    pub fn new(document: &PageDocument, timing: SyncTiming) -> Self {
        Self {
            page_id: document.id().clone(),
            timing,
            draft: Draft::from_document(document),
            dirty: DirtyFields::default(),
            in_flight: None,
            last_local_edit_at: None,
            last_known_server_version: document.updated_at(),
            save_failed: false,
            visible: true,
            server_title: document.page.title.clone(),
            server_icon: document.page.icon.clone(),
            last_poll: None,
        }
    }

    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn last_known_server_version(&self) -> DateTime<Utc> {
        self.last_known_server_version
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn save_failed(&self) -> bool {
        self.save_failed
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Unsaved local changes exist (not counting the in-flight save).
    pub fn needs_save(&self) -> bool {
        self.dirty.any()
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.last_local_edit_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.timing.suppression_window)
    }

    pub fn phase(&self, now: Instant) -> SyncPhase {
        if self.in_flight.is_some() {
            SyncPhase::SaveInFlight
        } else if self.dirty.any() || self.is_suppressed(now) {
            SyncPhase::Editing
        } else {
            SyncPhase::Clean
        }
    }

    /// Apply a local edit to the draft and mark the field dirty.
    pub fn record_edit(&mut self, edit: LocalEdit, now: Instant) {
        match edit {
            LocalEdit::Content(content) => {
                self.draft.content = content;
                self.dirty.content = true;
            }
            LocalEdit::Title(title) => {
                self.draft.title = title;
                self.dirty.title = true;
            }
            LocalEdit::Icon(icon) => {
                self.draft.icon = Some(icon);
                self.dirty.icon = true;
            }
            LocalEdit::Cover(cover) => {
                self.draft.cover = Some(cover);
                self.dirty.cover = true;
            }
        }
        self.last_local_edit_at = Some(now);
    }

    /// Build the autosave patch and move to SaveInFlight.
    ///
    /// Returns `None` when nothing is dirty or a save is already in flight;
    /// at most one save per document is outstanding.
    pub fn take_save(&mut self) -> Option<PatchPageRequest> {
        if self.in_flight.is_some() || !self.dirty.any() {
            return None;
        }
        let fields = std::mem::take(&mut self.dirty);
        let draft = &self.draft;
        let patch = PatchPageRequest {
            title: fields.title.then(|| draft.title.clone()),
            icon: if fields.icon { draft.icon.clone() } else { None },
            cover: if fields.cover { draft.cover.clone() } else { None },
            content: fields.content.then(|| draft.content.clone()),
        };
        self.in_flight = Some(fields);
        Some(patch)
    }

    /// The server accepted the save. Its version is adopted only if it is
    /// newer than what a concurrent poll may already have recorded.
    pub fn on_save_success(&mut self, node: &PageNode) {
        self.in_flight = None;
        self.save_failed = false;
        if node.updated_at > self.last_known_server_version {
            self.last_known_server_version = node.updated_at;
            self.server_title = node.title.clone();
            self.server_icon = node.icon.clone();
        }
        debug!(page_id = %self.page_id, version = %node.updated_at, "save confirmed");
    }

    /// The save did not land. The draft is kept and its fields become dirty
    /// again so the next edit or an explicit retry resends them.
    pub fn on_save_failure(&mut self) {
        if let Some(fields) = self.in_flight.take() {
            self.dirty.merge(fields);
        }
        self.save_failed = true;
    }

    /// Whether an explicit retry has anything to resend.
    pub fn retry_save(&self) -> bool {
        self.save_failed && self.in_flight.is_none() && self.dirty.any()
    }

    /// Reconcile a polled snapshot against local state.
    pub fn on_poll(&mut self, document: &PageDocument, now: Instant) -> PollDecision {
        let version = document.updated_at();
        let decision = if version <= self.last_known_server_version {
            PollDecision::UpToDate
        } else {
            self.server_title = document.page.title.clone();
            self.server_icon = document.page.icon.clone();
            if self.in_flight.is_some() || self.dirty.any() || self.is_suppressed(now) {
                PollDecision::Deferred
            } else {
                self.draft = Draft::from_document(document);
                self.last_known_server_version = version;
                PollDecision::Applied
            }
        };
        debug!(page_id = %self.page_id, %version, ?decision, "poll reconciled");
        self.last_poll = Some(decision);
        decision
    }

    pub fn view(&self) -> DocumentView {
        DocumentView {
            page_id: self.page_id.clone(),
            draft: self.draft.clone(),
            saving: self.in_flight.is_some(),
            unsaved: self.dirty.any() || self.in_flight.is_some(),
            save_failed: self.save_failed,
            server_version: self.last_known_server_version,
            server_title: self.server_title.clone(),
            server_icon: self.server_icon.clone(),
            last_poll: self.last_poll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    fn version(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    fn document(ms: i64, content: Value) -> PageDocument {
        PageDocument {
            page: PageNode::new("doc", version(ms)).with_title("Doc"),
            cover: None,
            content,
        }
    }

    fn state() -> (DocumentSyncState, Instant) {
        (DocumentSyncState::new(&document(1_000, json!("v1")), SyncTiming::default()), Instant::now())
    }

    fn saved(ms: i64) -> PageNode {
        PageNode::new("doc", version(ms)).with_title("Doc")
    }

    // ── Phases ─────────────────────────────────────────────────────

    #[test]
    fn phase_follows_edit_and_save() {
        let (mut state, t0) = state();
        assert_eq!(state.phase(t0), SyncPhase::Clean);

        state.record_edit(LocalEdit::Content(json!("local")), t0);
        assert_eq!(state.phase(t0), SyncPhase::Editing);

        state.take_save().unwrap();
        assert_eq!(state.phase(t0), SyncPhase::SaveInFlight);

        state.on_save_success(&saved(2_000));
        assert_eq!(state.phase(t0 + Duration::from_millis(1_000)), SyncPhase::Editing);
        assert_eq!(state.phase(t0 + Duration::from_millis(3_000)), SyncPhase::Clean);
    }

    // ── Saves ──────────────────────────────────────────────────────

    #[test]
    fn patch_carries_only_dirty_fields() {
        let (mut state, t0) = state();
        state.record_edit(LocalEdit::Title("Renamed".into()), t0);
        let patch = state.take_save().unwrap();
        assert_eq!(patch, PatchPageRequest { title: Some("Renamed".into()), ..Default::default() });
    }

    #[test]
    fn one_save_in_flight_at_a_time() {
        let (mut state, t0) = state();
        state.record_edit(LocalEdit::Content(json!("a")), t0);
        assert!(state.take_save().is_some());
        state.record_edit(LocalEdit::Content(json!("b")), t0);
        assert!(state.take_save().is_none());

        state.on_save_success(&saved(2_000));
        assert!(state.needs_save());
        assert_eq!(state.take_save().unwrap().content, Some(json!("b")));
    }

    #[test]
    fn nothing_dirty_means_no_save() {
        let (mut state, _) = state();
        assert!(state.take_save().is_none());
    }

    #[test]
    fn failed_save_restores_dirty_fields() {
        let (mut state, t0) = state();
        state.record_edit(LocalEdit::Icon("📄".into()), t0);
        state.take_save().unwrap();
        state.on_save_failure();

        assert!(state.save_failed());
        assert!(state.retry_save());
        assert_eq!(state.draft().icon.as_deref(), Some("📄"));
        let patch = state.take_save().unwrap();
        assert_eq!(patch.icon.as_deref(), Some("📄"));

        state.on_save_success(&saved(2_000));
        assert!(!state.save_failed());
        assert!(!state.retry_save());
    }

    #[test]
    fn stale_save_response_does_not_regress_version() {
        let (mut state, t0) = state();
        state.record_edit(LocalEdit::Content(json!("x")), t0);
        state.take_save().unwrap();
        state.on_save_success(&saved(500));
        assert_eq!(state.last_known_server_version(), version(1_000));
    }

    // ── Polls ──────────────────────────────────────────────────────

    #[test]
    fn same_version_poll_is_a_no_op() {
        let (mut state, t0) = state();
        state.record_edit(LocalEdit::Content(json!("local")), t0);
        state.take_save().unwrap();
        state.on_save_success(&saved(1_200));

        let later = t0 + Duration::from_secs(10);
        let decision = state.on_poll(&document(1_200, json!("server copy")), later);
        assert_eq!(decision, PollDecision::UpToDate);
        assert_eq!(state.draft().content, json!("local"));
    }

    #[test]
    fn older_version_poll_is_ignored() {
        let (mut state, t0) = state();
        assert_eq!(state.on_poll(&document(900, json!("old")), t0), PollDecision::UpToDate);
        assert_eq!(state.draft().content, json!("v1"));
    }

    #[test]
    fn poll_within_suppression_window_is_deferred() {
        let (mut state, t0) = state();
        state.record_edit(LocalEdit::Content(json!("local")), t0);
        state.take_save().unwrap();
        state.on_save_success(&saved(1_100));

        let poll = document(1_500, json!("remote"));
        let decision = state.on_poll(&poll, t0 + Duration::from_millis(2_000));
        assert_eq!(decision, PollDecision::Deferred);
        assert_eq!(state.draft().content, json!("local"));
        assert_eq!(state.last_known_server_version(), version(1_100));

        let decision = state.on_poll(&poll, t0 + Duration::from_millis(3_000));
        assert_eq!(decision, PollDecision::Applied);
        assert_eq!(state.draft().content, json!("remote"));
        assert_eq!(state.last_known_server_version(), version(1_500));
    }

    #[test]
    fn poll_with_unsaved_edit_is_deferred_even_after_window() {
        let (mut state, t0) = state();
        state.record_edit(LocalEdit::Content(json!("local")), t0);
        let decision = state.on_poll(&document(2_000, json!("remote")), t0 + Duration::from_secs(30));
        assert_eq!(decision, PollDecision::Deferred);
        assert_eq!(state.draft().content, json!("local"));
    }

    #[test]
    fn deferred_poll_still_mirrors_metadata() {
        let (mut state, t0) = state();
        state.record_edit(LocalEdit::Content(json!("local")), t0);
        let mut remote = document(2_000, json!("remote"));
        remote.page.title = "Renamed elsewhere".into();
        state.on_poll(&remote, t0);
        let view = state.view();
        assert_eq!(view.server_title, "Renamed elsewhere");
        assert_eq!(view.draft.title, "Doc");
        assert_eq!(view.last_poll, Some(PollDecision::Deferred));
    }

    #[test]
    fn clean_document_takes_newer_server_content() {
        let (mut state, t0) = state();
        let decision = state.on_poll(&document(2_000, json!("remote")), t0);
        assert_eq!(decision, PollDecision::Applied);
        assert_eq!(state.view().draft.content, json!("remote"));
        assert_eq!(state.view().server_version, version(2_000));
    }
}
