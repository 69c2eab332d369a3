//! Cross-thread plumbing between the host's threads and the control context.
//!
//! Requests that may originate on any thread (state restore, file drops,
//! engine callbacks) are wrapped in a [`ControlMessage`] and posted to a
//! channel. Only the control context drains it, one message at a time and in
//! FIFO order, so at most one reload or state application is ever in flight.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::engine::PatchHandle;
use crate::error::Result;
use crate::state::{self, PersistedState};
use crate::status::{PatchState, SharedStatus, Status};

/// Status reported when an incoming state blob cannot be decoded.
pub const INVALID_STATE_MESSAGE: &str = "Failed to load: invalid state";

/// Hash value meaning "no state applied yet".
const NO_STATE_HASH: u64 = 0;

/// A state record waiting to be applied on the control context.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingState {
    pub state: PersistedState,
}

/// Work posted to the control context.
#[derive(Debug)]
pub(crate) enum ControlMessage {
    ApplyState(PendingState),
    Unload,
    Status(Status),
    /// The patch changed itself; refresh the snapshot and notify.
    PatchChanged,
}

/// State shared by the adapter, its handles and the audio processor.
pub(crate) struct Shared {
    /// The live patch. The audio thread only ever `try_lock`s it.
    pub slot: Mutex<Option<Box<dyn PatchHandle>>>,
    /// Set only after a fully constructed playable handle is in `slot`.
    pub playable: AtomicBool,
    pub suspended: AtomicBool,
    pub playing: AtomicBool,
    pub status: SharedStatus,
    /// A coalesced patch-changed notification is owed to the host.
    pub change_pending: AtomicBool,
    /// A `PatchChanged` message is queued and not yet handled.
    pub refresh_queued: AtomicBool,
    pub last_state_hash: AtomicU64,
    /// The audio thread dropped MIDI since the control context last looked.
    pub midi_overflow: AtomicBool,
    sender: Sender<ControlMessage>,
}

impl Shared {
    pub fn new() -> (Arc<Self>, Receiver<ControlMessage>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let shared = Arc::new(Self {
            slot: Mutex::new(None),
            playable: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            status: SharedStatus::default(),
            change_pending: AtomicBool::new(false),
            refresh_queued: AtomicBool::new(false),
            last_state_hash: AtomicU64::new(NO_STATE_HASH),
            midi_overflow: AtomicBool::new(false),
            sender,
        });
        (shared, receiver)
    }

    pub fn post(&self, message: ControlMessage) {
        if self.sender.send(message).is_err() {
            log::debug!("Control queue closed, dropping message");
        }
    }

    /// Request a snapshot refresh and a patch-changed notification.
    ///
    /// Only the first request before the refresh runs posts a message; the
    /// rest fold into it. The notification itself is owed independently, so
    /// a flush already pending from a control operation never swallows the
    /// refresh.
    pub fn request_patch_change(&self) {
        self.change_pending.store(true, Ordering::Release);
        if !self.refresh_queued.swap(true, Ordering::AcqRel) {
            self.post(ControlMessage::PatchChanged);
        }
    }

    /// Forget the last applied state hash, so the next blob is applied even
    /// if it matches.
    pub fn forget_state_hash(&self) {
        self.last_state_hash.store(NO_STATE_HASH, Ordering::Release);
    }
}

/// Thread-safe handle for posting requests to an adapter.
///
/// Cheap to clone. Everything it does is asynchronous: the work happens the
/// next time the control context calls
/// [`PatchAdapter::dispatch_pending`](crate::PatchAdapter::dispatch_pending).
#[derive(Clone)]
pub struct AdapterHandle {
    shared: Arc<Shared>,
}

impl AdapterHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Queue a state blob from the host.
    ///
    /// Returns `Ok(false)` if the blob is byte-identical to the last one
    /// queued, in which case nothing happens. A blob that cannot be decoded
    /// changes nothing except the status and returns
    /// [`AdapterError::StateMalformed`](crate::AdapterError::StateMalformed).
    pub fn set_state(&self, data: &[u8]) -> Result<bool> {
        let hash = state::content_hash(data);
        if hash == self.shared.last_state_hash.load(Ordering::Acquire) {
            log::debug!("Skipping redelivered state ({} bytes)", data.len());
            return Ok(false);
        }

        match state::decode(data) {
            Ok(state) => {
                self.shared.last_state_hash.store(hash, Ordering::Release);
                self.shared
                    .post(ControlMessage::ApplyState(PendingState { state }));
                Ok(true)
            }
            Err(e) => {
                log::warn!("Ignoring state blob: {e}");
                self.shared
                    .post(ControlMessage::Status(Status::error(INVALID_STATE_MESSAGE)));
                Err(e)
            }
        }
    }

    /// Queue a state record built in-process.
    pub fn post_state(&self, state: PersistedState) {
        self.shared.forget_state_hash();
        self.shared
            .post(ControlMessage::ApplyState(PendingState { state }));
    }

    /// Queue loading the manifest at `path` (e.g. from a file drop).
    pub fn load_patch_file(&self, path: impl AsRef<Path>) {
        self.post_state(PersistedState::for_location(
            path.as_ref().to_string_lossy().into_owned(),
        ));
    }

    /// Queue an unload.
    pub fn unload(&self) {
        self.shared.forget_state_hash();
        self.shared.post(ControlMessage::Unload);
    }

    /// Suspend or resume audio processing. Takes effect on the next block.
    pub fn set_suspended(&self, suspended: bool) {
        self.shared.suspended.store(suspended, Ordering::Release);
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.suspended.load(Ordering::Acquire)
    }

    pub fn status(&self) -> Status {
        self.shared.status.status()
    }

    pub fn state(&self) -> PatchState {
        self.shared.status.state()
    }

    /// Whether the patch last reported that playback started.
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("state", &self.state())
            .field("suspended", &self.is_suspended())
            .finish()
    }
}
