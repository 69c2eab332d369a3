//! The adapter's side of the patch callbacks.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::control::{ControlMessage, Shared};
use crate::endpoint::CONSOLE_ENDPOINT_ID;
use crate::engine::PatchListener;
use crate::status::{HostListener, Status};

/// Routes patch callbacks to the control queue or the host.
///
/// Never blocks, so engines may call it from the audio thread.
pub(crate) struct EngineEvents {
    shared: Arc<Shared>,
    host: Arc<dyn HostListener>,
}

impl EngineEvents {
    pub fn new(shared: Arc<Shared>, host: Arc<dyn HostListener>) -> Self {
        Self { shared, host }
    }
}

impl PatchListener for EngineEvents {
    fn playback_started(&self) {
        self.shared.playing.store(true, Ordering::Release);
    }

    fn playback_stopped(&self) {
        self.shared.playing.store(false, Ordering::Release);
    }

    fn patch_changed(&self) {
        self.shared.request_patch_change();
    }

    fn status_message(&self, message: &str, is_error: bool) {
        self.shared
            .post(ControlMessage::Status(Status::new(message, is_error)));
    }

    fn output_event(&self, frame: u64, endpoint_id: &str, value: &serde_json::Value) {
        if endpoint_id == CONSOLE_ENDPOINT_ID {
            match value {
                serde_json::Value::String(text) => self.host.console_message(text),
                other => self.host.console_message(&other.to_string()),
            }
        } else {
            log::debug!("Unrouted output event on '{endpoint_id}' at frame {frame}");
        }
    }
}
