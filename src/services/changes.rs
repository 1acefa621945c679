use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Uploaded,
    Deleted,
    Restored,
    Purged,
    FavouriteToggled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChangeEvent {
    pub scope_id: String,
    pub file_id: String,
    pub kind: ChangeKind,
}

/// Fan-out of committed mutations so clients can refresh instead of polling.
/// Events are only published after the write they describe has committed.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, scope_id: &str, file_id: &str, kind: ChangeKind) {
        let event = ChangeEvent {
            scope_id: scope_id.to_string(),
            file_id: file_id.to_string(),
            kind,
        };
        // No subscribers is the common case and not an error
        if self.sender.send(event).is_err() {
            tracing::trace!("No change feed subscribers for {:?} on {}", kind, file_id);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}
