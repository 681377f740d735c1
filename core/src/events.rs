use crate::conversation::Message;
use tokio::sync::mpsc;

/// Events published by a session while it drives a turn
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Full copy of the conversation after a stream event or tool result
    Snapshot(Vec<Message>),

    /// A model request is being issued
    CycleStarted { cycle: usize },

    // Tool lifecycle events
    ToolBegin { id: String, name: String },
    ToolEnd { id: String, name: String, ok: bool, duration_ms: u64 },

    /// The turn ended with plain text; user input is expected next
    TurnCompleted { cycles: usize },

    /// The turn was aborted
    TurnFailed { message: String },
}

/// Event bus for communication between the session and the display
#[derive(Debug)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<AppEvent>,
    receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// Get a sender handle for the event bus
    pub fn sender(&self) -> EventSender {
        EventSender {
            inner: self.sender.clone(),
        }
    }

    /// Get the receiver (should only be used by the display loop)
    pub fn into_receiver(self) -> mpsc::UnboundedReceiver<AppEvent> {
        self.receiver
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for sending events to the event bus
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: mpsc::UnboundedSender<AppEvent>,
}

impl EventSender {
    /// Send an event to the bus
    pub fn send(&self, event: AppEvent) -> Result<(), EventSendError> {
        self.inner
            .send(event)
            .map_err(|_| EventSendError::ChannelClosed)
    }

    pub fn send_snapshot(&self, messages: Vec<Message>) -> Result<(), EventSendError> {
        self.send(AppEvent::Snapshot(messages))
    }
}

/// Errors that can occur when sending events
#[derive(Debug, thiserror::Error)]
pub enum EventSendError {
    #[error("Event channel is closed")]
    ChannelClosed,
}
