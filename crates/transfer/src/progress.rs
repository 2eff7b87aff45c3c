use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

use crate::TransportError;

/// Event emitted while a chunked upload runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// A chunk was stored; `processed_bytes` is the running total.
    ChunkProgress {
        processed_bytes: u64,
        total_bytes: u64,
    },
    /// A chunk upload failed. Sibling uploads keep running.
    ChunkError {
        part_number: u64,
        offset: u64,
        byte_count: u64,
        error: TransportError,
    },
    /// Every byte reached the server. Emitted before finalize.
    UploadSuccess { total_bytes: u64 },
    /// The upload failed and the session was abandoned.
    UploadError { error: String },
}

/// Discriminant of [`UploadEvent`], used to filter listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChunkProgress,
    ChunkError,
    UploadSuccess,
    UploadError,
}

impl UploadEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ChunkProgress { .. } => EventKind::ChunkProgress,
            Self::ChunkError { .. } => EventKind::ChunkError,
            Self::UploadSuccess { .. } => EventKind::UploadSuccess,
            Self::UploadError { .. } => EventKind::UploadError,
        }
    }
}

/// Callback invoked with each matching event.
pub type EventHandler = Box<dyn Fn(&UploadEvent) + Send + Sync>;

enum Listener {
    Callback {
        kind: Option<EventKind>,
        handler: EventHandler,
    },
    Channel(mpsc::UnboundedSender<UploadEvent>),
}

/// Single-writer, multi-listener event stream for one upload.
///
/// Emission is synchronous and in call order. There is no replay: a
/// listener registered after an event fired never sees it. Cloning shares
/// the listener list.
///
/// Handlers run while the listener list is locked and must not register
/// further listeners on the same emitter.
#[derive(Clone, Default)]
pub struct ProgressEmitter {
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl std::fmt::Debug for ProgressEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ProgressEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind`.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&UploadEvent) + Send + Sync + 'static) {
        self.push(Listener::Callback {
            kind: Some(kind),
            handler: Box::new(handler),
        });
    }

    /// Registers `handler` for every event.
    pub fn on_any(&self, handler: impl Fn(&UploadEvent) + Send + Sync + 'static) {
        self.push(Listener::Callback {
            kind: None,
            handler: Box::new(handler),
        });
    }

    /// Returns a receiver that gets every event emitted from now on.
    ///
    /// Dropping the receiver unsubscribes it on the next emission.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UploadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Listener::Channel(tx));
        rx
    }

    /// Delivers `event` to every matching listener, in registration order.
    pub fn emit(&self, event: &UploadEvent) {
        let kind = event.kind();
        let mut closed = false;
        {
            let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
            for listener in listeners.iter() {
                match listener {
                    Listener::Callback { kind: filter, handler } => {
                        if filter.is_none_or(|k| k == kind) {
                            handler(event);
                        }
                    }
                    Listener::Channel(tx) => {
                        closed |= tx.send(event.clone()).is_err();
                    }
                }
            }
        }

        if closed {
            let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
            listeners.retain(|l| !matches!(l, Listener::Channel(tx) if tx.is_closed()));
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(&self, listener: Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }
}
