use plaza_core::PeerId;
use std::sync::{Arc, RwLock};

pub type MessageHandler<T> = Arc<dyn Fn(PeerId, T) + Send + Sync>;

/// Handlers for one data channel of one peer.
///
/// Handlers registered before the channel exists wait in a pending list. The
/// first [`attach`](Self::attach) moves them into a live dispatcher exactly
/// once; later subscriptions go straight to the live list.
pub struct ChannelSubscription<T> {
    peer_id: PeerId,
    pending: Vec<MessageHandler<T>>,
    live: Option<Arc<RwLock<Vec<MessageHandler<T>>>>>,
}

impl<T: Clone> ChannelSubscription<T> {
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            pending: Vec::new(),
            live: None,
        }
    }

    pub fn subscribe(&mut self, handler: MessageHandler<T>) {
        match &self.live {
            Some(live) => live.write().unwrap_or_else(|e| e.into_inner()).push(handler),
            None => self.pending.push(handler),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.live.is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flushes pending handlers into a dispatcher. `None` if already attached.
    pub fn attach(&mut self) -> Option<Dispatcher<T>> {
        if self.live.is_some() {
            return None;
        }
        let live = Arc::new(RwLock::new(std::mem::take(&mut self.pending)));
        self.live = Some(live.clone());
        Some(Dispatcher {
            peer_id: self.peer_id,
            handlers: live,
        })
    }
}

/// Fans one decoded channel message out to every live handler.
#[derive(Clone)]
pub struct Dispatcher<T> {
    peer_id: PeerId,
    handlers: Arc<RwLock<Vec<MessageHandler<T>>>>,
}

impl<T: Clone> Dispatcher<T> {
    pub fn dispatch(&self, message: T) {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        for handler in handlers.iter() {
            handler(self.peer_id, message.clone());
        }
    }
}
