//! # Pagewatch Channels
//! One dispatcher per notification transport, plus the registry the
//! fan-out routes through.

pub mod email;
pub mod telegram;
pub mod webhook;
pub mod websocket;

pub use email::EmailDispatcher;
pub use telegram::TelegramDispatcher;
pub use webhook::WebhookDispatcher;
pub use websocket::{SocketHub, WebsocketDispatcher};

use std::collections::HashMap;
use std::sync::Arc;

use pagewatch_core::traits::Dispatcher;
use pagewatch_core::types::ChannelKind;

/// Lookup table from channel tag to dispatcher. Built once at wiring
/// time from whatever channels the process has credentials for.
#[derive(Default)]
pub struct DispatcherSet {
    inner: HashMap<ChannelKind, Arc<dyn Dispatcher>>,
}

impl DispatcherSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatcher under its own tag. Last registration wins.
    pub fn register(&mut self, dispatcher: Arc<dyn Dispatcher>) {
        self.inner.insert(dispatcher.kind(), dispatcher);
    }

    pub fn get(&self, kind: ChannelKind) -> Option<Arc<dyn Dispatcher>> {
        self.inner.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ChannelKind> {
        self.inner.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
