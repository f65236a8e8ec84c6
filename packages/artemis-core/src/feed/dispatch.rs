//! Message name to handler routing

use std::collections::HashMap;

use super::event::Event;

/// A handler bound to one message name.
///
/// Handlers get exclusive access to the context they mutate, so the table
/// itself holds no state and needs no locking.
pub type Handler<C> = fn(&mut C, &Event);

/// Outcome of routing one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Unhandled,
}

/// Table of handlers keyed by exact, case-sensitive message name.
pub struct DispatchTable<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> DispatchTable<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Bind `handler` to `message`, replacing any previous binding.
    pub fn register(&mut self, message: impl Into<String>, handler: Handler<C>) {
        let message = message.into();
        if self.handlers.insert(message.clone(), handler).is_some() {
            tracing::debug!(message = %message, "replaced existing handler");
        }
    }

    /// Route `event` to its handler, if any.
    pub fn dispatch(&self, ctx: &mut C, event: &Event) -> Dispatch {
        match self.handlers.get(event.message()) {
            Some(handler) => {
                tracing::info!("Calling handler for {}", event);
                handler(ctx, event);
                Dispatch::Handled
            }
            None => {
                tracing::info!("No handler for {}", event);
                Dispatch::Unhandled
            }
        }
    }

    pub fn contains(&self, message: &str) -> bool {
        self.handlers.contains_key(message)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered message names, sorted.
    pub fn messages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<C> Default for DispatchTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
