//! Location and session history.
//!
//! The host keeps a stack of [`Url`]s. `push_state` adds an entry without
//! notifying anyone; `back`/`forward` move through the stack and notify
//! every registered popstate listener, then drain the microtask queue.

use url::Url;

use super::Host;
use crate::dom::NodeId;
use crate::logging::targets;

/// The initial location of a new host.
pub const DEFAULT_LOCATION: &str = "https://localhost/";

/// Query string key/value pairs with `URLSearchParams` semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    /// Pairs of the query of `url`.
    pub fn from_url(url: &Url) -> Self {
        Self {
            pairs: url.query_pairs().into_owned().collect(),
        }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Replace the first value for `key` and drop the others; append when
    /// absent.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(first) => {
                self.pairs[first].1 = value.to_string();
                let mut index = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = index <= first || k != key;
                    index += 1;
                    keep
                });
            }
            None => self.pairs.push((key.to_string(), value.to_string())),
        }
    }

    /// Remove every value for `key`.
    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Pairs in order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// A copy of `url` whose query is these pairs. Path and fragment are kept.
    pub fn apply_to(&self, url: &Url) -> Url {
        let mut next = url.clone();
        if self.pairs.is_empty() {
            next.set_query(None);
        } else {
            next.query_pairs_mut().clear().extend_pairs(self.pairs.iter());
        }
        next
    }
}

/// Session history.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Url>,
    index: usize,
}

impl History {
    /// History with a single entry.
    pub fn new(location: Url) -> Self {
        Self {
            entries: vec![location],
            index: 0,
        }
    }

    /// The current entry.
    pub fn location(&self) -> &Url {
        &self.entries[self.index]
    }

    /// Replace the current entry.
    pub fn replace(&mut self, url: Url) {
        self.entries[self.index] = url;
    }

    /// Add an entry after the current one, dropping forward entries.
    pub fn push(&mut self, url: Url) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index += 1;
    }

    /// Step back. Returns false at the first entry.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Step forward. Returns false at the last entry.
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a history has at least one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_LOCATION).expect("default location is a valid URL"))
    }
}

impl Host {
    /// The current location.
    pub fn location(&self) -> &Url {
        self.history.location()
    }

    /// Query parameters of the current location.
    pub fn search_params(&self) -> SearchParams {
        SearchParams::from_url(self.location())
    }

    /// Load `url` as the current page, replacing the current entry. No
    /// popstate is fired.
    pub fn set_location(&mut self, url: Url) {
        tracing::debug!(target: targets::HISTORY, url = %url, "location set");
        self.history.replace(url);
    }

    /// Parse and load `url` as the current page.
    pub fn navigate(&mut self, url: &str) -> Result<(), url::ParseError> {
        let url = Url::parse(url)?;
        self.set_location(url);
        Ok(())
    }

    /// Push a history entry.
    pub fn push_state(&mut self, url: Url) {
        tracing::debug!(target: targets::HISTORY, url = %url, "push state");
        self.history.push(url);
    }

    /// Session history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether the runtime supports query-string history.
    pub fn supports_history(&self) -> bool {
        self.config.history
    }

    /// Go back one entry and fire popstate.
    pub fn back(&mut self) -> bool {
        let moved = self.history.back();
        if moved {
            self.fire_popstate();
        }
        moved
    }

    /// Go forward one entry and fire popstate.
    pub fn forward(&mut self) -> bool {
        let moved = self.history.forward();
        if moved {
            self.fire_popstate();
        }
        moved
    }

    /// Register `el` for popstate notifications. Registering twice has no
    /// effect.
    pub fn add_popstate_listener(&mut self, el: NodeId) {
        if !self.popstate_listeners.contains(&el) {
            self.popstate_listeners.push(el);
        }
    }

    /// Unregister `el`.
    pub fn remove_popstate_listener(&mut self, el: NodeId) {
        self.popstate_listeners.retain(|l| *l != el);
    }

    /// Whether `el` is registered for popstate.
    pub fn has_popstate_listener(&self, el: NodeId) -> bool {
        self.popstate_listeners.contains(&el)
    }

    fn fire_popstate(&mut self) {
        tracing::debug!(
            target: targets::HISTORY,
            url = %self.location(),
            listeners = self.popstate_listeners.len(),
            "popstate"
        );
        for el in self.popstate_listeners.clone() {
            if let Some(behavior) = self.behavior_of(el) {
                behavior.history_navigated(self, el);
            }
        }
        self.run_until_idle();
    }
}
