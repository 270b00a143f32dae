//! The custom element registry.
//!
//! Maps tags to [`DefinedClass`]es, parks `when_defined` continuations until
//! every tag they wait for is defined, and upgrades elements that existed
//! before their class.

use std::collections::HashMap;
use std::sync::Arc;

use super::Host;
use crate::error::RegistrationError;
use crate::logging::targets;
use crate::registry::{ComponentClass, DefinedClass};
use crate::task::BoxedTask;

struct Waiter {
    tags: Vec<String>,
    task: BoxedTask<Host>,
}

/// Tag → class table plus pending `when_defined` continuations.
#[derive(Default)]
pub struct CustomElementRegistry {
    classes: HashMap<String, Arc<DefinedClass>>,
    waiters: Vec<Waiter>,
}

impl CustomElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The class registered under `tag`.
    pub fn get(&self, tag: &str) -> Option<&Arc<DefinedClass>> {
        self.classes.get(tag)
    }

    /// Whether `tag` is defined.
    pub fn is_defined(&self, tag: &str) -> bool {
        self.classes.contains_key(tag)
    }

    /// Defined tags, unordered.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Number of continuations still waiting.
    pub fn pending_waiters(&self) -> usize {
        self.waiters.len()
    }

    fn take_ready(&mut self) -> Vec<BoxedTask<Host>> {
        let (ready, waiting): (Vec<Waiter>, Vec<Waiter>) = std::mem::take(&mut self.waiters)
            .into_iter()
            .partition(|w| w.tags.iter().all(|t| self.classes.contains_key(t)));
        self.waiters = waiting;
        ready.into_iter().map(|w| w.task).collect()
    }
}

impl std::fmt::Debug for CustomElementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomElementRegistry")
            .field("tags", &self.classes.keys().collect::<Vec<_>>())
            .field("waiters", &self.waiters.len())
            .finish()
    }
}

impl Host {
    /// Register a component class.
    ///
    /// Configuration mistakes are fatal: the error is logged and returned and
    /// the tag stays undefined. Registering an already defined tag is only a
    /// warning; the first definition stays in place and is returned.
    pub fn define(&mut self, class: ComponentClass) -> Result<Arc<DefinedClass>, RegistrationError> {
        if let Some(existing) = self.definitions.get(class.tag()).cloned() {
            let candidate_version = class.declared_version();
            if existing.version() != candidate_version {
                tracing::warn!(
                    target: targets::REGISTRY,
                    "{} was registered at version {}; cannot register version {}.",
                    existing.tag(),
                    existing.version(),
                    candidate_version
                );
            } else {
                self.log_global(format_args!("{} is already defined", existing.tag()));
            }
            return Ok(existing);
        }

        let defined = match class.build() {
            Ok(defined) => Arc::new(defined),
            Err(err) => {
                tracing::error!(target: targets::REGISTRY, tag = err.tag(), error = %err, "registration failed");
                return Err(err);
            }
        };

        let tag = defined.tag().to_string();
        self.definitions.classes.insert(tag.clone(), defined.clone());
        tracing::debug!(target: targets::REGISTRY, tag = %tag, version = defined.version(), "defined");
        if self.config.track_performance {
            tracing::info!(target: targets::PERF, mark = %format!("{tag}-defined"), "performance mark");
        }

        for task in self.definitions.take_ready() {
            self.microtasks.post_boxed(task);
        }

        // Upgrade connected elements created before the definition.
        let root = self.document.root();
        let candidates: Vec<_> = self
            .document
            .shadow_including_inclusive_descendants(root)
            .into_iter()
            .filter(|n| self.document.tag_name(*n) == Some(tag.as_str()))
            .collect();
        for el in candidates {
            if !self.instances.contains_key(&el) {
                self.upgrade(el);
            }
        }

        Ok(defined)
    }

    /// Whether `tag` is defined.
    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.is_defined(tag)
    }

    /// The custom element registry.
    pub fn custom_elements(&self) -> &CustomElementRegistry {
        &self.definitions
    }

    /// Run `task` as a microtask once every tag in `tags` is defined.
    ///
    /// The continuation is always deferred, even when everything is already
    /// defined.
    pub fn when_defined<I, S, F>(&mut self, tags: I, task: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Host) + Send + 'static,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.iter().all(|t| self.definitions.is_defined(t)) {
            self.microtasks.post(task);
        } else {
            self.definitions.waiters.push(Waiter {
                tags,
                task: Box::new(task),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_when_defined_is_deferred_and_waits() {
        let mut host = Host::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        host.when_defined(["x-late"], move |_| o.lock().push("late"));
        let o = order.clone();
        host.when_defined(Vec::<String>::new(), move |_| o.lock().push("now"));
        assert!(order.lock().is_empty());

        host.run_until_idle();
        assert_eq!(*order.lock(), vec!["now"]);
        assert_eq!(host.custom_elements().pending_waiters(), 1);

        host.define(ComponentClass::new("x-late")).unwrap();
        assert_eq!(*order.lock(), vec!["now"]);
        host.run_until_idle();
        assert_eq!(*order.lock(), vec!["now", "late"]);
    }

    #[test]
    fn test_duplicate_definition_keeps_first() {
        let mut host = Host::new();
        let first = host.define(ComponentClass::new("x-dup").version("1.0.0")).unwrap();
        let second = host.define(ComponentClass::new("x-dup").version("2.0.0")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.version(), "1.0.0");
    }

    #[test]
    fn test_invalid_definition_leaves_tag_undefined() {
        let mut host = Host::new();
        assert!(matches!(
            host.define(ComponentClass::new("nohyphen")),
            Err(RegistrationError::InvalidTagName { .. })
        ));
        assert!(matches!(
            host.define(ComponentClass::new("x-bad").template("<div>")),
            Err(RegistrationError::Template { .. })
        ));
        assert!(!host.is_defined("x-bad"));
    }

    #[test]
    fn test_existing_elements_upgrade_on_define() {
        let mut host = Host::new();
        let el = host.create_element("x-later");
        let body = host.document().body();
        host.append_child(body, el).unwrap();
        assert!(!host.is_component(el));

        host.define(ComponentClass::new("x-later")).unwrap();
        assert!(host.is_component(el));
        assert!(host.document().has_class(el, "HLElement"));
    }
}
