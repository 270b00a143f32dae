//! Core systems for Horizon Elements.
//!
//! This crate provides the base-class framework the `hl-*` widgets are built
//! on:
//!
//! - **Host runtime**: an in-memory document with shadow roots, a custom
//!   element registry, mutation watchers, a microtask queue, session history
//!   and event dispatch
//! - **Property reflection**: declarative property tables turned into typed
//!   accessors over attributes, with coercion, defaults, observers and
//!   aliases
//! - **Property registry**: per-class merge with the shared base table,
//!   attribute maps and the cascade table, built once at registration
//! - **Cascade**: attribute copies into matching light and shadow descendants
//! - **Context**: propagation of the visual context to nested components
//! - **Lifecycle**: construct, render, connect and disconnect
//! - **Signals**: type-safe notification of emitted custom events
//!
//! # Defining a Component
//!
//! ```
//! use horizon_elements_core::{ComponentClass, Host, PropertyDefinition, PropertyValue};
//!
//! let mut host = Host::new();
//! host.define(
//!     ComponentClass::new("x-alert")
//!         .template("<div class=\"alert\"><slot></slot></div>")
//!         .property(PropertyDefinition::string("state").default("info").values(["info", "danger"]))
//!         .property(PropertyDefinition::boolean("dismissable")),
//! )
//! .unwrap();
//!
//! let alert = host.create_element("x-alert");
//! let body = host.document().body();
//! host.append_child(body, alert).unwrap();
//!
//! assert_eq!(host.property(alert, "state").unwrap(), PropertyValue::from("info"));
//! host.set_property(alert, "dismissable", true).unwrap();
//! assert_eq!(host.document().get_attribute(alert, "dismissable"), Some(""));
//! ```
//!
//! # Listening to Events
//!
//! ```
//! use horizon_elements_core::{EventDetail, Host};
//!
//! let mut host = Host::new();
//! let conn = host.events().connect(|event| {
//!     println!("{} from {:?}", event.name, event.target);
//! });
//!
//! let body = host.document().body();
//! host.emit_event(body, "x-demo:ready", EventDetail::None);
//! host.events().disconnect(conn);
//! ```

pub mod base;
mod cascade;
pub mod config;
mod context;
pub mod dom;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod property;
pub mod registry;
pub mod signal;
mod slots;
pub mod task;

pub use config::{ConfigError, ElementsConfig};
pub use dom::{Document, DomError, NodeId, SelectorError, SelectorList, TemplateError};
pub use error::{ElementError, RegistrationError, Result, ResultExt};
pub use host::{
    CustomEvent, EventDetail, Host, Key, KeyboardEvent, MutationRecord, SearchParams, UiEvent, UiEventKind,
    WatcherKind, WatcherOptions,
};
pub use lifecycle::{ComponentBehavior, ComponentInstance, DefaultBehavior};
pub use logging::{ElementTreeDebug, PerfSpan, TreeFormatOptions, TreeStyle};
pub use property::{PropertyDefinition, PropertyType, PropertyValue};
pub use registry::{ComponentClass, ComponentRegistry, ComponentType, DefinedClass, SlotDefinition};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use task::TaskId;

// Re-export url so widgets and embedders share the location type.
pub use url::Url;
