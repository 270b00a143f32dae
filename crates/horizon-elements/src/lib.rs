//! Horizon Elements - accessible composite widgets built on custom elements.
//!
//! This is the widget crate; it re-exports the core framework so embedders
//! only depend on one crate.
//!
//! # Example
//!
//! ```
//! use horizon_elements::tabs::Tabs;
//! use horizon_elements::{Host, define_all};
//!
//! let mut host = Host::new();
//! define_all(&mut host).unwrap();
//!
//! let set = host.create_element("hl-tabs");
//! for label in ["One", "Two"] {
//!     let tab = host.create_element("hl-tab");
//!     host.set_text_content(tab, label).unwrap();
//!     let panel = host.create_element("hl-tab-panel");
//!     host.set_text_content(panel, label).unwrap();
//!     host.append_child(set, tab).unwrap();
//!     host.append_child(set, panel).unwrap();
//! }
//! let body = host.document().body();
//! host.append_child(body, set).unwrap();
//! host.run_until_idle();
//!
//! let tabs = Tabs::from_element(&host, set).unwrap();
//! assert_eq!(tabs.selected_index(&host), Some(0));
//! tabs.select_index(&mut host, 1);
//! assert_eq!(tabs.selected_index(&host), Some(1));
//! ```

pub use horizon_elements_core::*;

pub mod tabs;

/// Register every widget class with `host`.
pub fn define_all(host: &mut Host) -> std::result::Result<(), RegistrationError> {
    tabs::define(host)
}
