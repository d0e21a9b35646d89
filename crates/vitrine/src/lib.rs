//! # vitrine
//!
//! State synchronization between host models and notebook front-end views.
//!
//! A [`ViewBundle`] ties one model to one view: it resolves how the model's
//! state is read and written, opens a channel through the process-wide
//! registry, splits binary payloads out of outbound state, joins them back
//! into inbound updates, and (when the model exposes a change notifier)
//! pushes edits to the peer as they happen.
//!
//! ```no_run
//! use std::sync::Arc;
//! use parking_lot::RwLock;
//! use vitrine::{BundleOptions, ViewBundle};
//! use vitrine_channel::LoopbackProvider;
//! use vitrine_core::StateDict;
//! use vitrine_host::{HostModel, ModelHandle, SharedModel};
//! # struct Counter;
//! # impl HostModel for Counter {
//! #     fn type_label(&self) -> &str { "Counter" }
//! #     fn assign(&mut self, _: &str, _: vitrine_core::StateValue)
//! #         -> Result<(), vitrine_core::StateError> { Ok(()) }
//! # }
//!
//! let model: SharedModel = Arc::new(RwLock::new(Counter));
//! let provider = LoopbackProvider::new();
//! let bundle = ViewBundle::new(
//!     ModelHandle::weak(&model),
//!     &provider,
//!     BundleOptions::default(),
//!     StateDict::new(),
//! )?;
//! bundle.send_state(None)?;
//! # Ok::<(), vitrine::BundleError>(())
//! ```

#![deny(unsafe_code)]

pub mod bundle;
pub mod display;
pub mod errors;
pub mod logging;
pub mod platform;
pub mod static_asset;

pub use bundle::{BundleOptions, DEFAULT_ESM, ESM_KEY, ID_KEY, ViewBundle};
pub use errors::BundleError;
pub use static_asset::StaticAsset;

pub use vitrine_assets;
pub use vitrine_channel;
pub use vitrine_core;
pub use vitrine_host;
