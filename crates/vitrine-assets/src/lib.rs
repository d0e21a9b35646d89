//! # vitrine-assets
//!
//! Asset contents that a front-end module can be loaded from: a watched
//! file on disk ([`FileAsset`]) or an in-memory string ([`VirtualAsset`]),
//! interchangeable behind the [`AssetContents`] trait.
//!
//! File assets cache their text and can run a background watch thread that
//! invalidates the cache and notifies subscribers whenever the file changes
//! on disk.

#![deny(unsafe_code)]

pub mod contents;
pub mod errors;
pub mod file;

pub use contents::{AssetContents, AssetListener, SubscriptionId, VirtualAsset};
pub use errors::AssetError;
pub use file::{FileAsset, try_file_asset};
