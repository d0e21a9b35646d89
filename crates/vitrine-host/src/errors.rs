//! Accessor resolution errors.

use thiserror::Error;

/// Errors raised while resolving state accessors for a model.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No capability on the model yields a state dict. This is a
    /// configuration error: the model is fundamentally incompatible until
    /// it implements the custom-state escape hatch.
    #[error(
        "cannot determine a state getter for `{type_label}`; implement the \
         `CustomStateAccess` capability to provide one"
    )]
    UnresolvableState {
        /// The model's concrete type label.
        type_label: String,
    },
}
