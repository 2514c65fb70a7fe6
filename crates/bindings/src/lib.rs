//! Bindings pipeline: the variable scope a script executes with.
//!
//! Every execution gets a fresh [`Scope`] built by [`BindingsPipeline`]:
//! reserved base bindings first, then caller extras, then contributions from
//! the [`BindingsValuesProvider`]s registered for the execution's context and
//! the engine's languages. Reserved keys ([`keys::RESERVED`]) are write-once;
//! a provider touching one fails the execution.

mod error;
mod helper;
pub mod keys;
mod pipeline;
mod protected;
mod provider;
mod providers;
#[cfg(test)]
mod test_support;

pub use error::ScopeError;
pub use helper::ScriptHelper;
pub use pipeline::{BindingsPipeline, ExecutionRequest, PipelineConfig, Scope, ScopeGuard};
pub use protected::ProtectedBindings;
pub use provider::{BindingsValuesProvider, StaticBindingsProvider};
pub use providers::{DEFAULT_CONTEXT, ProviderId, ProviderRegistration, ProviderRegistry};
