//! Script engine registry and service cache.
//!
//! # Engines
//!
//! [`EngineRegistry`] aggregates engine factories from three origins
//! (platform, package-declared, dynamic) into one priority-ordered
//! [`EngineSnapshot`]. Every membership change rebuilds the snapshot from
//! scratch and publishes it atomically, so readers never observe a partially
//! updated association table.
//!
//! # Precedence Contract
//!
//! 1. **Rank:** higher [`PriorityKey::rank`] wins.
//! 2. **Origin id:** at equal rank, the earlier registration (lower id) wins.
//!
//! Extension, name and mime-type maps are derived by walking the ordered set
//! and letting the first claimant of each key win. Losing claimants are kept
//! as [`AssociationCollision`] records and logged.
//!
//! # Services
//!
//! [`ServiceCache`] memoizes priority-ordered lookups against an external
//! [`ServiceDirectory`], keyed by [`Capability`] tokens and invalidated per
//! capability on change notifications.

pub mod engines;
pub mod error;
pub mod services;

pub use engines::{
	AssociationCollision, AssociationKind, EngineDescriptor, EngineHandle, EngineOrigin,
	EngineProperties, EngineRegistry, EngineSetListener, EngineSnapshot, ListenerId, PriorityKey,
	language_hint,
};
pub use error::RegisterError;
pub use services::{
	Capability, DirectoryError, ServiceCache, ServiceDirectory, ServiceId, ServiceListener, ServiceRef,
};
