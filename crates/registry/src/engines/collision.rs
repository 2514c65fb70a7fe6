use std::fmt;

/// Which association map a collision occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
	Extension,
	Name,
	MimeType,
}

impl fmt::Display for AssociationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Extension => write!(f, "extension"),
			Self::Name => write!(f, "name"),
			Self::MimeType => write!(f, "mime_type"),
		}
	}
}

/// A lookup key claimed by more than one engine.
///
/// The winner is the higher-precedence engine; the shadowed engine stays
/// registered and reachable through candidate listings and language hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationCollision {
	pub kind: AssociationKind,
	pub key: String,
	pub winner: String,
	pub shadowed: String,
}
