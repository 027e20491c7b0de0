//! Runtime type identities
//!
//! - [`TypeIdentity`]: hashed, qualifier-aware fingerprint of one type
//! - [`TypeSignature`]: identity plus generic arguments
//! - [`TypeSpec`]: declared parameter/return type, possibly a generic slot
//! - [`NumericKind`]: the implicit numeric conversion table

mod convert;
mod hash;
mod identity;
mod signature;

pub use convert::{can_convert, convert_value, NumericKind};
pub use hash::{fnv1a_64, type_hash};
pub use identity::TypeIdentity;
pub use signature::{MatchMode, TypeSignature, TypeSlot, TypeSpec};
