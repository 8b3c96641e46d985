//! Deterministic hash-based type identity.
//!
//! [`TypeHash`] is the key under which per-type records live in the state
//! registry. Type identities are computed from the type's [`TypeId`], so the
//! same type always yields the same key without any registration-order
//! bookkeeping, and two types never share one just because their names
//! print alike. Internal slots hash their name in a separate domain.
//!
//! # Examples
//!
//! ```
//! use scriptbridge_core::TypeHash;
//!
//! struct Point;
//!
//! assert_eq!(TypeHash::of::<Point>(), TypeHash::of::<Point>());
//! assert_ne!(TypeHash::of::<Point>(), TypeHash::of::<String>());
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::Hash;
use xxhash_rust::xxh64::{Xxh64, xxh64};

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Domain marker for native type identities.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for internal registry slots that are not types.
    pub const SLOT: u64 = 0x5ea77ffbcdf5f302;
}

/// A deterministic 64-bit identity for a native type or registry slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Identity of the native type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from_type_id(TypeId::of::<T>())
    }

    /// Identity of the type behind `id`.
    pub fn from_type_id(id: TypeId) -> Self {
        let mut hasher = Xxh64::new(hash_constants::TYPE);
        id.hash(&mut hasher);
        TypeHash(hasher.digest())
    }

    /// Identity of a named internal registry slot.
    ///
    /// Slots live in a separate hash domain so they never collide with a
    /// type identity of the same spelling.
    #[inline]
    pub fn slot(name: &str) -> Self {
        TypeHash(xxh64(name.as_bytes(), hash_constants::SLOT))
    }

    /// Check if this is the empty hash.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash(0x{:016x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}
