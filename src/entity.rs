//! Entity identifiers, membership masks, and handles.
//!
//! An [`EntityId`] is an opaque 64-bit identifier that is strictly monotone
//! within one manager and never reused after deletion. Staleness is not
//! detected through a generation counter; instead every [`EntityHandle`]
//! carries a [`Mask`] snapshot of the entity's component/tag membership taken
//! when the handle was created or last refreshed. Any mutation that changes
//! the entity's membership leaves old handles detectably stale on next use,
//! while handles that performed the mutation are refreshed in place.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::manager::{Manager, ManagerToken};

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// An opaque entity identifier.
///
/// Ids are allocated from a per-manager monotone counter and are never
/// recycled: destroying an entity retires its id permanently.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Mask
// ---------------------------------------------------------------------------

/// A membership bitmask over a manager's registered components and tags.
///
/// Component bits occupy `[0, COMPONENT_COUNT)` and tag bits occupy
/// `[COMPONENT_COUNT, COMPONENT_COUNT + TAG_COUNT)`; a declared manager is
/// limited to 64 combined slots. Bit `i` set means the entity occupies
/// slot `i`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mask(u64);

impl Mask {
    /// The zero mask: no components, no tags.
    pub const EMPTY: Mask = Mask(0);

    /// Width of the mask word.
    pub const BITS: u32 = 64;

    /// A mask with exactly `bit` set.
    #[inline]
    pub const fn single(bit: u32) -> Mask {
        Mask(1u64 << bit)
    }

    /// This mask with `bit` set.
    #[inline]
    pub const fn with(self, bit: u32) -> Mask {
        Mask(self.0 | (1u64 << bit))
    }

    /// This mask with `bit` cleared.
    #[inline]
    pub const fn without(self, bit: u32) -> Mask {
        Mask(self.0 & !(1u64 << bit))
    }

    /// Bitwise union of two masks.
    #[inline]
    pub const fn union(self, other: Mask) -> Mask {
        Mask(self.0 | other.0)
    }

    /// Whether `bit` is set.
    #[inline]
    pub const fn contains(self, bit: u32) -> bool {
        self.0 & (1u64 << bit) != 0
    }

    /// Whether every bit of `required` is set in `self`.
    ///
    /// This single AND-and-compare is the whole membership test a query
    /// performs per candidate entity.
    #[inline]
    pub const fn contains_all(self, required: Mask) -> bool {
        self.0 & required.0 == required.0
    }

    /// Number of set bits.
    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether no bit is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mask({:#b})", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityStatus
// ---------------------------------------------------------------------------

/// The result of checking a handle against a manager.
///
/// Only [`EntityStatus::Ok`] permits further operations; every other status
/// makes operations fail with the matching [`EcsError`](crate::EcsError)
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityStatus {
    /// The handle was default-constructed and never bound to a manager.
    Uninitialized,
    /// The handle is fresh: its snapshot matches the live record.
    Ok,
    /// The handle belongs to a different manager.
    InvalidManager,
    /// The id is not in the registry (the entity was destroyed through some
    /// other handle, or never existed).
    NotFound,
    /// The entity still exists, but its component/tag set changed since this
    /// handle was taken.
    Stale,
    /// The entity was destroyed through this very handle.
    Deleted,
}

// ---------------------------------------------------------------------------
// EntityHandle
// ---------------------------------------------------------------------------

/// A cheap, copyable reference to an entity.
///
/// A handle bundles the owning manager's token, the entity id, and a
/// [`Mask`] snapshot taken when the handle was produced. Handles do not
/// borrow the manager: all operations are methods on the manager that take
/// the handle as an argument, and mutating operations take `&mut` to the
/// handle so they can refresh its snapshot. Copies that did not participate
/// in a mutation keep their old snapshot and report [`EntityStatus::Stale`].
///
/// Two handles compare equal when they name the same entity in the same
/// manager, regardless of snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityHandle {
    pub(crate) manager: Option<ManagerToken>,
    pub(crate) id: EntityId,
    pub(crate) snapshot: Mask,
    pub(crate) deleted: bool,
}

impl EntityHandle {
    /// The entity id this handle refers to.
    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The membership snapshot captured when this handle was produced.
    #[inline]
    pub fn snapshot(&self) -> Mask {
        self.snapshot
    }

    pub(crate) fn live(token: ManagerToken, id: EntityId, snapshot: Mask) -> Self {
        Self {
            manager: Some(token),
            id,
            snapshot,
            deleted: false,
        }
    }

    /// Compute this handle's status against `manager`.
    ///
    /// Checks run in a fixed order and the first failing one wins:
    /// uninitialized, foreign manager, deleted-by-this-handle, id missing
    /// from the registry, snapshot mismatch.
    pub fn status<M: Manager>(&self, manager: &M) -> EntityStatus {
        let Some(token) = self.manager else {
            return EntityStatus::Uninitialized;
        };
        if token != manager.token() {
            return EntityStatus::InvalidManager;
        }
        if self.deleted {
            return EntityStatus::Deleted;
        }
        match manager.registry().mask(self.id) {
            None => EntityStatus::NotFound,
            Some(mask) if mask != self.snapshot => EntityStatus::Stale,
            Some(_) => EntityStatus::Ok,
        }
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.manager == other.manager && self.id == other.id
    }
}

impl Eq for EntityHandle {}

impl std::hash::Hash for EntityHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.manager.hash(state);
        self.id.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
