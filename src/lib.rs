//! EntityPlus -- statically-typed Entity-Component-System with snapshot-based
//! handle invalidation.
//!
//! Game objects are compositions of *components* (typed data) and *tags*
//! (boolean markers). Both lists are closed at compile time: the
//! [`entity_manager!`] macro declares a manager type with one sorted store
//! per component and a bit index per declared type, so every operation is
//! routed at compile time with no runtime type registry. Queries filter by
//! arbitrary subsets of components and tags, iterate the sparsest
//! participating store, and visit entities in deterministic id order.
//! Handles are cheap copies carrying a membership-mask snapshot; any
//! mutation that changes an entity's composition leaves bypassed handles
//! detectably stale on their next use.
//!
//! # Quick Start
//!
//! ```
//! use entityplus::prelude::*;
//!
//! struct Position { x: f32, y: f32 }
//! struct Velocity { dx: f32, dy: f32 }
//! struct Paused; // tags are unit structs
//!
//! entityplus::entity_manager! {
//!     struct GameManager {
//!         components: [Position, Velocity],
//!         tags: [Paused],
//!     }
//! }
//!
//! let mut em = GameManager::new();
//! let mut e = em.create();
//! em.add_component(&mut e, Position { x: 0.0, y: 0.0 }).unwrap();
//! em.add_component(&mut e, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
//!
//! em.for_each::<(Position, Velocity), (), _>(|_entity, (pos, vel)| {
//!     pos.x += vel.dx;
//!     pos.y += vel.dy;
//! });
//!
//! assert_eq!(em.get_component::<Position>(&e).unwrap().x, 1.0);
//! ```
//!
//! # Handles and staleness
//!
//! All operations are manager methods taking the handle; mutating ones take
//! the handle by `&mut` and refresh its snapshot, so the handle that
//! performed a mutation stays valid while every other copy becomes
//! [`Stale`](entity::EntityStatus::Stale). A destroyed entity's id is never
//! reused. Handles must not outlive their manager and are meaningless when
//! shown to a different manager (that is detected and reported as
//! [`ForeignManager`](EcsError::ForeignManager)).
//!
//! The manager is single-threaded by design: no internal synchronization,
//! no suspension points. Callers serialize access externally.

#![deny(unsafe_code)]

pub mod declare;
pub mod entity;
pub mod events;
pub mod holder;
pub mod manager;
#[allow(unsafe_code)]
pub mod query;
pub mod registry;

use entity::EntityId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by entity and component operations.
///
/// Handle checks run in a fixed order (uninitialized, foreign manager, not
/// found, stale) and the first failing check selects the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The handle was default-constructed and never bound to a manager.
    #[error("entity handle was never bound to a manager")]
    Uninitialized,

    /// The handle belongs to a different manager.
    #[error("entity {id} belongs to a different manager")]
    ForeignManager {
        /// Id carried by the offending handle.
        id: EntityId,
    },

    /// The id is not in the registry: destroyed, or never created here.
    #[error("entity {id} does not exist (deleted or never created)")]
    NotFound {
        /// Id carried by the offending handle.
        id: EntityId,
    },

    /// The entity exists but its composition changed since the handle's
    /// snapshot was taken.
    #[error("stale handle for entity {id}: its component or tag set has changed")]
    Stale {
        /// Id carried by the offending handle.
        id: EntityId,
    },

    /// The entity is valid but does not hold the requested component.
    #[error("entity {id} does not have component `{component}`")]
    InvalidComponent {
        /// The entity that was asked.
        id: EntityId,
        /// Type name of the missing component.
        component: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{EntityHandle, EntityId, EntityStatus, Mask};
    pub use crate::events::EventManager;
    pub use crate::manager::{CompSlot, Manager, ManagerToken, TagSlot};
    pub use crate::query::{ComponentSet, IterControl, Queries, TagSet};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
