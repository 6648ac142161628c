//! The entity manager: lifecycle, component, and tag operations.
//!
//! Manager types are declared with the [`entity_manager!`](crate::entity_manager)
//! macro, which generates the storage (one [`ComponentHolder`] per declared
//! component, an [`EntityRegistry`]) and the routing impls
//! ([`CompSlot`]/[`TagSlot`]) that map each declared type to its bit index
//! and holder at compile time. All operation logic lives here, in provided
//! methods on the [`Manager`] trait, so a declared manager only supplies
//! storage and routing.
//!
//! Every operation that takes a handle validates it first, in a fixed order
//! (uninitialized, foreign manager, not found, stale); the first failing
//! check determines the reported [`EcsError`]. A mutation either completes
//! fully or is rejected before touching any holder.

use std::any::type_name;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::entity::{EntityHandle, EntityId, Mask};
use crate::holder::ComponentHolder;
use crate::registry::EntityRegistry;
use crate::EcsError;

// ---------------------------------------------------------------------------
// ManagerToken
// ---------------------------------------------------------------------------

/// Process-unique identity of one manager instance.
///
/// Handles carry a token instead of a reference to the manager (a borrow
/// would freeze the manager for the handle's lifetime), and foreign-manager
/// detection compares tokens. Tokens survive moves of the manager value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagerToken(u64);

impl ManagerToken {
    /// Allocate a fresh token. Called by the declaration macro's `new()`.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ManagerToken(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// Slot routing traits (implemented by the declaration macro)
// ---------------------------------------------------------------------------

/// Registration guard: implemented once per type declared in either list.
///
/// Declaring a type twice — in one list or across both — produces two
/// conflicting impls of this trait, which is how list uniqueness and
/// component/tag disjointness surface as a single compile error per
/// violation.
pub trait Slot<T> {}

/// Routes a component type to its bit index and holder inside a manager.
#[diagnostic::on_unimplemented(
    message = "`{C}` is not a registered component of `{Self}`",
    label = "declare `{C}` in this manager's `components` list"
)]
pub trait CompSlot<C>: Manager {
    /// Bit index of `C` in the membership mask.
    const BIT: u32;

    /// The holder storing all values of `C`.
    fn holder(&self) -> &ComponentHolder<C>;

    /// Mutable access to the holder storing all values of `C`.
    fn holder_mut(&mut self) -> &mut ComponentHolder<C>;
}

/// Routes a tag type to its bit index inside a manager.
///
/// Tags carry no data, so there is no holder; the bit lives in the tag
/// region of the mask, above all component bits.
#[diagnostic::on_unimplemented(
    message = "`{T}` is not a registered tag of `{Self}`",
    label = "declare `{T}` in this manager's `tags` list"
)]
pub trait TagSlot<T>: Manager {
    /// Bit index of `T` in the membership mask.
    const BIT: u32;
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Core entity-manager operations.
///
/// Implemented by types declared through
/// [`entity_manager!`](crate::entity_manager); user code only calls the
/// provided methods. The manager exclusively owns all records and component
/// values; handles are non-owning and must not be used across managers.
pub trait Manager: Sized {
    /// Number of declared component types.
    const COMPONENT_COUNT: u32;
    /// Number of declared tag types.
    const TAG_COUNT: u32;

    /// This manager instance's identity token.
    fn token(&self) -> ManagerToken;

    /// The live-entity registry.
    fn registry(&self) -> &EntityRegistry;

    /// Mutable access to the live-entity registry.
    fn registry_mut(&mut self) -> &mut EntityRegistry;

    /// Erase `id` from every holder whose bit is set in `mask`.
    ///
    /// Generated by the declaration macro; used by [`destroy`](Self::destroy).
    fn drop_components(&mut self, id: EntityId, mask: Mask);

    // -- lifecycle ----------------------------------------------------------

    /// Create a new entity with no components and no tags.
    ///
    /// The returned handle is fresh ([`EntityStatus::Ok`]) and its snapshot
    /// is the zero mask.
    ///
    /// [`EntityStatus::Ok`]: crate::entity::EntityStatus::Ok
    fn create(&mut self) -> EntityHandle {
        let id = self.registry_mut().create();
        tracing::trace!(%id, "created entity");
        EntityHandle::live(self.token(), id, Mask::EMPTY)
    }

    /// Destroy the entity `h` refers to.
    ///
    /// Removes the entity from every holder it occupies and drops its
    /// record in one logical step. Afterwards `h` reports
    /// [`EntityStatus::Deleted`]; any other handle to the same id reports
    /// [`EntityStatus::NotFound`]. The id is never reused.
    ///
    /// # Errors
    ///
    /// [`EcsError::Uninitialized`], [`EcsError::ForeignManager`],
    /// [`EcsError::NotFound`] or [`EcsError::Stale`] per the validation
    /// order.
    ///
    /// [`EntityStatus::Deleted`]: crate::entity::EntityStatus::Deleted
    /// [`EntityStatus::NotFound`]: crate::entity::EntityStatus::NotFound
    fn destroy(&mut self, h: &mut EntityHandle) -> Result<(), EcsError> {
        let mask = self.validate(h)?;
        self.drop_components(h.id, mask);
        self.registry_mut().remove(h.id);
        h.deleted = true;
        tracing::trace!(id = %h.id, "destroyed entity");
        Ok(())
    }

    /// Number of live entities.
    fn entity_count(&self) -> usize {
        self.registry().len()
    }

    // -- components ---------------------------------------------------------

    /// Whether the entity holds a `C`.
    ///
    /// Lacking the component is not an error; only an invalid handle is.
    fn has_component<C>(&self, h: &EntityHandle) -> Result<bool, EcsError>
    where
        Self: CompSlot<C>,
    {
        let mask = self.validate(h)?;
        Ok(mask.contains(<Self as CompSlot<C>>::BIT))
    }

    /// Attach `value` to the entity if it does not already hold a `C`.
    ///
    /// Returns the stored value and whether insertion happened. On a fresh
    /// insert the membership bit is set and `h`'s snapshot is refreshed, so
    /// `h` stays valid while every other copy of it becomes stale. If the
    /// entity already held a `C`, the existing value is returned untouched
    /// with `false` and nothing is invalidated.
    ///
    /// # Errors
    ///
    /// Handle validation errors, per the fixed order.
    fn add_component<C>(
        &mut self,
        h: &mut EntityHandle,
        value: C,
    ) -> Result<(&mut C, bool), EcsError>
    where
        Self: CompSlot<C>,
    {
        let mask = self.validate(h)?;
        let bit = <Self as CompSlot<C>>::BIT;
        if mask.contains(bit) {
            let existing = <Self as CompSlot<C>>::holder_mut(self)
                .get_mut(h.id)
                .expect("membership bit set but holder entry missing");
            return Ok((existing, false));
        }
        let refreshed = mask.with(bit);
        self.registry_mut().set_mask(h.id, refreshed);
        h.snapshot = refreshed;
        let (slot, _) = <Self as CompSlot<C>>::holder_mut(self).insert(h.id, value);
        Ok((slot, true))
    }

    /// Detach the entity's `C`, if any. Returns whether anything was removed.
    ///
    /// On removal the membership bit is cleared and `h`'s snapshot is
    /// refreshed; other copies of the handle become stale.
    fn remove_component<C>(&mut self, h: &mut EntityHandle) -> Result<bool, EcsError>
    where
        Self: CompSlot<C>,
    {
        let mask = self.validate(h)?;
        let bit = <Self as CompSlot<C>>::BIT;
        if !mask.contains(bit) {
            return Ok(false);
        }
        <Self as CompSlot<C>>::holder_mut(self).erase(h.id);
        let refreshed = mask.without(bit);
        self.registry_mut().set_mask(h.id, refreshed);
        h.snapshot = refreshed;
        Ok(true)
    }

    /// The entity's `C`.
    ///
    /// The reference stays valid until the next call on this manager that
    /// could mutate the entity.
    ///
    /// # Errors
    ///
    /// Handle validation errors, or [`EcsError::InvalidComponent`] if the
    /// entity does not hold a `C`.
    fn get_component<C>(&self, h: &EntityHandle) -> Result<&C, EcsError>
    where
        Self: CompSlot<C>,
    {
        let mask = self.validate(h)?;
        if !mask.contains(<Self as CompSlot<C>>::BIT) {
            return Err(EcsError::InvalidComponent {
                id: h.id,
                component: type_name::<C>(),
            });
        }
        Ok(<Self as CompSlot<C>>::holder(self)
            .get(h.id)
            .expect("membership bit set but holder entry missing"))
    }

    /// Mutable access to the entity's `C`.
    ///
    /// # Errors
    ///
    /// Same as [`get_component`](Self::get_component).
    fn get_component_mut<C>(&mut self, h: &EntityHandle) -> Result<&mut C, EcsError>
    where
        Self: CompSlot<C>,
    {
        let mask = self.validate(h)?;
        if !mask.contains(<Self as CompSlot<C>>::BIT) {
            return Err(EcsError::InvalidComponent {
                id: h.id,
                component: type_name::<C>(),
            });
        }
        Ok(<Self as CompSlot<C>>::holder_mut(self)
            .get_mut(h.id)
            .expect("membership bit set but holder entry missing"))
    }

    // -- tags ---------------------------------------------------------------

    /// Whether the entity carries tag `T`.
    fn has_tag<T>(&self, h: &EntityHandle) -> Result<bool, EcsError>
    where
        Self: TagSlot<T>,
    {
        let mask = self.validate(h)?;
        Ok(mask.contains(<Self as TagSlot<T>>::BIT))
    }

    /// Set or clear tag `T` on the entity. Returns the prior value.
    ///
    /// If the bit actually changed, `h`'s snapshot is refreshed and other
    /// copies become stale; a no-op toggle invalidates nothing.
    fn set_tag<T>(&mut self, h: &mut EntityHandle, value: bool) -> Result<bool, EcsError>
    where
        Self: TagSlot<T>,
    {
        let mask = self.validate(h)?;
        let bit = <Self as TagSlot<T>>::BIT;
        let prior = mask.contains(bit);
        if prior != value {
            let refreshed = if value {
                mask.with(bit)
            } else {
                mask.without(bit)
            };
            self.registry_mut().set_mask(h.id, refreshed);
            h.snapshot = refreshed;
        }
        Ok(prior)
    }

    // -- validation ---------------------------------------------------------

    /// Check `h` against this manager and return the entity's current mask.
    ///
    /// Checks run in a fixed order and the first failure is reported:
    /// `Uninitialized`, `ForeignManager`, `NotFound` (which also covers a
    /// handle that performed the destroy itself), then `Stale`.
    fn validate(&self, h: &EntityHandle) -> Result<Mask, EcsError> {
        let token = h.manager.ok_or(EcsError::Uninitialized)?;
        if token != self.token() {
            return Err(EcsError::ForeignManager { id: h.id });
        }
        if h.deleted {
            return Err(EcsError::NotFound { id: h.id });
        }
        let mask = self
            .registry()
            .mask(h.id)
            .ok_or(EcsError::NotFound { id: h.id })?;
        if mask != h.snapshot {
            return Err(EcsError::Stale { id: h.id });
        }
        Ok(mask)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityStatus;
    use crate::EcsError;

    struct Hp(u32);
    struct Poisoned;

    crate::entity_manager! {
        struct SmallWorld {
            components: [Hp],
            tags: [Poisoned],
        }
    }

    #[test]
    fn tokens_are_unique() {
        let a = ManagerToken::next();
        let b = ManagerToken::next();
        assert_ne!(a, b);
    }

    #[test]
    fn validation_checks_run_in_order() {
        let mut home = SmallWorld::new();
        let away = SmallWorld::new();

        // Uninitialized beats everything else.
        let blank = EntityHandle::default();
        assert_eq!(home.validate(&blank), Err(EcsError::Uninitialized));

        // A foreign handle is reported as foreign even after its entity
        // goes stale or dies in its own manager.
        let mut e = home.create();
        let stale_copy = e;
        home.add_component(&mut e, Hp(1)).unwrap();
        assert_eq!(
            away.validate(&stale_copy),
            Err(EcsError::ForeignManager { id: e.id() })
        );

        // At home, the same copy is stale, not missing.
        assert_eq!(
            home.validate(&stale_copy),
            Err(EcsError::Stale { id: e.id() })
        );

        // After destroy, NotFound wins over Stale.
        let old_copy = e;
        home.destroy(&mut e).unwrap();
        assert_eq!(
            home.validate(&old_copy),
            Err(EcsError::NotFound { id: old_copy.id() })
        );
        // The acting handle reports the same error kind.
        assert_eq!(home.validate(&e), Err(EcsError::NotFound { id: e.id() }));
        assert_eq!(e.status(&home), EntityStatus::Deleted);
    }

    #[test]
    fn destroy_purges_component_storage() {
        let mut em = SmallWorld::new();
        let mut a = em.create();
        let mut b = em.create();
        em.add_component(&mut a, Hp(1)).unwrap();
        em.add_component(&mut b, Hp(2)).unwrap();
        em.set_tag::<Poisoned>(&mut a, true).unwrap();

        em.destroy(&mut a).unwrap();
        let holder = <SmallWorld as CompSlot<Hp>>::holder(&em);
        assert_eq!(holder.len(), 1);
        assert!(holder.contains(b.id()));
        assert_eq!(em.entity_count(), 1);
    }

    #[test]
    fn remove_component_reports_absence() {
        let mut em = SmallWorld::new();
        let mut e = em.create();
        assert!(!em.remove_component::<Hp>(&mut e).unwrap());
        em.add_component(&mut e, Hp(3)).unwrap();
        assert_eq!(em.get_component::<Hp>(&e).unwrap().0, 3);
        assert!(em.remove_component::<Hp>(&mut e).unwrap());
        assert!(!em.remove_component::<Hp>(&mut e).unwrap());
    }
}
