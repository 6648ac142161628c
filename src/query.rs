//! Compositional queries over entities.
//!
//! A query names a set of component types and a set of tag types as two
//! tuple type parameters. The required bits of both sets are OR-ed into one
//! mask, and each candidate entity is admitted by a single AND-and-compare
//! against its membership mask. Candidates come from the *smallest
//! substrate*: among the requested components, the holder with the fewest
//! entries; when no components are requested, the registry itself. Either
//! way candidates arrive in increasing id order, so iteration is
//! deterministic and visits each matching entity exactly once.
//!
//! ## Soundness
//!
//! [`Queries::for_each`] and [`Queries::for_each_until`] hand the callback
//! one `&mut` reference per requested component. Both methods take
//! `&mut self`, so the manager is exclusively borrowed for the whole
//! iteration — the callback cannot call back into the manager at all, which
//! is what makes the raw-pointer fetch below sound. The fetched references
//! must also point at pairwise-distinct holders, so a component set naming
//! the same type twice is rejected before anything is fetched.

use crate::entity::{EntityHandle, EntityId, Mask};
use crate::manager::{CompSlot, Manager, TagSlot};

// ---------------------------------------------------------------------------
// IterControl
// ---------------------------------------------------------------------------

/// Loop control handed to [`Queries::for_each_until`] callbacks.
///
/// Setting `breakout` aborts the iteration after the current call. Every
/// invocation of `for_each_until` starts with a fresh control.
#[derive(Debug, Default, Clone)]
pub struct IterControl {
    /// Set to `true` to stop iterating after the current entity.
    pub breakout: bool,
}

// ---------------------------------------------------------------------------
// ComponentSet -- a tuple of component types to filter on and fetch
// ---------------------------------------------------------------------------

/// A tuple of component types used as a query's component filter.
///
/// Implemented for tuples `()` through `(C0, C1, C2, C3)` of types declared
/// in the manager's component list. Besides contributing its bits to the
/// required mask, a component set selects the iteration substrate and
/// produces the `&mut` references handed to callbacks.
pub trait ComponentSet<M: Manager> {
    /// Number of types in the set.
    const LEN: usize;

    /// The OR of every member's membership bit.
    const MASK: Mask;

    /// The flat tuple of `&mut` component references for one entity.
    type Refs<'a>
    where
        M: 'a;

    /// Ids of the smallest member holder, in increasing order.
    ///
    /// `None` when the set is empty — the caller then iterates the registry.
    fn substrate_ids(manager: &M) -> Option<Vec<EntityId>>;

    /// Fetch one reference per member for `id`.
    ///
    /// # Safety
    ///
    /// `manager` must come from a live `&mut M` that the caller keeps
    /// exclusively borrowed while the returned references are alive, the
    /// member types must be pairwise distinct, and `id` must hold every
    /// member component.
    unsafe fn fetch<'a>(manager: *mut M, id: EntityId) -> Self::Refs<'a>
    where
        M: 'a;
}

impl<M: Manager> ComponentSet<M> for () {
    const LEN: usize = 0;
    const MASK: Mask = Mask::EMPTY;
    type Refs<'a> = () where M: 'a;

    fn substrate_ids(_manager: &M) -> Option<Vec<EntityId>> {
        None
    }

    unsafe fn fetch<'a>(_manager: *mut M, _id: EntityId) -> Self::Refs<'a> where M: 'a {}
}

impl<M, C0> ComponentSet<M> for (C0,)
where
    M: CompSlot<C0>,
    C0: 'static,
{
    const LEN: usize = 1;
    const MASK: Mask = Mask::single(<M as CompSlot<C0>>::BIT);
    type Refs<'a> = (&'a mut C0,) where M: 'a;

    fn substrate_ids(manager: &M) -> Option<Vec<EntityId>> {
        Some(<M as CompSlot<C0>>::holder(manager).ids().collect())
    }

    unsafe fn fetch<'a>(manager: *mut M, id: EntityId) -> Self::Refs<'a>
    where
        M: 'a,
    {
        (<M as CompSlot<C0>>::holder_mut(&mut *manager)
            .get_mut(id)
            .unwrap(),)
    }
}

impl<M, C0, C1> ComponentSet<M> for (C0, C1)
where
    M: CompSlot<C0> + CompSlot<C1>,
    C0: 'static,
    C1: 'static,
{
    const LEN: usize = 2;
    const MASK: Mask = Mask::single(<M as CompSlot<C0>>::BIT)
        .union(Mask::single(<M as CompSlot<C1>>::BIT));
    type Refs<'a> = (&'a mut C0, &'a mut C1) where M: 'a;

    fn substrate_ids(manager: &M) -> Option<Vec<EntityId>> {
        let lens = [
            <M as CompSlot<C0>>::holder(manager).len(),
            <M as CompSlot<C1>>::holder(manager).len(),
        ];
        Some(match smallest_of(&lens) {
            0 => <M as CompSlot<C0>>::holder(manager).ids().collect(),
            _ => <M as CompSlot<C1>>::holder(manager).ids().collect(),
        })
    }

    unsafe fn fetch<'a>(manager: *mut M, id: EntityId) -> Self::Refs<'a>
    where
        M: 'a,
    {
        (
            <M as CompSlot<C0>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
            <M as CompSlot<C1>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
        )
    }
}

impl<M, C0, C1, C2> ComponentSet<M> for (C0, C1, C2)
where
    M: CompSlot<C0> + CompSlot<C1> + CompSlot<C2>,
    C0: 'static,
    C1: 'static,
    C2: 'static,
{
    const LEN: usize = 3;
    const MASK: Mask = Mask::single(<M as CompSlot<C0>>::BIT)
        .union(Mask::single(<M as CompSlot<C1>>::BIT))
        .union(Mask::single(<M as CompSlot<C2>>::BIT));
    type Refs<'a> = (&'a mut C0, &'a mut C1, &'a mut C2) where M: 'a;

    fn substrate_ids(manager: &M) -> Option<Vec<EntityId>> {
        let lens = [
            <M as CompSlot<C0>>::holder(manager).len(),
            <M as CompSlot<C1>>::holder(manager).len(),
            <M as CompSlot<C2>>::holder(manager).len(),
        ];
        Some(match smallest_of(&lens) {
            0 => <M as CompSlot<C0>>::holder(manager).ids().collect(),
            1 => <M as CompSlot<C1>>::holder(manager).ids().collect(),
            _ => <M as CompSlot<C2>>::holder(manager).ids().collect(),
        })
    }

    unsafe fn fetch<'a>(manager: *mut M, id: EntityId) -> Self::Refs<'a>
    where
        M: 'a,
    {
        (
            <M as CompSlot<C0>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
            <M as CompSlot<C1>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
            <M as CompSlot<C2>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
        )
    }
}

impl<M, C0, C1, C2, C3> ComponentSet<M> for (C0, C1, C2, C3)
where
    M: CompSlot<C0> + CompSlot<C1> + CompSlot<C2> + CompSlot<C3>,
    C0: 'static,
    C1: 'static,
    C2: 'static,
    C3: 'static,
{
    const LEN: usize = 4;
    const MASK: Mask = Mask::single(<M as CompSlot<C0>>::BIT)
        .union(Mask::single(<M as CompSlot<C1>>::BIT))
        .union(Mask::single(<M as CompSlot<C2>>::BIT))
        .union(Mask::single(<M as CompSlot<C3>>::BIT));
    type Refs<'a> = (&'a mut C0, &'a mut C1, &'a mut C2, &'a mut C3) where M: 'a;

    fn substrate_ids(manager: &M) -> Option<Vec<EntityId>> {
        let lens = [
            <M as CompSlot<C0>>::holder(manager).len(),
            <M as CompSlot<C1>>::holder(manager).len(),
            <M as CompSlot<C2>>::holder(manager).len(),
            <M as CompSlot<C3>>::holder(manager).len(),
        ];
        Some(match smallest_of(&lens) {
            0 => <M as CompSlot<C0>>::holder(manager).ids().collect(),
            1 => <M as CompSlot<C1>>::holder(manager).ids().collect(),
            2 => <M as CompSlot<C2>>::holder(manager).ids().collect(),
            _ => <M as CompSlot<C3>>::holder(manager).ids().collect(),
        })
    }

    unsafe fn fetch<'a>(manager: *mut M, id: EntityId) -> Self::Refs<'a>
    where
        M: 'a,
    {
        (
            <M as CompSlot<C0>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
            <M as CompSlot<C1>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
            <M as CompSlot<C2>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
            <M as CompSlot<C3>>::holder_mut(&mut *manager)
                .get_mut(id)
                .unwrap(),
        )
    }
}

/// Index of the smallest length in `lens`.
fn smallest_of(lens: &[usize]) -> usize {
    let mut smallest = 0;
    for i in 1..lens.len() {
        if lens[i] < lens[smallest] {
            smallest = i;
        }
    }
    smallest
}

// ---------------------------------------------------------------------------
// TagSet -- a tuple of tag types to filter on
// ---------------------------------------------------------------------------

/// A tuple of tag types used as a query's tag filter.
///
/// Tags contribute their bits to the required mask and nothing else — they
/// never appear among the callback arguments.
pub trait TagSet<M: Manager> {
    /// The OR of every member's membership bit.
    const MASK: Mask;
}

impl<M: Manager> TagSet<M> for () {
    const MASK: Mask = Mask::EMPTY;
}

impl<M, T0> TagSet<M> for (T0,)
where
    M: TagSlot<T0>,
{
    const MASK: Mask = Mask::single(<M as TagSlot<T0>>::BIT);
}

impl<M, T0, T1> TagSet<M> for (T0, T1)
where
    M: TagSlot<T0> + TagSlot<T1>,
{
    const MASK: Mask =
        Mask::single(<M as TagSlot<T0>>::BIT).union(Mask::single(<M as TagSlot<T1>>::BIT));
}

impl<M, T0, T1, T2> TagSet<M> for (T0, T1, T2)
where
    M: TagSlot<T0> + TagSlot<T1> + TagSlot<T2>,
{
    const MASK: Mask = Mask::single(<M as TagSlot<T0>>::BIT)
        .union(Mask::single(<M as TagSlot<T1>>::BIT))
        .union(Mask::single(<M as TagSlot<T2>>::BIT));
}

impl<M, T0, T1, T2, T3> TagSet<M> for (T0, T1, T2, T3)
where
    M: TagSlot<T0> + TagSlot<T1> + TagSlot<T2> + TagSlot<T3>,
{
    const MASK: Mask = Mask::single(<M as TagSlot<T0>>::BIT)
        .union(Mask::single(<M as TagSlot<T1>>::BIT))
        .union(Mask::single(<M as TagSlot<T2>>::BIT))
        .union(Mask::single(<M as TagSlot<T3>>::BIT));
}

// ---------------------------------------------------------------------------
// Queries -- query methods on every manager
// ---------------------------------------------------------------------------

/// Query operations, available on every declared manager.
pub trait Queries: Manager {
    /// Collect handles to every live entity whose membership mask is a
    /// superset of the requested components `CS` and tags `TS`.
    ///
    /// Handles come back in increasing id order and carry fresh snapshots.
    /// `get_entities::<(), ()>()` enumerates every live entity.
    fn get_entities<CS, TS>(&self) -> Vec<EntityHandle>
    where
        CS: ComponentSet<Self>,
        TS: TagSet<Self>,
    {
        let required = CS::MASK.union(TS::MASK);
        let mut found = Vec::new();
        match CS::substrate_ids(self) {
            Some(ids) => {
                for id in ids {
                    if let Some(mask) = self.registry().mask(id) {
                        if mask.contains_all(required) {
                            found.push(EntityHandle::live(self.token(), id, mask));
                        }
                    }
                }
            }
            None => {
                for record in self.registry().iter() {
                    if record.mask.contains_all(required) {
                        found.push(EntityHandle::live(self.token(), record.id, record.mask));
                    }
                }
            }
        }
        found
    }

    /// Handles to every live entity, in increasing id order.
    fn entities(&self) -> Vec<EntityHandle> {
        self.get_entities::<(), ()>()
    }

    /// Invoke `callback` for every matching entity, in increasing id order.
    ///
    /// The callback receives a fresh handle and one `&mut` reference per
    /// component in `CS`; tags in `TS` filter but contribute no argument.
    ///
    /// # Panics
    ///
    /// Panics if `CS` names the same component type more than once (the
    /// fetched references would alias).
    fn for_each<CS, TS, F>(&mut self, mut callback: F)
    where
        CS: ComponentSet<Self>,
        TS: TagSet<Self>,
        F: for<'a> FnMut(EntityHandle, CS::Refs<'a>),
    {
        assert!(
            CS::MASK.count() as usize == CS::LEN,
            "query component set names the same component type more than once"
        );
        let required = CS::MASK.union(TS::MASK);
        let ids: Vec<EntityId> = match CS::substrate_ids(self) {
            Some(ids) => ids,
            None => self.registry().ids().collect(),
        };
        let token = self.token();
        let manager: *mut Self = self;
        for id in ids {
            let Some(mask) = self.registry().mask(id) else {
                continue;
            };
            if !mask.contains_all(required) {
                continue;
            }
            let handle = EntityHandle::live(token, id, mask);
            // Safety: `manager` derives from the `&mut self` this method
            // holds for its whole duration, the assert above rules out
            // aliasing fetches, and the mask test guarantees every member
            // component is present.
            let refs = unsafe { CS::fetch(manager, id) };
            callback(handle, refs);
        }
    }

    /// Like [`for_each`](Self::for_each), but the callback also receives an
    /// [`IterControl`] whose `breakout` flag aborts the iteration after the
    /// current call. The control starts fresh on every invocation.
    ///
    /// # Panics
    ///
    /// Panics if `CS` names the same component type more than once.
    fn for_each_until<CS, TS, F>(&mut self, mut callback: F)
    where
        CS: ComponentSet<Self>,
        TS: TagSet<Self>,
        F: for<'a> FnMut(EntityHandle, CS::Refs<'a>, &mut IterControl),
    {
        assert!(
            CS::MASK.count() as usize == CS::LEN,
            "query component set names the same component type more than once"
        );
        let required = CS::MASK.union(TS::MASK);
        let ids: Vec<EntityId> = match CS::substrate_ids(self) {
            Some(ids) => ids,
            None => self.registry().ids().collect(),
        };
        let token = self.token();
        let manager: *mut Self = self;
        let mut control = IterControl::default();
        for id in ids {
            let Some(mask) = self.registry().mask(id) else {
                continue;
            };
            if !mask.contains_all(required) {
                continue;
            }
            let handle = EntityHandle::live(token, id, mask);
            // Safety: as in `for_each`.
            let refs = unsafe { CS::fetch(manager, id) };
            callback(handle, refs, &mut control);
            if control.breakout {
                break;
            }
        }
    }
}

impl<M: Manager> Queries for M {}
