//! Compile-time declaration of manager types.
//!
//! The component and tag lists of a manager are closed at compile time:
//! [`entity_manager!`](crate::entity_manager) takes both lists and generates
//! a concrete manager type with one [`ComponentHolder`] per component, a
//! bit index for every declared type, and the routing impls the generic
//! operations dispatch through. There is no runtime type registry and no
//! `TypeId` lookup on any operation path.
//!
//! List well-formedness is enforced by the generated impls themselves:
//!
//! - declaring a type twice in one list, or in both lists, produces
//!   conflicting implementations of the registration guard trait — one
//!   terse compile error per violation;
//! - using a type that is in neither list fails the
//!   [`CompSlot`](crate::manager::CompSlot) /
//!   [`TagSlot`](crate::manager::TagSlot) bound with a "not a registered
//!   component/tag" diagnostic;
//! - more than 64 combined components and tags fails a const assertion.
//!
//! [`ComponentHolder`]: crate::holder::ComponentHolder

/// Declare an entity-manager type with closed component and tag lists.
///
/// ```
/// use entityplus::prelude::*;
///
/// struct Position { x: f32, y: f32 }
/// struct Velocity { dx: f32, dy: f32 }
/// struct Frozen; // tags are unit structs
///
/// entityplus::entity_manager! {
///     struct GameManager {
///         components: [Position, Velocity],
///         tags: [Frozen],
///     }
/// }
///
/// let mut em = GameManager::new();
/// let mut player = em.create();
/// em.add_component(&mut player, Position { x: 0.0, y: 0.0 }).unwrap();
/// em.set_tag::<Frozen>(&mut player, true).unwrap();
///
/// let frozen = em.get_entities::<(Position,), (Frozen,)>();
/// assert_eq!(frozen.len(), 1);
/// ```
///
/// The generated type owns an [`EntityRegistry`](crate::registry::EntityRegistry)
/// and one [`ComponentHolder`](crate::holder::ComponentHolder) per declared
/// component, and implements [`Manager`](crate::manager::Manager) plus the
/// per-type routing traits. Component bits are assigned in declaration
/// order starting at zero; tag bits follow after the last component bit.
#[macro_export]
macro_rules! entity_manager {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            components: [$($comp:ty),* $(,)?],
            tags: [$($tag:ty),* $(,)?] $(,)?
        }
    ) => {
        $(#[$attr])*
        $vis struct $name {
            token: $crate::manager::ManagerToken,
            registry: $crate::registry::EntityRegistry,
            holders: $crate::entity_manager!(@holders $($comp),*),
        }

        impl $name {
            /// Create an empty manager.
            $vis fn new() -> Self {
                Self {
                    token: $crate::manager::ManagerToken::next(),
                    registry: $crate::registry::EntityRegistry::new(),
                    holders: ::core::default::Default::default(),
                }
            }
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::manager::Manager for $name {
            const COMPONENT_COUNT: u32 = $crate::entity_manager!(@count $($comp),*);
            const TAG_COUNT: u32 = $crate::entity_manager!(@count $($tag),*);

            #[inline]
            fn token(&self) -> $crate::manager::ManagerToken {
                self.token
            }

            #[inline]
            fn registry(&self) -> &$crate::registry::EntityRegistry {
                &self.registry
            }

            #[inline]
            fn registry_mut(&mut self) -> &mut $crate::registry::EntityRegistry {
                &mut self.registry
            }

            #[allow(unused_variables)]
            fn drop_components(
                &mut self,
                id: $crate::entity::EntityId,
                mask: $crate::entity::Mask,
            ) {
                $(
                    if mask.contains(<Self as $crate::manager::CompSlot<$comp>>::BIT) {
                        <Self as $crate::manager::CompSlot<$comp>>::holder_mut(self).erase(id);
                    }
                )*
            }
        }

        const _: () = assert!(
            <$name as $crate::manager::Manager>::COMPONENT_COUNT
                + <$name as $crate::manager::Manager>::TAG_COUNT
                <= $crate::entity::Mask::BITS,
            "a manager supports at most 64 components and tags combined"
        );

        $crate::entity_manager!(@comp_slots $name ; ; $($comp,)*);
        $crate::entity_manager!(@tag_slots $name ; ; $($tag,)*);
    };

    // -- internal: nested holder storage ------------------------------------

    (@holders) => { () };
    (@holders $head:ty $(, $rest:ty)*) => {
        ($crate::holder::ComponentHolder<$head>, $crate::entity_manager!(@holders $($rest),*))
    };

    // -- internal: list length as a const expression ------------------------

    (@count) => { 0u32 };
    (@count $head:ty $(, $rest:ty)*) => {
        1u32 + $crate::entity_manager!(@count $($rest),*)
    };

    // -- internal: field path of the holder after `seen` predecessors -------

    (@field $e:expr ;) => { $e.0 };
    (@field $e:expr ; $head:ty $(, $rest:ty)*) => {
        $crate::entity_manager!(@field $e.1 ; $($rest),*)
    };

    // -- internal: one CompSlot impl per component, bit = position ----------

    (@comp_slots $name:ident ; $($seen:ty,)* ;) => {};
    (@comp_slots $name:ident ; $($seen:ty,)* ; $head:ty, $($rest:ty,)*) => {
        impl $crate::manager::Slot<$head> for $name {}

        impl $crate::manager::CompSlot<$head> for $name {
            const BIT: u32 = $crate::entity_manager!(@count $($seen),*);

            #[inline]
            fn holder(&self) -> &$crate::holder::ComponentHolder<$head> {
                & $crate::entity_manager!(@field self.holders ; $($seen),*)
            }

            #[inline]
            fn holder_mut(&mut self) -> &mut $crate::holder::ComponentHolder<$head> {
                &mut $crate::entity_manager!(@field self.holders ; $($seen),*)
            }
        }

        $crate::entity_manager!(@comp_slots $name ; $($seen,)* $head, ; $($rest,)*);
    };

    // -- internal: one TagSlot impl per tag, bit = components + position ----

    (@tag_slots $name:ident ; $($seen:ty,)* ;) => {};
    (@tag_slots $name:ident ; $($seen:ty,)* ; $head:ty, $($rest:ty,)*) => {
        impl $crate::manager::Slot<$head> for $name {}

        impl $crate::manager::TagSlot<$head> for $name {
            const BIT: u32 = <$name as $crate::manager::Manager>::COMPONENT_COUNT
                + $crate::entity_manager!(@count $($seen),*);
        }

        $crate::entity_manager!(@tag_slots $name ; $($seen,)* $head, ; $($rest,)*);
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
