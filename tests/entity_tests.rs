//! End-to-end scenarios for entity lifecycle, components, tags, staleness,
//! and queries.

use entityplus::prelude::*;

#[derive(Debug, PartialEq)]
struct A {
    x: i32,
}

#[derive(Debug, PartialEq)]
struct B {
    name: String,
}

#[allow(dead_code)]
struct C {
    a: i32,
    b: i32,
}

impl C {
    fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    fn get(&self) -> i32 {
        self.b
    }
}

struct TA;
struct TB;
struct TC;

entityplus::entity_manager! {
    struct DefaultManager {
        components: [A, B, C],
        tags: [TA, TB, TC],
    }
}

entityplus::entity_manager! {
    struct CompManager {
        components: [A, B, C],
        tags: [],
    }
}

entityplus::entity_manager! {
    struct TagManager {
        components: [],
        tags: [TA, TB, TC],
    }
}

#[test]
fn entity_lifecycle() {
    let mut em = DefaultManager::new();
    let ent = EntityHandle::default();
    assert_eq!(ent.status(&em), EntityStatus::Uninitialized);
    assert_eq!(em.entities().len(), 0);
    em.for_each::<(), (), _>(|_, ()| unreachable!("no entities to visit"));

    let mut ent = em.create();
    assert_eq!(ent.status(&em), EntityStatus::Ok);
    assert_eq!(em.entities().len(), 1);

    let mut count = 0;
    em.for_each::<(), (), _>(|_, ()| count += 1);
    assert_eq!(count, 1);

    em.destroy(&mut ent).unwrap();
    assert_eq!(ent.status(&em), EntityStatus::Deleted);
    assert_eq!(em.entities().len(), 0);

    let mut em2 = DefaultManager::new();
    let mut foreign = em2.create();
    assert_eq!(
        em.destroy(&mut foreign),
        Err(EcsError::ForeignManager { id: foreign.id() })
    );
}

#[test]
fn components() {
    let mut em = CompManager::new();
    assert_eq!(em.get_entities::<(A,), ()>().len(), 0);
    assert_eq!(em.get_entities::<(A, B), ()>().len(), 0);
    em.for_each::<(A,), (), _>(|_, _| unreachable!("no entities to visit"));
    em.for_each::<(A, B), (), _>(|_, _| unreachable!("no entities to visit"));

    let mut ent = em.create();
    assert!(!em.has_component::<A>(&ent).unwrap());
    assert!(!em.has_component::<B>(&ent).unwrap());
    assert!(!em.has_component::<C>(&ent).unwrap());

    assert!(matches!(
        em.get_component::<A>(&ent),
        Err(EcsError::InvalidComponent { .. })
    ));
    assert!(matches!(
        em.get_component::<B>(&ent),
        Err(EcsError::InvalidComponent { .. })
    ));
    assert!(matches!(
        em.get_component::<C>(&ent),
        Err(EcsError::InvalidComponent { .. })
    ));

    let (added, inserted) = em.add_component(&mut ent, A { x: 3 }).unwrap();
    assert!(inserted);
    assert_eq!(added.x, 3);
    // A second add declines and hands back the original value.
    let (added, inserted) = em.add_component(&mut ent, A { x: 5 }).unwrap();
    assert!(!inserted);
    assert_eq!(added.x, 3);
    assert!(em.has_component::<A>(&ent).unwrap());
    assert!(!em.has_component::<B>(&ent).unwrap());
    assert!(!em.has_component::<C>(&ent).unwrap());

    em.add_component(
        &mut ent,
        B {
            name: "test".to_owned(),
        },
    )
    .unwrap();
    assert_eq!(em.get_component::<B>(&ent).unwrap().name, "test");

    assert_eq!(em.get_component::<A>(&ent).unwrap().x, 3);
    em.get_component_mut::<A>(&ent).unwrap().x = 5;
    assert_eq!(em.get_component::<A>(&ent).unwrap().x, 5);

    assert!(em.remove_component::<A>(&mut ent).unwrap());
    assert!(!em.has_component::<A>(&ent).unwrap());
    assert!(matches!(
        em.get_component::<A>(&ent),
        Err(EcsError::InvalidComponent { .. })
    ));
    assert!(!em.remove_component::<A>(&mut ent).unwrap());

    assert!(em.has_component::<B>(&ent).unwrap());
    assert!(!em.has_component::<C>(&ent).unwrap());
}

#[test]
fn tags() {
    let mut em = TagManager::new();
    let mut ent = em.create();

    assert!(!em.has_tag::<TA>(&ent).unwrap());
    assert!(!em.has_tag::<TB>(&ent).unwrap());
    assert!(!em.has_tag::<TC>(&ent).unwrap());

    assert!(!em.set_tag::<TA>(&mut ent, true).unwrap());
    assert!(em.set_tag::<TA>(&mut ent, true).unwrap());

    assert!(em.has_tag::<TA>(&ent).unwrap());
    assert!(!em.has_tag::<TB>(&ent).unwrap());
    assert!(!em.has_tag::<TC>(&ent).unwrap());

    let ent_copy = ent;
    assert!(em.has_tag::<TA>(&ent_copy).unwrap());
    assert!(!em.has_tag::<TB>(&ent_copy).unwrap());
    assert!(!em.has_tag::<TC>(&ent_copy).unwrap());

    assert!(em.set_tag::<TA>(&mut ent, false).unwrap());
    assert!(!em.has_tag::<TA>(&ent).unwrap());
}

#[test]
fn stale_entity() {
    let mut em = DefaultManager::new();

    let mut ent = em.create();
    assert_eq!(ent.status(&em), EntityStatus::Ok);

    let mut ent_copy = ent;
    em.add_component(&mut ent, A { x: 3 }).unwrap();
    assert_eq!(ent_copy.status(&em), EntityStatus::Stale);
    assert_eq!(
        em.get_component::<A>(&ent_copy),
        Err(EcsError::Stale { id: ent_copy.id() })
    );
    assert_eq!(
        em.set_tag::<TA>(&mut ent_copy, true),
        Err(EcsError::Stale { id: ent_copy.id() })
    );

    let mut ent_copy = ent;
    assert_eq!(ent_copy.status(&em), EntityStatus::Ok);
    em.set_tag::<TA>(&mut ent, true).unwrap();
    assert_eq!(ent_copy.status(&em), EntityStatus::Stale);
    assert_eq!(
        em.set_tag::<TA>(&mut ent_copy, true),
        Err(EcsError::Stale { id: ent_copy.id() })
    );
}

#[test]
fn get_entities_by_tag() {
    let mut em = TagManager::new();

    let mut ent1 = em.create();
    em.set_tag::<TA>(&mut ent1, true).unwrap();
    em.set_tag::<TB>(&mut ent1, true).unwrap();
    em.set_tag::<TC>(&mut ent1, true).unwrap();
    let mut ent2 = em.create();
    em.set_tag::<TA>(&mut ent2, true).unwrap();
    em.set_tag::<TB>(&mut ent2, true).unwrap();
    let mut ent3 = em.create();
    em.set_tag::<TB>(&mut ent3, true).unwrap();
    let mut ent4 = em.create();
    em.set_tag::<TC>(&mut ent4, true).unwrap();
    let ent5 = em.create();

    let all = em.entities();
    assert_eq!(all.len(), 5);
    for ent in [ent1, ent2, ent3, ent4, ent5] {
        assert!(all.contains(&ent));
    }

    let with_ta = em.get_entities::<(), (TA,)>();
    assert_eq!(with_ta.len(), 2);
    assert!(with_ta.contains(&ent1) && with_ta.contains(&ent2));

    let with_tb = em.get_entities::<(), (TB,)>();
    assert_eq!(with_tb.len(), 3);
    assert!(with_tb.contains(&ent1) && with_tb.contains(&ent2) && with_tb.contains(&ent3));

    let with_tc = em.get_entities::<(), (TC,)>();
    assert_eq!(with_tc.len(), 2);
    assert!(with_tc.contains(&ent1) && with_tc.contains(&ent4));
}

#[test]
fn for_each_entity() {
    let mut em = DefaultManager::new();

    let mut ent1 = em.create();
    em.add_component(&mut ent1, A { x: 4 }).unwrap();
    em.add_component(
        &mut ent1,
        B {
            name: "smith".to_owned(),
        },
    )
    .unwrap();
    em.add_component(&mut ent1, C::new(3, 5)).unwrap();

    let mut ent2 = em.create();
    em.add_component(&mut ent2, A { x: 2 }).unwrap();

    em.for_each::<(A, B, C), (), _>(|ent, (a, b, c)| {
        assert_eq!(ent, ent1);
        assert_eq!(a.x, 4);
        assert_eq!(b.name, "smith");
        assert_eq!(c.get(), 5);
        b.name = "john".to_owned();
    });
    // The callback mutated manager-owned storage, not a copy.
    assert_eq!(em.get_component::<B>(&ent1).unwrap().name, "john");

    let mut count = 0;
    let mut val = 0;
    em.for_each::<(A,), (), _>(|_, (a,)| {
        count += 1;
        val += a.x;
    });
    assert_eq!(count, 2);
    assert_eq!(val, 6);

    // Tag filter prunes entities that hold all components but lack the tag.
    em.for_each::<(A, B), (TA,), _>(|_, _| unreachable!("nothing carries TA"));
}

#[test]
fn for_each_with_control() {
    let mut em = DefaultManager::new();
    for _ in 0..3 {
        let mut ent = em.create();
        em.set_tag::<TA>(&mut ent, true).unwrap();
    }

    let mut count = 0;
    em.for_each_until::<(), (TA,), _>(|_, (), control| {
        count += 1;
        if count == 1 {
            control.breakout = true;
        }
    });
    assert_eq!(count, 1);

    count = 0;
    em.for_each::<(), (TA,), _>(|_, ()| count += 1);
    assert_eq!(count, 3);
}

#[test]
fn primitive_components_and_marker_tags() {
    struct Marker;

    entityplus::entity_manager! {
        struct SmallManager {
            components: [u32],
            tags: [Marker],
        }
    }

    let mut em = SmallManager::new();
    let mut ent = em.create();
    em.add_component(&mut ent, 7u32).unwrap();
    assert_eq!(*em.get_component::<u32>(&ent).unwrap(), 7);
    assert!(!em.set_tag::<Marker>(&mut ent, true).unwrap());
}
