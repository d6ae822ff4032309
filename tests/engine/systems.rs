//! Integration tests for systems and the scheduler
//!
//! Tests hook order, run arguments, and mutation during iteration.

use std::cell::Cell;
use std::rc::Rc;

use kiln_engine::{Scheduler, System};
use kiln_foundation::{EntityId, Result, Value};
use kiln_storage::{Visit, World};

fn coord(value: Option<&Value>, field: &str) -> i64 {
    value.and_then(|v| v.field(field)).and_then(Value::as_int).unwrap_or(0)
}

/// Adds velocity to position, field by field.
fn step(visit: &mut Visit<'_>) {
    let (vx, vy) = (coord(visit.value(1), "x"), coord(visit.value(1), "y"));
    if let Some(position) = visit.value_mut(0) {
        let (x, y) = (coord(Some(&*position), "x"), coord(Some(&*position), "y"));
        position.set_field("x", x + vx);
        position.set_field("y", y + vy);
    }
}

fn position(world: &World, entity: EntityId) -> (i64, i64) {
    let value = world.value(entity, "position");
    (coord(value, "x"), coord(value, "y"))
}

fn moving_pair(world: &mut World) -> (EntityId, EntityId) {
    let a = world.create();
    let b = world.create();
    let _ = world.create();
    world.update(a, "position", Value::map([("x", 1), ("y", 1)])).unwrap();
    world.update(a, "velocity", Value::map([("x", 1), ("y", 0)])).unwrap();
    world.update(b, "position", Value::map([("x", 30), ("y", 40)])).unwrap();
    world.update(b, "velocity", Value::map([("x", -1), ("y", 2)])).unwrap();
    (a, b)
}

// =============================================================================
// Iteration
// =============================================================================

/// Checks that every hook sees the frame arguments.
struct Movement {
    checked: Rc<Cell<u32>>,
}

impl System<(f64, f64)> for Movement {
    fn pre(&mut self, _: &mut World, (dt, total): &(f64, f64)) -> Result<()> {
        assert!(*dt > 0.0 && *total > 0.0);
        self.checked.set(self.checked.get() + 1);
        Ok(())
    }

    fn every(&mut self, visit: &mut Visit<'_>, (dt, total): &(f64, f64)) -> Result<()> {
        assert!(*dt > 0.0 && *total > 0.0);
        let entity = visit.entity();
        assert!(visit.world().has(entity, &["position", "velocity"]));
        step(visit);
        Ok(())
    }

    fn post(&mut self, _: &mut World, (dt, total): &(f64, f64)) -> Result<()> {
        assert!(*dt > 0.0 && *total > 0.0);
        self.checked.set(self.checked.get() + 1);
        Ok(())
    }
}

#[test]
fn system_iteration() {
    let checked = Rc::new(Cell::new(0));
    let mut scheduler = Scheduler::new();
    scheduler
        .add(&["position", "velocity"], Movement { checked: checked.clone() })
        .unwrap();

    let mut world = World::new();
    let (a, b) = moving_pair(&mut world);
    scheduler.initialize(&mut world).unwrap();
    assert_eq!(position(&world, a), (1, 1));
    assert_eq!(position(&world, b), (30, 40));

    let dt = 0.1667;
    scheduler.run(&mut world, &(dt, dt)).unwrap();
    assert_eq!(position(&world, a), (2, 1));
    assert_eq!(position(&world, b), (29, 42));

    scheduler.run(&mut world, &(dt, dt * 2.0)).unwrap();
    assert_eq!(position(&world, a), (3, 1));
    assert_eq!(position(&world, b), (28, 44));
    assert_eq!(checked.get(), 4);
}

// =============================================================================
// Mutation During Iteration
// =============================================================================

/// On its first visit, strips the three bystanders of their match.
struct Disruptor {
    bystanders: [EntityId; 3],
    visits: u32,
}

impl System for Disruptor {
    fn every(&mut self, visit: &mut Visit<'_>, (): &()) -> Result<()> {
        self.visits += 1;
        let [first, second, third] = self.bystanders;
        if self.visits == 1 {
            let world = visit.world();
            world.remove_all(second)?;
            world.remove(third, "position")?;
            world.remove(first, "velocity")?;
            return Ok(());
        }

        assert!(!self.bystanders.contains(&visit.entity()));
        assert!(visit.value(0).is_some() && visit.value(1).is_some());
        step(visit);
        Ok(())
    }
}

#[test]
fn system_edge_cases() {
    fn spawn(world: &mut World) -> EntityId {
        let e = world.create();
        world.set(e, "position", Value::empty_map()).unwrap();
        world.set(e, "velocity", Value::empty_map()).unwrap();
        e
    }

    let mut world = World::new();

    let first = spawn(&mut world);
    let mut third = first;
    for i in 0..100 {
        let e = spawn(&mut world);
        if i == 80 {
            third = e;
        }
    }
    let second = spawn(&mut world);

    let mut scheduler = Scheduler::new();
    scheduler
        .add(
            &["position", "velocity"],
            Disruptor {
                bystanders: [first, second, third],
                visits: 0,
            },
        )
        .unwrap();

    let (a, b) = moving_pair(&mut world);
    scheduler.initialize(&mut world).unwrap();
    scheduler.run(&mut world, &()).unwrap();
    assert_eq!(position(&world, a), (2, 1));
    assert_eq!(position(&world, b), (29, 42));

    scheduler.run(&mut world, &()).unwrap();
    assert_eq!(position(&world, a), (3, 1));
    assert_eq!(position(&world, b), (28, 44));
}

#[test]
fn system_over_every_entity() {
    struct CountAll(Rc<Cell<u32>>);

    impl System for CountAll {
        fn every(&mut self, _: &mut Visit<'_>, (): &()) -> Result<()> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    let mut world = World::new();
    for _ in 0..3 {
        let e = world.create();
        world.set(e, "position", Value::Int(1)).unwrap();
    }

    let count = Rc::new(Cell::new(0));
    let mut scheduler = Scheduler::new();
    scheduler.add(&[], CountAll(count.clone())).unwrap();
    scheduler.run(&mut world, &()).unwrap();
    assert_eq!(count.get(), 3);
}
