//! The scheduler against a recording phase primitive.
//!
//! Verifies that the scheduler only talks to the primitive through the
//! `PhasePrimitive` surface and asks for exactly the phases it should.


use cadence_ecs::phase::{Anchor, Driver, PhaseId, PhasePrimitive};
use cadence_ecs::system::SystemKey;
use cadence_schedule::hooks::SystemEvent;
use cadence_schedule::pipe::Pipe;
use cadence_schedule::pipeline::Pipeline;
use cadence_schedule::scheduler::{Scheduler, SystemRef};
use test_utils::{EventLog, RecordingPrimitive};

fn tick() {}

#[test]
fn scenario_a_b_then_c_resolves_to_a_chain() {
    let driver = Driver::new("D");
    let c = Pipe::named("C");
    let mut pipeline = Pipeline::new().with("A").with("B");

    let mut scheduler = Scheduler::with_primitive(RecordingPrimitive::default());
    scheduler
        .with_pipeline(&mut pipeline, driver.clone())
        .unwrap()
        .with_pipe_after(&c, &pipeline)
        .unwrap();

    assert_eq!(
        scheduler.primitive().phases,
        vec![
            ("A".to_owned(), Anchor::Root(driver)),
            ("B".to_owned(), Anchor::After(PhaseId::new(0))),
            ("C".to_owned(), Anchor::After(PhaseId::new(1))),
        ]
    );
}

#[test]
fn systems_are_registered_under_their_pipe_phase() {
    let a = Pipe::named("a");
    let b = Pipe::named("b");
    let mut scheduler = Scheduler::with_primitive(RecordingPrimitive::default());
    scheduler
        .with_pipe(&a, Driver::new("frame"))
        .unwrap()
        .with_pipe_after(&b, &a)
        .unwrap()
        .with_system(tick, &b)
        .unwrap();

    let entity = scheduler.system_entity(SystemKey::of_val(&tick)).unwrap();
    assert_eq!(scheduler.primitive().systems, vec![(PhaseId::new(1), entity)]);
    assert!(scheduler
        .system_name(SystemKey::of_val(&tick))
        .unwrap()
        .starts_with("mock:"));
}

#[test]
fn hooks_follow_any_primitive_store() {
    let pipe = Pipe::named("a");
    let mut scheduler = Scheduler::with_primitive(RecordingPrimitive::default());
    let events = EventLog::attach(scheduler.hooks());
    scheduler
        .with_pipe(&pipe, Driver::new("frame"))
        .unwrap()
        .with_system(tick, &pipe)
        .unwrap();

    assert!(matches!(
        events.events().as_slice(),
        [SystemEvent::Added { .. }]
    ));
}

#[test]
fn pause_forwards_resolved_names() {
    let pipe = Pipe::named("a");
    let mut scheduler = Scheduler::with_primitive(RecordingPrimitive::default());
    scheduler
        .with_pipe(&pipe, Driver::new("frame"))
        .unwrap()
        .with_system(tick, &pipe)
        .unwrap();
    let name = scheduler
        .system_name(SystemKey::of_val(&tick))
        .unwrap()
        .to_owned();

    scheduler
        .pause_system(SystemRef::of(&tick))
        .pause_system("literal")
        .unpause_system(SystemRef::of(&tick));

    assert_eq!(scheduler.primitive().paused, vec![name.clone(), "literal".to_owned()]);
    assert_eq!(scheduler.primitive().unpaused, vec![name]);
}

#[test]
fn start_reaches_the_primitive_once() {
    let mut scheduler = Scheduler::with_primitive(RecordingPrimitive::default());
    scheduler.start().start();

    assert_eq!(scheduler.primitive().starts, 1);
    assert!(scheduler.primitive().is_started());
}
