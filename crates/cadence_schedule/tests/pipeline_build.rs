//! Integration tests for pipe and pipeline resolution.
//!
//! Covers chain construction, duplicate detection across pipelines and
//! schedulers, `after` chaining, and execution order across chained
//! pipelines and independently timed drivers.


use cadence_ecs::phase::{Anchor, Driver};
use cadence_schedule::error::SchedulerError;
use cadence_schedule::pipe::Pipe;
use cadence_schedule::pipeline::Pipeline;
use cadence_schedule::scheduler::Scheduler;
use core::time::Duration;
use test_utils::{OrderLog, Tagged};

fn frame() -> Driver {
    Driver::new("frame")
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN CONSTRUCTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn pipeline_phases_form_a_linear_chain() {
    let mut pipeline = Pipeline::new().with("a").with("b").with("c").with("d");
    let mut scheduler = Scheduler::new();
    scheduler.with_pipeline(&mut pipeline, frame()).unwrap();

    let phases = scheduler.phases_of(&pipeline).unwrap().to_vec();
    let runtime = scheduler.primitive();

    assert_eq!(phases.len(), 4);
    assert_eq!(runtime.anchor_of(phases[0]), Some(&Anchor::Root(frame())));
    for pair in phases.windows(2) {
        assert_eq!(runtime.anchor_of(pair[1]), Some(&Anchor::After(pair[0])));
    }
}

#[test]
fn pipeline_pipes_are_registered_by_name() {
    let mut pipeline = Pipeline::new().with("input").with("update");
    let mut scheduler = Scheduler::new();
    scheduler.with_pipeline(&mut pipeline, frame()).unwrap();

    let phases = scheduler.phases_of(&pipeline).unwrap();
    assert_eq!(scheduler.phase_of(&Pipe::named("input")), Some(phases[0]));
    assert_eq!(scheduler.phase_of(&Pipe::named("update")), Some(phases[1]));
}

#[test]
fn unnamed_pipes_do_not_collide() {
    let a = Pipe::new();
    let b = Pipe::new();
    let mut pipeline = Pipeline::new().with(a.clone()).with(b.clone());
    let mut scheduler = Scheduler::new();

    scheduler.with_pipeline(&mut pipeline, frame()).unwrap();
    assert_ne!(scheduler.phase_of(&a), scheduler.phase_of(&b));
}

// ═══════════════════════════════════════════════════════════════════════════════
// DUPLICATES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn building_a_pipeline_twice_on_one_scheduler_fails() {
    let mut pipeline = Pipeline::new().with("a");
    let mut scheduler = Scheduler::new();
    scheduler.with_pipeline(&mut pipeline, frame()).unwrap();

    let err = scheduler.with_pipeline(&mut pipeline, frame()).unwrap_err();
    assert_eq!(err, SchedulerError::DuplicatePipeline(pipeline.id().clone()));
    assert_eq!(scheduler.registries().pipelines().len(), 1);
}

#[test]
fn a_clone_counts_as_the_same_pipeline() {
    let mut pipeline = Pipeline::new().with("a");
    let mut copy = pipeline.clone();
    let mut scheduler = Scheduler::new();
    scheduler.with_pipeline(&mut pipeline, frame()).unwrap();

    assert!(matches!(
        scheduler.with_pipeline(&mut copy, frame()),
        Err(SchedulerError::DuplicatePipeline(_))
    ));
}

#[test]
fn building_a_pipeline_on_two_schedulers_succeeds() {
    let mut pipeline = Pipeline::new().with("a").with("b");
    let mut first = Scheduler::new();
    let mut second = Scheduler::new();

    first.with_pipeline(&mut pipeline, frame()).unwrap();
    second.with_pipeline(&mut pipeline, frame()).unwrap();

    assert_eq!(first.phases_of(&pipeline).map(<[_]>::len), Some(2));
    assert_eq!(second.phases_of(&pipeline).map(<[_]>::len), Some(2));
}

#[test]
fn pipe_names_collide_across_pipelines() {
    let mut first = Pipeline::new().with("shared");
    let mut second = Pipeline::new().with("own").with("shared");
    let mut scheduler = Scheduler::new();
    scheduler.with_pipeline(&mut first, frame()).unwrap();

    let err = scheduler.with_pipeline(&mut second, frame()).unwrap_err();
    assert_eq!(err, SchedulerError::DuplicatePipe("shared".into()));
    assert!(scheduler.phase_of(&Pipe::named("own")).is_none());
    assert!(scheduler.phases_of(&second).is_none());
}

#[test]
fn a_pipe_already_in_a_pipeline_cannot_be_built_alone() {
    let mut pipeline = Pipeline::new().with("a");
    let mut scheduler = Scheduler::new();
    scheduler.with_pipeline(&mut pipeline, frame()).unwrap();

    let err = scheduler.with_pipe(&Pipe::named("a"), frame()).unwrap_err();
    assert_eq!(err, SchedulerError::DuplicatePipe("a".into()));
}

// ═══════════════════════════════════════════════════════════════════════════════
// AFTER
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn pipe_after_pipeline_anchors_to_its_last_phase() {
    let mut pipeline = Pipeline::new().with("a").with("b");
    let c = Pipe::named("c");
    let mut scheduler = Scheduler::new();
    scheduler
        .with_pipeline(&mut pipeline, Driver::new("d"))
        .unwrap()
        .with_pipe_after(&c, &pipeline)
        .unwrap();

    let phases = scheduler.phases_of(&pipeline).unwrap().to_vec();
    let fc = scheduler.phase_of(&c).unwrap();
    let runtime = scheduler.primitive();

    assert_eq!(runtime.anchor_of(phases[0]), Some(&Anchor::Root(Driver::new("d"))));
    assert_eq!(runtime.anchor_of(phases[1]), Some(&Anchor::After(phases[0])));
    assert_eq!(runtime.anchor_of(fc), Some(&Anchor::After(phases[1])));
}

#[test]
fn pipeline_after_pipe_chains_its_first_phase() {
    let root = Pipe::named("root");
    let mut pipeline = Pipeline::new().with("x").with("y");
    let mut scheduler = Scheduler::new();
    scheduler
        .with_pipe(&root, frame())
        .unwrap()
        .with_pipeline_after(&mut pipeline, &root)
        .unwrap();

    let phases = scheduler.phases_of(&pipeline).unwrap().to_vec();
    let root_phase = scheduler.phase_of(&root).unwrap();
    assert_eq!(
        scheduler.primitive().anchor_of(phases[0]),
        Some(&Anchor::After(root_phase))
    );
    assert_eq!(scheduler.primitive().drivers().count(), 1);
}

#[test]
fn after_an_unbuilt_pipeline_fails() {
    let unbuilt = Pipeline::new().with("ghost");
    let mut scheduler = Scheduler::new();

    let err = scheduler
        .with_pipe_after(&Pipe::named("c"), &unbuilt)
        .unwrap_err();
    assert_eq!(err, SchedulerError::UnbuiltPipeline(unbuilt.id().clone()));
    assert!(scheduler.registries().pipes().is_empty());
}

#[test]
fn chained_pipe_never_runs_before_its_pipeline() {
    let log = OrderLog::default();
    let (a, b, c) = (Pipe::named("A"), Pipe::named("B"), Pipe::named("C"));
    let mut pipeline = Pipeline::new().with(a.clone()).with(b.clone());

    let mut scheduler = Scheduler::new();
    scheduler
        .with_pipeline(&mut pipeline, Driver::new("D"))
        .unwrap()
        .with_pipe_after(&c, &pipeline)
        .unwrap()
        // Registered in reverse on purpose.
        .with_system(Tagged::new("c", &log), &c)
        .unwrap()
        .with_system(Tagged::new("b", &log), &b)
        .unwrap()
        .with_system(Tagged::new("a", &log), &a)
        .unwrap();
    scheduler.start();

    for _ in 0..3 {
        scheduler.tick("D").unwrap();
    }
    assert_eq!(
        log.entries(),
        vec!["a", "b", "c", "a", "b", "c", "a", "b", "c"]
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// CADENCE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn pipelines_on_distinct_drivers_keep_their_own_cadence() {
    let log = OrderLog::default();
    let physics = Pipe::named("physics");
    let render = Pipe::named("render");
    let hud = Pipe::named("hud");
    let mut fixed = Pipeline::new().with(physics.clone());
    let mut frame_pipeline = Pipeline::new().with(render.clone());

    let mut scheduler = Scheduler::new();
    scheduler
        .with_pipeline(&mut fixed, Driver::every("fixed", Duration::from_millis(10)))
        .unwrap()
        .with_pipeline(&mut frame_pipeline, frame())
        .unwrap()
        .with_pipe_after(&hud, &render)
        .unwrap()
        .with_system(Tagged::new("physics", &log), &physics)
        .unwrap()
        .with_system(Tagged::new("render", &log), &render)
        .unwrap()
        .with_system(Tagged::new("hud", &log), &hud)
        .unwrap();
    scheduler.start();

    scheduler.advance(Duration::from_millis(35)).unwrap();
    scheduler.advance(Duration::from_millis(5)).unwrap();

    assert_eq!(log.count("physics"), 4);
    assert_eq!(log.count("render"), 2);
    assert_eq!(log.count("hud"), 2);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Property tests over randomly shaped pipeline chains.
///
/// Each case builds `lengths.len()` pipelines, every pipeline after the first
/// chained after its predecessor, and checks that every phase's anchor is the
/// phase immediately before it in the flattened sequence.
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_every_phase_anchors_to_its_predecessor(
            lengths in prop::collection::vec(1..=5usize, 1..=4usize)
        ) {
            let mut scheduler = Scheduler::new();
            let mut pipelines = Vec::with_capacity(lengths.len());

            for (i, len) in lengths.iter().enumerate() {
                let mut pipeline = (0..*len)
                    .fold(Pipeline::new(), |pipeline, j| pipeline.with(format!("p{i}_{j}")));
                let built = match pipelines.last() {
                    None => scheduler.with_pipeline(&mut pipeline, frame()).map(|_| ()),
                    Some(previous) => scheduler
                        .with_pipeline_after(&mut pipeline, previous)
                        .map(|_| ()),
                };
                prop_assert!(built.is_ok());
                pipelines.push(pipeline);
            }

            let flattened: Vec<_> = pipelines
                .iter()
                .flat_map(|pipeline| scheduler.phases_of(pipeline).unwrap().to_vec())
                .collect();
            prop_assert_eq!(flattened.len(), lengths.iter().sum::<usize>());

            let runtime = scheduler.primitive();
            let root = Anchor::Root(frame());
            prop_assert_eq!(runtime.anchor_of(flattened[0]), Some(&root));
            for pair in flattened.windows(2) {
                let expected = Anchor::After(pair[0]);
                prop_assert_eq!(runtime.anchor_of(pair[1]), Some(&expected));
            }
        }
    }
}
