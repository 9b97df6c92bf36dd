//! Integration tests for checkpoint/resume
//!
//! Verifies the completeness property: consumers at 1.0, 2.0, 3.0 run
//! up to a 1.5 cutoff checkpoint with completionCount = 1; resuming
//! fires the remaining two exactly once each; and a run without any
//! checkpoint also ends at completionCount = 3.

use std::sync::{Arc, Mutex};

use plinth::continuity::{run_continuity_plugin, RunContinuityData, RunContinuityDataBuilder};
use plinth::core::PluginId;
use plinth::plugin::{Plugin, PluginData};
use plinth::simulation::Simulation;

const CUTOFF: PluginId = PluginId::new("cutoff");

type Fired = Arc<Mutex<Vec<usize>>>;
type Snapshots = Arc<Mutex<Vec<RunContinuityData>>>;

fn three_consumers(fired: &Fired) -> RunContinuityData {
    let mut builder = RunContinuityData::builder();
    for (index, time) in [1.0, 2.0, 3.0].into_iter().enumerate() {
        let fired = Arc::clone(fired);
        builder.add_consumer(time, move |_| {
            fired.lock().unwrap().push(index);
            Ok(())
        });
    }
    builder.build_data()
}

fn cutoff_plugin(at: f64) -> Plugin {
    Plugin::builder(CUTOFF)
        .with_initializer(move |ctx| {
            ctx.add_plan(at, |ctx| {
                ctx.halt();
                Ok(())
            })?;
            Ok(())
        })
        .build()
}

fn run(data: RunContinuityData, cutoff: Option<f64>) -> RunContinuityData {
    let snapshots: Snapshots = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshots);

    let mut builder = Simulation::builder()
        .add_plugin(run_continuity_plugin(data))
        .with_output(move |item| {
            if let Ok(snapshot) = item.downcast::<RunContinuityData>() {
                sink.lock().unwrap().push(*snapshot);
            }
        });
    if let Some(at) = cutoff {
        builder = builder.add_plugin(cutoff_plugin(at));
    }
    builder.build().execute().unwrap();

    let mut snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 1, "close emits exactly one snapshot");
    snapshots.pop().unwrap()
}

#[test]
fn checkpoint_then_resume_fires_each_consumer_exactly_once() {
    let fired: Fired = Arc::new(Mutex::new(Vec::new()));

    // first run halts between the first and second consumer
    let checkpoint = run(three_consumers(&fired), Some(1.5));
    assert_eq!(&*fired.lock().unwrap(), &[0]);
    assert_eq!(checkpoint.completion_count(), 1);
    assert_eq!(checkpoint.consumer_count(), 3);
    assert!(checkpoint.plans_scheduled());
    assert!(!checkpoint.all_plans_complete());

    // resume through the sanctioned builder path
    let resumed = checkpoint
        .clone_builder()
        .as_any_mut()
        .downcast_mut::<RunContinuityDataBuilder>()
        .expect("continuity data yields a continuity builder")
        .build_data();
    assert!(!resumed.plans_scheduled());

    let finished = run(resumed, None);
    assert_eq!(
        &*fired.lock().unwrap(),
        &[0, 1, 2],
        "the remaining two consumers fire exactly once each"
    );
    assert_eq!(finished.completion_count(), 3);
    assert!(finished.all_plans_complete());
}

#[test]
fn uncheckpointed_run_completes_all_consumers() {
    let fired: Fired = Arc::new(Mutex::new(Vec::new()));
    let snapshot = run(three_consumers(&fired), None);

    assert_eq!(&*fired.lock().unwrap(), &[0, 1, 2]);
    assert_eq!(snapshot.completion_count(), 3);
    assert!(snapshot.all_plans_complete());
}

#[test]
fn replaying_an_emitted_snapshot_verbatim_schedules_nothing() {
    let fired: Fired = Arc::new(Mutex::new(Vec::new()));
    let checkpoint = run(three_consumers(&fired), Some(1.5));
    assert_eq!(checkpoint.completion_count(), 1);

    // naive host: feeds the emitted snapshot straight back in; the
    // raised scheduled flag guards against double execution
    let replayed = run(checkpoint, None);
    assert_eq!(
        &*fired.lock().unwrap(),
        &[0],
        "no consumer may re-fire from a verbatim snapshot"
    );
    assert_eq!(replayed.completion_count(), 1);
}

#[test]
fn resume_skips_completed_consumers_by_counter() {
    let fired: Fired = Arc::new(Mutex::new(Vec::new()));

    // host reconstructs the consumer list and restores the counter, as
    // after reading a persisted checkpoint
    let mut builder = RunContinuityData::builder();
    for (index, time) in [1.0, 2.0, 3.0].into_iter().enumerate() {
        let fired = Arc::clone(&fired);
        builder.add_consumer(time, move |_| {
            fired.lock().unwrap().push(index);
            Ok(())
        });
    }
    builder.with_completion_count(2);
    let data = builder.build_data();

    let snapshot = run(data, None);
    assert_eq!(
        &*fired.lock().unwrap(),
        &[2],
        "only the consumer past the counter may fire"
    );
    assert_eq!(snapshot.completion_count(), 3);
    assert!(snapshot.all_plans_complete());
}
