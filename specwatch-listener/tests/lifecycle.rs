// Copyright (c) The specwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving a [`SpecListener`] the way the engine would.

use pretty_assertions::assert_eq;
use specwatch_listener::{
    config::ExtensionConfig,
    errors::ProducerError,
    extension::ReportExtension,
    listener::{
        ErrorContext, ErrorSummary, MethodInfo, MethodKind, NO_FEATURE_PLACEHOLDER,
        NO_ITERATION_PLACEHOLDER, SpecListener,
    },
    producer::{ProducerRegistry, ReportProducer},
};
use specwatch_model::{FeatureInfo, ProblemKind, SpecInfo, SpecRun};
use std::{
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use test_case::test_case;

/// Producer that stores every finalized run for inspection.
#[derive(Debug, Default)]
struct CaptureProducer {
    runs: Mutex<Vec<SpecRun>>,
    done_calls: AtomicUsize,
}

impl CaptureProducer {
    fn runs(&self) -> Vec<SpecRun> {
        self.runs.lock().unwrap().clone()
    }
}

impl ReportProducer for CaptureProducer {
    fn create_report_for(&self, spec_run: SpecRun) -> Result<(), ProducerError> {
        self.runs.lock().unwrap().push(spec_run);
        Ok(())
    }

    fn done(&self) -> Result<(), ProducerError> {
        self.done_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn capture_listener() -> (Arc<CaptureProducer>, SpecListener) {
    let producer = Arc::new(CaptureProducer::default());
    let listener = SpecListener::new(producer.clone());
    (producer, listener)
}

fn error(message: &str) -> ErrorContext {
    ErrorContext::new(ErrorSummary::new(message))
}

#[test]
fn scenario_a_clean_pass() {
    let (producer, listener) = capture_listener();

    listener.before_spec(SpecInfo::new("S"));
    listener.before_feature(FeatureInfo::new("F1"));
    listener.before_iteration("I1");
    listener.after_iteration("I1");
    listener.after_feature(&FeatureInfo::new("F1"));
    listener.after_spec(&SpecInfo::new("S"));

    let runs = producer.runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.spec.name, "S");
    assert_eq!(run.feature_runs.len(), 1);
    assert_eq!(run.feature_runs[0].feature.name, "F1");
    let iterations: Vec<_> = run.feature_runs[0].failures.keys().cloned().collect();
    assert_eq!(iterations, ["I1"]);
    assert!(run.feature_runs[0].failures["I1"].is_empty());
    assert!(run.initialization_error.is_none());
}

#[test]
fn scenario_b_error_inside_iteration() {
    let (producer, listener) = capture_listener();

    listener.before_spec(SpecInfo::new("S"));
    listener.before_feature(FeatureInfo::new("F1"));
    listener.before_iteration("I1");
    let mut context = error("boom");
    context.set_method(MethodInfo::new("F1", MethodKind::Feature));
    listener.error(context);
    listener.after_iteration("I1");
    listener.after_feature(&FeatureInfo::new("F1"));
    listener.after_spec(&SpecInfo::new("S"));

    let runs = producer.runs();
    let problems = &runs[0].feature_runs[0].failures["I1"];
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].kind, ProblemKind::Failure);
    assert_eq!(problems[0].message, "boom");
    assert_eq!(problems[0].method.as_deref(), Some("F1"));
}

#[test]
fn scenario_c_initialization_error_fan_out() {
    let (producer, listener) = capture_listener();

    let mut spec = SpecInfo::new("S");
    spec.add_features([FeatureInfo::new("F1"), FeatureInfo::new("F2")]);
    let mut context = error("ctor failed");
    context
        .set_spec(spec)
        .set_method(MethodInfo::new("<init>", MethodKind::Initializer));
    listener.error(context);

    let runs = producer.runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert!(run.initialization_error.is_some());
    assert_eq!(run.feature_runs.len(), 2);
    for feature_run in &run.feature_runs {
        assert!(feature_run.display_name().starts_with("<Initialization Error> "));
    }

    let first = &run.feature_runs[0].failures["F1"];
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, ProblemKind::SpecInitialization);
    assert!(first[0].message.contains("ctor failed"));

    let second = &run.feature_runs[1].failures["F2"];
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].kind, ProblemKind::Sentinel);
}

// Each declared feature becomes exactly one feature run with exactly one
// simulated iteration; zero declared features produces one placeholder.
#[test_case(0; "no known features")]
#[test_case(1; "single feature")]
#[test_case(3; "several features")]
fn initialization_error_feature_counts(feature_count: usize) {
    let (producer, listener) = capture_listener();

    let mut spec = SpecInfo::new("S");
    spec.add_features((0..feature_count).map(|i| FeatureInfo::new(format!("F{i}"))));
    let mut context = error("ctor failed");
    context.set_spec(spec);
    listener.error(context);

    let runs = producer.runs();
    let run = &runs[0];
    assert_eq!(run.feature_runs.len(), feature_count.max(1));
    if feature_count == 0 {
        assert_eq!(run.feature_runs[0].feature.name, NO_FEATURE_PLACEHOLDER);
    }
    for (index, feature_run) in run.feature_runs.iter().enumerate() {
        assert_eq!(feature_run.failures.len(), 1, "exactly one iteration");
        assert_eq!(feature_run.problem_count(), 1, "exactly one problem");
        let expected_kind = if index == 0 {
            ProblemKind::SpecInitialization
        } else {
            ProblemKind::Sentinel
        };
        let problem = &feature_run.failures[0][0];
        assert_eq!(problem.kind, expected_kind);
    }
    // One error call, one problem per feature run, one detailed problem overall.
    assert_eq!(run.problem_count(), feature_count.max(1));
}

#[test]
fn orphaned_failures_are_never_dropped() {
    let (producer, listener) = capture_listener();

    listener.before_spec(SpecInfo::new("S"));
    // No feature, no iteration.
    listener.error(error("setupSpec failed"));
    listener.before_feature(FeatureInfo::new("F1"));
    // Feature exists but no iteration cursor.
    listener.error(error("setup failed"));
    listener.before_iteration("I1");
    listener.error(error("assertion failed"));
    listener.after_iteration("I1");
    listener.after_spec(&SpecInfo::new("S"));

    let runs = producer.runs();
    let run = &runs[0];
    // Three error calls, three recorded problems.
    assert_eq!(run.problem_count(), 3);
    assert_eq!(run.feature_runs[0].feature.name, NO_FEATURE_PLACEHOLDER);
    assert_eq!(
        run.feature_runs[0].failures[NO_ITERATION_PLACEHOLDER][0].message,
        "setupSpec failed"
    );
    assert_eq!(
        run.feature_runs[1].failures[NO_ITERATION_PLACEHOLDER][0].message,
        "setup failed"
    );
    assert_eq!(
        run.feature_runs[1].failures["I1"][0].message,
        "assertion failed"
    );
}

#[test]
fn timing_is_recorded_on_finalization() {
    let (producer, listener) = capture_listener();

    listener.before_spec(SpecInfo::new("S"));
    listener.before_feature(FeatureInfo::new("F1"));
    listener.before_iteration("I1");
    std::thread::sleep(Duration::from_millis(10));
    listener.after_iteration("I1");
    listener.after_spec(&SpecInfo::new("S"));

    let runs = producer.runs();
    let run = &runs[0];
    assert!(run.start_timestamp.is_some());
    let total_time = run.total_time.expect("total time is set");
    assert!(
        total_time >= Duration::from_millis(10),
        "total time ({total_time:?}) covers the iteration"
    );
}

#[test]
fn skips_do_not_mutate_the_model() {
    let (producer, listener) = capture_listener();

    listener.before_spec(SpecInfo::new("S"));
    listener.spec_skipped(&SpecInfo::new("Other"));
    listener.before_feature(FeatureInfo::new("F1"));
    listener.feature_skipped(&FeatureInfo::new("F2"));
    listener.before_iteration("I1");
    listener.after_iteration("I1");
    listener.after_spec(&SpecInfo::new("S"));

    let runs = producer.runs();
    let run = &runs[0];
    assert_eq!(run.feature_runs.len(), 1);
    assert_eq!(run.problem_count(), 0);
}

#[test]
fn concurrent_errors_are_all_recorded() {
    let (producer, listener) = capture_listener();
    let listener = Arc::new(listener);

    listener.before_spec(SpecInfo::new("S"));
    listener.before_feature(FeatureInfo::new("F1"));
    listener.before_iteration("I1");

    let threads: Vec<_> = (0..2)
        .map(|thread| {
            let listener = listener.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    listener.error(error(&format!("t{thread} failure {i}")));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("error thread succeeds");
    }

    listener.after_iteration("I1");
    listener.after_spec(&SpecInfo::new("S"));

    let runs = producer.runs();
    assert_eq!(runs[0].problem_count(), 200);
}

static EXTENSION_CAPTURE: OnceLock<Arc<CaptureProducer>> = OnceLock::new();

fn capture_factory(
    _config: &ExtensionConfig,
) -> Result<Arc<dyn ReportProducer>, ProducerError> {
    let producer = EXTENSION_CAPTURE
        .get_or_init(|| Arc::new(CaptureProducer::default()))
        .clone();
    Ok(producer)
}

#[test]
fn extension_runs_end_to_end_and_flushes_once() {
    let mut registry = ProducerRegistry::with_defaults();
    registry.register("capture", capture_factory);
    let extension = ReportExtension::new(registry);

    let config =
        ExtensionConfig::from_toml_str("producer = \"capture\"").expect("config is valid");
    extension.start(config.clone());
    // Second start is a no-op.
    extension.start(config);

    let listener = extension.attach_listener().expect("producer is configured");
    listener.before_spec(SpecInfo::new("S"));
    listener.before_feature(FeatureInfo::new("F1"));
    listener.before_iteration("I1");
    listener.after_iteration("I1");
    listener.after_spec(&SpecInfo::new("S"));

    extension.shutdown();
    extension.shutdown();

    let producer = EXTENSION_CAPTURE.get().expect("factory ran");
    assert_eq!(producer.runs().len(), 1);
    assert_eq!(producer.done_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn extension_declines_on_bad_config() {
    let extension = ReportExtension::new(ProducerRegistry::with_defaults());
    extension.start_from_file("/nonexistent/specwatch.toml");
    assert!(extension.attach_listener().is_none());
    // Shutdown with no producer is a no-op, not a panic.
    extension.shutdown();
}

#[test]
fn extension_declines_on_unknown_producer() {
    let extension = ReportExtension::new(ProducerRegistry::new());
    extension.start(ExtensionConfig::default());
    assert!(extension.attach_listener().is_none());
}

#[test]
fn extension_declines_when_disabled() {
    let extension = ReportExtension::new(ProducerRegistry::with_defaults());
    extension.start(ExtensionConfig::from_toml_str("enabled = false").expect("config is valid"));
    assert!(extension.attach_listener().is_none());
}
