//! Finalizer lifecycle, idempotence and release change detection.

use std::sync::atomic::Ordering;

use chartkeeper_lib::consts::{ANNOTATION_CHART_HASH, FINALIZER, VALUES_NAMESPACES_KEY};
use chartkeeper_lib::instance::Instance;
use chartkeeper_lib::reconcile::{Reconcile, ReconcileError, ReconcileOutcome};
use chartkeeper_lib::render::RenderError;
use chartkeeper_lib::store::ResourceStore;
use chartkeeper_lib::util::hash::CONTENT_HASH_LEN;
use serde_json::json;

use super::common::{TestEnv, app_key};

#[test]
fn first_pass_installs_release() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));

  let outcome = env.reconciler().reconcile(&app_key()).unwrap();

  let ReconcileOutcome::Applied { hash } = outcome else {
    panic!("expected Applied, got {outcome:?}");
  };
  assert_eq!(hash.as_str().len(), CONTENT_HASH_LEN);

  let stored = env.get(&app_key());
  assert!(stored.has_finalizer(FINALIZER));
  assert_eq!(stored.annotation(ANNOTATION_CHART_HASH), Some(hash.as_str()));

  let values = env.upgraded_values();
  assert_eq!(values.len(), 1);
  assert_eq!(values[0][VALUES_NAMESPACES_KEY], json!(["default"]));
  assert_eq!(values[0]["replicas"], json!(1));

  let record = env.memory().release("app").unwrap();
  assert_eq!(record.revision, 1);
  assert_eq!(record.files, 3);
}

#[test]
fn repeated_pass_changes_nothing() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  let reconciler = env.reconciler();

  let first = reconciler.reconcile(&app_key()).unwrap();
  let writes = env.store.write_count();
  let second = reconciler.reconcile(&app_key()).unwrap();

  let (ReconcileOutcome::Applied { hash: applied }, ReconcileOutcome::Unchanged { hash: unchanged }) = (first, second)
  else {
    panic!("expected Applied then Unchanged");
  };
  assert_eq!(applied, unchanged);
  assert_eq!(env.memory().upgrade_count(), 1);
  assert_eq!(env.store.write_count(), writes, "no patch or update on an unchanged pass");
}

#[test]
fn template_change_upgrades_release() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  let reconciler = env.reconciler();
  reconciler.reconcile(&app_key()).unwrap();
  let before = env.get(&app_key());

  env.write_chart_file("templates/deployment.yaml", "kind: Deployment\nspec:\n  replicas: 3\n");
  let outcome = reconciler.reconcile(&app_key()).unwrap();

  assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));
  assert_eq!(env.memory().release("app").unwrap().revision, 2);
  assert_ne!(
    env.get(&app_key()).annotation(ANNOTATION_CHART_HASH),
    before.annotation(ANNOTATION_CHART_HASH)
  );
}

#[test]
fn added_chart_file_upgrades_release() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  let reconciler = env.reconciler();
  reconciler.reconcile(&app_key()).unwrap();

  env.write_chart_file("templates/service.yaml", "kind: Service\n");
  reconciler.reconcile(&app_key()).unwrap();

  assert_eq!(env.memory().upgrade_count(), 2);
  assert_eq!(env.memory().release("app").unwrap().files, 4);
}

#[test]
fn default_values_change_upgrades_release() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  let reconciler = env.reconciler();
  reconciler.reconcile(&app_key()).unwrap();

  env.write_chart_file("values.yaml", "replicas: 2\n");
  reconciler.reconcile(&app_key()).unwrap();

  let values = env.upgraded_values();
  assert_eq!(values.len(), 2);
  assert_eq!(values[1]["replicas"], json!(2));
}

#[test]
fn deleted_instance_is_uninstalled_once() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  let reconciler = env.reconciler();
  reconciler.reconcile(&app_key()).unwrap();

  assert!(env.store.delete(&app_key()));
  assert_eq!(reconciler.reconcile(&app_key()).unwrap(), ReconcileOutcome::Finalized);
  assert_eq!(reconciler.reconcile(&app_key()).unwrap(), ReconcileOutcome::Absent);

  assert_eq!(env.memory().uninstall_count(), 1);
  assert!(env.memory().release("app").is_none());
}

#[test]
fn deleted_instance_without_finalizer_is_left_alone() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app").with_finalizer("backup.example.io/snapshot"));
  env.store.delete(&app_key());

  let outcome = env.reconciler().reconcile(&app_key()).unwrap();

  assert_eq!(outcome, ReconcileOutcome::Deleted);
  assert_eq!(env.memory().uninstall_count(), 0);
  assert!(env.get(&app_key()).has_finalizer("backup.example.io/snapshot"));
}

#[test]
fn failed_uninstall_is_retried() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  let reconciler = env.reconciler();
  reconciler.reconcile(&app_key()).unwrap();
  env.store.delete(&app_key());

  env.releaser.fail_uninstall.store(true, Ordering::SeqCst);
  let err = reconciler.reconcile(&app_key()).unwrap_err();
  assert!(matches!(err, ReconcileError::Release(_)));
  assert!(env.get(&app_key()).has_finalizer(FINALIZER));
  assert!(env.memory().release("app").is_some());

  env.releaser.fail_uninstall.store(false, Ordering::SeqCst);
  assert_eq!(reconciler.reconcile(&app_key()).unwrap(), ReconcileOutcome::Finalized);
  assert!(env.store.get(&app_key()).unwrap_err().is_not_found());
}

#[test]
fn missing_chart_fails_after_finalizer() {
  let env = TestEnv::new();
  std::fs::remove_dir_all(&env.config.chart_dir).unwrap();
  env.create(Instance::new("default", "app"));

  let err = env.reconciler().reconcile(&app_key()).unwrap_err();

  assert!(matches!(err, ReconcileError::Render(RenderError::NotFound(_))));
  assert!(env.get(&app_key()).has_finalizer(FINALIZER));
  assert_eq!(env.memory().upgrade_count(), 0);
}

#[test]
fn unknown_instance_is_absent() {
  let env = TestEnv::new();
  assert_eq!(env.reconciler().reconcile(&app_key()).unwrap(), ReconcileOutcome::Absent);
  assert!(env.memory().calls().is_empty());
}
