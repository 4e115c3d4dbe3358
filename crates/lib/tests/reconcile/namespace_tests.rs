//! Namespace discovery, graph edges and change routing.

use chartkeeper_lib::consts::VALUES_NAMESPACES_KEY;
use chartkeeper_lib::instance::Instance;
use chartkeeper_lib::mapper::{InstanceMapper, ReconcileRequest};
use chartkeeper_lib::reconcile::{Reconcile, ReconcileOutcome};
use chartkeeper_lib::reference::{Reference, Resource};
use serde_json::json;

use super::common::{TestEnv, app_key, managed_namespace};

fn app() -> Reference {
  Reference::instance("default", "app")
}

#[test]
fn labelled_namespaces_precede_own_namespace() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  env.store.put_resource(managed_namespace("ns-a", "app", "default"));
  env.store.put_resource(managed_namespace("ns-b", "app", "default"));

  env.reconciler().reconcile(&app_key()).unwrap();

  let values = env.upgraded_values();
  assert_eq!(values[0][VALUES_NAMESPACES_KEY], json!(["ns-a", "ns-b", "default"]));

  let mut deps = env.graph.dependencies_for(&app());
  deps.sort();
  assert_eq!(deps, vec![Reference::namespace("ns-a"), Reference::namespace("ns-b")]);
  assert!(env.graph.has_dependency(&Reference::namespace("ns-a"), &app()));
}

#[test]
fn namespaces_of_other_instances_are_ignored() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  env.store.put_resource(managed_namespace("ns-a", "app", "staging"));
  env.store.put_resource(managed_namespace("ns-b", "web", "default"));

  env.reconciler().reconcile(&app_key()).unwrap();

  assert_eq!(env.upgraded_values()[0][VALUES_NAMESPACES_KEY], json!(["default"]));
  assert!(env.graph.dependencies_for(&app()).is_empty());
}

#[test]
fn cluster_wide_instance_keeps_chart_default() {
  let mut env = TestEnv::new();
  env.write_chart_file("values.yaml", "namespaces:\n  - everywhere\n");
  env.config = env.config.clone().with_cluster_wide(app_key());
  env.create(Instance::new("default", "app"));
  env.store.put_resource(managed_namespace("ns-a", "app", "default"));

  env.reconciler().reconcile(&app_key()).unwrap();

  assert_eq!(env.upgraded_values()[0][VALUES_NAMESPACES_KEY], json!(["everywhere"]));
  assert!(env.graph.dependencies_for(&app()).is_empty());
}

#[test]
fn cluster_wide_instance_without_default_has_no_list() {
  let mut env = TestEnv::new();
  env.config = env.config.clone().with_cluster_wide(app_key());
  env.create(Instance::new("default", "app"));

  env.reconciler().reconcile(&app_key()).unwrap();

  assert!(!env.upgraded_values()[0].contains_key(VALUES_NAMESPACES_KEY));
}

#[test]
fn unlabelled_namespace_is_dropped_on_next_pass() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  env.store.put_resource(managed_namespace("ns-a", "app", "default"));
  let reconciler = env.reconciler();
  reconciler.reconcile(&app_key()).unwrap();

  env.store.put_resource(Resource::new(Reference::namespace("ns-a")));
  let outcome = reconciler.reconcile(&app_key()).unwrap();

  assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));
  assert_eq!(env.upgraded_values()[1][VALUES_NAMESPACES_KEY], json!(["default"]));
  assert!(!env.graph.has_dependency(&app(), &Reference::namespace("ns-a")));
}

#[test]
fn namespace_changes_route_back_to_instance() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  env.store.put_resource(managed_namespace("ns-a", "app", "default"));
  env.reconciler().reconcile(&app_key()).unwrap();

  let mapper = InstanceMapper::new(env.graph.clone());
  let requests = mapper.map(&Resource::new(Reference::namespace("ns-a")));

  assert_eq!(requests, vec![ReconcileRequest::from(app_key())]);
}
