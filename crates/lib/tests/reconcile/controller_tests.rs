//! Controller driving the real reconciler.

use std::sync::Arc;

use chartkeeper_lib::consts::VALUES_NAMESPACES_KEY;
use chartkeeper_lib::controller::{Controller, RunSummary, WatchEvent};
use chartkeeper_lib::instance::Instance;
use chartkeeper_lib::mapper::InstanceMapper;
use chartkeeper_lib::reconcile::Reconcile;
use chartkeeper_lib::reference::ObjectKey;
use chartkeeper_lib::store::ResourceStore;
use serde_json::json;
use tokio::sync::mpsc;

use super::common::{TestEnv, app_key, managed_namespace};

fn controller(env: &TestEnv) -> Controller {
  Controller::new(
    Arc::new(env.reconciler()),
    InstanceMapper::new(env.graph.clone()),
    env.config.workers,
  )
}

#[tokio::test]
async fn instance_event_installs_release() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  env.create(Instance::new("team", "web"));

  let (tx, rx) = mpsc::channel(8);
  tx.send(WatchEvent::Instance(app_key())).await.unwrap();
  tx.send(WatchEvent::Instance(app_key())).await.unwrap();
  tx.send(WatchEvent::Instance(ObjectKey::new("team", "web")))
    .await
    .unwrap();
  drop(tx);

  let summary = controller(&env).run(rx).await;

  assert_eq!(summary.failures, 0);
  assert!(summary.passes >= 2);
  assert!(env.memory().release("app").is_some());
  assert!(env.memory().release("web").is_some());
  assert_eq!(env.memory().upgrade_count(), 2);
}

#[tokio::test]
async fn namespace_event_reaches_owner() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  let namespace = managed_namespace("ns-a", "app", "default");
  env.store.put_resource(namespace.clone());

  let (tx, rx) = mpsc::channel(8);
  tx.send(WatchEvent::Related(namespace)).await.unwrap();
  drop(tx);

  let summary = controller(&env).run(rx).await;

  assert_eq!(summary, RunSummary { passes: 1, failures: 0 });
  assert_eq!(
    env.memory().release("app").unwrap().values[VALUES_NAMESPACES_KEY],
    json!(["ns-a", "default"])
  );
}

#[tokio::test]
async fn deleted_instance_is_finalized() {
  let env = TestEnv::new();
  env.create(Instance::new("default", "app"));
  env.reconciler().reconcile(&app_key()).unwrap();
  env.store.delete(&app_key());

  let (tx, rx) = mpsc::channel(8);
  tx.send(WatchEvent::Instance(app_key())).await.unwrap();
  drop(tx);

  let summary = controller(&env).run(rx).await;

  assert_eq!(summary, RunSummary { passes: 1, failures: 0 });
  assert_eq!(env.memory().uninstall_count(), 1);
  assert!(env.store.get(&app_key()).unwrap_err().is_not_found());
}
