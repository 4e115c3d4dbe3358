//! Image and version defaulting through the update-policy annotation.

use chartkeeper_lib::config::OperatorConfig;
use chartkeeper_lib::consts::ANNOTATION_IMAGE_UPDATE_POLICY;
use chartkeeper_lib::instance::{Component, ComponentSpec, Instance, InstanceSpec};
use chartkeeper_lib::reconcile::Reconcile;

use super::common::{TestEnv, app_key};

fn pinned(config: OperatorConfig) -> OperatorConfig {
  config
    .with_image(Component::Server, "registry.local:5000/server:v2.0.0")
    .with_image(Component::AuthProxy, "proxy")
    .with_image(Component::Cache, ":7.2")
}

fn run(policy: Option<&str>, spec: InstanceSpec) -> InstanceSpec {
  let mut env = TestEnv::new();
  env.config = pinned(env.config.clone());
  let mut instance = Instance::new("default", "app").with_spec(spec);
  if let Some(policy) = policy {
    instance = instance.with_annotation(ANNOTATION_IMAGE_UPDATE_POLICY, policy);
  }
  env.create(instance);

  env.reconciler().reconcile(&app_key()).unwrap();
  env.get(&app_key()).spec
}

fn deployed() -> InstanceSpec {
  InstanceSpec {
    server: ComponentSpec::new("registry.local:5000/server", "v1.0.0"),
    auth_proxy: ComponentSpec::new("old-proxy", "1.0"),
    cache: ComponentSpec::new("cache", "7.0"),
  }
}

#[test]
fn always_overwrites_the_halves_provided() {
  let spec = run(Some("Always"), deployed());

  assert_eq!(spec.server, ComponentSpec::new("registry.local:5000/server", "v2.0.0"));
  assert_eq!(spec.auth_proxy, ComponentSpec::new("proxy", "1.0"));
  assert_eq!(spec.cache, ComponentSpec::new("cache", "7.2"));
}

#[test]
fn if_not_present_fills_only_empty_components() {
  let mut spec = deployed();
  spec.cache = ComponentSpec::default();

  let spec = run(Some("IfNotPresent"), spec);

  assert_eq!(spec.server, ComponentSpec::new("registry.local:5000/server", "v1.0.0"));
  assert_eq!(spec.auth_proxy, ComponentSpec::new("old-proxy", "1.0"));
  assert_eq!(spec.cache, ComponentSpec::new("", "7.2"));
}

#[test]
fn if_not_present_ignores_half_set_components() {
  let mut spec = InstanceSpec::default();
  spec.auth_proxy = ComponentSpec::new("", "1.0");

  let spec = run(Some("IfNotPresent"), spec);

  assert_eq!(spec.auth_proxy, ComponentSpec::new("", "1.0"));
  assert_eq!(spec.server, ComponentSpec::new("registry.local:5000/server", "v2.0.0"));
}

#[test]
fn none_and_unknown_policies_change_nothing() {
  assert_eq!(run(None, deployed()), deployed());
  assert_eq!(run(Some("None"), deployed()), deployed());
  assert_eq!(run(Some("Sometimes"), deployed()), deployed());
}

#[test]
fn unchanged_images_are_not_patched() {
  let mut env = TestEnv::new();
  env.config = env.config.clone().with_image(Component::Server, "server:v1");
  let mut spec = InstanceSpec::default();
  spec.server = ComponentSpec::new("server", "v1");
  env.create(
    Instance::new("default", "app")
      .with_spec(spec)
      .with_annotation(ANNOTATION_IMAGE_UPDATE_POLICY, "Always"),
  );

  env.reconciler().reconcile(&app_key()).unwrap();

  // One update for the finalizer, one patch for the hash annotation.
  assert_eq!(env.store.write_count(), 2);
}
