//! Values assembly and namespace discovery.

use serde_json::Value;
use tracing::debug;

use crate::consts::{LABEL_OWNER_NAME, LABEL_OWNER_NAMESPACE, VALUES_NAMESPACES_KEY};
use crate::graph::DependencyGraph;
use crate::instance::Instance;
use crate::render::Values;
use crate::store::{LabelSelector, ResourceStore, StoreError};

/// Selector for secondary resources that name `instance` as their owner.
pub fn owner_selector(instance: &Instance) -> LabelSelector {
  LabelSelector::new()
    .with(LABEL_OWNER_NAME, &instance.metadata.name)
    .with(LABEL_OWNER_NAMESPACE, &instance.metadata.namespace)
}

/// Find the namespaces `instance` manages and link each of them to it in the graph.
///
/// Returns the discovered names in listing order followed by the instance's
/// own namespace, without duplicates.
pub fn discover_namespaces(
  store: &dyn ResourceStore,
  graph: &DependencyGraph,
  instance: &Instance,
) -> Result<Vec<String>, StoreError> {
  let owner = instance.reference();
  let mut namespaces: Vec<String> = Vec::new();

  for resource in store.list(&owner_selector(instance))? {
    graph.add_dependency(&owner, &resource.reference);
    if !namespaces.contains(&resource.reference.name) {
      namespaces.push(resource.reference.name);
    }
  }

  if !namespaces.contains(&instance.metadata.namespace) {
    namespaces.push(instance.metadata.namespace.clone());
  }

  debug!(instance = %instance.key(), ?namespaces, "discovered namespaces");
  Ok(namespaces)
}

/// Chart defaults with the namespace list set, when there is one.
pub fn assemble_values(defaults: &Values, namespaces: Option<Vec<String>>) -> Values {
  let mut values = defaults.clone();
  if let Some(namespaces) = namespaces {
    let list = namespaces.into_iter().map(Value::String).collect();
    values.insert(VALUES_NAMESPACES_KEY.to_string(), Value::Array(list));
  }
  values
}
