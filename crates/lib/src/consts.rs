//! Well-known names shared by the reconciler, the mapper and the configuration.

/// API group of the primary managed resource.
pub const INSTANCE_API_GROUP: &str = "chartkeeper.io";

/// Kind of the primary managed resource.
pub const INSTANCE_KIND: &str = "ManagedApp";

/// Label on a secondary resource naming the owning instance.
pub const LABEL_OWNER_NAME: &str = "chartkeeper.io/name";

/// Label on a secondary resource naming the namespace of the owning instance.
pub const LABEL_OWNER_NAMESPACE: &str = "chartkeeper.io/namespace";

/// Annotation selecting how component images are defaulted.
///
/// Legal values are `None`, `Always` and `IfNotPresent` (default: `None`).
pub const ANNOTATION_IMAGE_UPDATE_POLICY: &str = "chartkeeper.io/image-update-policy";

/// Annotation holding the hash of the chart and values last applied.
pub const ANNOTATION_CHART_HASH: &str = "chartkeeper.io/chart-hash";

/// Finalizer guarding the uninstall of the release.
pub const FINALIZER: &str = "uninstall.finalizers.chartkeeper.io";

/// Values key receiving the namespaces an instance manages.
pub const VALUES_NAMESPACES_KEY: &str = "namespaces";

/// Chart values file, relative to the chart root.
pub const VALUES_FILENAME: &str = "values.yaml";

// Environment variables read by `OperatorConfig::from_env`.
pub const ENV_CHART_DIR: &str = "CHARTKEEPER_CHART_DIR";
pub const ENV_RELEASE_DRIVER: &str = "CHARTKEEPER_RELEASE_DRIVER";
pub const ENV_MAX_HISTORY: &str = "CHARTKEEPER_MAX_HISTORY";
pub const ENV_CLUSTER_INSTANCES: &str = "CHARTKEEPER_CLUSTER_INSTANCES";
pub const ENV_SERVER_IMAGE: &str = "CHARTKEEPER_SERVER_IMAGE";
pub const ENV_AUTH_PROXY_IMAGE: &str = "CHARTKEEPER_AUTH_PROXY_IMAGE";
pub const ENV_CACHE_IMAGE: &str = "CHARTKEEPER_CACHE_IMAGE";
pub const ENV_WORKERS: &str = "CHARTKEEPER_WORKERS";

/// Revisions kept per release when `CHARTKEEPER_MAX_HISTORY` is unset.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Concurrent reconciliation passes when `CHARTKEEPER_WORKERS` is unset.
pub const DEFAULT_WORKERS: usize = 4;
