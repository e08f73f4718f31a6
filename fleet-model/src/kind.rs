use std::fmt;

/// The fixed set of resource kinds the fleet observes.
///
/// Custom resource discovery is explicitly a Non-goal (spec.md §1); the
/// set below is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Pod,
    Deployment,
    StatefulSet,
    Service,
    Ingress,
    ConfigMap,
    Secret,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Pod,
        ResourceKind::Deployment,
        ResourceKind::StatefulSet,
        ResourceKind::Service,
        ResourceKind::Ingress,
        ResourceKind::ConfigMap,
        ResourceKind::Secret,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Deployment => "deployment",
            ResourceKind::StatefulSet => "statefulset",
            ResourceKind::Service => "service",
            ResourceKind::Ingress => "ingress",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Secret => "secret",
        }
    }

    /// Whether this kind supports row grouping/aggregation (§4.8).
    pub fn can_group(self) -> bool {
        matches!(self, ResourceKind::Deployment)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pod" | "pods" | "po" => Ok(ResourceKind::Pod),
            "deployment" | "deployments" | "deploy" => Ok(ResourceKind::Deployment),
            "statefulset" | "statefulsets" | "sts" => Ok(ResourceKind::StatefulSet),
            "service" | "services" | "svc" => Ok(ResourceKind::Service),
            "ingress" | "ingresses" | "ing" => Ok(ResourceKind::Ingress),
            "configmap" | "configmaps" | "cm" => Ok(ResourceKind::ConfigMap),
            "secret" | "secrets" => Ok(ResourceKind::Secret),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resource kind: {0}")]
pub struct UnknownKind(pub String);
