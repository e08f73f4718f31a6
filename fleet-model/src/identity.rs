use crate::kind::ResourceKind;
use std::fmt;

/// The stable handle to a resource (spec.md §3).
///
/// `uid` is the primary equality key across refreshes; the
/// `(context, namespace, kind, name)` tuple is the fallback when `uid`
/// is unavailable. Created at projection time; never mutated.
#[derive(Debug, Clone)]
pub struct ResourceIdentity {
    pub context: String,
    pub namespace: String,
    pub kind: ResourceKind,
    pub name: String,
    pub uid: Option<String>,
}

impl ResourceIdentity {
    pub fn new(
        context: impl Into<String>,
        namespace: impl Into<String>,
        kind: ResourceKind,
        name: impl Into<String>,
        uid: Option<String>,
    ) -> Self {
        Self {
            context: context.into(),
            namespace: namespace.into(),
            kind,
            name: name.into(),
            uid,
        }
    }

    /// The effective identity for selection purposes is `(context, uid)`
    /// when a uid is present (spec.md §9(b)); this is the key used by
    /// the uid-based matching pass in the selection tracker.
    pub fn context_uid_key(&self) -> Option<(&str, &str)> {
        self.uid.as_deref().map(|uid| (self.context.as_str(), uid))
    }

    /// The `(context, namespace, kind, name)` fallback key.
    pub fn fallback_key(&self) -> (&str, &str, ResourceKind, &str) {
        (
            self.context.as_str(),
            self.namespace.as_str(),
            self.kind,
            self.name.as_str(),
        )
    }
}

/// Equality compares `uid` first (when both sides have one, scoped to
/// context per §9(b)), falling back to the 4-tuple.
impl PartialEq for ResourceIdentity {
    fn eq(&self, other: &Self) -> bool {
        match (self.context_uid_key(), other.context_uid_key()) {
            (Some(a), Some(b)) => a == b,
            _ => self.fallback_key() == other.fallback_key(),
        }
    }
}

impl Eq for ResourceIdentity {}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.context, self.kind, self.namespace, self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(ctx: &str, ns: &str, name: &str, uid: Option<&str>) -> ResourceIdentity {
        ResourceIdentity::new(ctx, ns, ResourceKind::Pod, name, uid.map(str::to_string))
    }

    #[test]
    fn equal_by_uid_regardless_of_name_change() {
        let a = id("prod", "default", "pod-a", Some("u-1"));
        let b = id("prod", "default", "pod-a-renamed", Some("u-1"));
        assert_eq!(a, b);
    }

    #[test]
    fn same_uid_different_context_is_distinct() {
        let a = id("prod", "default", "pod-a", Some("u-1"));
        let b = id("staging", "default", "pod-a", Some("u-1"));
        assert_ne!(a, b);
    }

    #[test]
    fn falls_back_to_four_tuple_when_uid_missing() {
        let a = id("prod", "default", "pod-a", None);
        let b = id("prod", "default", "pod-a", None);
        assert_eq!(a, b);

        let c = id("prod", "default", "pod-b", None);
        assert_ne!(a, c);
    }
}
