//! Find the remote object a caller-supplied identifier refers to
//!
//! Matching is exact equality against the union of the identity paths: an
//! identifier matches an object if it equals the value at any configured path.
//! This is a pure filter over an already listed collection.

use crate::error::{Error, Result};
use crate::identity::ResourceIdentity;
use crate::types::ResourceSummary;
use serde_json::Value;

/// Find the single object in `collection` that `identifier` refers to.
///
/// Returns `Ok(None)` when nothing matches and [`Error::AmbiguousMatch`] when
/// more than one object does.
pub fn find<'a>(
    kind: &str,
    collection: &'a [ResourceSummary],
    identifier: &str,
    identity: &ResourceIdentity,
) -> Result<Option<&'a ResourceSummary>> {
    let mut matches = collection
        .iter()
        .filter(|resource| matches_identifier(resource, identifier, identity));

    let first = matches.next();
    let rest = matches.count();
    if rest > 0 {
        return Err(Error::AmbiguousMatch {
            kind: kind.to_string(),
            identifier: identifier.to_string(),
            count: rest + 1,
        });
    }
    Ok(first)
}

/// Like [`find`] but only returns the id of the match
pub fn find_id(
    kind: &str,
    collection: &[ResourceSummary],
    identifier: &str,
    identity: &ResourceIdentity,
) -> Result<Option<String>> {
    Ok(find(kind, collection, identifier, identity)?
        .and_then(ResourceSummary::id)
        .map(str::to_string))
}

/// Whether any identity path of `resource` equals `identifier`
pub fn matches_identifier(
    resource: &ResourceSummary,
    identifier: &str,
    identity: &ResourceIdentity,
) -> bool {
    identity
        .paths()
        .iter()
        .filter_map(|path| resource.get(path))
        .any(|value| value_equals(value, identifier))
}

/// Objects whose display name (any identity path but `id`) equals `name`
pub fn named<'a>(
    collection: &'a [ResourceSummary],
    name: &str,
    identity: &'a ResourceIdentity,
) -> impl Iterator<Item = &'a ResourceSummary> + 'a {
    let name = name.to_string();
    collection.iter().filter(move |resource| {
        identity
            .name_paths()
            .filter_map(|path| resource.get(path))
            .any(|value| value_equals(value, &name))
    })
}

fn value_equals(value: &Value, identifier: &str) -> bool {
    match value {
        Value::String(s) => s == identifier,
        Value::Number(n) => n.to_string() == identifier,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FieldPath;
    use serde_json::json;

    fn summary(id: &str, name: &str) -> ResourceSummary {
        ResourceSummary::new(json!({"id": id, "properties": {"name": name}}))
    }

    #[test]
    fn test_find_by_id() {
        let collection = vec![summary("A1", "db-prod"), summary("B2", "db-staging")];
        let found = find("cluster", &collection, "B2", &ResourceIdentity::default()).unwrap();
        assert_eq!(found.unwrap().id(), Some("B2"));
    }

    #[test]
    fn test_find_by_name() {
        let collection = vec![summary("A1", "db-prod"), summary("B2", "db-staging")];
        let found = find("cluster", &collection, "db-prod", &ResourceIdentity::default()).unwrap();
        assert_eq!(found.unwrap().id(), Some("A1"));
    }

    #[test]
    fn test_find_none() {
        let collection = vec![summary("A1", "db-prod")];
        let found = find("cluster", &collection, "nonexistent-id", &ResourceIdentity::default());
        assert!(found.unwrap().is_none());
        assert!(find("cluster", &[], "A1", &ResourceIdentity::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_is_independent_of_path_order() {
        let collection = vec![summary("A1", "db-prod"), summary("B2", "db-staging")];
        let forward = ResourceIdentity::new([FieldPath::id(), FieldPath::parse("properties.name")]);
        let reverse = ResourceIdentity::new([FieldPath::parse("properties.name"), FieldPath::id()]);

        for identifier in ["A1", "db-prod", "B2", "db-staging"] {
            let a = find("cluster", &collection, identifier, &forward).unwrap();
            let b = find("cluster", &collection, identifier, &reverse).unwrap();
            assert_eq!(a, b, "lookup of {identifier} differs with path order");
            assert!(a.is_some());
        }
    }

    #[test]
    fn test_duplicate_display_names_are_ambiguous() {
        let collection = vec![summary("A1", "web"), summary("B2", "web")];
        let err = find("server", &collection, "web", &ResourceIdentity::default()).unwrap_err();
        match err {
            Error::AmbiguousMatch {
                kind,
                identifier,
                count,
            } => {
                assert_eq!(kind, "server");
                assert_eq!(identifier, "web");
                assert_eq!(count, 2);
            }
            other => panic!("Expected AmbiguousMatch, got {other:?}"),
        }

        // The id still resolves uniquely
        let found = find("server", &collection, "B2", &ResourceIdentity::default()).unwrap();
        assert_eq!(found.unwrap().id(), Some("B2"));
    }

    #[test]
    fn test_id_equal_to_other_objects_name_is_ambiguous() {
        let collection = vec![summary("A1", "web"), summary("B2", "A1")];
        assert!(find("server", &collection, "A1", &ResourceIdentity::default()).is_err());
    }

    #[test]
    fn test_no_case_folding_or_partial_match() {
        let collection = vec![summary("A1", "db-prod")];
        let identity = ResourceIdentity::default();
        assert!(find("cluster", &collection, "DB-PROD", &identity).unwrap().is_none());
        assert!(find("cluster", &collection, "db", &identity).unwrap().is_none());
    }

    #[test]
    fn test_id_only_identity_ignores_names() {
        let collection = vec![summary("A1", "db-prod")];
        let found = find("cluster", &collection, "db-prod", &ResourceIdentity::id_only()).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_numeric_values_compare_by_rendering() {
        let collection = vec![ResourceSummary::new(json!({"id": "1", "properties": {"vlan": 7}}))];
        let identity = ResourceIdentity::new([FieldPath::parse("properties.vlan")]);
        assert!(find("lan", &collection, "7", &identity).unwrap().is_some());
    }

    #[test]
    fn test_named_ignores_ids() {
        let collection = vec![summary("A1", "web"), summary("B2", "A1"), summary("C3", "web")];
        let identity = ResourceIdentity::default();

        let ids: Vec<_> = named(&collection, "web", &identity).filter_map(ResourceSummary::id).collect();
        assert_eq!(ids, vec!["A1", "C3"]);
        let ids: Vec<_> = named(&collection, "A1", &identity).filter_map(ResourceSummary::id).collect();
        assert_eq!(ids, vec!["B2"]);
    }

    #[test]
    fn test_find_id() {
        let collection = vec![summary("A1", "db-prod")];
        let id = find_id("cluster", &collection, "db-prod", &ResourceIdentity::default()).unwrap();
        assert_eq!(id.as_deref(), Some("A1"));
    }
}
