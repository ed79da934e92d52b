//! `AuthorizationEngine`: maps a validated identity through a named role
//! to an `AuthIssue`.

use std::collections::BTreeSet;

use gmsa_store::RoleBackend;
use gmsa_store::RoleStore;
use gmsa_types::{AuthError, AuthIssue, AuthIssueMetadata, DenyReason, MergeStrategy, Role, ValidationResult};

/// Maps `group_sid -> policy names` for the optional group→policy merge
/// step. The host configures this out of band; an empty map disables
/// merging entirely and `role.token_policies` passes through unchanged
/// (modulo `deny_policies`).
pub type GroupPolicyMap = std::collections::BTreeMap<String, Vec<String>>;

/// Evaluate authorization for `result` against the named role.
///
/// Constraint evaluation is in the fixed order realm -> spn -> groups, so
/// the denial reason reported is always the first constraint violated,
/// never whichever happened to be checked last.
///
/// # Errors
///
/// Returns [`AuthError::AuthzUnknownRole`] if no role with this name
/// exists, or [`AuthError::AuthzDenied`] with the first violated
/// constraint.
pub async fn authorize<B: RoleBackend>(
    role_store: &RoleStore<B>,
    role_name: &str,
    result: &ValidationResult,
    group_policies: &GroupPolicyMap,
) -> Result<AuthIssue, AuthError> {
    let role = role_store.get(role_name).await?.ok_or(AuthError::AuthzUnknownRole)?;

    if !role.allowed_realms.is_empty() && !role.allowed_realms.contains(&result.realm) {
        return Err(AuthError::AuthzDenied(DenyReason::Realm));
    }
    if !role.allowed_spns.is_empty() && !role.allowed_spns.contains(&result.spn) {
        return Err(AuthError::AuthzDenied(DenyReason::Spn));
    }
    if !role.bound_group_sids.is_empty() {
        let matched = result.group_sids.iter().any(|sid| role.bound_group_sids.contains(sid));
        if !matched {
            return Err(AuthError::AuthzDenied(DenyReason::Groups));
        }
    }

    let policies = compute_policies(&role, result, group_policies);

    Ok(AuthIssue {
        policies,
        token_type: role.token_type,
        period: role.period,
        max_ttl: role.max_ttl,
        metadata: AuthIssueMetadata {
            principal: result.principal.clone(),
            realm: result.realm.clone(),
            spn: result.spn.clone(),
            group_sid_count: result.group_sids.len(),
            channel_binding_ok: result.channel_binding_ok,
        },
    })
}

fn compute_policies(role: &Role, result: &ValidationResult, group_policies: &GroupPolicyMap) -> Vec<String> {
    let base: BTreeSet<String> = role.token_policies.iter().cloned().collect();

    let group_mapped: BTreeSet<String> = result
        .group_sids
        .iter()
        .filter_map(|sid| group_policies.get(sid.as_str()))
        .flatten()
        .cloned()
        .collect();

    let merged: BTreeSet<String> = if group_mapped.is_empty() {
        base
    } else {
        match role.merge_strategy {
            MergeStrategy::Union => base.union(&group_mapped).cloned().collect(),
            MergeStrategy::Intersection => base.intersection(&group_mapped).cloned().collect(),
        }
    };

    let deny: BTreeSet<&String> = role.deny_policies.iter().collect();
    merged.into_iter().filter(|p| !deny.contains(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gmsa_store::InMemoryRoleBackend;
    use gmsa_types::Sid;

    fn result(realm: &str, spn: &str, group_sids: BTreeSet<Sid>) -> ValidationResult {
        ValidationResult {
            principal: format!("alice@{realm}"),
            realm: realm.to_string(),
            spn: spn.to_string(),
            group_sids,
            authtime: Utc::now(),
            endtime: Utc::now(),
            channel_binding_ok: None,
            kvno: 1,
        }
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let store = RoleStore::new(InMemoryRoleBackend::default());
        let err = authorize(&store, "missing", &result("EXAMPLE.COM", "HTTP/x", BTreeSet::new()), &GroupPolicyMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthzUnknownRole));
    }

    #[tokio::test]
    async fn realm_mismatch_is_denied_before_spn_check() {
        let store = RoleStore::new(InMemoryRoleBackend::default());
        let mut role = Role::new("r1");
        role.allowed_realms.insert("OTHER.COM".into());
        role.allowed_spns.insert("HTTP/should-not-be-checked".into());
        store.put(role).await.expect("put");

        let err = authorize(&store, "r1", &result("EXAMPLE.COM", "HTTP/x", BTreeSet::new()), &GroupPolicyMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthzDenied(DenyReason::Realm)));
    }

    #[tokio::test]
    async fn groups_constraint_denies_when_no_overlap() {
        let store = RoleStore::new(InMemoryRoleBackend::default());
        let mut role = Role::new("r1");
        role.bound_group_sids.insert(Sid::parse("S-1-5-21-1-2-3-1001").unwrap());
        store.put(role).await.expect("put");

        let presented: BTreeSet<Sid> = [Sid::parse("S-1-5-21-1-2-3-2002").unwrap()].into_iter().collect();
        let err = authorize(&store, "r1", &result("EXAMPLE.COM", "HTTP/x", presented), &GroupPolicyMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthzDenied(DenyReason::Groups)));
    }

    #[tokio::test]
    async fn union_merge_appends_group_mapped_policies() {
        let store = RoleStore::new(InMemoryRoleBackend::default());
        let mut role = Role::new("r1");
        role.token_policies = vec!["base-policy".into()];
        role.merge_strategy = MergeStrategy::Union;
        store.put(role).await.expect("put");

        let group_sid = Sid::parse("S-1-5-21-1-2-3-1001").unwrap();
        let mut group_policies = GroupPolicyMap::new();
        group_policies.insert(group_sid.as_str().to_string(), vec!["group-policy".into()]);

        let presented: BTreeSet<Sid> = [group_sid].into_iter().collect();
        let issue = authorize(&store, "r1", &result("EXAMPLE.COM", "HTTP/x", presented), &group_policies).await.expect("authorized");
        assert_eq!(issue.policies, vec!["base-policy".to_string(), "group-policy".to_string()]);
    }

    #[tokio::test]
    async fn deny_policies_are_subtracted_after_merge() {
        let store = RoleStore::new(InMemoryRoleBackend::default());
        let mut role = Role::new("r1");
        role.token_policies = vec!["base-policy".into(), "revoked".into()];
        role.deny_policies = vec!["revoked".into()];
        store.put(role).await.expect("put");

        let issue = authorize(&store, "r1", &result("EXAMPLE.COM", "HTTP/x", BTreeSet::new()), &GroupPolicyMap::new()).await.expect("authorized");
        assert_eq!(issue.policies, vec!["base-policy".to_string()]);
    }

    use proptest::prelude::*;

    proptest! {
        /// For all roles with non-empty `bound_group_sids` G and presented
        /// group SIDs S, login is admitted iff `S ∩ G != ∅` — realm and spn
        /// constraints are left open so only the group check can deny.
        #[test]
        fn admitted_iff_group_sids_intersect(
            bound in proptest::collection::btree_set(0u32..8, 1..5),
            presented in proptest::collection::btree_set(0u32..8, 0..5),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let store = RoleStore::new(InMemoryRoleBackend::default());
                let mut role = Role::new("r1");
                role.bound_group_sids = bound.iter().map(|n| Sid::parse(format!("S-1-5-21-1-2-3-{n}")).unwrap()).collect();
                store.put(role).await.expect("put");

                let presented_sids: BTreeSet<Sid> = presented.iter().map(|n| Sid::parse(format!("S-1-5-21-1-2-3-{n}")).unwrap()).collect();
                let intersects = bound.intersection(&presented).next().is_some();

                let outcome = authorize(&store, "r1", &result("EXAMPLE.COM", "HTTP/x", presented_sids), &GroupPolicyMap::new()).await;
                prop_assert_eq!(outcome.is_ok(), intersects);
            });
        }
    }
}
