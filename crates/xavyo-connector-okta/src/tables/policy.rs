//! Policy tables: sign-on, password and MFA enrollment.
//!
//! All three list `/api/v1/policies` narrowed by the `type` parameter and
//! share the `rules` and `resource_mapping` enrichments.

use std::sync::Arc;
use xavyo_query::prelude::*;

use crate::families::{PolicyVariant, POLICY_ERRORS, POLICY_MAPPING_ERRORS};

const POLICIES: EndpointTemplate = EndpointTemplate::new("/api/v1/policies");
const POLICY_RULES: EndpointTemplate = EndpointTemplate::new("/api/v1/policies/{id}/rules");
const POLICY_MAPPINGS: EndpointTemplate = EndpointTemplate::new("/api/v1/policies/{id}/mappings");

fn policy_columns(with_settings: bool) -> Vec<ColumnDefinition> {
    let mut columns = vec![
        ColumnDefinition::new("name", ColumnType::String, "Name of the policy."),
        ColumnDefinition::new("id", ColumnType::String, "Identifier of the policy."),
        ColumnDefinition::new("description", ColumnType::String, "Description of the policy."),
        ColumnDefinition::new("created", ColumnType::Timestamp, "Timestamp when the policy was created."),
        ColumnDefinition::new("last_updated", ColumnType::Timestamp, "Timestamp when the policy was last modified."),
        ColumnDefinition::new("priority", ColumnType::Int, "Priority of the policy."),
        ColumnDefinition::new("status", ColumnType::String, "Status of the policy: ACTIVE or INACTIVE."),
        ColumnDefinition::new("system", ColumnType::Bool, "True for system policies, which cannot be deleted."),
        ColumnDefinition::new("type", ColumnType::String, "Type of the policy."),
        ColumnDefinition::new("conditions", ColumnType::Json, "Conditions of the policy."),
        ColumnDefinition::new("rules", ColumnType::Json, "Rules of the policy, in priority order."),
        ColumnDefinition::new("resource_mapping", ColumnType::Json, "Resources mapped to the policy."),
        ColumnDefinition::new("title", ColumnType::String, "Display title of the policy."),
    ];
    if with_settings {
        columns.push(ColumnDefinition::new("settings", ColumnType::Json, "Settings of the policy."));
    }
    columns
}

fn policy_table(
    name: &'static str,
    description: &'static str,
    policy_type: PolicyVariant,
    with_settings: bool,
) -> TableDefinition {
    TableDefinition::new(name, description)
        .with_columns(policy_columns(with_settings))
        .with_list(
            ListSpec::new(
                POLICIES,
                Arc::new(TaggedUnion::<PolicyVariant>::new()),
                POLICY_ERRORS,
            )
            .with_static_param("type", policy_type.tag()),
        )
        .with_enrichment(
            "rules",
            Arc::new(CollectListTask::new("policy_rules", POLICY_RULES)),
            POLICY_ERRORS,
        )
        .with_enrichment(
            "resource_mapping",
            Arc::new(
                CollectListTask::new("policy_mappings", POLICY_MAPPINGS)
                    .empty_when(POLICY_MAPPING_ERRORS),
            ),
            POLICY_MAPPING_ERRORS,
        )
}

/// `okta_signon_policy`
pub fn signon_policy() -> TableDefinition {
    policy_table(
        "okta_signon_policy",
        "Okta sign-on policies control how users sign in, including MFA challenges and session lifetime.",
        PolicyVariant::OktaSignOn,
        false,
    )
}

/// `okta_password_policy`
pub fn password_policy() -> TableDefinition {
    policy_table(
        "okta_password_policy",
        "Password policies set password complexity, expiry and the recovery operations users may perform.",
        PolicyVariant::Password,
        true,
    )
}

/// `okta_mfa_policy`
pub fn mfa_policy() -> TableDefinition {
    policy_table(
        "okta_mfa_policy",
        "MFA enrollment policies control which authenticators users may or must enroll.",
        PolicyVariant::MfaEnroll,
        true,
    )
}
