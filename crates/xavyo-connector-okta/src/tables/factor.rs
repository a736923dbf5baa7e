//! `okta_factor`: enrolled factors of every user.

use std::sync::Arc;
use xavyo_query::prelude::*;

use crate::families::{FactorVariant, FACTOR_ERRORS, USER_ERRORS, USER_FIELDS};

const USERS: EndpointTemplate = EndpointTemplate::new("/api/v1/users");
const USER: EndpointTemplate = EndpointTemplate::new("/api/v1/users/{id}");
const USER_OF_FACTOR: EndpointTemplate = EndpointTemplate::new("/api/v1/users/{user_id}");
const USER_FACTORS: EndpointTemplate = EndpointTemplate::new("/api/v1/users/{user_id}/factors");
const USER_FACTOR: EndpointTemplate = EndpointTemplate::new("/api/v1/users/{user_id}/factors/{id}");

pub fn factor() -> TableDefinition {
    let users = ParentSpec::new(
        USERS,
        Arc::new(PlainResolver::new("user", USER_FIELDS)),
        USER_ERRORS,
        "user_id",
    )
    .with_get(USER)
    .with_carry("login", "user_name");

    TableDefinition::new("okta_factor", "Factors enrolled by Okta users.")
        .with_columns([
            ColumnDefinition::new("id", ColumnType::String, "Unique key of the factor."),
            ColumnDefinition::new("user_id", ColumnType::String, "Unique key of the user owning the factor."),
            ColumnDefinition::new("user_name", ColumnType::String, "Login of the user owning the factor."),
            ColumnDefinition::new("factor_type", ColumnType::String, "Type of the factor."),
            ColumnDefinition::new("created", ColumnType::Timestamp, "Timestamp when the factor was enrolled."),
            ColumnDefinition::new("last_updated", ColumnType::Timestamp, "Timestamp when the factor was last updated."),
            ColumnDefinition::new("provider", ColumnType::String, "Provider of the factor."),
            ColumnDefinition::new("status", ColumnType::String, "Current status of the factor."),
            ColumnDefinition::new("profile", ColumnType::Json, "Factor-specific attributes."),
            ColumnDefinition::new("embedded", ColumnType::Json, "Embedded resources of the factor."),
            ColumnDefinition::new("verify", ColumnType::Json, "Verification details of the factor."),
            ColumnDefinition::new("title", ColumnType::String, "Display title of the factor."),
        ])
        .with_list(
            ListSpec::new(
                USER_FACTORS,
                Arc::new(TaggedUnion::<FactorVariant>::new()),
                FACTOR_ERRORS,
            )
            .with_parent(users)
            .with_key_column(KeyColumn::optional("user_id")),
        )
        .with_get(GetSpec::new(
            USER_FACTOR,
            vec!["id", "user_id"],
            Arc::new(TaggedUnion::<FactorVariant>::new()),
            FACTOR_ERRORS,
        ))
        .with_enrichment(
            "user_name",
            Arc::new(LookupFieldTask::new(
                "factor_owner_login",
                USER_OF_FACTOR,
                "profile.login",
                ColumnType::String,
            )),
            USER_ERRORS,
        )
}
