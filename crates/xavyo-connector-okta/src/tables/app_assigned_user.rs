//! `okta_app_assigned_user`: users assigned to every application.

use std::sync::Arc;
use xavyo_query::prelude::*;

use crate::families::{ApplicationVariant, APPLICATION_ERRORS, APP_USER_ERRORS, APP_USER_FIELDS};

const APPS: EndpointTemplate = EndpointTemplate::new("/api/v1/apps");
const APP: EndpointTemplate = EndpointTemplate::new("/api/v1/apps/{id}");
const APP_USERS: EndpointTemplate = EndpointTemplate::new("/api/v1/apps/{app_id}/users");
const APP_USER: EndpointTemplate = EndpointTemplate::new("/api/v1/apps/{app_id}/users/{id}");

/// Okta serves at most this many assigned users per page.
const APP_USERS_MAX_PAGE: u64 = 500;

pub fn app_assigned_user() -> TableDefinition {
    let apps = ParentSpec::new(
        APPS,
        Arc::new(TaggedUnion::<ApplicationVariant>::new()),
        APPLICATION_ERRORS,
        "app_id",
    )
    .with_get(APP);

    TableDefinition::new("okta_app_assigned_user", "Users assigned to Okta applications.")
        .with_columns([
            ColumnDefinition::new("id", ColumnType::String, "Unique key of the application user."),
            ColumnDefinition::new("user_name", ColumnType::String, "User name of the application user."),
            ColumnDefinition::new("app_id", ColumnType::String, "Unique key of the application."),
            ColumnDefinition::new("created", ColumnType::Timestamp, "Timestamp when the user was assigned."),
            ColumnDefinition::new("status", ColumnType::String, "Status of the application user."),
            ColumnDefinition::new("email", ColumnType::String, "Email of the application user."),
            ColumnDefinition::new("external_id", ColumnType::String, "External ID of the application user."),
            ColumnDefinition::new("first_name", ColumnType::String, "First name of the application user."),
            ColumnDefinition::new("last_name", ColumnType::String, "Last name of the application user."),
            ColumnDefinition::new("last_sync", ColumnType::Timestamp, "Timestamp when the user was last synced."),
            ColumnDefinition::new("last_updated", ColumnType::Timestamp, "Timestamp when the assignment was last updated."),
            ColumnDefinition::new("password_changed", ColumnType::Timestamp, "Timestamp when the password was last changed."),
            ColumnDefinition::new("scope", ColumnType::String, "Scope of the assignment: USER or GROUP."),
            ColumnDefinition::new("status_changed", ColumnType::Timestamp, "Timestamp when the status last changed."),
            ColumnDefinition::new("sync_state", ColumnType::String, "Synchronization state of the application user."),
            ColumnDefinition::new("links", ColumnType::Json, "Links of the application user."),
            ColumnDefinition::new("profile", ColumnType::Json, "Application profile of the user."),
            ColumnDefinition::new("title", ColumnType::String, "Display title of the application user."),
        ])
        .with_list(
            ListSpec::new(
                APP_USERS,
                Arc::new(PlainResolver::new("app_user", APP_USER_FIELDS)),
                APP_USER_ERRORS,
            )
            .with_parent(apps)
            .with_key_column(KeyColumn::optional("app_id"))
            .with_key_column(KeyColumn::optional("user_name"))
            .with_key_column(KeyColumn::optional("first_name"))
            .with_key_column(KeyColumn::optional("email"))
            .with_pushdown("user_name", "q")
            .with_pushdown("first_name", "q")
            .with_pushdown("email", "q")
            .with_page_size("limit", APP_USERS_MAX_PAGE),
        )
        .with_get(GetSpec::new(
            APP_USER,
            vec!["id", "app_id"],
            Arc::new(PlainResolver::new("app_user", APP_USER_FIELDS)),
            APP_USER_ERRORS,
        ))
}
