//! Okta table catalog.

mod app_assigned_user;
mod factor;
mod policy;

pub use app_assigned_user::app_assigned_user;
pub use factor::factor;
pub use policy::{mfa_policy, password_policy, signon_policy};

use xavyo_query::{QueryError, QueryResult};
use xavyo_query::prelude::TableDefinition;

/// Every table this connector serves.
pub fn catalog() -> Vec<TableDefinition> {
    vec![
        app_assigned_user(),
        factor(),
        mfa_policy(),
        password_policy(),
        signon_policy(),
    ]
}

/// Look up a table by name.
///
/// # Errors
///
/// Returns `UnknownTable` if no table has this name.
pub fn table(name: &str) -> QueryResult<TableDefinition> {
    catalog()
        .into_iter()
        .find(|table| table.name == name)
        .ok_or_else(|| QueryError::UnknownTable {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_tables_are_valid() {
        let tables = catalog();
        assert_eq!(tables.len(), 5);
        for table in &tables {
            table.validate().unwrap();
            assert!(table.column("id").is_some(), "{}", table.name);
            assert!(table.column("title").is_some(), "{}", table.name);
        }
    }

    #[test]
    fn test_table_lookup() {
        assert_eq!(table("okta_factor").unwrap().name, "okta_factor");

        let err = table("okta_user").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_TABLE");
    }

    #[test]
    fn test_policy_tables_filter_by_type() {
        let table = password_policy();
        let list = table.list.as_ref().unwrap();
        assert_eq!(list.static_params, vec![("type", "PASSWORD")]);
        assert!(table.column("settings").is_some());
        assert!(signon_policy().column("settings").is_none());
    }
}
