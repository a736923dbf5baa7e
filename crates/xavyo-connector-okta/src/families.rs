//! Okta resource families.
//!
//! Polymorphic payloads (policies, factors, applications) are closed
//! [`Variant`] enums keyed by their discriminator; anything else is reported
//! as an unknown variant by the engine. Each family also declares which API
//! errors mean "does not exist".

use xavyo_query::prelude::*;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Policy type, discriminated by `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyVariant {
    OktaSignOn,
    Password,
    MfaEnroll,
    AccessPolicy,
    IdpDiscovery,
}

const POLICY_COMMON: &[FieldMapping] = &[
    FieldMapping::string("name", "name"),
    FieldMapping::string("description", "description"),
    FieldMapping::timestamp("created", "created"),
    FieldMapping::timestamp("last_updated", "lastUpdated"),
    FieldMapping::int("priority", "priority"),
    FieldMapping::string("status", "status"),
    FieldMapping::bool("system", "system").or_default(),
    FieldMapping::string("type", "type"),
    FieldMapping::json("conditions", "conditions"),
    FieldMapping::string("title", "name"),
];

const POLICY_SETTINGS: &[FieldMapping] = &[FieldMapping::json("settings", "settings")];

impl Variant for PolicyVariant {
    const FAMILY: &'static str = "policy";
    const DISCRIMINANT: &'static str = "type";

    fn all() -> &'static [Self] {
        &[
            PolicyVariant::OktaSignOn,
            PolicyVariant::Password,
            PolicyVariant::MfaEnroll,
            PolicyVariant::AccessPolicy,
            PolicyVariant::IdpDiscovery,
        ]
    }

    fn tag(self) -> &'static str {
        match self {
            PolicyVariant::OktaSignOn => "OKTA_SIGN_ON",
            PolicyVariant::Password => "PASSWORD",
            PolicyVariant::MfaEnroll => "MFA_ENROLL",
            PolicyVariant::AccessPolicy => "ACCESS_POLICY",
            PolicyVariant::IdpDiscovery => "IDP_DISCOVERY",
        }
    }

    fn common_fields() -> &'static [FieldMapping] {
        POLICY_COMMON
    }

    fn fields(self) -> &'static [FieldMapping] {
        match self {
            PolicyVariant::Password | PolicyVariant::MfaEnroll => POLICY_SETTINGS,
            PolicyVariant::OktaSignOn | PolicyVariant::AccessPolicy | PolicyVariant::IdpDiscovery => {
                &[]
            }
        }
    }
}

/// Policy list and rule errors are never swallowed.
pub const POLICY_ERRORS: ErrorTable = ErrorTable::new("policy", &[]);

/// A policy without mappings may answer with a not-found error.
pub const POLICY_MAPPING_ERRORS: ErrorTable = ErrorTable::new(
    "policy_mapping",
    &[
        IgnoreRule::Status(404),
        IgnoreRule::MessageContainsIgnoreCase("not found"),
        IgnoreRule::MessageContains("404"),
    ],
);

// ---------------------------------------------------------------------------
// Users and factors
// ---------------------------------------------------------------------------

/// Columns read from a user when it is the parent of a factor.
pub const USER_FIELDS: &[FieldMapping] = &[
    FieldMapping::string("login", "profile.login"),
    FieldMapping::string("status", "status"),
];

pub const USER_ERRORS: ErrorTable = ErrorTable::new(
    "user",
    &[IgnoreRule::Status(404), IgnoreRule::MessageContains("Not found")],
);

/// Factor type, discriminated by `factorType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorVariant {
    Call,
    Email,
    Push,
    Sms,
    Question,
    Token,
    TokenHardware,
    TokenHotp,
    TokenSoftwareTotp,
    U2f,
    Web,
    Webauthn,
    SignedNonce,
}

const FACTOR_COMMON: &[FieldMapping] = &[
    FieldMapping::string("factor_type", "factorType"),
    FieldMapping::timestamp("created", "created"),
    FieldMapping::timestamp("last_updated", "lastUpdated"),
    FieldMapping::string("provider", "provider"),
    FieldMapping::string("status", "status"),
    FieldMapping::json("embedded", "_embedded"),
    FieldMapping::json("verify", "verify"),
    FieldMapping::string("title", "id"),
];

const FACTOR_PROFILE: &[FieldMapping] = &[FieldMapping::json("profile", "profile")];

impl Variant for FactorVariant {
    const FAMILY: &'static str = "factor";
    const DISCRIMINANT: &'static str = "factorType";

    fn all() -> &'static [Self] {
        &[
            FactorVariant::Call,
            FactorVariant::Email,
            FactorVariant::Push,
            FactorVariant::Sms,
            FactorVariant::Question,
            FactorVariant::Token,
            FactorVariant::TokenHardware,
            FactorVariant::TokenHotp,
            FactorVariant::TokenSoftwareTotp,
            FactorVariant::U2f,
            FactorVariant::Web,
            FactorVariant::Webauthn,
            FactorVariant::SignedNonce,
        ]
    }

    fn tag(self) -> &'static str {
        match self {
            FactorVariant::Call => "call",
            FactorVariant::Email => "email",
            FactorVariant::Push => "push",
            FactorVariant::Sms => "sms",
            FactorVariant::Question => "question",
            FactorVariant::Token => "token",
            FactorVariant::TokenHardware => "token:hardware",
            FactorVariant::TokenHotp => "token:hotp",
            FactorVariant::TokenSoftwareTotp => "token:software:totp",
            FactorVariant::U2f => "u2f",
            FactorVariant::Web => "web",
            FactorVariant::Webauthn => "webauthn",
            FactorVariant::SignedNonce => "signed_nonce",
        }
    }

    fn common_fields() -> &'static [FieldMapping] {
        FACTOR_COMMON
    }

    // signed_nonce (Okta FastPass) carries no enrollment profile
    fn fields(self) -> &'static [FieldMapping] {
        match self {
            FactorVariant::SignedNonce => &[],
            _ => FACTOR_PROFILE,
        }
    }
}

pub const FACTOR_ERRORS: ErrorTable = ErrorTable::new(
    "factor",
    &[
        IgnoreRule::Status(404),
        IgnoreRule::MessageContains("Not found"),
        IgnoreRule::MessageContains("Invalid Factor"),
    ],
);

// ---------------------------------------------------------------------------
// Applications and their users
// ---------------------------------------------------------------------------

/// Application sign-on mode, discriminated by `signOnMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationVariant {
    AutoLogin,
    BasicAuth,
    Bookmark,
    BrowserPlugin,
    OpenIdConnect,
    Saml11,
    Saml20,
    SecurePasswordStore,
    WsFederation,
}

const APPLICATION_COMMON: &[FieldMapping] = &[
    FieldMapping::string("name", "name"),
    FieldMapping::string("label", "label"),
    FieldMapping::string("status", "status"),
    FieldMapping::string("sign_on_mode", "signOnMode"),
];

impl Variant for ApplicationVariant {
    const FAMILY: &'static str = "application";
    const DISCRIMINANT: &'static str = "signOnMode";

    fn all() -> &'static [Self] {
        &[
            ApplicationVariant::AutoLogin,
            ApplicationVariant::BasicAuth,
            ApplicationVariant::Bookmark,
            ApplicationVariant::BrowserPlugin,
            ApplicationVariant::OpenIdConnect,
            ApplicationVariant::Saml11,
            ApplicationVariant::Saml20,
            ApplicationVariant::SecurePasswordStore,
            ApplicationVariant::WsFederation,
        ]
    }

    fn tag(self) -> &'static str {
        match self {
            ApplicationVariant::AutoLogin => "AUTO_LOGIN",
            ApplicationVariant::BasicAuth => "BASIC_AUTH",
            ApplicationVariant::Bookmark => "BOOKMARK",
            ApplicationVariant::BrowserPlugin => "BROWSER_PLUGIN",
            ApplicationVariant::OpenIdConnect => "OPENID_CONNECT",
            ApplicationVariant::Saml11 => "SAML_1_1",
            ApplicationVariant::Saml20 => "SAML_2_0",
            ApplicationVariant::SecurePasswordStore => "SECURE_PASSWORD_STORE",
            ApplicationVariant::WsFederation => "WS_FEDERATION",
        }
    }

    fn common_fields() -> &'static [FieldMapping] {
        APPLICATION_COMMON
    }

    fn fields(self) -> &'static [FieldMapping] {
        &[]
    }
}

pub const APPLICATION_ERRORS: ErrorTable = ErrorTable::new(
    "application",
    &[IgnoreRule::Status(404), IgnoreRule::MessageContains("Not found")],
);

/// Columns of a user assigned to an application.
pub const APP_USER_FIELDS: &[FieldMapping] = &[
    FieldMapping::string("user_name", "credentials.userName"),
    FieldMapping::timestamp("created", "created"),
    FieldMapping::string("status", "status"),
    FieldMapping::string("email", "profile.email"),
    FieldMapping::string("external_id", "externalId"),
    FieldMapping::string("first_name", "profile.given_name"),
    FieldMapping::string("last_name", "profile.family_name"),
    FieldMapping::timestamp("last_sync", "lastSync"),
    FieldMapping::timestamp("last_updated", "lastUpdated"),
    FieldMapping::timestamp("password_changed", "passwordChanged"),
    FieldMapping::string("scope", "scope"),
    FieldMapping::timestamp("status_changed", "statusChanged"),
    FieldMapping::string("sync_state", "syncState"),
    FieldMapping::json("links", "_links"),
    FieldMapping::json("profile", "profile"),
    FieldMapping::string("title", "id"),
];

pub const APP_USER_ERRORS: ErrorTable = ErrorTable::new(
    "app_user",
    &[IgnoreRule::Status(404), IgnoreRule::MessageContains("Not found")],
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve<V: Variant>(value: serde_json::Value) -> Resolution {
        TaggedUnion::<V>::new().resolve(&RawItem::new(value))
    }

    #[test]
    fn test_tags_round_trip() {
        for variant in PolicyVariant::all() {
            assert_eq!(PolicyVariant::from_tag(variant.tag()), Some(*variant));
        }
        for variant in FactorVariant::all() {
            assert_eq!(FactorVariant::from_tag(variant.tag()), Some(*variant));
        }
        for variant in ApplicationVariant::all() {
            assert_eq!(ApplicationVariant::from_tag(variant.tag()), Some(*variant));
        }
    }

    #[test]
    fn test_password_policy_resolves_settings() {
        let resolution = resolve::<PolicyVariant>(json!({
            "id": "00p1",
            "type": "PASSWORD",
            "name": "Default Policy",
            "priority": 1,
            "created": "2024-01-15T10:30:00.000Z",
            "settings": {"password": {"complexity": {"minLength": 8}}}
        }));

        let Resolution::Known { tag, row } = resolution else {
            panic!("expected a known policy");
        };
        assert_eq!(tag, Some("PASSWORD"));
        assert_eq!(row.get_str("title"), Some("Default Policy"));
        assert_eq!(row.get("priority"), Some(&ColumnValue::Int(1)));
        assert_eq!(row.get("system"), Some(&ColumnValue::Bool(false)));
        assert!(matches!(row.get("created"), Some(ColumnValue::Timestamp(_))));
        assert!(matches!(row.get("settings"), Some(ColumnValue::Json(_))));
    }

    #[test]
    fn test_sign_on_policy_has_no_settings_column() {
        let row = resolve::<PolicyVariant>(json!({
            "id": "00p2",
            "type": "OKTA_SIGN_ON",
            "name": "Default",
            "settings": {"ignored": true}
        }))
        .into_row()
        .unwrap();
        assert!(row.get("settings").is_none());
    }

    #[test]
    fn test_unknown_policy_type() {
        let Resolution::Unknown(unknown) = resolve::<PolicyVariant>(json!({
            "id": "00p3",
            "type": "ENTITY_RISK"
        })) else {
            panic!("expected an unknown variant");
        };
        assert_eq!(unknown.family, "policy");
        assert_eq!(unknown.tag.as_deref(), Some("ENTITY_RISK"));
        assert_eq!(unknown.reason, UnknownReason::UndeclaredTag);
    }

    #[test]
    fn test_factor_profile_by_variant() {
        let sms = resolve::<FactorVariant>(json!({
            "id": "sms1",
            "factorType": "sms",
            "provider": "OKTA",
            "profile": {"phoneNumber": "+15555550100"}
        }))
        .into_row()
        .unwrap();
        assert_eq!(sms.get_str("title"), Some("sms1"));
        assert!(sms.get("profile").is_some());

        let fastpass = resolve::<FactorVariant>(json!({
            "id": "sn1",
            "factorType": "signed_nonce",
            "profile": {"device": "x"}
        }))
        .into_row()
        .unwrap();
        assert!(fastpass.get("profile").is_none());
    }

    #[test]
    fn test_error_tables() {
        let not_found = QueryError::api(
            Some(404),
            Some("E0000007".to_string()),
            "Not found: Resource not found: 00ux (User)",
        );
        assert!(USER_ERRORS.classify(&not_found).is_ignorable());
        assert!(FACTOR_ERRORS.classify(&not_found).is_ignorable());
        assert!(!POLICY_ERRORS.classify(&not_found).is_ignorable());

        let invalid = QueryError::api(Some(400), None, "Invalid Factor");
        assert!(FACTOR_ERRORS.classify(&invalid).is_ignorable());
        assert!(!USER_ERRORS.classify(&invalid).is_ignorable());

        let mapping = QueryError::status_only(404, "404 Not Found");
        assert!(POLICY_MAPPING_ERRORS.classify(&mapping).is_ignorable());

        let bare = QueryError::status_only(404, "404 Not Found");
        for table in [USER_ERRORS, FACTOR_ERRORS, APPLICATION_ERRORS, APP_USER_ERRORS] {
            assert!(table.classify(&bare).is_ignorable(), "{}", table.family());
        }

        let forbidden = QueryError::status_only(403, "Forbidden");
        assert!(!POLICY_MAPPING_ERRORS.classify(&forbidden).is_ignorable());
    }
}
