//! Polymorphic payload normalization
//!
//! Several resource families return tagged unions: a discriminator field
//! selects which other fields are meaningful. Each family declares a closed
//! [`Variant`] enum. Resolution is a pure function of the item and never
//! fails: an item that cannot be recognized becomes an explicit
//! [`UnknownVariant`] that the caller counts and skips.

use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

use crate::value::{ColumnType, ColumnValue, NormalizedRow, RawItem};

/// Column every resolved row carries.
pub const IDENTITY_COLUMN: &str = "id";

/// How one column is read from an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub column: &'static str,
    /// Dotted JSON path in the item.
    pub path: &'static str,
    pub kind: ColumnType,
    /// Absent fields become the type's zero value instead of null.
    pub or_default: bool,
}

impl FieldMapping {
    #[must_use]
    pub const fn new(column: &'static str, path: &'static str, kind: ColumnType) -> Self {
        Self {
            column,
            path,
            kind,
            or_default: false,
        }
    }

    #[must_use]
    pub const fn string(column: &'static str, path: &'static str) -> Self {
        Self::new(column, path, ColumnType::String)
    }

    #[must_use]
    pub const fn int(column: &'static str, path: &'static str) -> Self {
        Self::new(column, path, ColumnType::Int)
    }

    #[must_use]
    pub const fn bool(column: &'static str, path: &'static str) -> Self {
        Self::new(column, path, ColumnType::Bool)
    }

    #[must_use]
    pub const fn timestamp(column: &'static str, path: &'static str) -> Self {
        Self::new(column, path, ColumnType::Timestamp)
    }

    #[must_use]
    pub const fn json(column: &'static str, path: &'static str) -> Self {
        Self::new(column, path, ColumnType::Json)
    }

    /// Use the type's zero value when the field is absent.
    #[must_use]
    pub const fn or_default(mut self) -> Self {
        self.or_default = true;
        self
    }

    /// Read the column from an item.
    #[must_use]
    pub fn extract(&self, item: &RawItem) -> ColumnValue {
        let value = item.column_value(self.path, self.kind);
        if value.is_null() && self.or_default {
            self.kind.zero()
        } else {
            value
        }
    }

    fn apply(mappings: &[FieldMapping], item: &RawItem, row: &mut NormalizedRow) {
        for mapping in mappings {
            row.set(mapping.column, mapping.extract(item));
        }
    }
}

/// Why an item could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReason {
    /// The discriminator field is absent or not a string.
    MissingDiscriminant,
    /// The discriminator names a variant this family does not declare.
    UndeclaredTag,
    /// The item has no non-empty identity.
    MissingIdentity,
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::MissingDiscriminant => write!(f, "missing discriminant"),
            UnknownReason::UndeclaredTag => write!(f, "undeclared tag"),
            UnknownReason::MissingIdentity => write!(f, "missing identity"),
        }
    }
}

/// Sentinel for an item that carries no usable row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownVariant {
    pub family: &'static str,
    pub tag: Option<String>,
    pub reason: UnknownReason,
}

/// Outcome of resolving one item.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A recognized item. `tag` is `None` for families without variants.
    Known {
        tag: Option<&'static str>,
        row: NormalizedRow,
    },
    Unknown(UnknownVariant),
}

impl Resolution {
    /// The row of a recognized item.
    #[must_use]
    pub fn into_row(self) -> Option<NormalizedRow> {
        match self {
            Resolution::Known { row, .. } => Some(row),
            Resolution::Unknown(_) => None,
        }
    }

    /// Check if the item was recognized.
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Resolution::Known { .. })
    }
}

/// Turns raw items of one family into rows.
pub trait UnionResolver: Send + Sync {
    /// Family name, used in logs.
    fn family(&self) -> &'static str;

    /// Resolve an item. Pure and total.
    fn resolve(&self, item: &RawItem) -> Resolution;
}

/// One closed set of variants of a polymorphic family.
pub trait Variant: Copy + Eq + Send + Sync + 'static {
    /// Family name.
    const FAMILY: &'static str;
    /// Dotted path of the discriminator field.
    const DISCRIMINANT: &'static str;

    /// Every declared variant.
    fn all() -> &'static [Self];

    /// Wire tag of this variant.
    fn tag(self) -> &'static str;

    /// Columns shared by every variant.
    fn common_fields() -> &'static [FieldMapping];

    /// Columns specific to this variant.
    fn fields(self) -> &'static [FieldMapping];

    /// Look up a declared variant by wire tag.
    fn from_tag(tag: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.tag() == tag)
    }
}

fn identity(item: &RawItem) -> Option<String> {
    item.get::<String>(IDENTITY_COLUMN).filter(|id| !id.is_empty())
}

/// Resolver for a family described by a [`Variant`] enum.
pub struct TaggedUnion<V>(PhantomData<fn() -> V>);

impl<V: Variant> TaggedUnion<V> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V: Variant> Default for TaggedUnion<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Variant> fmt::Debug for TaggedUnion<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaggedUnion").field(&V::FAMILY).finish()
    }
}

impl<V: Variant> UnionResolver for TaggedUnion<V> {
    fn family(&self) -> &'static str {
        V::FAMILY
    }

    fn resolve(&self, item: &RawItem) -> Resolution {
        let unknown = |tag: Option<String>, reason| {
            Resolution::Unknown(UnknownVariant {
                family: V::FAMILY,
                tag,
                reason,
            })
        };

        let Some(tag) = item.get::<String>(V::DISCRIMINANT) else {
            return unknown(None, UnknownReason::MissingDiscriminant);
        };
        let Some(variant) = V::from_tag(&tag) else {
            return unknown(Some(tag), UnknownReason::UndeclaredTag);
        };
        let Some(id) = identity(item) else {
            return unknown(Some(tag), UnknownReason::MissingIdentity);
        };

        let mut row = NormalizedRow::new().with(IDENTITY_COLUMN, id);
        FieldMapping::apply(V::common_fields(), item, &mut row);
        FieldMapping::apply(variant.fields(), item, &mut row);

        Resolution::Known {
            tag: Some(variant.tag()),
            row,
        }
    }
}

/// Resolver for a family without variants.
#[derive(Debug, Clone, Copy)]
pub struct PlainResolver {
    family: &'static str,
    fields: &'static [FieldMapping],
}

impl PlainResolver {
    #[must_use]
    pub const fn new(family: &'static str, fields: &'static [FieldMapping]) -> Self {
        Self { family, fields }
    }
}

impl UnionResolver for PlainResolver {
    fn family(&self) -> &'static str {
        self.family
    }

    fn resolve(&self, item: &RawItem) -> Resolution {
        let Some(id) = identity(item) else {
            return Resolution::Unknown(UnknownVariant {
                family: self.family,
                tag: None,
                reason: UnknownReason::MissingIdentity,
            });
        };

        let mut row = NormalizedRow::new().with(IDENTITY_COLUMN, id);
        FieldMapping::apply(self.fields, item, &mut row);
        Resolution::Known { tag: None, row }
    }
}
