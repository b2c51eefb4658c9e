//! Core identifier and ordering types for family-cookbook

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Defines a UUID-backed identifier with the conversions the database layer needs.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the inner UUID
            pub fn get(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <Uuid as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <Uuid as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let id = <Uuid as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a user account
    UserId
);
uuid_id!(
    /// Unique identifier for a recipe
    RecipeId
);
uuid_id!(
    /// Unique identifier for a category
    CategoryId
);
uuid_id!(
    /// Unique identifier for a stored ingredient row
    IngredientId
);
uuid_id!(
    /// Unique identifier for a note on a recipe
    NoteId
);

/// Account role
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular family member
    #[default]
    User,
    /// May manage categories and profiles
    Admin,
}

/// Title ordering for recipe listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// A to Z
    #[default]
    Asc,
    /// Z to A
    Desc,
}

impl SortOrder {
    /// Parse a `?sort=` query value; anything unrecognized falls back to ascending
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Ordering for the recently-viewed list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewOrder {
    /// Most recently viewed first
    #[default]
    Newest,
    /// Least recently viewed first
    Oldest,
}

impl ViewOrder {
    /// Parse a `?sort=` query value; anything unrecognized falls back to newest first
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("oldest") => ViewOrder::Oldest,
            _ => ViewOrder::Newest,
        }
    }

    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            ViewOrder::Newest => "DESC",
            ViewOrder::Oldest => "ASC",
        }
    }
}

/// Current time as Unix milliseconds, the unit every stored timestamp uses
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
