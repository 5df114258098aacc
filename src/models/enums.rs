//! Shared domain enums, stored as lowercase TEXT columns

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Declares a lowercase string enum with serde, utoipa and sqlx (TEXT) support.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// Account role, drives every capability check
    Role {
        Admin => "admin",
        Librarian => "librarian",
        Member => "member",
    }
}

text_enum! {
    MembershipStatus {
        Active => "active",
        Suspended => "suspended",
        Expired => "expired",
    }
}

text_enum! {
    /// Stored loan state. Overdue is derived, see `Loan::is_overdue`.
    LoanStatus {
        Issued => "issued",
        Returned => "returned",
    }
}

text_enum! {
    FineStatus {
        Pending => "pending",
        Paid => "paid",
        Waived => "waived",
    }
}

text_enum! {
    ReservationStatus {
        Waiting => "waiting",
        Available => "available",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
    }
}

impl Role {
    /// Admins and librarians run the circulation desk
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Librarian)
    }
}

impl ReservationStatus {
    /// Waiting and Available reservations still hold a place in the queue
    pub fn is_open(&self) -> bool {
        matches!(self, ReservationStatus::Waiting | ReservationStatus::Available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Librarian".parse::<Role>().unwrap(), Role::Librarian);
        assert_eq!("ISSUED".parse::<LoanStatus>().unwrap(), LoanStatus::Issued);
        assert!("overdue".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&FineStatus::Waived).unwrap();
        assert_eq!(json, "\"waived\"");
        let status: ReservationStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, ReservationStatus::Cancelled);
    }

    #[test]
    fn test_role_and_reservation_helpers() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Librarian.is_staff());
        assert!(!Role::Member.is_staff());
        assert!(ReservationStatus::Waiting.is_open());
        assert!(!ReservationStatus::Fulfilled.is_open());
    }
}
