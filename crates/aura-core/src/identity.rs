use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::products::string_or_number;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Stylist,
    Customer,
}

impl UserRole {
    /// Staff and admins may move trial requests through their lifecycle.
    #[must_use]
    pub fn can_manage_trials(self) -> bool {
        !matches!(self, UserRole::Customer)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Stylist => "stylist",
            UserRole::Customer => "customer",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            "stylist" => Ok(UserRole::Stylist),
            "customer" => Ok(UserRole::Customer),
            _ => Err(CoreError::UnknownVariant {
                kind: "role",
                value: s.to_owned(),
            }),
        }
    }
}

/// The signed-in user as resolved by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(alias = "full_name")]
    pub name: String,
    pub role: UserRole,
}

impl Session {
    #[must_use]
    pub fn customer_identity(&self) -> CustomerIdentity {
        CustomerIdentity {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIdentity {
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_customers_are_barred_from_managing_trials() {
        assert!(UserRole::Admin.can_manage_trials());
        assert!(UserRole::Manager.can_manage_trials());
        assert!(UserRole::Stylist.can_manage_trials());
        assert!(!UserRole::Customer.can_manage_trials());
    }

    #[test]
    fn role_round_trips_through_display_and_from_str() {
        for role in [
            UserRole::Admin,
            UserRole::Manager,
            UserRole::Stylist,
            UserRole::Customer,
        ] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn session_deserializes_and_exposes_identity() {
        let session: Session = serde_json::from_value(serde_json::json!({
            "id": "u-7",
            "email": "staff@auraselect.com",
            "name": "Mika",
            "role": "stylist"
        }))
        .expect("session should parse");
        assert_eq!(session.role, UserRole::Stylist);
        assert_eq!(session.customer_identity().email, "staff@auraselect.com");
    }

    #[test]
    fn session_accepts_numeric_id_and_full_name() {
        let session: Session = serde_json::from_value(serde_json::json!({
            "id": 12,
            "email": "owner@auraselect.com",
            "full_name": "Ren",
            "role": "admin"
        }))
        .expect("session should parse");
        assert_eq!(session.id, "12");
        assert_eq!(session.name, "Ren");
    }
}
