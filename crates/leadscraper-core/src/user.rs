//! User accounts and the business details attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::UserId;

/// Longest accepted username (e-mail address).
pub const MAX_USERNAME_LEN: usize = 254;

/// A registered user.
///
/// The username is the user's e-mail address, stored lowercased. The credit
/// balance starts at zero and never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user ID.
    pub id: UserId,

    /// Login name (normalized e-mail address).
    pub username: String,

    /// Argon2 PHC hash of the password.
    pub password_hash: String,

    /// Current credit balance.
    pub credits: i64,

    /// Stripe customer ID, once one was created.
    pub stripe_customer_id: Option<String>,

    /// Company details submitted during onboarding.
    pub business_info: Option<BusinessInfo>,

    /// When the user registered.
    pub created_at: DateTime<Utc>,

    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a zero balance.
    #[must_use]
    pub fn new(username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            username,
            password_hash,
            credits: 0,
            stripe_customer_id: None,
            business_info: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the user can pay for `amount` credits.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.credits >= amount
    }
}

/// Normalize and validate a username.
///
/// Usernames are e-mail addresses; they are trimmed and lowercased so that
/// lookups are case-insensitive.
///
/// # Errors
///
/// Returns `CoreError::EmptyField`, `CoreError::TooLong` or
/// `CoreError::InvalidEmail` when the input is unusable.
pub fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();

    if username.is_empty() {
        return Err(CoreError::EmptyField { field: "username" });
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(CoreError::TooLong {
            field: "username",
            max: MAX_USERNAME_LEN,
        });
    }

    let Some((local, domain)) = username.split_once('@') else {
        return Err(CoreError::InvalidEmail(username));
    };

    let valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !username.chars().any(char::is_whitespace);

    if valid {
        Ok(username)
    } else {
        Err(CoreError::InvalidEmail(username))
    }
}

/// Company details a customer provides before buying credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    /// Registered company name.
    pub company_name: String,
    /// Contact person.
    pub contact_name: String,
    /// Street and house number.
    pub street: String,
    /// Postal code.
    pub postal_code: String,
    /// City.
    pub city: String,
    /// Country (ISO code or name).
    pub country: String,
    /// VAT identification number.
    #[serde(default)]
    pub vat_id: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

impl BusinessInfo {
    /// Validate required fields, returning a trimmed copy.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyField` for the first blank required field.
    pub fn validated(&self) -> Result<Self> {
        let required = |value: &str, field: &'static str| {
            let value = value.trim();
            if value.is_empty() {
                Err(CoreError::EmptyField { field })
            } else {
                Ok(value.to_string())
            }
        };
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Ok(Self {
            company_name: required(&self.company_name, "companyName")?,
            contact_name: required(&self.contact_name, "contactName")?,
            street: required(&self.street, "street")?,
            postal_code: required(&self.postal_code, "postalCode")?,
            city: required(&self.city, "city")?,
            country: required(&self.country, "country")?,
            vat_id: optional(&self.vat_id),
            phone: optional(&self.phone),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_starts_without_credits() {
        let user = User::new("a@b.de".into(), "hash".into());
        assert_eq!(user.credits, 0);
        assert!(user.stripe_customer_id.is_none());
        assert!(!user.has_sufficient_credits(1));
    }

    #[test]
    fn usernames_are_lowercased_and_trimmed() {
        assert_eq!(normalize_username("  Max@Example.DE ").unwrap(), "max@example.de");
    }

    #[test]
    fn malformed_usernames_are_rejected() {
        for raw in ["", "plain", "@b.de", "a@b", "a@.de", "a@b.", "a b@c.de", "a@b@c.de"] {
            assert!(normalize_username(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn business_info_requires_company_name() {
        let info = BusinessInfo {
            company_name: "  ".into(),
            contact_name: "Erika".into(),
            street: "Hauptstr. 5".into(),
            postal_code: "10115".into(),
            city: "Berlin".into(),
            country: "DE".into(),
            vat_id: Some(String::new()),
            phone: None,
        };
        assert!(matches!(
            info.validated(),
            Err(CoreError::EmptyField {
                field: "companyName"
            })
        ));

        let fixed = BusinessInfo {
            company_name: " ACME GmbH ".into(),
            ..info
        }
        .validated()
        .unwrap();
        assert_eq!(fixed.company_name, "ACME GmbH");
        assert_eq!(fixed.vat_id, None);
    }
}
