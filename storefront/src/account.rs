//! Signup validation and the stored user profile.

use crate::storage::{keys, load_json, save_json};
use freshcart_core::environment::KeyValueStore;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Profile name shown when none is stored
pub const DEFAULT_NAME: &str = "User";

/// Profile email shown when none is stored
pub const DEFAULT_EMAIL: &str = "user@example.com";

/// A signup field that failed validation
///
/// The message is meant to be shown to the user as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email does not look like `local@domain.tld`
    #[error("Please enter a valid email address")]
    InvalidEmail,

    /// Phone does not have exactly ten digits
    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,

    /// Name shorter than two characters
    #[error("Please enter a valid name (at least 2 characters)")]
    InvalidName,
}

/// Data entered on the signup screen
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignupForm {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number, any formatting
    pub phone: String,
}

impl SignupForm {
    /// Form with the given fields
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    /// The phone number with formatting removed
    #[must_use]
    pub fn phone_digits(&self) -> String {
        self.phone.chars().filter(char::is_ascii_digit).collect()
    }

    /// Check email, then phone, then name
    ///
    /// # Errors
    ///
    /// Returns the first field that fails.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let email_ok = EMAIL
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(&self.email));
        if !email_ok {
            return Err(ValidationError::InvalidEmail);
        }

        if self.phone_digits().len() != 10 {
            return Err(ValidationError::InvalidPhone);
        }

        if self.name.trim().chars().count() < 2 {
            return Err(ValidationError::InvalidName);
        }

        Ok(())
    }
}

/// Validate `form` and store the user's details
///
/// Nothing is written when validation fails. Storage failures are logged
/// and do not fail the signup.
///
/// # Errors
///
/// Returns the [`ValidationError`] for the first invalid field.
pub fn register(form: &SignupForm, storage: &dyn KeyValueStore) -> Result<UserProfile, ValidationError> {
    form.validate()?;

    let name = form.name.trim();
    save_json(storage, keys::USER_NAME, name);
    save_json(storage, keys::USER_EMAIL, &form.email);
    save_json(storage, keys::USER_PHONE, &form.phone_digits());
    tracing::info!(email = %form.email, "User registered");

    Ok(UserProfile::load(storage))
}

/// What the profile screen shows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone digits, when stored
    pub phone: Option<String>,
    /// Number of stored orders
    pub order_count: usize,
    /// Number of saved addresses
    pub address_count: usize,
}

impl UserProfile {
    /// Read the profile, falling back to defaults for anything missing or unreadable
    #[must_use]
    pub fn load(storage: &dyn KeyValueStore) -> Self {
        let count = |key| {
            load_json::<Vec<serde_json::Value>>(storage, key).map_or(0, |items| items.len())
        };

        Self {
            name: load_json(storage, keys::USER_NAME).unwrap_or_else(|| DEFAULT_NAME.to_string()),
            email: load_json(storage, keys::USER_EMAIL).unwrap_or_else(|| DEFAULT_EMAIL.to_string()),
            phone: load_json(storage, keys::USER_PHONE),
            order_count: count(keys::USER_ORDERS),
            address_count: count(keys::USER_ADDRESSES),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use freshcart_testing::InMemoryStorage;

    #[test]
    fn email_is_checked_first() {
        let form = SignupForm::new("A", "not-an-email", "12");
        assert_eq!(form.validate(), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn phone_formatting_is_ignored() {
        let form = SignupForm::new("Asha", "asha@example.com", "(987) 654-3210");
        assert_eq!(form.validate(), Ok(()));
        assert_eq!(form.phone_digits(), "9876543210");

        let short = SignupForm::new("Asha", "asha@example.com", "98765");
        assert_eq!(short.validate(), Err(ValidationError::InvalidPhone));
    }

    #[test]
    fn name_is_trimmed() {
        let form = SignupForm::new("  A  ", "asha@example.com", "9876543210");
        assert_eq!(form.validate(), Err(ValidationError::InvalidName));
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            ValidationError::InvalidPhone.to_string(),
            "Please enter a valid 10-digit phone number"
        );
    }

    #[test]
    fn register_stores_details() {
        let storage = InMemoryStorage::new();
        let form = SignupForm::new(" Asha ", "asha@example.com", "98765 43210");

        let profile = register(&form, &storage).unwrap();

        assert_eq!(profile.name, "Asha");
        assert_eq!(profile.phone.as_deref(), Some("9876543210"));
        assert_eq!(storage.raw(keys::USER_EMAIL).as_deref(), Some("\"asha@example.com\""));
    }

    #[test]
    fn invalid_signup_writes_nothing() {
        let storage = InMemoryStorage::new();
        let form = SignupForm::new("Asha", "asha@example", "9876543210");

        assert_eq!(register(&form, &storage), Err(ValidationError::InvalidEmail));
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn profile_defaults_when_storage_fails() {
        let storage = InMemoryStorage::failing();

        let profile = UserProfile::load(&storage);

        assert_eq!(profile.name, DEFAULT_NAME);
        assert_eq!(profile.email, DEFAULT_EMAIL);
        assert_eq!(profile.order_count, 0);
    }

    #[test]
    fn profile_counts_orders_and_addresses() {
        let storage = InMemoryStorage::with_entries([
            (keys::USER_NAME, r#""Ravi""#),
            (keys::USER_ORDERS, r#"[{"id":"ORD1"},{"id":"ORD2"}]"#),
            (keys::USER_ADDRESSES, r#"["Home"]"#),
        ]);

        let profile = UserProfile::load(&storage);

        assert_eq!(profile.name, "Ravi");
        assert_eq!(profile.order_count, 2);
        assert_eq!(profile.address_count, 1);
    }
}
