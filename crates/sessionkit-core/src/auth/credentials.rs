use std::collections::BTreeMap;
use std::fmt;

use validator::ValidateEmail;

/// Raw form input, before validation.
#[derive(Clone, Default)]
pub struct CredentialInput {
    pub email: String,
    pub password: String,
    pub remember: Option<bool>,
}

/// Credentials that passed validation. Only `validate` builds these.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub remember: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("remember", &self.remember)
            .finish()
    }
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("remember", &self.remember)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Email,
    Password,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Password => "password",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    EmailRequired,
    EmailInvalid,
    PasswordRequired,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmailRequired => "email-required",
            ErrorCode::EmailInvalid => "email-invalid",
            ErrorCode::PasswordRequired => "password-required",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::EmailRequired => "Email is required",
            ErrorCode::EmailInvalid => "Enter a valid email address",
            ErrorCode::PasswordRequired => "Password is required",
        }
    }
}

/// Per-field validation failures, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<Field, ErrorCode>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<ErrorCode> {
        self.fields.get(&field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, ErrorCode)> + '_ {
        self.fields.iter().map(|(field, code)| (*field, *code))
    }

    fn insert(&mut self, field: Field, code: ErrorCode) {
        self.fields.insert(field, code);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, code)| format!("{}: {}", field.name(), code.message()))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn check_email(email: &str) -> Option<ErrorCode> {
    if email.is_empty() {
        Some(ErrorCode::EmailRequired)
    } else if !email.to_string().validate_email() {
        Some(ErrorCode::EmailInvalid)
    } else {
        None
    }
}

fn check_password(password: &str) -> Option<ErrorCode> {
    password.is_empty().then_some(ErrorCode::PasswordRequired)
}

/// Validate raw input, collecting errors for every failing field.
pub fn validate(input: &CredentialInput) -> Result<Credentials, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(code) = check_email(&input.email) {
        errors.insert(Field::Email, code);
    }
    if let Some(code) = check_password(&input.password) {
        errors.insert(Field::Password, code);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Credentials {
        email: input.email.clone(),
        password: input.password.clone(),
        remember: input.remember.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str, password: &str) -> CredentialInput {
        CredentialInput {
            email: email.to_string(),
            password: password.to_string(),
            remember: None,
        }
    }

    #[test]
    fn test_valid_input() {
        let creds = validate(&CredentialInput {
            remember: Some(true),
            ..input("a@b.com", "x")
        })
        .unwrap();
        assert_eq!(creds.email, "a@b.com");
        assert_eq!(creds.password, "x");
        assert!(creds.remember);
    }

    #[test]
    fn test_remember_defaults_to_false() {
        let creds = validate(&input("a@b.com", "x")).unwrap();
        assert!(!creds.remember);
    }

    #[test]
    fn test_invalid_email_format() {
        for bad in ["bad", "a@", "@b.com", "a b@c.com"] {
            let errors = validate(&input(bad, "x")).unwrap_err();
            assert_eq!(errors.get(Field::Email), Some(ErrorCode::EmailInvalid), "{bad}");
            assert_eq!(errors.get(Field::Password), None);
        }
    }

    #[test]
    fn test_missing_email_is_distinct_from_invalid() {
        let errors = validate(&input("", "x")).unwrap_err();
        assert_eq!(errors.get(Field::Email), Some(ErrorCode::EmailRequired));
    }

    #[test]
    fn test_missing_password() {
        let errors = validate(&input("a@b.com", "")).unwrap_err();
        assert_eq!(errors.get(Field::Password), Some(ErrorCode::PasswordRequired));
        assert_eq!(errors.get(Field::Email), None);
    }

    #[test]
    fn test_errors_collected_for_all_fields() {
        let errors = validate(&input("", "")).unwrap_err();
        assert_eq!(errors.iter().count(), 2);
        assert_eq!(
            errors.to_string(),
            "email: Email is required; password: Password is required"
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = validate(&input("a@b.com", "hunter2")).unwrap();
        assert!(!format!("{:?}", creds).contains("hunter2"));
        assert!(!format!("{:?}", input("a@b.com", "hunter2")).contains("hunter2"));
    }
}
