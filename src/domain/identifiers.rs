//! Patient identifiers supplied alongside a source text
//!
//! Identifiers are ephemeral input: the core only reads them to build an
//! anonymization map and never persists them directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Known identifiers of the patient a session text is about
///
/// Every field is optional; absent identifiers are simply skipped by the
/// anonymizer. The `Debug` implementation reports which fields are present,
/// never their values.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentifiers {
    /// Full name as written in the record (e.g. "Иванов Петр")
    #[serde(default)]
    pub name: Option<String>,

    /// Email address
    #[serde(default)]
    pub email: Option<String>,

    /// Phone number as written in the record
    #[serde(default)]
    pub phone: Option<String>,

    /// Postal address
    #[serde(default)]
    pub address: Option<String>,

    /// Date of birth as written in the record
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

impl PatientIdentifiers {
    /// Creates identifiers with only a name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Sets the email address
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the phone number
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the postal address
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the date of birth
    pub fn date_of_birth(mut self, dob: impl Into<String>) -> Self {
        self.date_of_birth = Some(dob.into());
        self
    }

    /// True when no identifier carries a non-blank value
    pub fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.email,
            &self.phone,
            &self.address,
            &self.date_of_birth,
        ]
        .iter()
        .all(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

impl fmt::Debug for PatientIdentifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |v: &Option<String>| if v.is_some() { "[REDACTED]" } else { "None" };
        f.debug_struct("PatientIdentifiers")
            .field("name", &mark(&self.name))
            .field("email", &mark(&self.email))
            .field("phone", &mark(&self.phone))
            .field("address", &mark(&self.address))
            .field("date_of_birth", &mark(&self.date_of_birth))
            .finish()
    }
}
