//! The form completing a sign-up when the provider did not supply enough data.

use crate::error::Error;
use crate::store::{NewUser, UserStore};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_EMAIL_LENGTH: usize = 75;
const MAX_NAME_LENGTH: usize = 30;

/// Submitted or pre-filled values. Also the payload of the temporary setup cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct SetupInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

/// Everything a client needs to render the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupForm {
    pub fields: Vec<&'static str>,
    pub values: SetupInput,
    pub errors: FieldErrors,
}

impl SetupForm {
    pub fn new(values: SetupInput, errors: FieldErrors, email_is_username: bool) -> Self {
        let fields = if email_is_username {
            vec!["email", "first_name", "last_name"]
        } else {
            vec!["username", "email", "first_name", "last_name"]
        };

        Self {
            fields,
            values,
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl SetupInput {
    fn trimmed(&self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            username: self.username.trim().to_string(),
        }
    }

    /// The user to create from valid input.
    pub fn into_new_user(self, email_is_username: bool) -> NewUser {
        let input = self.trimmed();
        NewUser {
            username: if email_is_username {
                input.email.clone()
            } else {
                input.username
            },
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
        }
    }
}

/// A provider-supplied name cut down to what the form and the `users` table accept.
pub fn clip_name(value: &str) -> String {
    value.trim().chars().take(MAX_NAME_LENGTH).collect()
}

/// Whether a provider-supplied email fits the `users.email` column.
pub fn is_storable_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.chars().count() <= MAX_EMAIL_LENGTH
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || "@.+-_".contains(c)
}

/// Collects the errors of each field; an empty map means the input is valid.
pub async fn validate<S: UserStore + ?Sized>(
    store: &S,
    input: &SetupInput,
    email_is_username: bool,
) -> Result<FieldErrors, Error> {
    let input = input.trimmed();
    let mut errors = FieldErrors::new();
    let mut add = |field: &'static str, message: &str| {
        errors.entry(field).or_default().push(message.to_string());
    };

    if input.email.is_empty() {
        if email_is_username {
            add("email", "This field is required.");
        }
    } else if input.email.chars().count() > MAX_EMAIL_LENGTH {
        add("email", "Ensure this value has at most 75 characters.");
    } else if !EmailAddress::is_valid(&input.email) {
        add("email", "Enter a valid email address.");
    } else if store.find_user_by_email(&input.email).await?.is_some() {
        add("email", "This email is already in use.");
    }

    if !email_is_username {
        if input.username.is_empty() {
            add("username", "This field is required.");
        } else if input.username.chars().count() > MAX_NAME_LENGTH {
            add("username", "Ensure this value has at most 30 characters.");
        } else if !input.username.chars().all(is_username_char) {
            add(
                "username",
                "This value may contain only letters, numbers and @/./+/-/_ characters.",
            );
        } else if store.find_user_by_username(&input.username).await?.is_some() {
            add("username", "This username is already in use.");
        }
    }

    for (field, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
    ] {
        if value.chars().count() > MAX_NAME_LENGTH {
            add(field, "Ensure this value has at most 30 characters.");
        }
    }

    Ok(errors)
}
