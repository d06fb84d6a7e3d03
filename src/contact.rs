//! Contact form messages.

use crate::Fields;
use crate::error::{ErrorCollector, ValidationError};
use crate::validators::{required_text, text_field, validate_email, validate_phone};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A validated contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub user_id: Option<String>,
}

impl ContactMessage {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("first_name".into(), self.first_name.clone().into());
        fields.insert("last_name".into(), self.last_name.clone().into());
        fields.insert("email".into(), self.email.clone().into());
        if let Some(phone) = &self.phone {
            fields.insert("phone".into(), phone.clone().into());
        }
        fields.insert("message".into(), self.message.clone().into());
        fields
    }
}

pub struct ContactSchema;

impl ContactSchema {
    /// Validate a contact form.
    ///
    /// `user_id` links the message to the signed-in user, if there is one. It
    /// is taken from the caller, never from the submitted fields. All field
    /// problems are reported together.
    pub fn create(fields: &Fields, user_id: Option<&str>) -> Result<ContactMessage, ValidationError> {
        let mut errors = ErrorCollector::new();

        let first_name = errors.check("first_name", required_text(fields, "first_name"));
        let last_name = errors.check("last_name", required_text(fields, "last_name"));
        let email = errors.check(
            "email",
            required_text(fields, "email").and_then(validate_email),
        );
        let phone = errors.check(
            "phone",
            text_field(fields, "phone")
                .transpose()
                .and_then(validate_phone),
        );
        let message = errors.check("message", required_text(fields, "message"));

        match (first_name, last_name, email, phone, message) {
            (Some(first_name), Some(last_name), Some(email), Some(phone), Some(message))
                if errors.is_empty() =>
            {
                Ok(ContactMessage {
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                    email,
                    phone,
                    message: message.to_string(),
                    user_id: user_id.map(str::to_string),
                })
            }
            _ => {
                let err = errors.into_error();
                debug!(errors = err.errors().len(), "contact message rejected");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::{Value, json};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fields must be an object"),
        }
    }

    fn sample() -> Fields {
        fields(json!({
            "first_name": "Erika",
            "last_name": "Mustermann",
            "email": "  Erika@Example.DE ",
            "phone": " +49301234567 ",
            "message": "Wann ist die nächste Ziehung?"
        }))
    }

    #[test]
    fn create_normalizes_email_and_phone() {
        let msg = ContactSchema::create(&sample(), None).unwrap();
        assert_eq!(msg.email, "erika@example.de");
        assert_eq!(msg.phone.as_deref(), Some("+49301234567"));
        assert_eq!(msg.user_id, None);
    }

    #[test]
    fn phone_is_optional() {
        let mut input = sample();
        input.remove("phone");
        assert_eq!(ContactSchema::create(&input, None).unwrap().phone, None);

        input.insert("phone".into(), json!(""));
        assert_eq!(ContactSchema::create(&input, None).unwrap().phone, None);

        input.insert("phone".into(), Value::Null);
        assert_eq!(ContactSchema::create(&input, None).unwrap().phone, None);
    }

    #[test]
    fn user_link_comes_from_the_caller() {
        let mut input = sample();
        input.insert("user_id".into(), json!("user_forged"));
        let msg = ContactSchema::create(&input, Some("user_2abc")).unwrap();
        assert_eq!(msg.user_id.as_deref(), Some("user_2abc"));

        let anonymous = ContactSchema::create(&input, None).unwrap();
        assert_eq!(anonymous.user_id, None);
    }

    #[test]
    fn empty_message_is_reported_with_other_errors() {
        let mut input = sample();
        input.insert("message".into(), json!(""));
        input.insert("email".into(), json!("not-an-email"));
        input.insert("phone".into(), json!("0301234567"));

        let err = ContactSchema::create(&input, None).unwrap_err();
        assert!(err.has("message", ErrorKind::RequiredField));
        assert!(err.has("email", ErrorKind::Format));
        assert!(err.has("phone", ErrorKind::Format));
        assert_eq!(err.errors().len(), 3);
    }

    #[test]
    fn missing_fields_are_required_errors() {
        let err = ContactSchema::create(&Fields::new(), None).unwrap_err();
        for field in ["first_name", "last_name", "email", "message"] {
            assert!(err.has(field, ErrorKind::RequiredField), "{field}");
        }
        assert!(err.field("phone").is_none());
    }

    #[test]
    fn revalidating_a_message_is_stable() {
        let msg = ContactSchema::create(&sample(), Some("user_1")).unwrap();
        let again = ContactSchema::create(&msg.to_fields(), Some("user_1")).unwrap();
        assert_eq!(msg, again);
    }
}
