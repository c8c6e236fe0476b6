//! Declarative field checks for inbound payloads.
//!
//! A request type lists its fields together with the rules they must satisfy
//! and [`Validate::validate`] turns that list into an ordered set of findings.
//! Nothing here knows about storage or ownership; a payload that produces any
//! finding is rejected before a service is called.

use serde::Serialize;
use validator::{ValidateEmail, ValidateLength};

/// A single structural rule applied to a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Value must contain at least one non-whitespace character
    NotEmpty,
    /// Value must be at least this many characters long
    MinLength(usize),
    /// Value must look like an email address
    Email,
}

impl Rule {
    fn check(&self, value: &str) -> Result<(), String> {
        match self {
            Rule::NotEmpty => {
                if value.trim().is_empty() {
                    Err("must not be empty".to_string())
                } else {
                    Ok(())
                }
            }
            Rule::MinLength(min) => {
                if !value.validate_length(Some(*min as u64), None, None) {
                    Err(format!("must be at least {} characters long", min))
                } else {
                    Ok(())
                }
            }
            Rule::Email => {
                if value.validate_email() {
                    Ok(())
                } else {
                    Err("must be a valid email address".to_string())
                }
            }
        }
    }
}

/// One violated rule on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub field: String,
    pub message: String,
}

/// A field value paired with the rules it is checked against
#[derive(Debug)]
pub struct FieldRules<'a> {
    pub field: &'static str,
    pub value: &'a str,
    pub rules: &'static [Rule],
}

impl<'a> FieldRules<'a> {
    pub fn new(field: &'static str, value: &'a str, rules: &'static [Rule]) -> Self {
        Self { field, value, rules }
    }
}

/// Run every rule of every field, keeping declaration order
pub fn check(fields: &[FieldRules<'_>]) -> Vec<Finding> {
    fields
        .iter()
        .flat_map(|f| {
            f.rules.iter().filter_map(move |rule| {
                rule.check(f.value).err().map(|message| Finding {
                    field: f.field.to_string(),
                    message,
                })
            })
        })
        .collect()
}

/// Implemented by request payloads that carry field rules
pub trait Validate {
    fn field_rules(&self) -> Vec<FieldRules<'_>>;

    /// Canonicalise values before the rules run (e.g. email case)
    fn normalize(&mut self) {}

    fn validate(&mut self) -> Result<(), Vec<Finding>> {
        self.normalize();
        let findings = check(&self.field_rules());
        if findings.is_empty() {
            Ok(())
        } else {
            Err(findings)
        }
    }
}

/// Trim and lowercase so lookups by email are case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Signup {
        name: String,
        email: String,
    }

    impl Validate for Signup {
        fn field_rules(&self) -> Vec<FieldRules<'_>> {
            vec![
                FieldRules::new("name", &self.name, &[Rule::MinLength(2)]),
                FieldRules::new("email", &self.email, &[Rule::NotEmpty, Rule::Email]),
            ]
        }

        fn normalize(&mut self) {
            self.email = normalize_email(&self.email);
        }
    }

    #[test]
    fn accepts_valid_payload_and_normalizes_email() {
        let mut payload = Signup {
            name: "Ann".to_string(),
            email: "  Ann@X.com ".to_string(),
        };
        assert!(payload.validate().is_ok());
        assert_eq!(payload.email, "ann@x.com");
    }

    #[test]
    fn reports_findings_in_declaration_order() {
        let mut payload = Signup {
            name: "A".to_string(),
            email: "".to_string(),
        };
        let findings = payload.validate().unwrap_err();
        let fields: Vec<&str> = findings.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "email"]);
        assert_eq!(findings[0].message, "must be at least 2 characters long");
    }

    #[test]
    fn not_empty_rejects_whitespace() {
        assert!(Rule::NotEmpty.check("   ").is_err());
        assert!(Rule::NotEmpty.check(" x ").is_ok());
    }

    #[test]
    fn min_length_counts_characters() {
        assert!(Rule::MinLength(5).check("tower").is_ok());
        assert!(Rule::MinLength(5).check("towr").is_err());
        assert!(Rule::MinLength(3).check("åäö").is_ok());
    }

    #[test]
    fn email_shapes() {
        assert!(Rule::Email.check("ann@x.com").is_ok());
        assert!(Rule::Email.check("first.last@sub.example.org").is_ok());
        for bad in [
            "",
            "@x.com",
            "ann@@x.com",
            "ann@x..com",
            "an n@x.com",
            "ann.x.com",
            "<ann>@x.com",
            "ann@x_y.com",
            "a\"b@x.com",
            "ann@x.c,om",
            "ann@-x-.com",
        ] {
            assert!(Rule::Email.check(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
