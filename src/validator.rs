use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock};

use crate::field::Field;
use crate::form::Form;
use crate::keys::FieldKeysCollection;
use crate::options::ValidationOptions;
use crate::rules::{Rule, RuleFault, UnexpectedError};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldValidationError {
    pub messages: Vec<String>,
}

impl FieldValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

impl Display for FieldValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "field validation failed: {}", self.messages.join(", "))
    }
}

impl std::error::Error for FieldValidationError {}

#[derive(Debug)]
pub enum ValidatorError {
    Field(FieldValidationError),
    Unexpected(UnexpectedError),
}

impl Display for ValidatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidatorError::Field(error) => Display::fmt(error, f),
            ValidatorError::Unexpected(source) => {
                write!(f, "unexpected validation error: {source}")
            }
        }
    }
}

impl std::error::Error for ValidatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidatorError::Field(error) => Some(error),
            ValidatorError::Unexpected(source) => Some(source.as_ref()),
        }
    }
}

// Options are copied at construction time.
#[derive(Clone)]
pub struct Validator {
    options: ValidationOptions,
    validating: Arc<RwLock<FieldKeysCollection>>,
}

impl Validator {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            options,
            validating: Arc::new(RwLock::new(FieldKeysCollection::new())),
        }
    }

    /// Runs the rules strictly in order; an unexpected predicate error
    /// rejects the whole call immediately, bypassing aggregation.
    pub async fn validate_field(
        &self,
        rules: Vec<Rule>,
        field: Field,
        form: &Form,
    ) -> Result<Field, ValidatorError> {
        let mut chain: VecDeque<Rule> = rules.into();
        let mut messages: Vec<String> = Vec::new();

        self.mark_validating(&field.key);

        while let Some(rule) = chain.pop_front() {
            match rule.validate(&field, form).await {
                Ok(()) => {}
                Err(RuleFault::Failed) => {
                    messages.push(rule.message(&field, form));
                    if self.options.stop_after_first_rule_failed {
                        chain.clear();
                    }
                }
                Err(RuleFault::Unexpected(source)) => {
                    self.unmark_validating(&field.key);
                    return Err(ValidatorError::Unexpected(source));
                }
            }
        }

        self.unmark_validating(&field.key);

        if messages.is_empty() {
            Ok(field)
        } else {
            Err(ValidatorError::Field(FieldValidationError::new(messages)))
        }
    }

    pub fn is_validating(&self, field_key: &str) -> bool {
        self.read_validating().has(field_key)
    }

    pub fn any_validating(&self) -> bool {
        self.read_validating().any()
    }

    pub fn validating_keys(&self) -> Vec<String> {
        self.read_validating().all().to_vec()
    }

    fn mark_validating(&self, field_key: &str) {
        let mut validating = match self.validating.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        validating.push(field_key);
    }

    fn unmark_validating(&self, field_key: &str) {
        let mut validating = match self.validating.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        validating.unset(field_key);
    }

    fn read_validating(&self) -> FieldKeysCollection {
        let validating = match self.validating.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        validating.clone()
    }
}
