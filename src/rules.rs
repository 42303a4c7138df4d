use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::field::Field;
use crate::form::Form;

pub type UnexpectedError = Box<dyn std::error::Error + Send + Sync>;
pub type BoxPassesFuture = Pin<Box<dyn Future<Output = Result<bool, UnexpectedError>> + Send>>;

pub type PassesFn = Arc<dyn Fn(&Field, &Form) -> bool + Send + Sync>;
pub type AsyncPassesFn = Arc<dyn Fn(&Field, &Form) -> BoxPassesFuture + Send + Sync>;
pub type MessageFn = Arc<dyn Fn(&Field, &Form) -> String + Send + Sync>;

#[derive(Clone)]
enum RulePredicate {
    Sync(PassesFn),
    Async(AsyncPassesFn),
}

#[derive(Clone)]
enum RuleMessage {
    Text(String),
    Producer(MessageFn),
}

#[derive(Clone)]
pub struct RawRule {
    passes: RulePredicate,
    message: Option<RuleMessage>,
}

impl RawRule {
    pub fn passes(passes: impl Fn(&Field, &Form) -> bool + Send + Sync + 'static) -> Self {
        Self {
            passes: RulePredicate::Sync(Arc::new(passes)),
            message: None,
        }
    }

    // The future resolves to `Ok(bool)` for a verdict and to `Err` for an
    // unexpected failure that is not a validation result.
    pub fn passes_async(
        passes: impl Fn(&Field, &Form) -> BoxPassesFuture + Send + Sync + 'static,
    ) -> Self {
        Self {
            passes: RulePredicate::Async(Arc::new(passes)),
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(RuleMessage::Text(message.into()));
        self
    }

    pub fn message_with(
        mut self,
        message: impl Fn(&Field, &Form) -> String + Send + Sync + 'static,
    ) -> Self {
        self.message = Some(RuleMessage::Producer(Arc::new(message)));
        self
    }
}

#[derive(Debug)]
pub enum RuleFault {
    Failed,
    Unexpected(UnexpectedError),
}

// Normalization happens once, at build time, never at validation time.
#[derive(Clone)]
pub struct Rule {
    passes: RulePredicate,
    message: MessageFn,
}

impl Rule {
    pub fn build_from_raw(raw: RawRule, default_message: &MessageFn) -> Self {
        let message = match raw.message {
            None => default_message.clone(),
            Some(RuleMessage::Producer(producer)) => producer,
            Some(RuleMessage::Text(text)) => {
                Arc::new(move |_: &Field, _: &Form| text.clone()) as MessageFn
            }
        };

        Self {
            passes: raw.passes,
            message,
        }
    }

    pub async fn validate(&self, field: &Field, form: &Form) -> Result<(), RuleFault> {
        match &self.passes {
            RulePredicate::Sync(passes) => {
                if passes(field, form) {
                    Ok(())
                } else {
                    Err(RuleFault::Failed)
                }
            }
            RulePredicate::Async(passes) => match passes(field, form).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(RuleFault::Failed),
                Err(source) => Err(RuleFault::Unexpected(source)),
            },
        }
    }

    pub fn message(&self, field: &Field, form: &Form) -> String {
        (self.message)(field, form)
    }
}

// Absent keys behave as "zero rules".
pub struct RulesManager {
    field_rules: BTreeMap<String, Vec<Rule>>,
    default_message: MessageFn,
}

impl RulesManager {
    pub fn new(
        initial: impl IntoIterator<Item = (String, Vec<RawRule>)>,
        default_message: MessageFn,
    ) -> Self {
        let mut manager = Self {
            field_rules: BTreeMap::new(),
            default_message,
        };
        for (field_key, raw_rules) in initial {
            manager.build_field_rules(field_key, raw_rules);
        }
        manager
    }

    // Replaces the field's rule list; an empty list removes the key.
    pub fn build_field_rules(&mut self, field_key: impl Into<String>, raw_rules: Vec<RawRule>) {
        let field_key = field_key.into();
        if raw_rules.is_empty() {
            self.field_rules.remove(&field_key);
            return;
        }

        let rules = raw_rules
            .into_iter()
            .map(|raw| Rule::build_from_raw(raw, &self.default_message))
            .collect();
        self.field_rules.insert(field_key, rules);
    }

    pub fn get(&self, field_key: &str) -> Vec<Rule> {
        self.field_rules.get(field_key).cloned().unwrap_or_default()
    }

    pub fn has(&self, field_key: &str) -> bool {
        self.field_rules.contains_key(field_key)
    }

    pub fn unset(&mut self, field_key: &str) {
        self.field_rules.remove(field_key);
    }

    pub fn all(&self) -> &BTreeMap<String, Vec<Rule>> {
        &self.field_rules
    }
}
