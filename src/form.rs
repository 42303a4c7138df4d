use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::warn;
use serde_json::Value;

use crate::debounce::Debouncer;
use crate::errors::Errors;
use crate::field::{Field, FieldDescriptor, FormFields, default_label};
use crate::interceptors::{self, Interceptor, InterceptorManager, SubmitError, run_stage};
use crate::keys::FieldKeysCollection;
use crate::options::{self, FormDefaults, FormOptions};
use crate::rules::RulesManager;
use crate::validator::{Validator, ValidatorError};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Clone, Debug)]
pub enum FormError {
    StatePoisoned(&'static str),
    UnexpectedRule {
        field_key: String,
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::UnexpectedRule { field_key, source } => {
                write!(f, "unexpected error while validating `{field_key}`: {source}")
            }
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}

pub(crate) struct FormState {
    values: BTreeMap<String, Value>,
    initial_values: BTreeMap<String, Value>,
    labels: BTreeMap<String, String>,
    extras: BTreeMap<String, Value>,
    on_focus: Option<String>,
    submitting: bool,
}

fn insert_field(
    state: &mut FormState,
    rules: &mut RulesManager,
    field_key: String,
    descriptor: FieldDescriptor,
) {
    let label = descriptor
        .label
        .unwrap_or_else(|| default_label(&field_key));
    state.values.insert(field_key.clone(), descriptor.value.clone());
    state.initial_values.insert(field_key.clone(), descriptor.value);
    state.labels.insert(field_key.clone(), label);
    state.extras.insert(field_key.clone(), descriptor.extra);
    rules.build_field_rules(field_key, descriptor.rules);
}

// Cheap `Clone` handle over shared state.
#[derive(Clone)]
pub struct Form {
    id: FormId,
    pub(crate) options: Arc<RwLock<FormOptions>>,
    pub(crate) state: Arc<RwLock<FormState>>,
    pub(crate) errors: Arc<RwLock<Errors>>,
    pub(crate) touched: Arc<RwLock<FieldKeysCollection>>,
    pub(crate) rules: Arc<RwLock<RulesManager>>,
    pub(crate) validator: Validator,
    pub(crate) before_submission: Arc<RwLock<InterceptorManager>>,
    pub(crate) submission_complete: Arc<RwLock<InterceptorManager>>,
    pub(crate) debouncer: Arc<RwLock<Debouncer>>,
}

impl Form {
    pub fn new(fields: FormFields) -> Self {
        Self::with_defaults(fields, options::defaults())
    }

    // Defaults are copied in; mutating them afterwards does not affect
    // this instance.
    pub fn with_defaults(fields: FormFields, defaults: FormDefaults) -> Self {
        let FormDefaults {
            options,
            before_submission,
            submission_complete,
        } = defaults;

        let validator = Validator::new(options.validation.clone());
        let mut rules = RulesManager::new([], options.validation.default_message.clone());
        let mut state = FormState {
            values: BTreeMap::new(),
            initial_values: BTreeMap::new(),
            labels: BTreeMap::new(),
            extras: BTreeMap::new(),
            on_focus: None,
            submitting: false,
        };
        for (field_key, descriptor) in fields {
            insert_field(&mut state, &mut rules, field_key, descriptor);
        }
        let debouncer = Debouncer::new(options.validation.debounced_validate_field_time);

        Self {
            id: FormId::next(),
            options: Arc::new(RwLock::new(options)),
            state: Arc::new(RwLock::new(state)),
            errors: Arc::new(RwLock::new(Errors::new())),
            touched: Arc::new(RwLock::new(FieldKeysCollection::new())),
            rules: Arc::new(RwLock::new(rules)),
            validator,
            before_submission: Arc::new(RwLock::new(InterceptorManager::new(
                before_submission.all().to_vec(),
            ))),
            submission_complete: Arc::new(RwLock::new(InterceptorManager::new(
                submission_complete.all().to_vec(),
            ))),
            debouncer: Arc::new(RwLock::new(debouncer)),
        }
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    // The validator's options copy and the rules' default message stay as
    // constructed; only the options and the debouncer are replaced.
    pub fn assign_options(&self, options: FormOptions) -> FormResult<()> {
        let delay = options.validation.debounced_validate_field_time;
        *write_lock(&self.options, "assigning options")? = options;
        *write_lock(&self.debouncer, "regenerating the debouncer")? = Debouncer::new(delay);
        Ok(())
    }

    pub fn options(&self) -> FormResult<FormOptions> {
        Ok(read_lock(&self.options, "reading options")?.clone())
    }

    pub fn add_field(
        &self,
        field_key: impl Into<String>,
        descriptor: impl Into<FieldDescriptor>,
    ) -> FormResult<()> {
        let field_key = field_key.into();
        if self.has_field(&field_key)? {
            warn!("`{field_key}` already exists");
        }
        let mut state = write_lock(&self.state, "adding a field")?;
        let mut rules = write_lock(&self.rules, "building field rules")?;
        insert_field(&mut state, &mut rules, field_key, descriptor.into());
        Ok(())
    }

    pub fn add_fields(&self, fields: FormFields) -> FormResult<()> {
        for (field_key, descriptor) in fields {
            self.add_field(field_key, descriptor)?;
        }
        Ok(())
    }

    pub fn remove_field(&self, field_key: &str) -> FormResult<()> {
        if !self.has_field(field_key)? {
            warn!("`{field_key}` is not a valid field");
            return Ok(());
        }
        {
            let mut state = write_lock(&self.state, "removing a field")?;
            state.values.remove(field_key);
            state.initial_values.remove(field_key);
            state.labels.remove(field_key);
            state.extras.remove(field_key);
        }
        write_lock(&self.rules, "unsetting field rules")?.unset(field_key);
        Ok(())
    }

    pub fn remove_fields(&self, field_keys: &[&str]) -> FormResult<()> {
        for field_key in field_keys {
            self.remove_field(field_key)?;
        }
        Ok(())
    }

    pub fn has_field(&self, field_key: &str) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking field presence")?
            .values
            .contains_key(field_key))
    }

    pub fn set(&self, field_key: &str, value: impl Into<Value>) -> FormResult<()> {
        if !self.has_field(field_key)? {
            warn!("`{field_key}` is not a valid field");
            return Ok(());
        }
        write_lock(&self.state, "setting a field value")?
            .values
            .insert(field_key.to_owned(), value.into());
        Ok(())
    }

    pub fn value_of(&self, field_key: &str) -> FormResult<Option<Value>> {
        Ok(read_lock(&self.state, "reading a field value")?
            .values
            .get(field_key)
            .cloned())
    }

    pub fn label_of(&self, field_key: &str) -> FormResult<Option<String>> {
        Ok(read_lock(&self.state, "reading a field label")?
            .labels
            .get(field_key)
            .cloned())
    }

    pub fn extra_of(&self, field_key: &str) -> FormResult<Option<Value>> {
        Ok(read_lock(&self.state, "reading field extra data")?
            .extras
            .get(field_key)
            .cloned())
    }

    pub fn values(&self) -> FormResult<BTreeMap<String, Value>> {
        Ok(read_lock(&self.state, "reading values")?.values.clone())
    }

    pub fn values_as_json(&self) -> FormResult<String> {
        let values: serde_json::Map<String, Value> = self.values()?.into_iter().collect();
        Ok(Value::Object(values).to_string())
    }

    // Unknown keys are ignored.
    pub fn fill(&self, data: BTreeMap<String, Value>) -> FormResult<()> {
        let mut state = write_lock(&self.state, "filling values")?;
        for (field_key, value) in data {
            if state.values.contains_key(&field_key) {
                state.values.insert(field_key, value);
            }
        }
        Ok(())
    }

    pub fn reset_values(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resetting values")?;
        state.values = state.initial_values.clone();
        Ok(())
    }

    pub fn reset(&self) -> FormResult<()> {
        self.reset_values()?;
        write_lock(&self.errors, "clearing errors on reset")?.clear();
        write_lock(&self.touched, "clearing touched on reset")?.clear();
        Ok(())
    }

    pub fn is_field_dirty(&self, field_key: &str) -> FormResult<bool> {
        if !self.has_field(field_key)? {
            warn!("`{field_key}` is not a valid field");
            return Ok(false);
        }
        let state = read_lock(&self.state, "checking field dirtiness")?;
        Ok(state.values.get(field_key) != state.initial_values.get(field_key))
    }

    pub fn is_dirty(&self) -> FormResult<bool> {
        let state = read_lock(&self.state, "checking form dirtiness")?;
        Ok(state
            .initial_values
            .iter()
            .any(|(field_key, initial)| state.values.get(field_key) != Some(initial)))
    }

    pub async fn field_changed(&self, field_key: &str) -> FormResult<()> {
        if !self.has_field(field_key)? {
            warn!("`{field_key}` is not a valid field");
            return Ok(());
        }
        let validation = self.options()?.validation;
        if validation.unset_field_errors_on_field_change {
            write_lock(&self.errors, "unsetting field errors on change")?.unset(field_key);
        }
        if validation.on_field_changed {
            let debouncer = read_lock(&self.debouncer, "reading the debouncer")?.clone();
            if debouncer.pass().await {
                self.validate_field(field_key).await?;
            }
        }
        Ok(())
    }

    pub fn field_focused(&self, field_key: &str) -> FormResult<()> {
        if !self.has_field(field_key)? {
            warn!("`{field_key}` is not a valid field");
            return Ok(());
        }
        write_lock(&self.touched, "recording a touched field")?.push(field_key);
        write_lock(&self.state, "recording the focused field")?.on_focus =
            Some(field_key.to_owned());
        Ok(())
    }

    pub async fn field_blurred(&self, field_key: &str) -> FormResult<()> {
        if !self.has_field(field_key)? {
            warn!("`{field_key}` is not a valid field");
            return Ok(());
        }
        {
            let mut state = write_lock(&self.state, "clearing the focused field")?;
            if state.on_focus.as_deref() == Some(field_key) {
                state.on_focus = None;
            }
        }
        if self.options()?.validation.on_field_blurred {
            self.validate_field(field_key).await?;
        }
        Ok(())
    }

    pub fn focused_field(&self) -> FormResult<Option<String>> {
        Ok(read_lock(&self.state, "reading the focused field")?
            .on_focus
            .clone())
    }

    /// Unexpected rule errors are never recorded; they surface to the
    /// caller.
    pub async fn validate_field(&self, field_key: &str) -> FormResult<()> {
        if !self.has_field(field_key)? {
            warn!("`{field_key}` is not a valid field");
            return Ok(());
        }
        write_lock(&self.errors, "unsetting field errors before validation")?.unset(field_key);

        let rules = read_lock(&self.rules, "reading field rules")?.get(field_key);
        let field = self.build_field(field_key)?;

        match self.validator.validate_field(rules, field, self).await {
            Ok(_) => Ok(()),
            Err(ValidatorError::Field(error)) => {
                write_lock(&self.errors, "recording field validation errors")?
                    .push(BTreeMap::from([(field_key.to_owned(), error.messages)]));
                Ok(())
            }
            Err(ValidatorError::Unexpected(source)) => Err(FormError::UnexpectedRule {
                field_key: field_key.to_owned(),
                source: Arc::from(source),
            }),
        }
    }

    // Later fields still run when earlier ones fail; the first unexpected
    // error, if any, is returned afterwards.
    pub async fn validate_all(&self) -> FormResult<()> {
        let field_keys: Vec<String> = read_lock(&self.state, "listing fields for validation")?
            .initial_values
            .keys()
            .cloned()
            .collect();

        let mut first_error = None;
        for field_key in field_keys {
            if let Err(error) = self.validate_field(&field_key).await {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn is_validating(&self, field_key: &str) -> FormResult<bool> {
        if !self.has_field(field_key)? {
            warn!("`{field_key}` is not a valid field");
        }
        Ok(self.validator.is_validating(field_key))
    }

    pub fn any_validating(&self) -> bool {
        self.validator.any_validating()
    }

    pub fn is_submitting(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading the submitting flag")?.submitting)
    }

    pub fn set_submitting(&self, submitting: bool) -> FormResult<()> {
        write_lock(&self.state, "writing the submitting flag")?.submitting = submitting;
        Ok(())
    }

    pub fn errors(&self) -> FormResult<Errors> {
        Ok(read_lock(&self.errors, "reading errors")?.clone())
    }

    pub fn touched(&self) -> FormResult<FieldKeysCollection> {
        Ok(read_lock(&self.touched, "reading touched fields")?.clone())
    }

    pub fn intercept_before_submission(&self, interceptor: Interceptor) -> FormResult<usize> {
        Ok(
            write_lock(&self.before_submission, "registering a before-submission interceptor")?
                .add(interceptor),
        )
    }

    pub fn eject_before_submission(&self, position: usize) -> FormResult<()> {
        write_lock(&self.before_submission, "ejecting a before-submission interceptor")?
            .eject(position);
        Ok(())
    }

    pub fn intercept_submission_complete(&self, interceptor: Interceptor) -> FormResult<usize> {
        Ok(write_lock(
            &self.submission_complete,
            "registering a submission-complete interceptor",
        )?
        .add(interceptor))
    }

    pub fn eject_submission_complete(&self, position: usize) -> FormResult<()> {
        write_lock(&self.submission_complete, "ejecting a submission-complete interceptor")?
            .eject(position);
        Ok(())
    }

    /// Stage order: instance before-submission handlers, validate, mark
    /// submitting, the callback, unmark submitting, clear, then instance
    /// submission-complete handlers. A rejection skips later fulfilled
    /// handlers; rejected handlers may recover or re-reject.
    pub async fn submit<F, Fut>(&self, callback: F) -> Result<Value, SubmitError>
    where
        F: FnOnce(Form) -> Fut,
        Fut: Future<Output = Result<Value, SubmitError>>,
    {
        let mut before =
            read_lock(&self.before_submission, "collecting before-submission interceptors")?
                .active();
        before.push(interceptors::validate_form());
        before.push(interceptors::set_submitting_true());

        let mut complete = vec![
            interceptors::set_submitting_false(),
            interceptors::clear_form(),
        ];
        complete.extend(
            read_lock(&self.submission_complete, "collecting submission-complete interceptors")?
                .active(),
        );

        let mut outcome: Result<Value, SubmitError> = Ok(Value::Null);
        for stage in &before {
            outcome = run_stage(stage, self, outcome).await;
        }
        outcome = match outcome {
            Ok(_) => callback(self.clone()).await,
            Err(error) => Err(error),
        };
        for stage in &complete {
            outcome = run_stage(stage, self, outcome).await;
        }
        outcome
    }

    fn build_field(&self, field_key: &str) -> FormResult<Field> {
        let state = read_lock(&self.state, "building a field snapshot")?;
        Ok(Field {
            key: field_key.to_owned(),
            label: state
                .labels
                .get(field_key)
                .cloned()
                .unwrap_or_else(|| default_label(field_key)),
            value: state.values.get(field_key).cloned().unwrap_or(Value::Null),
        })
    }
}
