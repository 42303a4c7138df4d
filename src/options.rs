use std::sync::{Arc, LazyLock, RwLock};
use std::time::Duration;

use crate::interceptors::InterceptorManager;
use crate::rules::MessageFn;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SuccessfulSubmissionOptions {
    pub clear_errors: bool,
    pub clear_touched: bool,
    pub reset_values: bool,
}

impl Default for SuccessfulSubmissionOptions {
    fn default() -> Self {
        Self {
            clear_errors: true,
            clear_touched: true,
            reset_values: true,
        }
    }
}

#[derive(Clone)]
pub struct ValidationOptions {
    pub debounced_validate_field_time: Duration,
    pub default_message: MessageFn,
    pub on_field_blurred: bool,
    pub on_field_changed: bool,
    pub on_submission: bool,
    pub stop_after_first_rule_failed: bool,
    pub unset_field_errors_on_field_change: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            debounced_validate_field_time: Duration::ZERO,
            default_message: Arc::new(|field, _| format!("{} is invalid.", field.label)),
            on_field_blurred: false,
            on_field_changed: false,
            on_submission: true,
            stop_after_first_rule_failed: true,
            unset_field_errors_on_field_change: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct FormOptions {
    pub successful_submission: SuccessfulSubmissionOptions,
    pub validation: ValidationOptions,
}

// Copied into each instance at construction, never referenced, so later
// mutation cannot retroactively alter already-constructed forms.
#[derive(Clone, Default)]
pub struct FormDefaults {
    pub options: FormOptions,
    pub before_submission: InterceptorManager,
    pub submission_complete: InterceptorManager,
}

static DEFAULTS: LazyLock<RwLock<FormDefaults>> =
    LazyLock::new(|| RwLock::new(FormDefaults::default()));

pub fn defaults() -> FormDefaults {
    let defaults = match DEFAULTS.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    defaults.clone()
}

// Only forms constructed afterwards see the change.
pub fn update_defaults(update: impl FnOnce(&mut FormDefaults)) {
    let mut defaults = match DEFAULTS.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    update(&mut defaults);
}
