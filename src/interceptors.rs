use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::form::{Form, FormError, write_lock};

#[derive(Clone, Debug)]
pub enum SubmitError {
    FormInvalid,
    Failed(Value),
    Form(FormError),
}

impl Display for SubmitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::FormInvalid => f.write_str("Form is invalid."),
            SubmitError::Failed(payload) => write!(f, "submission failed: {payload}"),
            SubmitError::Form(error) => Display::fmt(error, f),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<FormError> for SubmitError {
    fn from(error: FormError) -> Self {
        SubmitError::Form(error)
    }
}

pub type BoxSubmitFuture = Pin<Box<dyn Future<Output = Result<Value, SubmitError>> + Send>>;
pub type FulfilledFn = Arc<dyn Fn(Form, Value) -> BoxSubmitFuture + Send + Sync>;
pub type RejectedFn = Arc<dyn Fn(Form, SubmitError) -> BoxSubmitFuture + Send + Sync>;

// A missing side passes the outcome through unchanged.
#[derive(Clone, Default)]
pub struct Interceptor {
    fulfilled: Option<FulfilledFn>,
    rejected: Option<RejectedFn>,
}

impl Interceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fulfilled(
        mut self,
        handler: impl Fn(Form, Value) -> BoxSubmitFuture + Send + Sync + 'static,
    ) -> Self {
        self.fulfilled = Some(Arc::new(handler));
        self
    }

    pub fn rejected(
        mut self,
        handler: impl Fn(Form, SubmitError) -> BoxSubmitFuture + Send + Sync + 'static,
    ) -> Self {
        self.rejected = Some(Arc::new(handler));
        self
    }
}

/// Ejected slots stay as holes so previously returned positions remain
/// valid.
#[derive(Clone, Default)]
pub struct InterceptorManager {
    handlers: Vec<Option<Interceptor>>,
}

impl InterceptorManager {
    pub fn new(handlers: Vec<Option<Interceptor>>) -> Self {
        let mut manager = Self::default();
        manager.merge(handlers);
        manager
    }

    pub fn add(&mut self, interceptor: Interceptor) -> usize {
        self.handlers.push(Some(interceptor));
        self.handlers.len() - 1
    }

    pub fn eject(&mut self, position: usize) {
        if let Some(slot) = self.handlers.get_mut(position) {
            *slot = None;
        }
    }

    // Merged handlers come before previously registered ones.
    pub fn merge(&mut self, handlers: Vec<Option<Interceptor>>) -> &mut Self {
        let mut merged = handlers;
        merged.append(&mut self.handlers);
        self.handlers = merged;
        self
    }

    pub fn all(&self) -> &[Option<Interceptor>] {
        &self.handlers
    }

    pub fn for_each(&self, mut visit: impl FnMut(&Interceptor)) {
        for interceptor in self.handlers.iter().flatten() {
            visit(interceptor);
        }
    }

    pub(crate) fn active(&self) -> Vec<Interceptor> {
        self.handlers.iter().flatten().cloned().collect()
    }
}

// The fulfilled handler runs on `Ok`, the rejected handler on `Err`; either
// side may recover or re-reject.
pub(crate) async fn run_stage(
    stage: &Interceptor,
    form: &Form,
    outcome: Result<Value, SubmitError>,
) -> Result<Value, SubmitError> {
    match outcome {
        Ok(value) => match &stage.fulfilled {
            Some(handler) => handler(form.clone(), value).await,
            None => Ok(value),
        },
        Err(error) => match &stage.rejected {
            Some(handler) => handler(form.clone(), error).await,
            None => Err(error),
        },
    }
}

pub(crate) fn validate_form() -> Interceptor {
    Interceptor::new().fulfilled(|form, value| {
        Box::pin(async move {
            let options = form.options()?;
            if options.validation.on_submission {
                form.validate_all().await?;
                if form.errors()?.any() {
                    return Err(SubmitError::FormInvalid);
                }
            }
            Ok(value)
        })
    })
}

// Must stay the last stage before the submission callback.
pub(crate) fn set_submitting_true() -> Interceptor {
    Interceptor::new().fulfilled(|form, value| {
        Box::pin(async move {
            form.set_submitting(true)?;
            Ok(value)
        })
    })
}

// Runs on both paths; the failure path re-rejects with the original error.
pub(crate) fn set_submitting_false() -> Interceptor {
    Interceptor::new()
        .fulfilled(|form, value| {
            Box::pin(async move {
                form.set_submitting(false)?;
                Ok(value)
            })
        })
        .rejected(|form, error| {
            Box::pin(async move {
                form.set_submitting(false)?;
                Err(error)
            })
        })
}

// Each clearing step sits behind its own option flag.
pub(crate) fn clear_form() -> Interceptor {
    Interceptor::new().fulfilled(|form, value| {
        Box::pin(async move {
            let flags = form.options()?.successful_submission;
            if flags.clear_errors {
                write_lock(&form.errors, "clearing errors after submission")?.clear();
            }
            if flags.clear_touched {
                write_lock(&form.touched, "clearing touched after submission")?.clear();
            }
            if flags.reset_values {
                form.reset_values()?;
            }
            Ok(value)
        })
    })
}
