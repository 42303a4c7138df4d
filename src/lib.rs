pub mod debounce;
pub mod errors;
pub mod field;
pub mod form;
pub mod interceptors;
pub mod keys;
pub mod options;
pub mod rules;
pub mod validator;

pub use errors::Errors;
pub use field::{Field, FieldDescriptor, FormFields};
pub use form::{Form, FormError, FormId, FormResult};
pub use interceptors::{Interceptor, InterceptorManager, SubmitError};
pub use keys::FieldKeysCollection;
pub use options::{
    FormDefaults, FormOptions, SuccessfulSubmissionOptions, ValidationOptions, defaults,
    update_defaults,
};
pub use rules::{RawRule, Rule, RulesManager};
pub use validator::{FieldValidationError, Validator, ValidatorError};
