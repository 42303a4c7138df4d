use serde_json::Value;

use crate::rules::RawRule;

// Snapshot of one field at validation time; no identity beyond the key.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub key: String,
    pub label: String,
    pub value: Value,
}

#[derive(Clone, Default)]
pub struct FieldDescriptor {
    pub(crate) value: Value,
    pub(crate) label: Option<String>,
    pub(crate) rules: Vec<RawRule>,
    pub(crate) extra: Value,
}

impl FieldDescriptor {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            label: None,
            rules: Vec::new(),
            extra: Value::Null,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn rule(mut self, rule: RawRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = RawRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn extra(mut self, extra: impl Into<Value>) -> Self {
        self.extra = extra.into();
        self
    }
}

impl From<Value> for FieldDescriptor {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Default)]
pub struct FormFields {
    fields: Vec<(String, FieldDescriptor)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(self, field_key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field(field_key, FieldDescriptor::new(value))
    }

    pub fn field(
        mut self,
        field_key: impl Into<String>,
        descriptor: impl Into<FieldDescriptor>,
    ) -> Self {
        self.fields.push((field_key.into(), descriptor.into()));
        self
    }
}

impl IntoIterator for FormFields {
    type Item = (String, FieldDescriptor);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

// Word boundaries at `_`, `-`, `.` and lower-to-upper case changes; first
// word capitalized.
pub(crate) fn default_label(field_key: &str) -> String {
    let mut label = String::with_capacity(field_key.len());
    let mut previous_lower = false;

    for character in field_key.chars() {
        if matches!(character, '_' | '-' | '.') {
            if !label.ends_with(' ') && !label.is_empty() {
                label.push(' ');
            }
            previous_lower = false;
            continue;
        }

        if character.is_uppercase() && previous_lower && !label.is_empty() {
            label.push(' ');
        }

        if label.is_empty() {
            label.extend(character.to_uppercase());
        } else {
            label.extend(character.to_lowercase());
        }
        previous_lower = character.is_lowercase();
    }

    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_label_handles_common_key_shapes() {
        assert_eq!(default_label("name"), "Name");
        assert_eq!(default_label("last_name"), "Last name");
        assert_eq!(default_label("lastName"), "Last name");
        assert_eq!(default_label("billing-address.city"), "Billing address city");
    }

    #[test]
    fn descriptor_from_bare_value_has_no_label_rules_or_extra() {
        let descriptor = FieldDescriptor::from(Value::from("Alice"));
        assert_eq!(descriptor.value, Value::from("Alice"));
        assert!(descriptor.label.is_none());
        assert!(descriptor.rules.is_empty());
        assert_eq!(descriptor.extra, Value::Null);
    }
}
