// Insertion-ordered key set backing the touched and validating state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldKeysCollection {
    field_keys: Vec<String>,
}

impl FieldKeysCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[String] {
        &self.field_keys
    }

    pub fn record(&mut self, field_keys: Vec<String>) {
        self.field_keys.clear();
        for field_key in field_keys {
            self.push(field_key);
        }
    }

    pub fn has(&self, field_key: &str) -> bool {
        self.field_keys.iter().any(|existing| existing == field_key)
    }

    // Idempotent: a key already present is neither duplicated nor moved.
    pub fn push(&mut self, field_key: impl Into<String>) {
        let field_key = field_key.into();
        if !self.has(&field_key) {
            self.field_keys.push(field_key);
        }
    }

    pub fn unset(&mut self, field_key: &str) {
        self.field_keys.retain(|existing| existing != field_key);
    }

    pub fn any(&self) -> bool {
        !self.field_keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.field_keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_is_idempotent_and_preserves_order() {
        let mut keys = FieldKeysCollection::new();
        keys.push("name");
        keys.push("email");
        keys.push("name");

        assert_eq!(keys.all(), ["name".to_owned(), "email".to_owned()]);
    }

    #[test]
    fn record_replaces_and_deduplicates() {
        let mut keys = FieldKeysCollection::new();
        keys.push("stale");
        keys.record(vec!["a".into(), "b".into(), "a".into()]);

        assert!(!keys.has("stale"));
        assert_eq!(keys.all(), ["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn unset_and_clear_are_idempotent() {
        let mut keys = FieldKeysCollection::new();
        keys.push("name");
        keys.unset("name");
        keys.unset("name");
        assert!(!keys.any());

        keys.push("email");
        keys.clear();
        keys.clear();
        assert!(!keys.has("email"));
        assert!(!keys.any());
    }
}
