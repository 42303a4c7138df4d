use std::collections::BTreeMap;

/// A key is present if and only if the field currently has at least one
/// message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Errors {
    errors: BTreeMap<String, Vec<String>>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, errors: BTreeMap<String, Vec<String>>) {
        self.errors.clear();
        self.push(errors);
    }

    // Later entries for a key fully replace that key's list.
    pub fn push(&mut self, errors: BTreeMap<String, Vec<String>>) {
        for (field_key, messages) in errors {
            if messages.is_empty() {
                self.errors.remove(&field_key);
            } else {
                self.errors.insert(field_key, messages);
            }
        }
    }

    pub fn has(&self, field_key: &str) -> bool {
        self.errors.contains_key(field_key)
    }

    pub fn get(&self, field_key: &str) -> Option<&[String]> {
        self.errors.get(field_key).map(Vec::as_slice)
    }

    pub fn get_first(&self, field_key: &str) -> Option<&str> {
        self.get(field_key)?.first().map(String::as_str)
    }

    pub fn all(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn unset(&mut self, field_key: &str) {
        self.errors.remove(field_key);
    }

    pub fn any(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(field_key: &str, messages: &[&str]) -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([(
            field_key.to_owned(),
            messages.iter().map(|message| (*message).to_owned()).collect(),
        )])
    }

    #[test]
    fn push_replaces_the_whole_list_for_a_key() {
        let mut errors = Errors::new();
        errors.push(entry("a", &["x"]));
        errors.push(entry("b", &["kept"]));
        errors.push(entry("a", &["y"]));

        assert_eq!(errors.get("a"), Some(["y".to_owned()].as_slice()));
        assert_eq!(errors.get("b"), Some(["kept".to_owned()].as_slice()));
    }

    #[test]
    fn record_replaces_wholesale() {
        let mut errors = Errors::new();
        errors.push(entry("a", &["x"]));
        errors.record(entry("b", &["y"]));

        assert!(!errors.has("a"));
        assert!(errors.has("b"));
    }

    #[test]
    fn key_presence_tracks_messages() {
        let mut errors = Errors::new();
        errors.push(entry("a", &["x", "y"]));
        assert!(errors.has("a"));
        assert!(errors.any());
        assert_eq!(errors.get_first("a"), Some("x"));

        errors.unset("a");
        assert!(!errors.has("a"));
        assert_eq!(errors.get("a"), None);
        assert_eq!(errors.get_first("a"), None);
        assert!(!errors.any());

        // unset is idempotent
        errors.unset("a");
        assert!(!errors.any());
    }

    #[test]
    fn empty_message_lists_never_create_keys() {
        let mut errors = Errors::new();
        errors.push(entry("a", &[]));
        assert!(!errors.has("a"));

        errors.push(entry("a", &["x"]));
        errors.push(entry("a", &[]));
        assert!(!errors.has("a"));
    }

    #[test]
    fn clear_empties_everything() {
        let mut errors = Errors::new();
        errors.push(entry("a", &["x"]));
        errors.push(entry("b", &["y"]));
        errors.clear();

        assert!(!errors.any());
        assert!(errors.all().is_empty());
    }
}
