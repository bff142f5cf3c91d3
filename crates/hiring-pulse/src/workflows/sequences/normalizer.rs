use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Lookup key for a sequence name: invisible characters stripped, whitespace collapsed,
/// lowercased.
pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Display form of a sequence name: same cleanup as the key, original casing kept.
pub(crate) fn clean_display(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Known sequences mapped to the role they source for and the person sending them.
///
/// Export rows frequently leave the role or sender column blank; this fills them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceDirectory {
    pub roles: BTreeMap<String, String>,
    pub senders: BTreeMap<String, String>,
}

impl SequenceDirectory {
    pub fn with_sequence(
        mut self,
        sequence: impl Into<String>,
        role: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        let sequence = sequence.into();
        self.roles.insert(sequence.clone(), role.into());
        self.senders.insert(sequence, sender.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.senders.is_empty()
    }

    pub fn role_for(&self, sequence: &str) -> Option<&str> {
        lookup(&self.roles, sequence)
    }

    pub fn sender_for(&self, sequence: &str) -> Option<&str> {
        lookup(&self.senders, sequence)
    }

    /// Tracked sequences with no entry in `present`, compared by normalized name.
    pub fn absent_from<'a, I, S>(&'a self, present: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let present: BTreeSet<String> = present
            .into_iter()
            .map(|name| normalize_name(name.as_ref()))
            .collect();
        self.roles
            .keys()
            .filter(|name| !present.contains(&normalize_name(name)))
            .map(String::as_str)
            .collect()
    }
}

fn lookup<'a>(entries: &'a BTreeMap<String, String>, sequence: &str) -> Option<&'a str> {
    if let Some(value) = entries.get(sequence) {
        return Some(value.as_str());
    }
    let wanted = normalize_name(sequence);
    entries
        .iter()
        .find(|(name, _)| normalize_name(name) == wanted)
        .map(|(_, value)| value.as_str())
}
