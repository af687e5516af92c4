use std::collections::HashSet;

use bakeweave_util::split::{RSplitAll, split_filter_empty};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

// Override names must start with a lowercase letter or digit
static OVERRIDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+").unwrap());

/// One override variant of a short variable name, e.g. for short var `A`, the variant
/// `A:foo:bar` has the override string `foo:bar`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OverrideEntry {
    pub full_var: String,
    pub override_str: String,
}

/// Tracks, for each short variable name, every stored variable that is an override variant of it.
///
/// Setting `A:b:c` records `A:b:c` under both `A:b` (override `c`) and `A` (override `b:c`).
#[derive(Clone, Debug, Default)]
pub struct PerVarOverrideData {
    data: FxHashMap<String, Vec<OverrideEntry>>,
}

/// Splits a variable name into every (short var, override) pair it is a variant of, stopping at
/// the first suffix that doesn't look like an override.
pub fn decompose_variable(var: &str) -> Vec<(&str, OverrideEntry)> {
    let mut ret = vec![];
    for (shortvar, override_str) in var.rsplit_all(':') {
        if shortvar.is_empty() || !OVERRIDE_REGEX.is_match(override_str) {
            break;
        }
        ret.push((
            shortvar,
            OverrideEntry {
                full_var: var.to_string(),
                override_str: override_str.to_string(),
            },
        ));
    }
    ret
}

impl PerVarOverrideData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: AsRef<str>>(&self, var: T) -> Option<&Vec<OverrideEntry>> {
        self.data.get(var.as_ref())
    }

    pub fn contains_key<T: AsRef<str>>(&self, var: T) -> bool {
        self.data.contains_key(var.as_ref())
    }

    pub fn record_overrides<T: AsRef<str>>(&mut self, var: T) {
        for (shortvar, entry) in decompose_variable(var.as_ref()) {
            let entries = self.data.entry(shortvar.to_string()).or_default();
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
    }

    /// Forgets `var` both as a short var and as a variant of its own short vars.
    pub fn remove_overrides<T: AsRef<str>>(&mut self, var: T) {
        let var = var.as_ref();
        self.data.remove(var);
        for (shortvar, entry) in decompose_variable(var) {
            if let Some(entries) = self.data.get_mut(shortvar) {
                entries.retain(|e| e != &entry);
            }
        }
    }

    pub fn remove<T: AsRef<str>>(&mut self, var: T) -> Option<Vec<OverrideEntry>> {
        self.data.remove(var.as_ref())
    }

    pub fn extend<T: Into<String>>(&mut self, var: T, new_entries: Vec<OverrideEntry>) {
        let entries = self.data.entry(var.into()).or_default();
        for entry in new_entries {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<OverrideEntry>)> {
        self.data.iter()
    }
}

/// The expanded value of `OVERRIDES`, in increasing priority order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveOverrides {
    list: Vec<String>,
    set: HashSet<String>,
}

impl ActiveOverrides {
    pub fn from_value(overrides: &str) -> Self {
        let list = split_filter_empty(overrides, ":")
            .map(String::from)
            .collect::<Vec<_>>();
        let set = list.iter().cloned().collect();
        ActiveOverrides { list, set }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.list
    }

    pub fn is_active(&self, override_str: &str) -> bool {
        if self.set.contains(override_str) {
            return true;
        }

        override_str.contains(':') && override_str.split(':').all(|o| self.set.contains(o))
    }

    /// Whether a keyword operation filter (the `b` in `A:append:b`) is satisfied.
    pub fn filter_matches(&self, filter: Option<&str>) -> bool {
        match filter {
            None | Some("") => true,
            Some(f) => f.split(':').all(|o| self.set.contains(o)),
        }
    }

    /// Picks the override variant that supplies the value of a short var, if any.
    ///
    /// Active variants are keyed by their override string. Each pass strips `:<override>`
    /// occurrences for every active override, in priority order, and a key that reduces to
    /// exactly an override becomes the current match. The last match wins.
    pub fn select<'a>(&self, entries: &'a [OverrideEntry]) -> Option<&'a OverrideEntry> {
        let mut active: IndexMap<String, &'a OverrideEntry> = IndexMap::new();
        for entry in entries {
            if self.is_active(&entry.override_str) {
                active.insert(entry.override_str.clone(), entry);
            }
        }

        let mut the_match = None;
        let mut modified = true;
        while modified {
            modified = false;
            for o in &self.list {
                let suffix = format!(":{o}");
                let keys = active.keys().cloned().collect::<Vec<_>>();
                for a in keys {
                    if a.ends_with(&suffix) {
                        if let Some(t) = active.shift_remove(&a) {
                            active.insert(a.replace(&suffix, ""), t);
                            modified = true;
                        }
                    } else if &a == o {
                        the_match = active.shift_remove(&a);
                    }
                }
            }
        }

        the_match
    }
}
