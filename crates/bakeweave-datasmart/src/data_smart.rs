use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use bakeweave_util::split::{ReplaceFallible, split_keep};
use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, trace, warn};

use crate::errors::{DataSmartError, DataSmartResult};
use crate::overrides::{ActiveOverrides, OverrideEntry, PerVarOverrideData};
use crate::variable_contents::VariableContents;
use crate::variable_parse::VariableParse;

static SETVAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>.*?)(?P<keyword>:append|:prepend|:remove)(?::(?P<add>[^A-Z]*))?$")
        .unwrap()
});
static VAR_EXPANSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{[a-zA-Z0-9\-_+./~:]+?}").unwrap());
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\s)").unwrap());

const EXPORT_LIST_ITEM: &str = "__exportlist";
const MAX_OVERRIDE_ITERATIONS: usize = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Append,
    Prepend,
    Remove,
}

impl Keyword {
    fn from_suffix(s: &str) -> Option<Keyword> {
        match s {
            ":append" => Some(Keyword::Append),
            ":prepend" => Some(Keyword::Prepend),
            ":remove" => Some(Keyword::Remove),
            _ => None,
        }
    }
}

/// A deferred `:append`, `:prepend` or `:remove` attached to a variable, optionally filtered by
/// overrides (`A:append:foo` only applies while `foo` is active).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordOperation {
    pub value: String,
    pub filter: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct VariableEntry {
    value: Option<VariableContents>,
    weak_default: Option<VariableContents>,
    appends: Vec<KeywordOperation>,
    prepends: Vec<KeywordOperation>,
    removes: Vec<KeywordOperation>,
    flags: BTreeMap<String, VariableContents>,
    weak_default_flags: BTreeMap<String, VariableContents>,
}

impl VariableEntry {
    fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.weak_default.is_none()
            && self.appends.is_empty()
            && self.prepends.is_empty()
            && self.removes.is_empty()
            && self.flags.is_empty()
            && self.weak_default_flags.is_empty()
    }

    fn ops(&self, keyword: Keyword) -> &Vec<KeywordOperation> {
        match keyword {
            Keyword::Append => &self.appends,
            Keyword::Prepend => &self.prepends,
            Keyword::Remove => &self.removes,
        }
    }

    fn ops_mut(&mut self, keyword: Keyword) -> &mut Vec<KeywordOperation> {
        match keyword {
            Keyword::Append => &mut self.appends,
            Keyword::Prepend => &mut self.prepends,
            Keyword::Remove => &mut self.removes,
        }
    }

    fn clear_ops(&mut self) {
        self.appends.clear();
        self.prepends.clear();
        self.removes.clear();
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GetVarOptions {
    expand: bool,
    no_weak_default: bool,
    parsing: bool,
}

impl Default for GetVarOptions {
    fn default() -> Self {
        GetVarOptions {
            expand: true,
            no_weak_default: false,
            parsing: false,
        }
    }
}

impl GetVarOptions {
    pub fn new(expand: bool, no_weak_default: bool, parsing: bool) -> Self {
        GetVarOptions {
            expand,
            no_weak_default,
            parsing,
        }
    }

    pub fn no_weak_default(self, no_weak_default: bool) -> Self {
        GetVarOptions {
            no_weak_default,
            ..self
        }
    }
    pub fn expand(self, expand: bool) -> Self {
        GetVarOptions { expand, ..self }
    }
    pub fn parsing(self, parsing: bool) -> Self {
        GetVarOptions { parsing, ..self }
    }
}

#[derive(Debug, Default)]
struct ExpansionCache {
    overrides: Option<Arc<ActiveOverrides>>,
    values: FxHashMap<String, Option<VariableContents>>,
}

/// The variable store.
///
/// Values are kept unexpanded. Overrides, keyword operations and `${...}` references are all
/// resolved when a variable is read, so later changes to `OVERRIDES` or to referenced variables
/// show up without re-parsing anything. Expanded reads are cached until the next write.
///
/// Cloning produces a fully independent store.
#[derive(Debug, Default)]
pub struct DataSmart {
    vars: FxHashMap<String, VariableEntry>,
    override_data: PerVarOverrideData,
    cache: Mutex<ExpansionCache>,
}

impl Clone for DataSmart {
    fn clone(&self) -> Self {
        DataSmart {
            vars: self.vars.clone(),
            override_data: self.override_data.clone(),
            cache: Mutex::default(),
        }
    }
}

/// State for one top-level read: the active overrides (computed on first use) and the stack of
/// variables currently being expanded.
pub(crate) struct Resolver<'d> {
    d: &'d DataSmart,
    overrides: Option<Arc<ActiveOverrides>>,
    expanding: Vec<String>,
    provisional: bool,
}

impl<'d> Resolver<'d> {
    fn new(d: &'d DataSmart) -> Self {
        Resolver {
            d,
            overrides: None,
            expanding: vec![],
            provisional: false,
        }
    }

    /// A resolver working with a guessed override list while `OVERRIDES` itself is being
    /// computed. Nothing it produces may be cached.
    fn provisional(d: &'d DataSmart, overrides: ActiveOverrides) -> Self {
        Resolver {
            d,
            overrides: Some(Arc::new(overrides)),
            expanding: vec![],
            provisional: true,
        }
    }

    fn overrides(&mut self) -> DataSmartResult<Arc<ActiveOverrides>> {
        if let Some(overrides) = &self.overrides {
            return Ok(overrides.clone());
        }

        let cached = self.d.lock_cache().overrides.clone();
        let overrides = match cached {
            Some(overrides) => overrides,
            None => {
                let computed = Arc::new(self.d.compute_overrides()?);
                self.d.lock_cache().overrides = Some(computed.clone());
                computed
            }
        };

        self.overrides = Some(overrides.clone());
        Ok(overrides)
    }

    fn overrides_value(&mut self) -> DataSmartResult<ActiveOverrides> {
        let value = self
            .get_content("OVERRIDES", GetVarOptions::default())
            .context("OVERRIDES")?
            .map(|v| v.to_string())
            .unwrap_or_default();
        Ok(ActiveOverrides::from_value(&value))
    }

    pub(crate) fn get_content(
        &mut self,
        var: &str,
        options: GetVarOptions,
    ) -> DataSmartResult<Option<VariableContents>> {
        Ok(self
            .get_content_with_parser(var, options, false)?
            .map(|(value, _)| value))
    }

    fn get_content_with_parser(
        &mut self,
        var: &str,
        options: GetVarOptions,
        want_parser: bool,
    ) -> DataSmartResult<Option<(VariableContents, VariableParse)>> {
        if self.expanding.iter().any(|v| v == var) {
            return Err(DataSmartError::RecursiveReferenceError {
                var: var.to_string(),
            }
            .into());
        }

        let d = self.d;
        let cacheable = !self.provisional && !want_parser && options == GetVarOptions::default();
        if cacheable {
            if let Some(hit) = d.lock_cache().values.get(var).cloned() {
                return Ok(hit.map(|v| (v, VariableParse::new(Some(var)))));
            }
        }

        let mut value: Option<VariableContents> = None;
        let mut removes: HashSet<String> = HashSet::new();

        if !options.parsing {
            if let Some(entries) = d.override_data.get(var) {
                let overrides = self.overrides()?;
                if let Some(selected) = overrides.select(entries) {
                    trace!("{var}: override variant {} selected", selected.full_var);
                    if let Some((selected_value, subparser)) = self.get_content_with_parser(
                        &selected.full_var,
                        GetVarOptions::default().expand(false),
                        true,
                    )? {
                        value = Some(selected_value);
                        removes = subparser.removes.unwrap_or_default();
                    }
                }
            }
        }

        let entry = d.vars.get(var);
        if let Some(entry) = entry {
            if value.is_none() {
                value = entry.value.clone();
                if value.is_none() && !options.no_weak_default {
                    value = entry.weak_default.clone();
                }
            }

            if !options.parsing && !(entry.appends.is_empty() && entry.prepends.is_empty()) {
                let overrides = self.overrides()?;
                for op in &entry.appends {
                    if overrides.filter_matches(op.filter.as_deref()) {
                        let mut s = text_of(var, value)?;
                        s.push_str(&op.value);
                        value = Some(s.into());
                    }
                }
                for op in &entry.prepends {
                    if overrides.filter_matches(op.filter.as_deref()) {
                        let s = text_of(var, value)?;
                        value = Some(format!("{}{s}", op.value).into());
                    }
                }
            }
        }

        let mut parser = VariableParse::new(Some(var));
        if options.expand || want_parser {
            parser = self.expand_with_refs(value.clone(), Some(var))?;
            if options.expand {
                value = parser.value.clone();
            }
        }

        if !options.parsing && value.as_ref().is_some_and(VariableContents::is_truthy) {
            if let Some(entry) = entry {
                if !entry.removes.is_empty() {
                    let overrides = self.overrides()?;
                    for op in &entry.removes {
                        if overrides.filter_matches(op.filter.as_deref()) {
                            removes.insert(op.value.clone());
                        }
                    }
                }
            }

            if !removes.is_empty() && (options.expand || want_parser) {
                self.apply_removes(&removes, &mut parser)?;
                if options.expand {
                    value = parser.value.clone();
                }
            }
        }

        if cacheable {
            d.lock_cache()
                .values
                .insert(var.to_string(), value.clone());
        }

        Ok(value.map(|v| (v, parser)))
    }

    fn apply_removes(
        &mut self,
        removes: &HashSet<String>,
        parser: &mut VariableParse,
    ) -> DataSmartResult<()> {
        let Some(current) = parser.value.as_ref().and_then(|v| v.as_str()) else {
            return Ok(());
        };

        let mut expanded_removes = FxHashMap::default();
        for r in removes {
            let expanded = self
                .expand_with_refs(Some(r.as_str().into()), None)?
                .value_string();
            expanded_removes.insert(
                r.clone(),
                expanded
                    .split_whitespace()
                    .map(String::from)
                    .collect::<HashSet<_>>(),
            );
        }

        let mut applied = HashSet::new();
        let mut val = String::with_capacity(current.len());
        for v in split_keep(&WHITESPACE_REGEX, current) {
            let mut skip = false;
            for (r, words) in &expanded_removes {
                if words.contains(v) {
                    applied.insert(r.clone());
                    skip = true;
                }
            }
            if !skip {
                val.push_str(v);
            }
        }

        parser.value = Some(val.into());
        parser.removes = Some(applied);
        Ok(())
    }

    fn get_flag(
        &mut self,
        var: &str,
        flag: &str,
        options: GetVarOptions,
    ) -> DataSmartResult<Option<VariableContents>> {
        let d = self.d;
        let value = d.vars.get(var).and_then(|entry| {
            entry.flags.get(flag).cloned().or_else(|| {
                if options.no_weak_default {
                    None
                } else {
                    entry.weak_default_flags.get(flag).cloned()
                }
            })
        });

        if !options.expand {
            return Ok(value);
        }

        let varname = format!("{var}[{flag}]");
        Ok(self.expand_with_refs(value, Some(&varname))?.value)
    }

    pub(crate) fn expand_with_refs(
        &mut self,
        value: Option<VariableContents>,
        varname: Option<&str>,
    ) -> DataSmartResult<VariableParse> {
        let mut parser = VariableParse::new(varname);
        let text = match value {
            Some(VariableContents::String(s)) => s,
            other => {
                parser.value = other;
                return Ok(parser);
            }
        };

        if let Some(name) = varname {
            if self.expanding.iter().any(|v| v == name) {
                return Err(DataSmartError::RecursiveReferenceError {
                    var: name.to_string(),
                }
                .into());
            }
            self.expanding.push(name.to_string());
        }

        let expanded = self.expand_text(text, &mut parser);

        if varname.is_some() {
            self.expanding.pop();
        }

        parser.value = Some(expanded?.into());
        Ok(parser)
    }

    fn expand_text(&mut self, text: String, parser: &mut VariableParse) -> DataSmartResult<String> {
        let mut value = text;
        while value.contains("${") {
            let new_value = VAR_EXPANSION_REGEX
                .replace_fallible(&value, |caps: &Captures| parser.var_sub(caps, self))?
                .into_owned();

            if new_value == value {
                break;
            }
            value = new_value;
        }

        Ok(value)
    }
}

fn text_of(var: &str, value: Option<VariableContents>) -> DataSmartResult<String> {
    match value {
        None => Ok(String::new()),
        Some(VariableContents::String(s)) => Ok(s),
        Some(_) => Err(DataSmartError::DataConversionError {
            var: var.to_string(),
        }
        .into()),
    }
}

impl DataSmart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_copy(&self) -> Self {
        self.clone()
    }

    fn lock_cache(&self) -> MutexGuard<'_, ExpansionCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate_cache(&mut self) {
        let cache = self.cache.get_mut().unwrap_or_else(PoisonError::into_inner);
        *cache = ExpansionCache::default();
    }

    fn compute_overrides(&self) -> DataSmartResult<ActiveOverrides> {
        // OVERRIDES may depend on itself through override variants of the variables it
        // references, so iterate until it stops changing.
        let mut current = ActiveOverrides::default();
        let mut history = vec![];
        for _ in 0..MAX_OVERRIDE_ITERATIONS {
            let next = Resolver::provisional(self, current.clone()).overrides_value()?;
            history.push(next.as_slice().join(":"));
            if next == current {
                return Ok(next);
            }
            current = next;
        }

        Err(DataSmartError::UnstableOverridesError { history }.into())
    }

    /// The active override list, in increasing priority order.
    pub fn overrides(&self) -> DataSmartResult<Arc<ActiveOverrides>> {
        Resolver::new(self).overrides()
    }

    pub fn get_var<T: AsRef<str>>(&self, var: T) -> DataSmartResult<Option<VariableContents>> {
        self.get_var_opt(var, GetVarOptions::default())
    }

    pub fn get_var_opt<T: AsRef<str>>(
        &self,
        var: T,
        options: GetVarOptions,
    ) -> DataSmartResult<Option<VariableContents>> {
        let var = var.as_ref();
        Resolver::new(self)
            .get_content(var, options)
            .with_context(|| format!("get_var_opt {var}, {options:?}"))
    }

    /// Like [`DataSmart::get_var_opt`], but also returns the expansion details.
    pub fn get_var_with_parser<T: AsRef<str>>(
        &self,
        var: T,
        options: GetVarOptions,
    ) -> DataSmartResult<Option<(VariableContents, VariableParse)>> {
        let var = var.as_ref();
        Resolver::new(self)
            .get_content_with_parser(var, options, true)
            .with_context(|| format!("get_var_with_parser {var}"))
    }

    pub fn get_var_flag<T: AsRef<str>, F: AsRef<str>>(
        &self,
        var: T,
        flag: F,
    ) -> DataSmartResult<Option<VariableContents>> {
        self.get_var_flag_opt(var, flag, GetVarOptions::default())
    }

    pub fn get_var_flag_opt<T: AsRef<str>, F: AsRef<str>>(
        &self,
        var: T,
        flag: F,
        options: GetVarOptions,
    ) -> DataSmartResult<Option<VariableContents>> {
        let (var, flag) = (var.as_ref(), flag.as_ref());
        Resolver::new(self)
            .get_flag(var, flag, options)
            .with_context(|| format!("get_var_flag {var}[{flag}]"))
    }

    /// All flags of a variable, unexpanded.
    pub fn get_var_flags<T: AsRef<str>>(&self, var: T) -> BTreeMap<String, VariableContents> {
        self.vars
            .get(var.as_ref())
            .map(|entry| {
                let mut flags = entry.weak_default_flags.clone();
                flags.extend(entry.flags.clone());
                flags
            })
            .unwrap_or_default()
    }

    pub fn keyword_operations<T: AsRef<str>>(
        &self,
        var: T,
        keyword: Keyword,
    ) -> &[KeywordOperation] {
        self.vars
            .get(var.as_ref())
            .map(|entry| entry.ops(keyword).as_slice())
            .unwrap_or_default()
    }

    /// An API write: drops keyword operations queued on `var` and deletes its active override
    /// variants, so the value read back is exactly `value`.
    pub fn set_var<K: AsRef<str>, V: Into<VariableContents>>(
        &mut self,
        var: K,
        value: V,
    ) -> DataSmartResult<()> {
        self.set_var_opt(var, value, false)
    }

    /// A parser write: keyword operations and override variants are left alone.
    pub fn set_var_parsing<K: AsRef<str>, V: Into<VariableContents>>(
        &mut self,
        var: K,
        value: V,
    ) -> DataSmartResult<()> {
        self.set_var_opt(var, value, true)
    }

    pub fn set_var_opt<K: AsRef<str>, V: Into<VariableContents>>(
        &mut self,
        var: K,
        value: V,
        parsing: bool,
    ) -> DataSmartResult<()> {
        let var = var.as_ref();
        let value = value.into();

        if let Some(caps) = SETVAR_REGEX.captures(var) {
            let base = caps.name("base").map_or("", |m| m.as_str());
            let keyword = caps
                .name("keyword")
                .and_then(|m| Keyword::from_suffix(m.as_str()))
                .ok_or(DataSmartError::UnwrapNoneError)?;
            let filter = caps.name("add").map(|m| m.as_str().to_string());
            let VariableContents::String(text) = value else {
                return Err(DataSmartError::DataConversionError {
                    var: var.to_string(),
                }
                .into());
            };

            self.invalidate_cache();
            self.vars
                .entry(base.to_string())
                .or_default()
                .ops_mut(keyword)
                .push(KeywordOperation {
                    value: text,
                    filter,
                });
            self.override_data.record_overrides(base);
            return Ok(());
        }

        if !parsing {
            let mut active = vec![];
            if let Some(entries) = self.override_data.get(var) {
                let overrides = self.overrides()?;
                active = entries
                    .iter()
                    .filter(|e| overrides.is_active(&e.override_str))
                    .map(|e| e.full_var.clone())
                    .collect();
            }

            self.invalidate_cache();
            if let Some(entry) = self.vars.get_mut(var) {
                entry.clear_ops();
            }
            for a in active {
                self.del_var(a);
            }
            self.override_data.remove(var);
        }

        self.invalidate_cache();
        if var.contains(':') {
            self.override_data.record_overrides(var);
        }
        self.vars.entry(var.to_string()).or_default().value = Some(value);
        Ok(())
    }

    /// `??=`: used only when nothing else sets the variable.
    pub fn weak_default_var<K: AsRef<str>, V: Into<VariableContents>>(&mut self, var: K, value: V) {
        let var = var.as_ref();
        self.invalidate_cache();
        if var.contains(':') {
            self.override_data.record_overrides(var);
        }
        self.vars.entry(var.to_string()).or_default().weak_default = Some(value.into());
    }

    pub fn set_var_flag<K: AsRef<str>, F: AsRef<str>, V: Into<VariableContents>>(
        &mut self,
        var: K,
        flag: F,
        value: V,
    ) {
        let (var, flag) = (var.as_ref(), flag.as_ref());
        self.invalidate_cache();
        self.vars
            .entry(var.to_string())
            .or_default()
            .flags
            .insert(flag.to_string(), value.into());

        if flag == "export" || flag == "unexport" {
            let list = &mut self
                .vars
                .entry(EXPORT_LIST_ITEM.to_string())
                .or_default()
                .value;
            match list {
                Some(VariableContents::List(l)) => {
                    if !l.iter().any(|v| v == var) {
                        l.push(var.to_string());
                    }
                }
                _ => *list = Some(VariableContents::List(vec![var.to_string()])),
            }
        }
    }

    pub fn weak_default_var_flag<K: AsRef<str>, F: AsRef<str>, V: Into<VariableContents>>(
        &mut self,
        var: K,
        flag: F,
        value: V,
    ) {
        let (var, flag) = (var.as_ref(), flag.as_ref());
        self.invalidate_cache();
        self.vars
            .entry(var.to_string())
            .or_default()
            .weak_default_flags
            .insert(flag.to_string(), value.into());
    }

    pub fn del_var_flag<K: AsRef<str>, F: AsRef<str>>(&mut self, var: K, flag: F) {
        let (var, flag) = (var.as_ref(), flag.as_ref());
        self.invalidate_cache();
        if let Some(entry) = self.vars.get_mut(var) {
            entry.flags.remove(flag);
            entry.weak_default_flags.remove(flag);
        }
    }

    /// Removes the variable, its flags, its keyword operations and its override bookkeeping.
    pub fn del_var<K: AsRef<str>>(&mut self, var: K) {
        let var = var.as_ref();
        self.invalidate_cache();
        self.vars.remove(var);
        self.override_data.remove_overrides(var);
    }

    pub fn append_var<K: AsRef<str>, V: Into<VariableContents>>(
        &mut self,
        var: K,
        value: V,
    ) -> DataSmartResult<()> {
        let target = format!("{}:append", var.as_ref());
        self.set_var_opt(target, value, true)
    }

    pub fn prepend_var<K: AsRef<str>, V: Into<VariableContents>>(
        &mut self,
        var: K,
        value: V,
    ) -> DataSmartResult<()> {
        let target = format!("{}:prepend", var.as_ref());
        self.set_var_opt(target, value, true)
    }

    /// Moves the value, flags, keyword operations and override variants of `key` to `new_key`.
    pub fn rename_var<K: AsRef<str>, N: AsRef<str>>(
        &mut self,
        key: K,
        new_key: N,
    ) -> DataSmartResult<()> {
        let (key, new_key) = (key.as_ref(), new_key.as_ref());
        if key == new_key {
            warn!("Calling rename_var with equivalent keys ({key}) is invalid.");
            return Ok(());
        }

        let val = self
            .get_var_opt(key, GetVarOptions::default().expand(false).parsing(true))
            .with_context(|| format!("rename_var: {key}"))?;
        if let Some(val) = &val {
            self.set_var_opt(new_key, val.clone(), true)?;
        }

        if let Some(source) = self.vars.get(key).cloned() {
            for (flag, value) in source.flags {
                self.set_var_flag(new_key, flag, value);
            }
            for (flag, value) in source.weak_default_flags {
                self.weak_default_var_flag(new_key, flag, value);
            }

            self.invalidate_cache();
            let dest = self.vars.entry(new_key.to_string()).or_default();
            dest.appends.extend(source.appends);
            dest.prepends.extend(source.prepends);
            dest.removes.extend(source.removes);
            if !(dest.appends.is_empty() && dest.prepends.is_empty() && dest.removes.is_empty()) {
                self.override_data.record_overrides(new_key);
            }
        }

        if let Some(entries) = self.override_data.get(key).cloned() {
            let mut renamed = vec![];
            for entry in entries {
                let renamed_var = entry.full_var.replace(key, new_key);
                renamed.push(OverrideEntry {
                    full_var: renamed_var.clone(),
                    override_str: entry.override_str,
                });
                self.rename_var(&entry.full_var, &renamed_var)?;
            }
            self.override_data.extend(new_key, renamed);
        }

        if new_key.contains(':') && val.is_none() {
            self.override_data.record_overrides(new_key);
        }

        self.del_var(key);
        Ok(())
    }

    /// Every variable name in the store, sorted. Short names that only exist through an active
    /// override variant are included.
    pub fn keys(&self) -> DataSmartResult<Vec<String>> {
        let overrides = self.overrides()?;
        let mut ret = self
            .vars
            .iter()
            .filter(|(_, entry)| !entry.is_empty())
            .map(|(k, _)| k.clone())
            .collect::<BTreeSet<_>>();

        for (var, entries) in self.override_data.iter() {
            if entries.iter().any(|e| overrides.is_active(&e.override_str)) {
                ret.insert(var.clone());
            }
        }

        Ok(ret.into_iter().collect())
    }

    pub fn expand<T: AsRef<str>>(&self, s: T) -> DataSmartResult<String> {
        let s = s.as_ref();
        self.expand_with_refs(s, None)
            .map(|p| p.value_string())
            .with_context(|| format!("unable to expand: {s}"))
    }

    /// Expands `s` as though it were the value of `varname`, so references back to `varname`
    /// are reported as recursive.
    pub fn expand_with_varname<T: AsRef<str>, V: AsRef<str>>(
        &self,
        s: T,
        varname: V,
    ) -> DataSmartResult<String> {
        let s = s.as_ref();
        self.expand_with_refs(s, Some(varname.as_ref()))
            .map(|p| p.value_string())
            .with_context(|| format!("unable to expand: {s}"))
    }

    pub fn expand_with_refs<T: AsRef<str>>(
        &self,
        s: T,
        varname: Option<&str>,
    ) -> DataSmartResult<VariableParse> {
        Resolver::new(self).expand_with_refs(Some(s.as_ref().into()), varname)
    }

    /// Renames every variable whose name contains `${...}` to its expanded name.
    ///
    /// Names that reference undefined variables are left alone.
    pub fn expand_keys(&mut self) -> DataSmartResult<()> {
        let mut todo_list = BTreeMap::new();
        for key in self.keys()?.into_iter().filter(|k| k.contains("${")) {
            let parser = self.expand_with_refs(&key, None)?;
            if !parser.unresolved.is_empty() {
                debug!("not expanding key {key}: unresolved references");
                continue;
            }
            let expanded_key = parser.value_string();
            if expanded_key == key {
                continue;
            }
            todo_list.insert(key, expanded_key);
        }

        let raw = GetVarOptions::default().expand(false);
        for (key, expanded_key) in todo_list {
            if let Some(new_value) = self.get_var_opt(&expanded_key, raw)? {
                if let Some(value) = self.get_var_opt(&key, raw)? {
                    warn!(
                        "Variable key {key} ({value}) replaces original key {expanded_key} ({new_value})."
                    );
                }
            }
            self.rename_var(&key, &expanded_key)?;
        }

        Ok(())
    }
}
