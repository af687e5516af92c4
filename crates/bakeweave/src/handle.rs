//! Inclusion controller: turns a file on disk into one or more finalised datastores.
//!
//! [`Parser::handle`] is the entry point. A `.bb` recipe comes back as the default context
//! (key `""`) plus one context per `BBCLASSEXTEND` entry, each cloned from the unfinalised
//! recipe so that nothing done while building one variant is visible in another. Classes,
//! includes and configuration files are parsed into a clone of the base store and returned
//! under `""` as-is.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use bakeweave_datasmart::{DataSmart, VariableContents};
use bakeweave_syntax::ParseMode;
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::BakeweaveResult;
use crate::build;
use crate::errors::{ParseError, ParseErrorKind, SkipRecipe};
use crate::evaluate::{ANON_FUNCS_VAR, Evaluate};
use crate::executor::{FunctionExecutor, NoopExecutor};
use crate::locator::{BbPathLocator, FileLocator};
use crate::nodes::parse_nodes;
use crate::siggen::{NoopSignatureGenerator, SignatureGenerator};
use crate::utils::{list_var, raw};

const INHERIT_CACHE_VAR: &str = "__inherit_cache";
const DEPENDS_VAR: &str = "__depends";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Include,
    Require,
}

impl Directive {
    pub fn as_str(self) -> &'static str {
        match self {
            Directive::Include => "include",
            Directive::Require => "require",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FileKind {
    Recipe,
    Append,
    Class,
    Include,
    Config,
}

impl FileKind {
    fn of(path: &Path) -> Option<Self> {
        let kind = match path.extension()?.to_str()? {
            "bb" => FileKind::Recipe,
            "bbappend" => FileKind::Append,
            "bbclass" => FileKind::Class,
            "inc" => FileKind::Include,
            "conf" => FileKind::Config,
            _ => return None,
        };
        Some(kind)
    }

    fn mode(self) -> ParseMode {
        match self {
            FileKind::Config => ParseMode::Config,
            _ => ParseMode::Recipe,
        }
    }
}

fn classname_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn skipped_marker(skip: &SkipRecipe) -> String {
    match skip.0.is_empty() {
        true => "1".to_string(),
        false => skip.0.clone(),
    }
}

pub struct Parser {
    executor: Box<dyn FunctionExecutor>,
    signature_generator: Box<dyn SignatureGenerator>,
    locator: Box<dyn FileLocator>,
}

impl Default for Parser {
    fn default() -> Self {
        Parser {
            executor: Box::new(NoopExecutor),
            signature_generator: Box::new(NoopSignatureGenerator),
            locator: Box::new(BbPathLocator),
        }
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executor<E: FunctionExecutor + 'static>(mut self, executor: E) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Usually the result of [`crate::siggen::init`].
    pub fn with_signature_generator(mut self, generator: Box<dyn SignatureGenerator>) -> Self {
        self.signature_generator = generator;
        self
    }

    pub fn with_locator<L: FileLocator + 'static>(mut self, locator: L) -> Self {
        self.locator = Box::new(locator);
        self
    }

    /// Parses `path` against a clone of `base`. The base store itself is never modified.
    pub fn handle<P: AsRef<Path>>(
        &self,
        path: P,
        base: &DataSmart,
    ) -> BakeweaveResult<IndexMap<String, DataSmart>> {
        let path = path.as_ref();
        let mut d = base.create_copy();

        let kind = FileKind::of(path).ok_or_else(|| ParseError {
            file: path.to_path_buf(),
            line: 0,
            kind: ParseErrorKind::UnsupportedFile(path.to_path_buf()),
        })?;

        let abs_path = self.locator.locate(path, &d, None)?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file {} not found", path.display()),
            )
        })?;

        let mut session = ParseSession::new(self);
        let mut ret = IndexMap::new();
        match kind {
            FileKind::Recipe => {
                d.set_var("FILE", abs_path.display().to_string())?;
                if let Err(err) = session.evaluate_file(&abs_path, &mut d, 0) {
                    let skip = err.downcast_ref::<SkipRecipe>().map(skipped_marker);
                    let Some(skip) = skip else {
                        return Err(err);
                    };
                    d.set_var("__SKIPPED", skip)?;
                    ret.insert(String::new(), d);
                    return Ok(ret);
                }
                return self.multi_finalize(&abs_path, d);
            }
            FileKind::Config => {
                if d.get_var_opt("TOPDIR", raw())?.is_none() {
                    let topdir = std::env::current_dir()?;
                    d.set_var("TOPDIR", topdir.display().to_string())?;
                }
                session.evaluate_file(&abs_path, &mut d, 0)?;
            }
            FileKind::Class => {
                push_unique(&mut d, INHERIT_CACHE_VAR, &abs_path)?;
                session.evaluate_file(&abs_path, &mut d, 0)?;
            }
            FileKind::Append | FileKind::Include => {
                session.evaluate_file(&abs_path, &mut d, 0)?;
            }
        }

        ret.insert(String::new(), d);
        Ok(ret)
    }

    /// Evaluates `text` into `d` as though it were the contents of `file`. Nothing is
    /// finalised.
    #[cfg(test)]
    pub(crate) fn evaluate_text(&self, text: &str, file: &Path, d: &mut DataSmart) -> BakeweaveResult<()> {
        let mode = FileKind::of(file).map_or(ParseMode::Recipe, FileKind::mode);
        let nodes = parse_nodes(text, file, mode)?;

        let mut session = ParseSession::new(self);
        session.files.push(FileContext {
            path: file.to_path_buf(),
            classname: match FileKind::of(file) {
                Some(FileKind::Class) => classname_of(file),
                _ => None,
            },
        });
        nodes.evaluate(d, &mut session)
    }

    fn multi_finalize(
        &self,
        file: &Path,
        mut d: DataSmart,
    ) -> BakeweaveResult<IndexMap<String, DataSmart>> {
        let mut session = ParseSession::new(self);
        session.files.push(FileContext {
            path: file.to_path_buf(),
            classname: None,
        });

        for append in list_var(&d, "__BBAPPEND")? {
            debug!("Appending .bbappend file {append} to {}", file.display());
            session.evaluate_file(Path::new(&append), &mut d, 0)?;
        }

        let safe_d = d.create_copy();
        self.finalize_or_skip(file, &mut d, None)?;

        let extended = d
            .get_var("BBCLASSEXTEND")?
            .map(|v| v.to_string())
            .unwrap_or_default();
        let pn = d.get_var("PN")?.map(|v| v.to_string());

        let mut ret = IndexMap::new();
        ret.insert(String::new(), d);

        for entry in extended.split_whitespace() {
            let mut vd = safe_d.create_copy();
            let mut parts = entry.splitn(3, ':');
            let class = parts.next().unwrap_or(entry);
            match parts.next() {
                Some(variant) => {
                    vd.set_var("BBEXTENDCURR", class)?;
                    vd.set_var("BBEXTENDVARIANT", variant)?;
                }
                None => {
                    if let Some(pn) = &pn {
                        vd.set_var("PN", format!("{pn}-{entry}"))?;
                    }
                }
            }

            trace!("creating variant {entry} of {}", file.display());
            session.inherit_class(class, 0, &mut vd)?;
            self.finalize_or_skip(file, &mut vd, Some(entry))?;
            ret.insert(entry.to_string(), vd);
        }

        Ok(ret)
    }

    fn finalize_or_skip(
        &self,
        file: &Path,
        d: &mut DataSmart,
        variant: Option<&str>,
    ) -> BakeweaveResult<()> {
        match self.finalize(file, d, variant) {
            Ok(()) => Ok(()),
            Err(err) => match err.downcast_ref::<SkipRecipe>() {
                Some(skip) => {
                    debug!("{} ({variant:?}) skipped: {skip}", file.display());
                    d.set_var("__SKIPPED", skipped_marker(skip))?;
                    Ok(())
                }
                None => Err(err),
            },
        }
    }

    fn finalize(&self, file: &Path, d: &mut DataSmart, variant: Option<&str>) -> BakeweaveResult<()> {
        d.expand_keys()?;

        for func in list_var(d, ANON_FUNCS_VAR)? {
            trace!("running anonymous function {func}");
            self.executor.execute(&func, d)?;
        }

        build::add_tasks(d)?;
        self.signature_generator.finalise(file, d, variant)?;

        let depends = list_var(d, DEPENDS_VAR)?;
        d.set_var("BBINCLUDED", depends.join(" "))?;
        Ok(())
    }
}

fn push_unique(d: &mut DataSmart, var: &str, path: &Path) -> BakeweaveResult<bool> {
    let path = path.display().to_string();
    let mut list = list_var(d, var)?;
    if list.contains(&path) {
        return Ok(false);
    }
    list.push(path);
    d.set_var(var, VariableContents::List(list))?;
    Ok(true)
}

struct FileContext {
    path: PathBuf,
    classname: Option<String>,
}

/// The stack of files being evaluated for one `handle` call.
pub struct ParseSession<'p> {
    parser: &'p Parser,
    files: Vec<FileContext>,
}

impl<'p> ParseSession<'p> {
    fn new(parser: &'p Parser) -> Self {
        ParseSession {
            parser,
            files: vec![],
        }
    }

    pub fn current_file(&self) -> &Path {
        self.files
            .last()
            .map_or(Path::new(""), |f| f.path.as_path())
    }

    /// Name of the class whose text is being evaluated, if any. Files included from a class
    /// share its name.
    pub fn classname(&self) -> Option<&str> {
        self.files.last().and_then(|f| f.classname.as_deref())
    }

    fn parse_error(&self, line: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            file: self.current_file().to_path_buf(),
            line,
            kind,
        }
    }

    fn evaluate_file(&mut self, path: &Path, d: &mut DataSmart, line: usize) -> BakeweaveResult<()> {
        if self.files.iter().any(|f| f.path == path) {
            return Err(self
                .parse_error(line, ParseErrorKind::RecursiveInclusion(path.to_path_buf()))
                .into());
        }

        let kind = FileKind::of(path).ok_or_else(|| {
            self.parse_error(line, ParseErrorKind::UnsupportedFile(path.to_path_buf()))
        })?;

        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        let nodes = parse_nodes(&text, path, kind.mode())?;

        let classname = match kind {
            FileKind::Class => classname_of(path),
            _ => self.classname().map(String::from),
        };

        // Nested files (but not classes) see their own name in FILE while they are evaluated.
        let nested = !self.files.is_empty() && kind != FileKind::Class;
        let old_file = match nested {
            true => {
                let old = d.get_var_opt("FILE", raw())?;
                d.set_var("FILE", path.display().to_string())?;
                old
            }
            false => None,
        };

        self.files.push(FileContext {
            path: path.to_path_buf(),
            classname,
        });
        let res = nodes.evaluate(d, self);
        self.files.pop();

        if nested {
            match old_file {
                Some(old) => d.set_var("FILE", old)?,
                None => d.del_var("FILE"),
            }
        }

        res.with_context(|| format!("failure to evaluate metadata for {}", path.display()))
    }

    fn mark_dependency(&self, d: &mut DataSmart, path: &Path) -> BakeweaveResult<()> {
        if !push_unique(d, DEPENDS_VAR, path)? {
            warn!(
                "Duplicate inclusion for {} in {}",
                path.display(),
                self.current_file().display()
            );
        }
        Ok(())
    }

    /// `include`/`require`: each whitespace-separated (expanded) name is located and evaluated
    /// into `d`.
    pub fn include(
        &mut self,
        what: &str,
        directive: Directive,
        line: usize,
        d: &mut DataSmart,
    ) -> BakeweaveResult<()> {
        let files = d.expand(what)?;
        for file in files.split_whitespace() {
            let located = self
                .parser
                .locator
                .locate(Path::new(file), d, Some(self.current_file()))?;

            let Some(path) = located else {
                if directive == Directive::Require {
                    return Err(self
                        .parse_error(
                            line,
                            ParseErrorKind::MissingFile {
                                directive: directive.as_str(),
                                file: file.to_string(),
                            },
                        )
                        .into());
                }
                debug!(
                    "CONF file '{file}' not found (included from {}:{line})",
                    self.current_file().display()
                );
                continue;
            };

            self.mark_dependency(d, &path)?;
            trace!("{} {}", directive.as_str(), path.display());
            self.evaluate_file(&path, d, line)?;
        }

        Ok(())
    }

    /// `inherit`: each whitespace-separated (expanded) class is evaluated into `d` once.
    pub fn inherit(&mut self, classes: &str, line: usize, d: &mut DataSmart) -> BakeweaveResult<()> {
        let classes = d.expand(classes)?;
        for class in classes.split_whitespace() {
            self.inherit_class(class, line, d)?;
        }

        Ok(())
    }

    fn inherit_class(&mut self, class: &str, line: usize, d: &mut DataSmart) -> BakeweaveResult<()> {
        let mut dirs = vec![];
        if let Some(classtype) = d.get_var_opt("__bbclasstype", raw())? {
            dirs.push(format!("classes-{classtype}"));
        }
        dirs.push("classes".to_string());

        let mut found = None;
        for dir in &dirs {
            let candidate = match Path::new(class).is_absolute() || class.ends_with(".bbclass") {
                true => PathBuf::from(class),
                false => Path::new(dir).join(format!("{class}.bbclass")),
            };
            found = self
                .parser
                .locator
                .locate(&candidate, d, Some(self.current_file()))?;
            if found.is_some() {
                break;
            }
        }

        let Some(path) = found else {
            return Err(self
                .parse_error(line, ParseErrorKind::MissingClass(class.to_string()))
                .into());
        };

        if list_var(d, INHERIT_CACHE_VAR)?.contains(&path.display().to_string()) {
            if self.files.iter().any(|f| f.path == path) {
                return Err(self
                    .parse_error(line, ParseErrorKind::RecursiveInclusion(path))
                    .into());
            }
            trace!("{} already inherited", path.display());
            return Ok(());
        }

        debug!(
            "Inheriting {} (from {}:{line})",
            path.display(),
            self.current_file().display()
        );
        push_unique(d, INHERIT_CACHE_VAR, &path)?;
        self.mark_dependency(d, &path)?;
        self.evaluate_file(&path, d, line)
    }
}
