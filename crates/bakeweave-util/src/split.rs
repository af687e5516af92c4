use std::borrow::Cow;
use std::iter::{Enumerate, Rev};
use std::str::Chars;

use regex::{Captures, Regex};

pub fn split_filter_empty<'a>(input: &'a str, separator: &'a str) -> impl Iterator<Item = &'a str> {
    input.split(separator).filter(|v| !v.is_empty())
}

pub trait RSplitAll
where
    Self: AsRef<str>,
{
    /// Returns an iterator that produces all possible splits at the given character, moving from
    /// right to left in the input.
    ///
    /// # Example
    ///
    /// ```
    /// use bakeweave_util::split::RSplitAll;
    /// let input = "VAR:foo:bar:local";
    /// let mut iter = input.rsplit_all(':');
    /// assert_eq!(iter.next(), Some(("VAR:foo:bar", "local")));
    /// assert_eq!(iter.next(), Some(("VAR:foo", "bar:local")));
    /// assert_eq!(iter.next(), Some(("VAR", "foo:bar:local")));
    /// assert_eq!(iter.next(), None);
    /// ```
    fn rsplit_all(&self, c: char) -> RSplit<'_> {
        RSplit::new(self.as_ref(), c)
    }
}

pub struct RSplit<'a> {
    str: &'a str,
    c: char,
    iter: Enumerate<Rev<Chars<'a>>>,
}

impl<'a> RSplit<'a> {
    pub fn new(str: &'a str, c: char) -> Self {
        Self {
            str,
            c,
            iter: str.chars().rev().enumerate(),
        }
    }
}

impl<'a> Iterator for RSplit<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let search = self.c;
        let width = search.len_utf8();
        let str = self.str;
        // Enumerate counts chars, so walk back to the byte offset of the separator
        self.iter.find(|(_, c)| *c == search).map(|(i, _)| {
            let byte_index = str
                .char_indices()
                .rev()
                .nth(i)
                .map(|(idx, _)| idx)
                .unwrap_or_default();
            (&str[..byte_index], &str[byte_index + width..])
        })
    }
}

impl RSplitAll for str {}
impl RSplitAll for String {}

/// Splits `text` at every match of `r`, keeping the matched separators as their own items.
pub fn split_keep<'a>(r: &Regex, text: &'a str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut last = 0;
    for matched in r.find_iter(text) {
        if last != matched.start() {
            result.push(&text[last..matched.start()]);
        }
        result.push(matched.as_str());
        last = matched.end();
    }
    if last < text.len() {
        result.push(&text[last..]);
    }
    result
}

pub trait ReplaceFallible {
    fn replace_fallible<'t, F, E>(&self, text: &'t str, rep: F) -> Result<Cow<'t, str>, E>
    where
        F: FnMut(&Captures) -> Result<String, E>;
}

impl ReplaceFallible for Regex {
    fn replace_fallible<'t, F, E>(&self, text: &'t str, mut rep: F) -> Result<Cow<'t, str>, E>
    where
        F: FnMut(&Captures) -> Result<String, E>,
    {
        let mut new: Option<String> = None;
        let mut last_match = 0;
        for caps in self.captures_iter(text) {
            let Some(m) = caps.get(0) else {
                continue;
            };
            let buf = new.get_or_insert_with(|| String::with_capacity(text.len()));
            buf.push_str(&text[last_match..m.start()]);
            buf.push_str(&rep(&caps)?);
            last_match = m.end();
        }

        Ok(match new {
            Some(mut buf) => {
                buf.push_str(&text[last_match..]);
                Cow::Owned(buf)
            }
            None => Cow::Borrowed(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keep_whitespace() {
        let re = Regex::new(r"(\s)").unwrap();
        assert_eq!(split_keep(&re, "a  b c"), vec!["a", " ", " ", "b", " ", "c"]);
        assert_eq!(split_keep(&re, " a"), vec![" ", "a"]);
        assert!(split_keep(&re, "").is_empty());
    }

    #[test]
    fn rsplit_all_multibyte() {
        let input = "PKG:gtk+:lïbc";
        let splits = input.rsplit_all(':').collect::<Vec<_>>();
        assert_eq!(splits, vec![("PKG:gtk+", "lïbc"), ("PKG", "gtk+:lïbc")]);
    }

    fn shortest_prefix(var: &str) -> Option<&str> {
        var.rsplit_all(':').last().map(|(prefix, _)| prefix)
    }

    #[test]
    fn rsplit_all_borrows_input() {
        let owned = String::from("A:b:c");
        assert_eq!(shortest_prefix(&owned), Some("A"));
        assert_eq!(owned.rsplit_all(':').count(), 2);
        assert_eq!(shortest_prefix("A"), None);
    }

    #[test]
    fn replace_fallible_stops_on_error() {
        let re = Regex::new(r"\d").unwrap();
        let ok: Result<_, ()> = re.replace_fallible("a1b2", |c| Ok(format!("<{}>", &c[0])));
        assert_eq!(ok.unwrap(), "a<1>b<2>");

        let err: Result<_, &str> = re.replace_fallible("a1b2", |_| Err("nope"));
        assert_eq!(err.unwrap_err(), "nope");

        let untouched: Result<_, ()> = re.replace_fallible("abc", |_| Ok(String::new()));
        assert!(matches!(untouched.unwrap(), Cow::Borrowed("abc")));
    }

    #[test]
    fn filter_empty() {
        assert_eq!(
            split_filter_empty("a::b:", ":").collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }
}
