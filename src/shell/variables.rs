//! Shell variables and `$NAME` / `${NAME}` expansion.
//!
//! The set of names is closed. Expansion runs on the raw command line before it is split into
//! words, so it also applies inside quotes; write `\$` for a literal dollar sign.

use std::collections::BTreeMap;

pub const PWD: &str = "PWD";
pub const CWD: &str = "CWD";
pub const CONV: &str = "CONV";
pub const MODEL: &str = "MODEL";
pub const PROVIDER: &str = "PROVIDER";
pub const MSG_COUNT: &str = "MSG_COUNT";
pub const MSG_PATH: &str = "MSG_PATH";
pub const MODE: &str = "MODE";

pub const VARIABLE_NAMES: [&str; 8] = [PWD, CWD, CONV, MODEL, PROVIDER, MSG_COUNT, MSG_PATH, MODE];

/// Current values of the shell variables. Names outside [`VARIABLE_NAMES`] are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<&'static str, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        if let Some(known) = VARIABLE_NAMES.iter().find(|known| **known == name) {
            self.values.insert(*known, value.into());
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Value of `name`, or `""` when unset or unknown
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Every variable in [`VARIABLE_NAMES`] order, unset ones as `""`
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        VARIABLE_NAMES.iter().map(move |name| (*name, self.get(name)))
    }

    /// Replace `$NAME` and `${NAME}` references in `input`.
    ///
    /// - Unknown names expand to `""`
    /// - A `$` not followed by a name (or an unclosed `${`) is kept literally
    /// - `\$` is left in place for the tokenizer, which turns it into a literal `$`
    pub fn expand(&self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        let mut chars = input.char_indices().peekable();

        while let Some((i, ch)) = chars.next() {
            match ch {
                '\\' => {
                    output.push(ch);
                    if let Some((_, next)) = chars.next() {
                        output.push(next);
                    }
                }
                '$' => {
                    let rest = &input[i + 1..];
                    match read_reference(rest) {
                        Some((name, consumed)) => {
                            output.push_str(self.get(name));
                            for _ in 0..consumed {
                                chars.next();
                            }
                        }
                        None => output.push('$'),
                    }
                }
                _ => output.push(ch),
            }
        }

        output
    }
}

/// Parse the reference after a `$`: returns the name and how many chars it spans
fn read_reference(rest: &str) -> Option<(&str, usize)> {
    if let Some(braced) = rest.strip_prefix('{') {
        let end = braced.find('}')?;
        let name = &braced[..end];
        if !is_name(name) {
            return None;
        }
        return Some((name, name.chars().count() + 2));
    }

    let end = rest
        .char_indices()
        .find(|&(i, c)| !(c == '_' || c.is_ascii_alphanumeric()) || (i == 0 && c.is_ascii_digit()))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let name = &rest[..end];
    if name.is_empty() {
        return None;
    }
    Some((name, name.chars().count()))
}

fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
