//! Command-line parameters and identity-key deduplication.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Where a parameter is placed relative to the input declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPosition {
    /// Before the `-i` declarations (global or input options).
    PreInput,
    /// After the `-i` declarations (output options).
    PostInput,
}

/// A single group of command-line tokens such as `-preset slow`.
///
/// The identity key is the first token. Two parameters compare equal when
/// their keys match, whatever their values: registering `-preset fast` after
/// `-preset slow` replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    tokens: Vec<String>,
    position: ParameterPosition,
}

impl Parameter {
    /// Parses parameter text with shell-style quoting.
    ///
    /// Text that cannot be split (an unterminated quote) falls back to
    /// whitespace splitting; ffmpeg will reject it if it is malformed.
    pub fn new(text: &str, position: ParameterPosition) -> Self {
        let tokens = shell_words::split(text.trim())
            .unwrap_or_else(|_| text.split_whitespace().map(str::to_string).collect());
        Self { tokens, position }
    }

    /// Builds a parameter from already separated tokens.
    pub fn from_tokens<I, S>(tokens: I, position: ParameterPosition) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            position,
        }
    }

    /// A post-input `flag value` pair.
    pub fn output(flag: &str, value: impl ToString) -> Self {
        Self::from_tokens([flag.to_string(), value.to_string()], ParameterPosition::PostInput)
    }

    /// A pre-input `flag value` pair.
    pub fn input(flag: &str, value: impl ToString) -> Self {
        Self::from_tokens([flag.to_string(), value.to_string()], ParameterPosition::PreInput)
    }

    /// Identity key: the first token, or an empty string for an empty parameter.
    pub fn key(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or("")
    }

    pub fn position(&self) -> ParameterPosition {
        self.position
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Rendered text with a single trailing space, e.g. `"-preset slow "`.
    pub fn text(&self) -> String {
        if self.tokens.is_empty() {
            return String::new();
        }
        let mut text = render_tokens(&self.tokens);
        text.push(' ');
        text
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Parameter {}

impl Hash for Parameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_tokens(&self.tokens))
    }
}

/// Ordered parameters where a later registration overrides an earlier one
/// with the same identity key and position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSet {
    entries: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parameter. An existing entry with the same key in the same
    /// position is removed and the new one takes the latest slot.
    pub fn add(&mut self, parameter: Parameter) {
        if parameter.is_empty() {
            return;
        }
        self.entries
            .retain(|p| !(p.position == parameter.position && p == &parameter));
        self.entries.push(parameter);
    }

    /// Removes every parameter with the given key and position.
    pub fn remove(&mut self, key: &str, position: ParameterPosition) {
        self.entries
            .retain(|p| !(p.position == position && p.key() == key));
    }

    /// Parameters in one position, in registration order.
    pub fn iter_position(
        &self,
        position: ParameterPosition,
    ) -> impl Iterator<Item = &Parameter> + '_ {
        self.entries.iter().filter(move |p| p.position == position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Parameter> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = Parameter>>(iter: T) -> Self {
        let mut set = Self::new();
        for parameter in iter {
            set.add(parameter);
        }
        set
    }
}

impl Extend<Parameter> for ParameterSet {
    fn extend<T: IntoIterator<Item = Parameter>>(&mut self, iter: T) {
        for parameter in iter {
            self.add(parameter);
        }
    }
}

/// Joins tokens with spaces, quoting the ones a shell would split.
pub fn render_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| quote_token(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders parameters back to back, each with its trailing space.
pub fn render_parameters<'a>(parameters: impl IntoIterator<Item = &'a Parameter>) -> String {
    parameters.into_iter().map(Parameter::text).collect()
}

fn quote_token(token: &str) -> Cow<'_, str> {
    let needs_quoting = token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if needs_quoting {
        shell_words::quote(token)
    } else {
        Cow::Borrowed(token)
    }
}
