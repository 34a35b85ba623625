//! Splitting a raw input line into words.
//!
//! The grammar is deliberately flat: words are separated by whitespace, there is no
//! quoting or escaping, and the only token with meaning at this stage is a trailing `&`.

/// Token that, as the last word of a line, requests background execution.
pub const BACKGROUND_MARKER: &str = "&";

/// One tokenized input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Words in input order, with the background marker already removed.
    pub words: Vec<String>,
    /// True when the line ended with [`BACKGROUND_MARKER`].
    pub background: bool,
}

impl CommandLine {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The command name, if any word is left.
    pub fn name(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }
}

/// Split `line` into words.
///
/// Returns `None` for an empty or whitespace-only line. A line consisting of only `&`
/// yields an empty, backgrounded [`CommandLine`]; the dispatcher treats it as a no-op.
pub fn split_into_tokens(line: &str) -> Option<CommandLine> {
    let mut words: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
    if words.is_empty() {
        return None;
    }

    let background = words.last().is_some_and(|w| w == BACKGROUND_MARKER);
    if background {
        words.pop();
    }

    Some(CommandLine { words, background })
}
