//! Parser for model replies in the `Thought:` / `Action:` format
//!
//! Grammar of one step:
//!
//! ```text
//! [Thought: <text>]
//! Action: <tool_name>(<key>="<value>", ...)
//!       | Finish[<answer>]
//! ```
//!
//! The model is not trusted to follow it. Nothing here fails: a reply that
//! does not fit the grammar becomes [`Action::Malformed`] with a reason the
//! loop can feed back as an observation.
//!
//! Markers are recognised anywhere a word starts, so `Thought: ok. Action: x()`
//! on one line parses. An action body ends at the next marker that sits
//! outside its brackets and quotes; `Finish[the Action: plan]` keeps its
//! whole answer. An empty final answer is malformed.

use std::sync::OnceLock;

use regex::Regex;
use reactant_config::MultiActionPolicy;

use crate::tools::Arguments;

const FINISH_TOKEN: &str = "Finish";

pub const NO_ACTION: &str = "No `Action:` line found. Reply with one `Thought:` line followed by one `Action:` line.";
pub const EMPTY_ACTION: &str = "The `Action:` line is empty.";
pub const MULTIPLE_ACTIONS: &str = "More than one `Action:` found. Reply with exactly one Thought/Action pair.";
pub const UNCLOSED_FINISH: &str = "`Finish[` has no closing `]`. Use Finish[answer].";
pub const EMPTY_ANSWER: &str = "The final answer is empty. Put the answer inside Finish[answer].";
pub const BAD_FINISH: &str = "Could not read the final answer. Use Finish[answer].";
pub const BAD_TOOL_CALL: &str = "Action is neither a tool call `tool_name(arg=\"value\")` nor `Finish[answer]`.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Thought,
    Action,
    Observation,
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    kind: MarkerKind,
    start: usize,
    end: usize,
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(Thought|Action|Observation)[ \t]*:[ \t]*").expect("marker pattern is valid")
    })
}

fn markers(text: &str) -> Vec<Marker> {
    marker_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = match &caps[1] {
                "Thought" => MarkerKind::Thought,
                "Action" => MarkerKind::Action,
                _ => MarkerKind::Observation,
            };
            Some(Marker {
                kind,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// No bracket or quote left open in `text`
fn balanced(text: &str) -> bool {
    let mut open: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;

    for c in text.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '[' | '(' => open.push(c),
            ']' | ')' => {
                open.pop();
            }
            '"' if !open.is_empty() => quote = Some('"'),
            '\'' if open.last() == Some(&'(') => quote = Some('\''),
            _ => {}
        }
    }
    open.is_empty() && quote.is_none()
}

/// End of the action body starting at `from`. A body that never balances
/// is cut at the next marker.
fn action_end(text: &str, from: usize, markers: &[Marker]) -> usize {
    let mut following = markers.iter().filter(|m| m.start >= from);
    let first = following.clone().next();

    if let Some(m) = following.find(|m| balanced(&text[from..m.start])) {
        return m.start;
    }
    if balanced(&text[from..]) {
        return text.len();
    }
    first.map(|m| m.start).unwrap_or(text.len())
}

fn tool_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^(\w+)\s*\((.*)\)").expect("call pattern is valid"))
}

fn argument() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(\w+)\s*[=:]?\s*(?:"([^"]*)"|'([^']*)')"#).expect("argument pattern is valid")
    })
}

fn quoted_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)^\(\s*"(.*)"\s*\)"#).expect("finish pattern is valid"))
}

/// What the model asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ToolCall { name: String, arguments: Arguments },
    Finish { answer: String },
    Malformed { reason: String },
}

/// One parsed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStep {
    pub thought: Option<String>,
    pub action: Action,
    /// The part of the reply the step was read from; trailing pairs are cut off
    pub text: String,
}

impl ParsedStep {
    pub fn tool_name(&self) -> Option<&str> {
        match &self.action {
            Action::ToolCall { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn arguments(&self) -> Option<&Arguments> {
        match &self.action {
            Action::ToolCall { arguments, .. } => Some(arguments),
            _ => None,
        }
    }

    pub fn finish_answer(&self) -> Option<&str> {
        match &self.action {
            Action::Finish { answer } => Some(answer),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.action, Action::Malformed { .. })
    }
}

/// Reads a model reply into a [`ParsedStep`]
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputParser {
    policy: MultiActionPolicy,
}

impl OutputParser {
    pub fn new(policy: MultiActionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MultiActionPolicy {
        self.policy
    }

    pub fn parse(&self, text: &str) -> ParsedStep {
        let markers = markers(text);
        let Some(action) = markers.iter().find(|m| m.kind == MarkerKind::Action) else {
            return ParsedStep {
                thought: first_thought(text, text.len(), &markers),
                action: malformed(NO_ACTION),
                text: text.trim().to_string(),
            };
        };

        let body_end = action_end(text, action.end, &markers);
        let action_text = text[action.end..body_end].trim();
        let thought = first_thought(text, action.start, &markers);

        if self.policy == MultiActionPolicy::Reject
            && markers
                .iter()
                .any(|m| m.kind == MarkerKind::Action && m.start >= body_end)
        {
            return ParsedStep {
                thought,
                action: malformed(MULTIPLE_ACTIONS),
                text: text.trim().to_string(),
            };
        }

        ParsedStep {
            thought,
            action: parse_action(action_text),
            text: text[..body_end].trim().to_string(),
        }
    }
}

fn malformed(reason: &str) -> Action {
    Action::Malformed {
        reason: reason.to_string(),
    }
}

/// First `Thought:` section starting before `limit`, up to the next marker
fn first_thought(text: &str, limit: usize, markers: &[Marker]) -> Option<String> {
    let (i, marker) = markers
        .iter()
        .enumerate()
        .find(|(_, m)| m.kind == MarkerKind::Thought && m.start < limit)?;
    let end = markers
        .get(i + 1)
        .map(|next| next.start)
        .unwrap_or(text.len());

    let thought = text[marker.end..end].trim();
    if thought.is_empty() {
        None
    } else {
        Some(thought.to_string())
    }
}

fn parse_action(action: &str) -> Action {
    if action.is_empty() {
        return malformed(EMPTY_ACTION);
    }
    if is_finish(action) {
        return parse_finish(&action[FINISH_TOKEN.len()..]);
    }

    match tool_call().captures(action) {
        Some(caps) => {
            let name = caps[1].to_string();
            let arguments = parse_arguments(caps.get(2).map(|m| m.as_str()).unwrap_or(""));
            Action::ToolCall { name, arguments }
        }
        None => malformed(BAD_TOOL_CALL),
    }
}

/// `Finish` as a whole word at the start of the action
fn is_finish(action: &str) -> bool {
    action.starts_with(FINISH_TOKEN)
        && !action[FINISH_TOKEN.len()..]
            .chars()
            .next()
            .map(|c| c.is_alphanumeric() || c == '_')
            .unwrap_or(false)
}

fn parse_finish(rest: &str) -> Action {
    let rest = rest.trim_start();

    let inner = if rest.starts_with('[') {
        match bracket_contents(rest) {
            Some(inner) => inner,
            None => return malformed(UNCLOSED_FINISH),
        }
    } else if rest.starts_with('(') {
        match quoted_call().captures(rest).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => return malformed(BAD_FINISH),
        }
    } else if let Some(after_colon) = rest.strip_prefix(':') {
        if after_colon.trim().is_empty() {
            return malformed(BAD_FINISH);
        }
        after_colon
    } else {
        return malformed(BAD_FINISH);
    };

    let answer = strip_quotes(inner.trim()).trim();
    if answer.is_empty() {
        return malformed(EMPTY_ANSWER);
    }
    Action::Finish {
        answer: answer.to_string(),
    }
}

/// Contents of the bracket pair opening at the start of `text`. Nesting is
/// honoured; unbalanced inner brackets fall back to the last `]`.
fn bracket_contents(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[1..i]);
                }
            }
            _ => {}
        }
    }
    text.rfind(']').map(|i| &text[1..i])
}

fn strip_quotes(s: &str) -> &str {
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if s.len() >= open.len_utf8() + close.len_utf8()
            && s.starts_with(open)
            && s.ends_with(close)
        {
            return &s[open.len_utf8()..s.len() - close.len_utf8()];
        }
    }
    s
}

/// Best-effort `key="value"` extraction; anything else is ignored
pub fn parse_arguments(text: &str) -> Arguments {
    argument()
        .captures_iter(text)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");
            (caps[1].to_string(), value.to_string())
        })
        .collect()
}
