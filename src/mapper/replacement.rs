//! Explaining a textual difference between two fragments of the same kind
//! by a short list of typed substitutions.

use crate::fragment::{CodeFragment, FragmentFacts, OperationBody};
use crate::model::variable::VariableRole;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"[A-Za-z_][A-Za-z0-9_]*|\d+(?:\.\d+)?|"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|\S"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementType {
    /// A conditional expression replaced by one of its branches, or the reverse
    TernaryBranch,
    ParameterToArgument,
    /// A variable replaced by a receiver-qualified field access
    VariableToField,
    FieldToVariable,
    /// An expression replaced by a variable initialized with it
    ExtractVariable,
    /// A variable replaced by its initializer
    InlineVariable,
    InvocationName,
    InvocationQualifier,
    FieldAccessQualifier,
    FieldAccessName,
    VariableName,
    VariableToExpression,
    ExpressionToVariable,
    Literal,
    Argument,
}

impl fmt::Display for ReplacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TernaryBranch => "ternary branch",
            Self::ParameterToArgument => "parameter to argument",
            Self::VariableToField => "variable to field",
            Self::FieldToVariable => "field to variable",
            Self::ExtractVariable => "extract variable",
            Self::InlineVariable => "inline variable",
            Self::InvocationName => "invocation name",
            Self::InvocationQualifier => "invocation qualifier",
            Self::FieldAccessQualifier => "field access qualifier",
            Self::FieldAccessName => "field access name",
            Self::VariableName => "variable name",
            Self::VariableToExpression => "variable to expression",
            Self::ExpressionToVariable => "expression to variable",
            Self::Literal => "literal",
            Self::Argument => "argument",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Replacement {
    pub kind: ReplacementType,
    pub before: String,
    pub after: String,
}

impl Replacement {
    pub fn new(kind: ReplacementType, before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            kind,
            before: before.into(),
            after: after.into(),
        }
    }
}

/// Substitutions implied by calling an extracted operation or inlining one:
/// pairs of (text on the before side, text on the after side)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBinding {
    pub pairs: Vec<(String, String)>,
}

impl ParameterBinding {
    /// Before code used the arguments; the extracted body uses parameters
    pub fn extracted(parameters: &[&str], arguments: &[String]) -> Self {
        Self {
            pairs: arguments
                .iter()
                .zip(parameters)
                .filter(|(argument, parameter)| argument.as_str() != **parameter)
                .map(|(argument, parameter)| (argument.clone(), parameter.to_string()))
                .collect(),
        }
    }

    /// The inlined body used parameters; after code uses the arguments
    pub fn inlined(parameters: &[&str], arguments: &[String]) -> Self {
        Self {
            pairs: parameters
                .iter()
                .zip(arguments)
                .filter(|(parameter, argument)| **parameter != argument.as_str())
                .map(|(parameter, argument)| (parameter.to_string(), argument.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// What the finder may consult besides the two fragments
pub struct ReplacementContext<'a> {
    pub before_body: &'a OperationBody,
    pub after_body: &'a OperationBody,
    pub binding: &'a ParameterBinding,
    pub receivers: &'static [&'static str],
    pub max_replacements: usize,
}

/// Source-level tokens: identifiers, numbers, quoted strings, punctuation
pub fn tokenize(text: &str) -> Vec<&str> {
    TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Identifier tokens of `text`
pub fn identifiers(text: &str) -> Vec<&str> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.starts_with(|c: char| c.is_alphabetic() || c == '_'))
        .collect()
}

/// Levenshtein distance over token sequences
pub fn token_distance(a: &[&str], b: &[&str]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, a_token) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_token) in b.iter().enumerate() {
            let cost = if a_token == b_token { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace every occurrence of `from` that is not part of a longer
/// identifier or the member part of a qualified name. `None` when nothing
/// was replaced.
pub fn replace_identifier_aware(text: &str, from: &str, to: &str) -> Option<String> {
    if from.is_empty() || from == to {
        return None;
    }
    let starts_with_word = from.starts_with(is_identifier_char);
    let ends_with_word = from.ends_with(is_identifier_char);

    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    let mut replaced = false;
    for (start, _) in text.match_indices(from) {
        if start < last {
            continue;
        }
        let end = start + from.len();
        let before_ok = !starts_with_word
            || text[..start]
                .chars()
                .next_back()
                .is_none_or(|c| !is_identifier_char(c) && c != '.');
        let after_ok = !ends_with_word
            || text[end..]
                .chars()
                .next()
                .is_none_or(|c| !is_identifier_char(c));
        if before_ok && after_ok {
            result.push_str(&text[last..start]);
            result.push_str(to);
            last = end;
            replaced = true;
        }
    }
    if !replaced {
        return None;
    }
    result.push_str(&text[last..]);
    Some(result)
}

fn push(candidates: &mut Vec<Replacement>, kind: ReplacementType, before: &str, after: &str) {
    if before.is_empty() || before == after {
        return;
    }
    let duplicate = candidates
        .iter()
        .any(|c| c.before == before && c.after == after);
    if !duplicate {
        candidates.push(Replacement::new(kind, before, after));
    }
}

fn contains_word(text: &str, needle: &str) -> bool {
    replace_identifier_aware(text, needle, "\u{0}").is_some()
}

/// Candidate substitutions in priority order
fn candidates(
    before: &CodeFragment,
    after: &CodeFragment,
    context: &ReplacementContext<'_>,
) -> Vec<Replacement> {
    use ReplacementType::*;

    let fb: &FragmentFacts = &before.facts;
    let fa: &FragmentFacts = &after.facts;
    let is_receiver = |text: &str| context.receivers.contains(&text);
    let mut list = Vec::new();

    for ternary in &fb.ternaries {
        push(&mut list, TernaryBranch, &ternary.text, &ternary.then_branch);
        push(&mut list, TernaryBranch, &ternary.text, &ternary.else_branch);
    }
    for ternary in &fa.ternaries {
        push(&mut list, TernaryBranch, &ternary.then_branch, &ternary.text);
        push(&mut list, TernaryBranch, &ternary.else_branch, &ternary.text);
    }

    for (from, to) in &context.binding.pairs {
        if contains_word(&before.text, from) {
            push(&mut list, ParameterToArgument, from, to);
        }
    }

    let removed_variables: Vec<&String> = fb
        .variables
        .iter()
        .filter(|v| !fa.mentions_variable(v))
        .collect();
    let added_variables: Vec<&String> = fa
        .variables
        .iter()
        .filter(|v| !fb.mentions_variable(v))
        .collect();

    for variable in &removed_variables {
        for field in fa.field_accesses.iter().filter(|f| is_receiver(&f.receiver)) {
            if !fb.accesses_field(&field.receiver, &field.name) {
                push(&mut list, VariableToField, variable, &field.text);
            }
        }
    }
    for field in fb.field_accesses.iter().filter(|f| is_receiver(&f.receiver)) {
        if fa.accesses_field(&field.receiver, &field.name) {
            continue;
        }
        for variable in &added_variables {
            push(&mut list, FieldToVariable, &field.text, variable);
        }
    }

    for declaration in context
        .after_body
        .declarations
        .iter()
        .filter(|d| d.role == VariableRole::Local)
    {
        let Some(initializer) = &declaration.initializer else {
            continue;
        };
        if fa.mentions_variable(&declaration.name)
            && !fb.mentions_variable(&declaration.name)
            && before.text.contains(initializer.as_str())
        {
            push(&mut list, ExtractVariable, initializer, &declaration.name);
        }
    }
    for declaration in context
        .before_body
        .declarations
        .iter()
        .filter(|d| d.role == VariableRole::Local)
    {
        let Some(initializer) = &declaration.initializer else {
            continue;
        };
        if fb.mentions_variable(&declaration.name)
            && !fa.mentions_variable(&declaration.name)
            && after.text.contains(initializer.as_str())
        {
            push(&mut list, InlineVariable, &declaration.name, initializer);
        }
    }

    for i in &fb.invocations {
        for j in &fa.invocations {
            if i.receiver == j.receiver && i.arguments == j.arguments && i.name != j.name {
                push(&mut list, InvocationName, &i.text, &j.text);
            } else if i.name == j.name && i.arguments == j.arguments && i.receiver != j.receiver {
                push(&mut list, InvocationQualifier, &i.text, &j.text);
            }
        }
    }

    for f in &fb.field_accesses {
        for g in &fa.field_accesses {
            if f.name == g.name && f.receiver != g.receiver {
                push(&mut list, FieldAccessQualifier, &f.text, &g.text);
            } else if f.receiver == g.receiver && f.name != g.name {
                push(&mut list, FieldAccessName, &f.text, &g.text);
            }
        }
    }

    for variable in &removed_variables {
        for other in &added_variables {
            push(&mut list, VariableName, variable, other);
        }
    }

    for variable in &removed_variables {
        for expression in fa.expressions() {
            if !before.text.contains(expression) {
                push(&mut list, VariableToExpression, variable, expression);
            }
        }
    }
    for expression in fb.expressions() {
        if after.text.contains(expression) {
            continue;
        }
        for variable in &added_variables {
            push(&mut list, ExpressionToVariable, expression, variable);
        }
    }

    for literal in fb.literals.iter().filter(|l| !fa.literals.contains(l)) {
        for other in fa.literals.iter().filter(|l| !fb.literals.contains(l)) {
            push(&mut list, Literal, literal, other);
        }
    }

    for argument in fb.arguments.iter().filter(|a| !fa.arguments.contains(a)) {
        for other in fa.arguments.iter().filter(|a| !fb.arguments.contains(a)) {
            push(&mut list, Argument, argument, other);
        }
    }

    list
}

/// Find substitutions that turn `before.text` into `after.text`.
///
/// Greedy: each round applies the candidate that brings the token distance
/// down the most, earlier candidates winning ties. `None` when the texts
/// cannot be reconciled within `max_replacements` substitutions.
pub fn find_replacements(
    before: &CodeFragment,
    after: &CodeFragment,
    context: &ReplacementContext<'_>,
) -> Option<Vec<Replacement>> {
    if before.kind != after.kind || before.text == after.text {
        return None;
    }
    let target = tokenize(&after.text);
    let candidates = candidates(before, after, context);

    let mut current = before.text.clone();
    let mut distance = token_distance(&tokenize(&current), &target);
    let mut applied = Vec::new();

    while distance > 0 && applied.len() < context.max_replacements {
        let mut best: Option<(usize, String, usize)> = None;
        for (index, candidate) in candidates.iter().enumerate() {
            let Some(next) = replace_identifier_aware(&current, &candidate.before, &candidate.after)
            else {
                continue;
            };
            let next_distance = token_distance(&tokenize(&next), &target);
            if next_distance < distance && best.as_ref().is_none_or(|(_, _, d)| next_distance < *d)
            {
                best = Some((index, next, next_distance));
            }
        }
        let Some((index, next, next_distance)) = best else {
            break;
        };
        applied.push(candidates[index].clone());
        current = next;
        distance = next_distance;
    }

    (distance == 0).then_some(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_strings_whole() {
        assert_eq!(
            tokenize(r#"print("a b", x1 + 2.5)"#),
            vec!["print", "(", r#""a b""#, ",", "x1", "+", "2.5", ")"]
        );
    }

    #[test]
    fn test_token_distance() {
        assert_eq!(token_distance(&["a", "+", "b"], &["a", "+", "b"]), 0);
        assert_eq!(token_distance(&["a", "+", "b"], &["a", "-", "b"]), 1);
        assert_eq!(token_distance(&[], &["x", "y"]), 2);
    }

    #[test]
    fn test_replace_identifier_aware() {
        assert_eq!(
            replace_identifier_aware("rate * rates + self.rate", "rate", "self.rate").as_deref(),
            Some("self.rate * rates + self.rate")
        );
        assert_eq!(replace_identifier_aware("rates", "rate", "x"), None);
    }

    #[test]
    fn test_binding_direction() {
        let arguments = vec!["price".to_string(), "qty".to_string()];
        let extracted = ParameterBinding::extracted(&["price", "count"], &arguments);
        assert_eq!(extracted.pairs, vec![("qty".to_string(), "count".to_string())]);
        let inlined = ParameterBinding::inlined(&["price", "count"], &arguments);
        assert_eq!(inlined.pairs, vec![("count".to_string(), "qty".to_string())]);
    }
}
