use sqlparser::ast::{Ident, ObjectName, ObjectNamePart};

/// How a dialect folds unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierCase {
    /// Fold to lower case (Postgres family).
    Lower,
    /// Fold to upper case (Snowflake).
    Upper,
    /// Keep as written; comparisons ignore ASCII case.
    Preserve,
}

impl IdentifierCase {
    /// Apply the folding rule to an unquoted identifier.
    pub fn fold(self, ident: &str) -> String {
        match self {
            IdentifierCase::Lower => ident.to_lowercase(),
            IdentifierCase::Upper => ident.to_uppercase(),
            IdentifierCase::Preserve => ident.to_string(),
        }
    }

    /// Name comparison that matches this folding rule.
    pub fn comparison(self) -> NameCmp {
        match self {
            IdentifierCase::Lower | IdentifierCase::Upper => NameCmp::Exact,
            IdentifierCase::Preserve => NameCmp::IgnoreAsciiCase,
        }
    }
}

/// Equality policy for already-normalized names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCmp {
    /// Byte-for-byte.
    Exact,
    /// ASCII case-insensitive.
    IgnoreAsciiCase,
}

impl NameCmp {
    /// Compare two names under this policy.
    pub fn eq(self, left: &str, right: &str) -> bool {
        match self {
            NameCmp::Exact => left == right,
            NameCmp::IgnoreAsciiCase => left.eq_ignore_ascii_case(right),
        }
    }
}

/// Normalize a parsed identifier: quoted identifiers keep their text, unquoted
/// ones are folded.
pub fn normalize_ident(ident: &Ident, case: IdentifierCase) -> String {
    if ident.quote_style.is_some() {
        ident.value.clone()
    } else {
        case.fold(&ident.value)
    }
}

/// Normalize every identifier part of an object name.
///
/// Non-identifier parts (e.g. function-valued parts) keep their SQL text.
pub fn normalize_object_name(name: &ObjectName, case: IdentifierCase) -> Vec<String> {
    name.0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => normalize_ident(ident, case),
            #[allow(unreachable_patterns)]
            other => other.to_string(),
        })
        .collect()
}

/// Return the identifier without surrounding quotes (`"x"`, `` `x` ``, `[x]`).
pub fn unquote_identifier(ident: &str) -> &str {
    let pairs = [('"', '"'), ('`', '`'), ('[', ']')];
    for (open, close) in pairs {
        if let Some(inner) = ident
            .strip_prefix(open)
            .and_then(|s| s.strip_suffix(close))
        {
            return inner;
        }
    }
    ident
}

/// True when the written identifier is wrapped in quotes.
pub fn is_quoted(ident: &str) -> bool {
    unquote_identifier(ident).len() != ident.len()
}

/// Normalize a single written identifier (as rendered SQL text).
pub fn normalize_written_ident(ident: &str, case: IdentifierCase) -> String {
    let ident = ident.trim();
    if is_quoted(ident) {
        unquote_identifier(ident).to_string()
    } else {
        case.fold(ident)
    }
}

/// Split a rendered, possibly qualified name on dots outside quotes.
///
/// Handles dots inside quoted identifiers, e.g. `"my.schema"."table.name"`.
pub fn split_qualified_name(name: &str) -> Vec<&str> {
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    let mut parts: Vec<&str> = Vec::new();

    for (idx, ch) in name.char_indices() {
        match (quote, ch) {
            (None, '"' | '`') => quote = Some(ch),
            (None, '[') => quote = Some(']'),
            (Some(close), _) if ch == close => quote = None,
            (None, '.') => {
                parts.push(name[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(name[start..].trim());
    parts
}

/// Normalize a rendered name to its terminal identifier.
///
/// Examples (lower-folding dialect):
/// - `"a.MONTH"` -> `"month"`
/// - `"\"Sales\".\"Amount\""` -> `"Amount"`
/// - `"amount AS amt"` -> `"amount"`
pub fn terminal_name(rendered: &str, case: IdentifierCase) -> String {
    let without_alias = strip_alias(rendered);
    let parts = split_qualified_name(without_alias);
    let last = parts.last().copied().unwrap_or(without_alias);
    normalize_written_ident(last, case)
}

/// Drop a trailing ` AS alias` from rendered SQL text.
pub fn strip_alias(rendered: &str) -> &str {
    match rendered.rfind(" AS ") {
        Some(idx) if !rendered[idx..].contains(['(', ')', '\'']) => rendered[..idx].trim(),
        _ => rendered.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_qualified_name_handles_quoted_dots() {
        assert_eq!(
            split_qualified_name(r#""my.schema"."table.name""#),
            vec![r#""my.schema""#, r#""table.name""#]
        );
        assert_eq!(split_qualified_name("[a.b].c"), vec!["[a.b]", "c"]);
    }

    #[test]
    fn terminal_name_handles_qualifiers_quotes_and_case() {
        assert_eq!(terminal_name("a.MONTH", IdentifierCase::Lower), "month");
        assert_eq!(terminal_name("a.month", IdentifierCase::Upper), "MONTH");
        assert_eq!(
            terminal_name(r#""Sales"."Amount""#, IdentifierCase::Lower),
            "Amount"
        );
        assert_eq!(terminal_name("amount AS amt", IdentifierCase::Preserve), "amount");
    }

    #[test]
    fn unquote_identifier_supports_every_quote_style() {
        assert_eq!(unquote_identifier(r#""x""#), "x");
        assert_eq!(unquote_identifier("`x`"), "x");
        assert_eq!(unquote_identifier("[x]"), "x");
        assert_eq!(unquote_identifier("x"), "x");
    }

    #[test]
    fn normalize_ident_keeps_quoted_case() {
        let quoted = Ident::with_quote('"', "MixedCase");
        let plain = Ident::new("MixedCase");
        assert_eq!(normalize_ident(&quoted, IdentifierCase::Lower), "MixedCase");
        assert_eq!(normalize_ident(&plain, IdentifierCase::Lower), "mixedcase");
        assert_eq!(normalize_ident(&plain, IdentifierCase::Upper), "MIXEDCASE");
        assert_eq!(normalize_ident(&plain, IdentifierCase::Preserve), "MixedCase");
    }

    #[test]
    fn name_comparison_follows_case_policy() {
        assert!(NameCmp::IgnoreAsciiCase.eq("Orders", "ORDERS"));
        assert!(!NameCmp::Exact.eq("Orders", "ORDERS"));
        assert_eq!(
            IdentifierCase::Preserve.comparison(),
            NameCmp::IgnoreAsciiCase
        );
    }
}
