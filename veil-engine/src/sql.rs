//! SQL text helpers: identifier quoting, call-site scanning and shape
//! checks over expression fragments.
//!
//! The engine never parses full SQL. Masking rules only ever embed three
//! restricted fragment kinds (a function call, a constant or column
//! reference, a sampling clause), so shape checks over literal-blanked
//! text are enough to vet them before they are spliced into generated
//! statements.

use once_cell::sync::Lazy;
use regex::Regex;
use veil_core::{EngineError, VeilResult};

// ============================================================================
// IDENTIFIER QUOTING
// ============================================================================

/// Reserved words that can never be emitted as bare identifiers.
/// Sorted; looked up with `binary_search`.
const RESERVED_WORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "asymmetric",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "column",
    "constraint",
    "create",
    "current_catalog",
    "current_date",
    "current_role",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "fetch",
    "for",
    "foreign",
    "from",
    "grant",
    "group",
    "having",
    "in",
    "initially",
    "intersect",
    "into",
    "lateral",
    "leading",
    "limit",
    "localtime",
    "localtimestamp",
    "not",
    "null",
    "offset",
    "on",
    "only",
    "or",
    "order",
    "placing",
    "primary",
    "references",
    "returning",
    "select",
    "session_user",
    "some",
    "symmetric",
    "table",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "variadic",
    "when",
    "where",
    "window",
    "with",
];

pub fn is_reserved_word(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    RESERVED_WORDS.binary_search(&lower.as_str()).is_ok()
}

fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

/// Always double-quote, doubling embedded quotes.
pub fn double_quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an identifier the way the host dialect does: bare when it is a
/// plain lower-case name and not a reserved word, double-quoted with
/// embedded quotes doubled otherwise.
pub fn quote_identifier(name: &str) -> String {
    if is_plain_name(name) && !is_reserved_word(name) {
        return name.to_string();
    }
    double_quote(name)
}

/// `<quoted_namespace>.<quoted_name>`.
pub fn quoted_qualified_name(namespace: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(namespace), quote_identifier(name))
}

// ============================================================================
// LITERAL BLANKING
// ============================================================================

/// Replace every quoted span (single-quoted and dollar-quoted string
/// constants, double-quoted identifiers) with spaces, delimiters
/// included. Scanning never looks inside literal text, so a masking
/// function argument like `'foo('` cannot confuse the call scanner.
pub fn blank_literals(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push(' ');
                while let Some(c) = chars.next() {
                    out.push(' ');
                    if c == '\'' {
                        // a doubled quote is an escape, not the end
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            out.push(' ');
                        } else {
                            break;
                        }
                    }
                }
            }
            '"' => {
                out.push(' ');
                while let Some(c) = chars.next() {
                    out.push(' ');
                    if c == '"' {
                        if chars.peek() == Some(&'"') {
                            chars.next();
                            out.push(' ');
                        } else {
                            break;
                        }
                    }
                }
            }
            '$' if chars.peek() == Some(&'$') => {
                chars.next();
                out.push_str("  ");
                while let Some(c) = chars.next() {
                    if c == '$' && chars.peek() == Some(&'$') {
                        chars.next();
                        out.push_str("  ");
                        break;
                    }
                    out.push(' ');
                }
            }
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// CALL-SITE SCANNING
// ============================================================================

/// Head of a function call: an optionally qualified identifier followed
/// by an opening parenthesis, anchored at the start.
static CALL_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_$]*)(?:\s*\.\s*([A-Za-z_][A-Za-z0-9_$]*))?\s*\(")
        .unwrap()
});

/// Any call site inside an expression.
static CALL_SITE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_][A-Za-z0-9_$]*)(?:\s*\.\s*([A-Za-z_][A-Za-z0-9_$]*))?\s*\(")
        .unwrap()
});

/// SQL syntax that is call-shaped but never a function reference.
/// Sorted; looked up with `binary_search`.
const CALL_SHAPED_SYNTAX: &[&str] = &[
    "all",
    "any",
    "array",
    "cast",
    "coalesce",
    "exists",
    "extract",
    "greatest",
    "least",
    "nullif",
    "overlay",
    "position",
    "row",
    "substring",
    "trim",
];

fn is_call_shaped_syntax(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    CALL_SHAPED_SYNTAX.binary_search(&lower.as_str()).is_ok()
}

/// One function reference found in an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub schema: Option<String>,
    pub name: String,
}

/// Every function reference in the expression, literals blanked first.
/// Unqualified call-shaped keywords (`CAST`, `COALESCE`, ...) are
/// grammar, not functions, and are skipped.
pub fn function_calls(expr: &str) -> Vec<CallSite> {
    let blanked = blank_literals(expr);
    let mut sites = Vec::new();
    for caps in CALL_SITE.captures_iter(&blanked) {
        let (schema, name) = match (caps.get(1), caps.get(2)) {
            (Some(first), Some(second)) => (Some(first.as_str()), second.as_str()),
            (Some(first), None) => (None, first.as_str()),
            _ => continue,
        };
        if schema.is_none() && is_call_shaped_syntax(name) {
            continue;
        }
        sites.push(CallSite {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        });
    }
    sites
}

/// Byte index of the `)` closing the `(` at `open`, if balanced.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// EXPRESSION SHAPES
// ============================================================================

/// An expression shaped like a single function call: one optionally
/// qualified name, one balanced argument list, nothing trailing and no
/// statement separator.
pub fn is_function_call_shape(expr: &str) -> bool {
    let blanked = blank_literals(expr);
    if blanked.contains(';') {
        return false;
    }
    let Some(head) = CALL_HEAD.find(&blanked) else {
        return false;
    };
    let open = head.end() - 1;
    let Some(close) = matching_paren(&blanked, open) else {
        return false;
    };
    blanked[close + 1..].trim().is_empty()
}

static NUMERIC_CONST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap());

static STRING_CONST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^'([^']|'')*'$").unwrap());

static DOLLAR_CONST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^\$\$.*\$\$$").unwrap());

static COLUMN_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+")(?:\s*\.\s*(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+"))*$"#,
    )
    .unwrap()
});

/// A constant or a column reference, the only two expression kinds a
/// masking value may be. Calls, casts and operators are all out.
pub fn is_value_shape(expr: &str) -> bool {
    let t = expr.trim();
    if t.is_empty() {
        return false;
    }
    if NUMERIC_CONST.is_match(t) || STRING_CONST.is_match(t) || DOLLAR_CONST.is_match(t) {
        return true;
    }
    if t.eq_ignore_ascii_case("NULL")
        || t.eq_ignore_ascii_case("TRUE")
        || t.eq_ignore_ascii_case("FALSE")
    {
        return true;
    }
    COLUMN_REF.is_match(t)
}

/// Schema qualifier of a function-call expression, `""` when the call is
/// unqualified.
pub fn get_function_schema(expr: &str) -> VeilResult<String> {
    if expr.trim().is_empty() {
        return Err(EngineError::EmptyExpression.into());
    }
    if !is_function_call_shape(expr) {
        return Err(EngineError::NotAFunctionCall {
            expr: expr.to_string(),
        }
        .into());
    }
    let blanked = blank_literals(expr);
    let schema = match CALL_HEAD.captures(&blanked) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(schema), Some(_)) => schema.as_str().to_string(),
            _ => String::new(),
        },
        None => String::new(),
    };
    Ok(schema)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_plain() {
        assert_eq!("firstname", quote_identifier("firstname"));
        assert_eq!("_private", quote_identifier("_private"));
        assert_eq!("col2", quote_identifier("col2"));
    }

    #[test]
    fn test_quote_identifier_forced() {
        assert_eq!("\"I\"", quote_identifier("I"));
        assert_eq!("\"WEIRD_schema\"", quote_identifier("WEIRD_schema"));
        assert_eq!("\"has space\"", quote_identifier("has space"));
        assert_eq!("\"2fast\"", quote_identifier("2fast"));
        assert_eq!("\"she said \"\"hi\"\"\"", quote_identifier("she said \"hi\""));
    }

    #[test]
    fn test_quote_identifier_reserved() {
        assert_eq!("\"select\"", quote_identifier("select"));
        assert_eq!("\"user\"", quote_identifier("user"));
        assert_eq!("\"table\"", quote_identifier("table"));
    }

    #[test]
    fn test_double_quote_always_quotes() {
        assert_eq!("\"lastname\"", double_quote("lastname"));
    }

    #[test]
    fn test_quoted_qualified_name() {
        assert_eq!("public.person", quoted_qualified_name("public", "person"));
        assert_eq!(
            "\"Gotham\".\"Bat Cave\"",
            quoted_qualified_name("Gotham", "Bat Cave")
        );
    }

    #[test]
    fn test_blank_literals() {
        assert_eq!("lower(   )", blank_literals("lower('A')"));

        // quoted spans become spaces, length preserved
        let input = "x = 'a(''b)'";
        let blanked = blank_literals(input);
        assert_eq!(input.len(), blanked.len());
        assert!(!blanked.contains('('));

        let blanked = blank_literals("$$drop($$");
        assert_eq!(9, blanked.len());
        assert!(!blanked.contains("drop"));

        let blanked = blank_literals("select \"col()\"");
        assert!(blanked.starts_with("select "));
        assert!(!blanked.contains("col"));
    }

    #[test]
    fn test_blank_literals_unterminated() {
        // an unterminated literal swallows the rest, never panics
        let blanked = blank_literals("f('oops");
        assert_eq!(7, blanked.len());
        assert!(blanked.starts_with("f("));
        assert!(!blanked.contains("oops"));
    }

    #[test]
    fn test_function_call_shape_ok() {
        assert!(is_function_call_shape("veil.fake_city()"));
        assert!(is_function_call_shape("veil.lower(veil.upper('a'))"));
        assert!(is_function_call_shape("outfit.mask(0)"));
        assert!(is_function_call_shape("foo()"));
        assert!(is_function_call_shape("  spaced ( 1 , 2 )  "));
    }

    #[test]
    fn test_function_call_shape_err() {
        assert!(!is_function_call_shape(""));
        assert!(!is_function_call_shape("42"));
        assert!(!is_function_call_shape("foo(), bar()"));
        assert!(!is_function_call_shape("foo(1) + 1"));
        assert!(!is_function_call_shape("foo(bar("));
        assert!(!is_function_call_shape("Robert'); DROP TABLE Students;--"));
        assert!(!is_function_call_shape("foo(); DROP TABLE x"));
    }

    #[test]
    fn test_function_calls_qualified_and_nested() {
        let sites = function_calls("veil.lower(veil.upper('a'))");
        assert_eq!(2, sites.len());
        assert_eq!(Some("veil".to_string()), sites[0].schema);
        assert_eq!("lower", sites[0].name);
        assert_eq!("upper", sites[1].name);
    }

    #[test]
    fn test_function_calls_unqualified() {
        let sites = function_calls("foo(bar())");
        assert_eq!(2, sites.len());
        assert_eq!(None, sites[0].schema);
        assert_eq!(None, sites[1].schema);
    }

    #[test]
    fn test_function_calls_skips_grammar() {
        assert!(function_calls("CAST(1 AS int)").is_empty());
        assert!(function_calls("coalesce(a, b)").is_empty());
        // a qualified name is always a real function, even a shadowing one
        let sites = function_calls("myschema.cast(1)");
        assert_eq!(1, sites.len());
        assert_eq!("cast", sites[0].name);
    }

    #[test]
    fn test_function_calls_ignores_literals() {
        assert!(function_calls("'foo(bar)'").is_empty());
        let sites = function_calls("veil.partial_email('j.doe@x.io')");
        assert_eq!(1, sites.len());
        assert_eq!("partial_email", sites[0].name);
    }

    #[test]
    fn test_value_shapes() {
        assert!(is_value_shape("1"));
        assert!(is_value_shape("-3.14"));
        assert!(is_value_shape("1e6"));
        assert!(is_value_shape("a"));
        assert!(is_value_shape("person.a"));
        assert!(is_value_shape("NULL"));
        assert!(is_value_shape("true"));
        assert!(is_value_shape("'CONFIDENTIAL'"));
        assert!(is_value_shape("'O''Brien'"));
        assert!(is_value_shape("$$x$$"));

        assert!(!is_value_shape(""));
        assert!(!is_value_shape("foo()"));
        assert!(!is_value_shape("CAST(0 AS INT)"));
        assert!(!is_value_shape("1 + 1"));
        assert!(!is_value_shape("'unterminated"));
    }

    #[test]
    fn test_get_function_schema() {
        assert_eq!(
            "outfit",
            get_function_schema("outfit.mask(0)").unwrap()
        );
        assert_eq!("", get_function_schema("mask(0)").unwrap());
        assert!(get_function_schema("").is_err());
        assert!(get_function_schema("   ").is_err());
        assert!(get_function_schema("1 + 1").is_err());
    }
}
