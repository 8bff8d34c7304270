//! Identifier quoting
//!
//! Names are printed bare when the lexer would read them back unchanged:
//! lower-case ASCII letters, digits and underscores, not starting with a
//! digit, and not a keyword. Anything else is wrapped in double quotes with
//! embedded quotes doubled.

use super::token::Token;

fn is_bare(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && Token::from_keyword(name).is_none()
}

/// Quote a single name
pub fn quote_name(name: &str) -> String {
    if is_bare(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Quote each name and join them with `", "`
pub fn quote_names<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_name(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote each part of a dotted name
pub fn quote_qualified(database: Option<&str>, name: &str) -> String {
    match database {
        Some(db) => format!("{}.{}", quote_name(db), quote_name(name)),
        None => quote_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_names() {
        assert_eq!(quote_name("users"), "users");
        assert_eq!(quote_name("_tmp1"), "_tmp1");
    }

    #[test]
    fn test_quoted_names() {
        assert_eq!(quote_name("Users"), "\"Users\"");
        assert_eq!(quote_name("1abc"), "\"1abc\"");
        assert_eq!(quote_name("two words"), "\"two words\"");
        assert_eq!(quote_name("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_name(""), "\"\"");
    }

    #[test]
    fn test_keywords_are_quoted() {
        assert_eq!(quote_name("primary"), "\"primary\"");
        assert_eq!(quote_name("family"), "\"family\"");
        assert_eq!(quote_name("select"), "\"select\"");
    }

    #[test]
    fn test_name_lists() {
        assert_eq!(quote_names(&["a", "B", "index"]), "a, \"B\", \"index\"");
        assert_eq!(quote_names::<&str>(&[]), "");
        assert_eq!(quote_qualified(Some("db"), "T"), "db.\"T\"");
        assert_eq!(quote_qualified(None, "t"), "t");
    }
}
