//! Record-scoped renaming of identifiers to positional `VARn` placeholders.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::syntax::Token;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^VAR\d+$").unwrap());

/// Contextual keywords the C# lexer reports as identifiers.
const DEFAULT_PRESERVED: &[&str] = &[
    "add", "alias", "and", "ascending", "async", "await", "by", "descending", "dynamic",
    "equals", "from", "get", "global", "group", "init", "into", "join", "let", "nameof",
    "not", "notnull", "on", "or", "orderby", "partial", "record", "remove", "required",
    "select", "set", "unmanaged", "value", "var", "when", "where", "with", "yield",
];

/// Settings for identifier renaming.
#[derive(Debug, Clone)]
pub struct CanonicalizerConfig {
    /// Identifier texts that are never renamed.
    pub preserved_identifiers: HashSet<String>,
}

impl Default for CanonicalizerConfig {
    fn default() -> Self {
        Self {
            preserved_identifiers: DEFAULT_PRESERVED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A token after renaming. `original` keeps the span and trivia reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalToken<'t> {
    pub original: &'t Token,
    pub text: String,
}

impl CanonicalToken<'_> {
    pub fn is_renamed(&self) -> bool {
        self.text != self.original.text
    }
}

/// Whether `text` already has the `VARn` shape.
pub fn is_placeholder(text: &str) -> bool {
    PLACEHOLDER_RE.is_match(text)
}

/// Owns the identifier map of one record.
///
/// Placeholders are minted in first-seen order, so the order in which token
/// slices are passed to [`Canonicalizer::canonicalize`] decides numbering.
/// Source identifiers already shaped like `VARn` keep their text unless that
/// name was minted first, and minting skips every name in use.
#[derive(Debug)]
pub struct Canonicalizer<'c> {
    config: &'c CanonicalizerConfig,
    map: IndexMap<String, String>,
    /// Placeholder-shaped source identifiers kept verbatim.
    reserved: HashSet<String>,
    /// Minted and reserved names.
    used: HashSet<String>,
    next: usize,
}

impl<'c> Canonicalizer<'c> {
    pub fn new(config: &'c CanonicalizerConfig) -> Self {
        Self {
            config,
            map: IndexMap::new(),
            reserved: HashSet::new(),
            used: HashSet::new(),
            next: 0,
        }
    }

    /// Rename every identifier of `tokens`, extending the map as needed.
    pub fn canonicalize<'t>(&mut self, tokens: &'t [Token]) -> Vec<CanonicalToken<'t>> {
        tokens
            .iter()
            .map(|token| CanonicalToken {
                original: token,
                text: self.rename(token),
            })
            .collect()
    }

    fn rename(&mut self, token: &Token) -> String {
        if !token.is_identifier() || self.config.preserved_identifiers.contains(&token.text) {
            return token.text.clone();
        }
        if let Some(placeholder) = self.map.get(&token.text) {
            return placeholder.clone();
        }
        if is_placeholder(&token.text)
            && (self.reserved.contains(&token.text) || !self.used.contains(&token.text))
        {
            self.reserved.insert(token.text.clone());
            self.used.insert(token.text.clone());
            return token.text.clone();
        }

        let placeholder = loop {
            let candidate = format!("VAR{}", self.next);
            self.next += 1;
            if !self.used.contains(&candidate) {
                break candidate;
            }
        };
        self.used.insert(placeholder.clone());
        self.map.insert(token.text.clone(), placeholder.clone());
        placeholder
    }

    /// Placeholder standing for `identifier`, if it has been seen.
    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        self.map
            .get(identifier)
            .or_else(|| self.reserved.get(identifier))
            .map(String::as_str)
    }

    pub fn map(&self) -> &IndexMap<String, String> {
        &self.map
    }

    /// Number of minted placeholders.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csharp::CSharpParser;
    use crate::SourceParser;

    fn texts(tokens: &[CanonicalToken<'_>]) -> Vec<String> {
        tokens.iter().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn test_first_seen_numbering() {
        let config = CanonicalizerConfig::default();
        let tree = CSharpParser.parse("foo = bar + foo; int VAR7 = baz;").unwrap();
        let mut canon = Canonicalizer::new(&config);
        let out = canon.canonicalize(tree.tokens());
        assert_eq!(
            texts(&out),
            vec!["VAR0", "=", "VAR1", "+", "VAR0", ";", "int", "VAR7", "=", "VAR2", ";"]
        );
        assert_eq!(canon.lookup("baz"), Some("VAR2"));
        assert_eq!(canon.len(), 3);
        assert!(out[0].is_renamed());
        assert!(!out[7].is_renamed());
    }

    #[test]
    fn test_preserved_identifiers_pass_through() {
        let config = CanonicalizerConfig::default();
        let tree = CSharpParser.parse("var x = nameof(value);").unwrap();
        let mut canon = Canonicalizer::new(&config);
        let out = canon.canonicalize(tree.tokens());
        assert_eq!(texts(&out), vec!["var", "VAR0", "=", "nameof", "(", "value", ")", ";"]);
    }

    #[test]
    fn test_custom_preserved_set() {
        let config = CanonicalizerConfig {
            preserved_identifiers: ["Console".to_string()].into_iter().collect(),
        };
        let tree = CSharpParser.parse("Console.WriteLine(var);").unwrap();
        let mut canon = Canonicalizer::new(&config);
        let out = canon.canonicalize(tree.tokens());
        assert_eq!(texts(&out), vec!["Console", ".", "VAR0", "(", "VAR1", ")", ";"]);
    }

    #[test]
    fn test_shared_map_is_bijective_across_windows() {
        let config = CanonicalizerConfig::default();
        let target = CSharpParser.parse("b = a;").unwrap();
        let previous = CSharpParser.parse("a = c; b = c;").unwrap();
        let mut canon = Canonicalizer::new(&config);
        let target_out = canon.canonicalize(target.tokens());
        let previous_out = canon.canonicalize(previous.tokens());

        assert_eq!(texts(&target_out), vec!["VAR0", "=", "VAR1", ";"]);
        assert_eq!(
            texts(&previous_out),
            vec!["VAR1", "=", "VAR2", ";", "VAR0", "=", "VAR2", ";"]
        );
        let placeholders: HashSet<_> = canon.map().values().collect();
        assert_eq!(placeholders.len(), canon.map().len());
    }

    #[test]
    fn test_canonicalize_is_idempotent_on_output() {
        let config = CanonicalizerConfig::default();
        let tree = CSharpParser.parse("VAR0 = VAR12;").unwrap();
        let mut canon = Canonicalizer::new(&config);
        let out = canon.canonicalize(tree.tokens());
        assert_eq!(texts(&out), vec!["VAR0", "=", "VAR12", ";"]);
        assert!(canon.is_empty());
        assert_eq!(canon.lookup("VAR12"), Some("VAR12"));
    }

    #[test]
    fn test_minting_skips_source_placeholders() {
        let config = CanonicalizerConfig::default();
        let tree = CSharpParser.parse("int VAR0 = foo; bar = VAR1;").unwrap();
        let mut canon = Canonicalizer::new(&config);
        let out = canon.canonicalize(tree.tokens());
        assert_eq!(
            texts(&out),
            vec!["int", "VAR0", "=", "VAR1", ";", "VAR2", "=", "VAR3", ";"]
        );
        assert_eq!(canon.lookup("foo"), Some("VAR1"));
        assert_eq!(canon.lookup("VAR1"), Some("VAR3"));
    }

    #[test]
    fn test_source_placeholder_after_minted_name_is_renamed() {
        let config = CanonicalizerConfig::default();
        let tree = CSharpParser.parse("foo = VAR0; VAR0 = foo;").unwrap();
        let mut canon = Canonicalizer::new(&config);
        let out = canon.canonicalize(tree.tokens());
        assert_eq!(
            texts(&out),
            vec!["VAR0", "=", "VAR1", ";", "VAR1", "=", "VAR0", ";"]
        );

        let mut seen = std::collections::HashMap::new();
        for (token, canonical) in tree.tokens().iter().zip(&out) {
            if token.is_identifier() {
                let previous = seen.insert(canonical.text.clone(), token.text.clone());
                if let Some(previous) = previous {
                    assert_eq!(previous, token.text);
                }
            }
        }
    }
}
