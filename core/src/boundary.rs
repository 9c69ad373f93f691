//! The boundary mini-language: parsing an intent's free-text `boundaries`
//! field into patterns, and matching modified files against them (§4.6, §9).

use regex::Regex;
use std::sync::OnceLock;

/// A token looks path-like if it contains a `/`, a `.`, or a `*` — the
/// signal that separates "src/secrets/" or "*.env" from prose like "don't
/// touch the database".
fn looks_path_like(token: &str) -> bool {
    token.contains('/') || token.contains('.') || token.contains('*')
}

fn path_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_./*-]*[/.][A-Za-z0-9_./*-]*").unwrap())
}

/// Parse a `boundaries` string into a list of patterns.
///
/// Tokens are first split on commas, semicolons, and newlines. A token
/// that already looks like a path or glob is kept as-is; otherwise the
/// natural-language fragment is scanned for embedded path-like
/// substrings (e.g. "please avoid touching src/secrets/keys.rs").
pub fn parse_boundaries(text: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    for raw in text.split(['\n', ',', ';']) {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }
        if looks_path_like(token) {
            patterns.push(token.trim_end_matches(|c: char| c.is_ascii_punctuation() && c != '/' && c != '*').to_string());
        } else {
            for m in path_token_regex().find_iter(token) {
                let extracted = m.as_str().trim_matches(|c: char| c.is_ascii_punctuation() && c != '/' && c != '*');
                if !extracted.is_empty() {
                    patterns.push(extracted.to_string());
                }
            }
        }
    }
    patterns.retain(|p| !p.is_empty());
    patterns
}

/// Does `file` match boundary `pattern`? Three forms are supported:
/// exact equality, a `*` glob (single-segment wildcard semantics handled
/// via simple substitution), and a directory prefix (pattern ending in
/// `/` matches anything beneath it).
pub fn matches(file: &str, pattern: &str) -> bool {
    if pattern.ends_with('/') {
        return file.starts_with(pattern);
    }
    if pattern.contains('*') {
        return glob_match(pattern, file);
    }
    file == pattern
}

fn glob_match(pattern: &str, text: &str) -> bool {
    fn inner(p: &[u8], t: &[u8]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some(b'*'), _) => inner(&p[1..], t) || (!t.is_empty() && inner(p, &t[1..])),
            (Some(pc), Some(tc)) if pc == tc => inner(&p[1..], &t[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), text.as_bytes())
}

/// Patterns declared in an intent's `boundaries` field, parsed once.
pub struct Boundaries {
    patterns: Vec<String>,
}

impl Boundaries {
    pub fn parse(text: Option<&str>) -> Self {
        Self {
            patterns: text.map(parse_boundaries).unwrap_or_default(),
        }
    }

    /// Files among `modified` that hit at least one declared boundary
    /// pattern. Vacuously empty when no boundaries are declared (§4.6).
    pub fn violations<'a>(&self, modified: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        modified
            .into_iter()
            .filter(|f| self.patterns.iter().any(|p| matches(f, p)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_separators() {
        let patterns = parse_boundaries("src/secrets/, *.env; config/prod.toml");
        assert!(patterns.contains(&"src/secrets/".to_string()));
        assert!(patterns.contains(&"*.env".to_string()));
        assert!(patterns.contains(&"config/prod.toml".to_string()));
    }

    #[test]
    fn extracts_path_like_tokens_from_prose() {
        let patterns = parse_boundaries("please do not touch src/secrets/keys.rs under any circumstance");
        assert!(patterns.iter().any(|p| p.contains("src/secrets/keys.rs")));
    }

    #[test]
    fn directory_prefix_matches_beneath() {
        assert!(matches("src/secrets/k.ts", "src/secrets/"));
        assert!(!matches("src/public/k.ts", "src/secrets/"));
    }

    #[test]
    fn glob_matches() {
        assert!(matches("config/prod.env", "*.env"));
        assert!(!matches("config/prod.toml", "*.env"));
    }

    #[test]
    fn exact_match() {
        assert!(matches("a.ts", "a.ts"));
        assert!(!matches("a.ts", "b.ts"));
    }

    #[test]
    fn no_boundaries_passes_vacuously() {
        let b = Boundaries::parse(None);
        let modified = vec!["anything.rs".to_string()];
        assert!(b.violations(&modified).is_empty());
    }

    #[test]
    fn boundary_violation_scenario_s5() {
        let b = Boundaries::parse(Some("src/secrets/"));
        let modified = vec!["src/secrets/k.ts".to_string()];
        assert_eq!(b.violations(&modified), vec!["src/secrets/k.ts".to_string()]);
    }
}
