//! Directive scanning for build descriptors.
//!
//! Only the four directives that matter to dependency resolution are
//! recognized: FROM, LABEL, ARG and COPY. Everything else in the file is left
//! to the build backend.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

/// Directive data extracted from one descriptor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Directives {
    /// Image references used as base images or copy-from sources.
    pub requires: BTreeSet<String>,
    /// Build argument names the descriptor declares.
    pub args: BTreeSet<String>,
    pub labels: BTreeMap<String, String>,
}

/// Read and scan one descriptor file.
pub fn parse_file(path: &Path) -> Result<Directives> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(parse(&content))
}

/// Scan descriptor content for FROM / LABEL / ARG / COPY directives.
///
/// A malformed directive line is skipped with a warning and scanning
/// continues; an empty file yields empty sets.
pub fn parse(content: &str) -> Directives {
    let mut out = Directives::default();
    for line in logical_lines(content) {
        let Some(keyword) = line.split_whitespace().next() else {
            continue;
        };
        let keyword = keyword.to_ascii_uppercase();
        if !matches!(keyword.as_str(), "FROM" | "LABEL" | "ARG" | "COPY") {
            continue;
        }
        if let Err(reason) = scan_directive(&keyword, &line, &mut out) {
            warn!("{line} is ignored by parser, {reason}");
        }
    }
    out
}

/// Join physical lines at trailing continuation markers. The marker is
/// stripped and the lines are concatenated with a single space.
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut continued = false;
    for raw in content.lines() {
        let (body, continues) = match raw.strip_suffix('\\') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        let body = body.trim();
        if continued {
            if let Some(last) = lines.last_mut() {
                last.push(' ');
                last.push_str(body);
            }
        } else {
            lines.push(body.to_string());
        }
        continued = continues;
    }
    lines
}

fn scan_directive(
    keyword: &str,
    line: &str,
    out: &mut Directives,
) -> std::result::Result<(), String> {
    let tokens = tokenize(line).ok_or_else(|| "unterminated quote".to_string())?;
    let fields = tokens.get(1..).unwrap_or_default();
    match keyword {
        "FROM" => {
            let mut fields = fields;
            if fields.first().is_some_and(|field| field.starts_with("--")) {
                fields = &fields[1..];
            }
            let image = fields
                .first()
                .ok_or_else(|| "missing image reference".to_string())?;
            out.requires.insert(image.clone());
        }
        "LABEL" => {
            let mut pairs = Vec::new();
            for field in fields {
                let (key, value) = field
                    .split_once('=')
                    .ok_or_else(|| format!("{field} is not a key=value pair"))?;
                pairs.push((key.to_string(), unquote(value).to_string()));
            }
            out.labels.extend(pairs);
        }
        "ARG" => {
            let field = fields
                .first()
                .ok_or_else(|| "missing argument name".to_string())?;
            let name = match field.split_once('=') {
                Some((name, _default)) => name,
                None => field.as_str(),
            };
            out.args.insert(name.to_string());
        }
        "COPY" => {
            for field in fields {
                if let Some(source) = field.strip_prefix("--from=") {
                    out.requires.insert(source.to_string());
                    break;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Whitespace tokenizer that keeps quoted spans, quotes included, inside one
/// token. Returns `None` when a quote is left open.
fn tokenize(line: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in line.chars() {
        match quote {
            Some(open) => {
                current.push(ch);
                if ch == open {
                    quote = None;
                }
            }
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if quote.is_some() {
        return None;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Some(tokens)
}

/// Strip one surrounding quote pair, if present.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_adds_requirement() {
        let parsed = parse("FROM alpine:3.19\nRUN echo hi\n");
        assert!(parsed.requires.contains("alpine:3.19"));
        assert_eq!(parsed.requires.len(), 1);
    }

    #[test]
    fn test_from_skips_leading_option_flag() {
        let parsed = parse("FROM --platform=linux/amd64 alpine:3.19\n");
        assert!(parsed.requires.contains("alpine:3.19"));
        assert!(!parsed.requires.contains("--platform=linux/amd64"));
    }

    #[test]
    fn test_copy_from_extracts_source_image() {
        let parsed = parse("COPY --from=acme/foo-builder:latest /x /y\n");
        assert!(parsed.requires.contains("acme/foo-builder:latest"));
    }

    #[test]
    fn test_plain_copy_adds_nothing() {
        let parsed = parse("COPY src/ /app/src/\n");
        assert!(parsed.requires.is_empty());
    }

    #[test]
    fn test_label_value_loses_surrounding_quotes() {
        let parsed = parse("LABEL stackbuild.optional=\"true\"\n");
        assert_eq!(
            parsed.labels.get("stackbuild.optional").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_label_with_several_pairs() {
        let parsed = parse("LABEL a=1 b='two words'\n");
        assert_eq!(parsed.labels.get("a").map(String::as_str), Some("1"));
        assert_eq!(parsed.labels.get("b").map(String::as_str), Some("two words"));
    }

    #[test]
    fn test_arg_keeps_name_half_only() {
        let parsed = parse("ARG REGISTRY=\"\"\nARG TAG\n");
        assert!(parsed.args.contains("REGISTRY"));
        assert!(parsed.args.contains("TAG"));
        assert_eq!(parsed.args.len(), 2);
    }

    #[test]
    fn test_continuation_lines_join_with_space() {
        let parsed = parse("FROM \\\nalpine:3.19\n");
        assert!(parsed.requires.contains("alpine:3.19"));
    }

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        let parsed = parse("from alpine\narg X\nlabel k=v\n");
        assert!(parsed.requires.contains("alpine"));
        assert!(parsed.args.contains("X"));
        assert_eq!(parsed.labels.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_malformed_line_is_skipped_not_fatal() {
        let parsed = parse("LABEL nothing-here\nFROM alpine\n");
        assert!(parsed.labels.is_empty());
        assert!(parsed.requires.contains("alpine"));
    }

    #[test]
    fn test_empty_file_yields_empty_sets() {
        let parsed = parse("");
        assert!(parsed.requires.is_empty());
        assert!(parsed.args.is_empty());
        assert!(parsed.labels.is_empty());
    }

    #[test]
    fn test_unrelated_directives_are_not_scanned() {
        let parsed = parse("RUN echo FROM alpine\nWORKDIR /app\nCMD [\"sh\"]\n");
        assert!(parsed.requires.is_empty());
    }

    #[test]
    fn test_tokenize_keeps_quoted_spans() {
        let tokens = tokenize("LABEL a=\"x y\" b=1").unwrap();
        assert_eq!(tokens, vec!["LABEL", "a=\"x y\"", "b=1"]);
        assert!(tokenize("LABEL a=\"open").is_none());
    }
}
