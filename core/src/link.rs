//! Parser for RFC 5988 `Link` headers.
//!
//! Only what pagination needs: `<uri>; rel="name"` segments separated by
//! commas. Segments that do not parse are skipped, so one usable `next`
//! segment survives any amount of surrounding garbage.

use std::collections::HashMap;

/// Relation name to target URI, as advertised by a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link(HashMap<String, String>);

impl Link {
    pub fn get(&self, rel: &str) -> Option<&str> {
        self.0.get(rel).map(String::as_str)
    }

    /// Target of the `next` relation, if any.
    pub fn next(&self) -> Option<&str> {
        self.get("next")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse a single `Link` header value.
pub fn parse_link(value: &str) -> Link {
    let mut rels = HashMap::new();
    for segment in split_segments(value) {
        if let Some((uri, names)) = parse_segment(segment) {
            for name in names {
                rels.insert(name.to_string(), uri.to_string());
            }
        }
    }
    Link(rels)
}

/// Split on commas that sit outside `<...>` and outside quotes.
fn split_segments(value: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_uri = false;
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '<' if !in_quotes => in_uri = true,
            '>' if !in_quotes => in_uri = false,
            '"' if !in_uri => in_quotes = !in_quotes,
            ',' if !in_uri && !in_quotes => {
                segments.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&value[start..]);
    segments
}

fn parse_segment(segment: &str) -> Option<(&str, Vec<&str>)> {
    // The target may itself contain ';', so cut it off before splitting params.
    let (target, params) = segment.trim_start().strip_prefix('<')?.split_once('>')?;
    let uri = target.trim();
    if uri.is_empty() {
        return None;
    }

    for param in params.split(';') {
        let Some((key, val)) = param.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("rel") {
            continue;
        }
        let val = val.trim();
        let val = val
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(val);
        let names: Vec<&str> = val.split_whitespace().collect();
        if names.is_empty() {
            return None;
        }
        return Some((uri, names));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_next_relation() {
        let link = parse_link(r#"<https://api.nsone.net/v1/zones?after=b>; rel="next""#);
        assert_eq!(link.len(), 1);
        assert_eq!(link.next(), Some("https://api.nsone.net/v1/zones?after=b"));
    }

    #[test]
    fn multiple_relations() {
        let link = parse_link(r#"<http://x/2>; rel="next", <http://x/9>; rel="last""#);
        assert_eq!(link.next(), Some("http://x/2"));
        assert_eq!(link.get("last"), Some("http://x/9"));
    }

    #[test]
    fn garbage_segments_are_skipped() {
        let link = parse_link(r#"garbage, <>; rel="prev", <http://x/1>, <http://x/2>; rel="next", ;;"#);
        assert_eq!(link.len(), 1);
        assert_eq!(link.next(), Some("http://x/2"));
    }

    #[test]
    fn commas_inside_uri_do_not_split() {
        let link = parse_link(r#"<http://x/zones?ids=a,b>; rel="next""#);
        assert_eq!(link.next(), Some("http://x/zones?ids=a,b"));
    }

    #[test]
    fn unquoted_and_multi_name_rel() {
        let link = parse_link("<http://x/2>; title=\"a, b\"; rel=next, <http://x/0>; rel=\"first prev\"");
        assert_eq!(link.next(), Some("http://x/2"));
        assert_eq!(link.get("first"), Some("http://x/0"));
        assert_eq!(link.get("prev"), Some("http://x/0"));
    }

    #[test]
    fn empty_header_has_no_next() {
        let link = parse_link("");
        assert!(link.is_empty());
        assert_eq!(link.next(), None);
    }

    #[test]
    fn semicolon_inside_target_is_kept() {
        let link = parse_link(r#"<http://x/a;v=1>; rel="next", <http://x/b;v=2?p=3>; rel="last""#);
        assert_eq!(link.next(), Some("http://x/a;v=1"));
        assert_eq!(link.get("last"), Some("http://x/b;v=2?p=3"));
    }
}
