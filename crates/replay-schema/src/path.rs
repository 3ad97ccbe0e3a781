//! # Path Templates
//!
//! Matches concrete request paths against OpenAPI path templates such as
//! `/widgets/{id}` or `/files/{name}.json`.

/// One `/`-separated piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `prefix{name}suffix`; prefix and suffix are usually empty.
    Param {
        prefix: String,
        name: String,
        suffix: String,
    },
}

/// A parsed OpenAPI path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template. Never fails: a malformed `{` is treated as a literal.
    pub fn parse(raw: &str) -> Self {
        let segments = split(raw)
            .map(|seg| match (seg.find('{'), seg.rfind('}')) {
                (Some(open), Some(close)) if open < close => Segment::Param {
                    prefix: seg[..open].to_string(),
                    name: seg[open + 1..close].to_string(),
                    suffix: seg[close + 1..].to_string(),
                },
                _ => Segment::Literal(seg.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// The template as written in the document.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of literal segments. Higher wins when several templates match.
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Names of the template's path parameters, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a concrete path, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = split(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut captures = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param {
                    prefix,
                    name,
                    suffix,
                } => {
                    if part.len() <= prefix.len() + suffix.len()
                        || !part.starts_with(prefix.as_str())
                        || !part.ends_with(suffix.as_str())
                    {
                        return None;
                    }
                    let value = &part[prefix.len()..part.len() - suffix.len()];
                    captures.push((name.clone(), value.to_string()));
                }
            }
        }
        Some(captures)
    }
}

fn split(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_template_matches_only_itself() {
        let t = PathTemplate::parse("/widgets");
        assert_eq!(t.matches("/widgets"), Some(vec![]));
        assert_eq!(t.matches("/widgets/1"), None);
        assert_eq!(t.matches("/gadgets"), None);
        assert_eq!(t.specificity(), 1);
    }

    #[test]
    fn param_segment_captures_value() {
        let t = PathTemplate::parse("/widgets/{id}");
        assert_eq!(
            t.matches("/widgets/42"),
            Some(vec![("id".to_string(), "42".to_string())])
        );
        assert_eq!(t.matches("/widgets/"), None);
        assert_eq!(t.param_names().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn prefix_and_suffix_are_respected() {
        let t = PathTemplate::parse("/files/{name}.json");
        assert_eq!(
            t.matches("/files/report.json"),
            Some(vec![("name".to_string(), "report".to_string())])
        );
        assert_eq!(t.matches("/files/report.xml"), None);
        assert_eq!(t.matches("/files/.json"), None);
    }

    #[test]
    fn root_path() {
        let t = PathTemplate::parse("/");
        assert_eq!(t.matches("/"), Some(vec![]));
        assert_eq!(t.matches("/x"), None);
    }

    #[test]
    fn trailing_slash_is_significant() {
        let t = PathTemplate::parse("/widgets");
        assert_eq!(t.matches("/widgets/"), None);
    }

    #[test]
    fn unbalanced_brace_is_literal() {
        let t = PathTemplate::parse("/odd/}x{");
        assert_eq!(t.specificity(), 2);
        assert_eq!(t.matches("/odd/}x{"), Some(vec![]));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A template built from concrete segments by replacing some of them
        /// with parameters matches the concrete path and captures exactly the
        /// replaced values.
        #[test]
        fn parameterized_template_matches_source_path(
            parts in prop::collection::vec(("[a-z0-9]{1,8}", any::<bool>()), 1..6)
        ) {
            let concrete = format!(
                "/{}",
                parts.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>().join("/")
            );
            let template = format!(
                "/{}",
                parts
                    .iter()
                    .enumerate()
                    .map(|(i, (p, param))| if *param { format!("{{p{i}}}") } else { p.clone() })
                    .collect::<Vec<_>>()
                    .join("/")
            );
            let captures = PathTemplate::parse(&template).matches(&concrete);
            prop_assert!(captures.is_some());
            let expected: Vec<(String, String)> = parts
                .iter()
                .enumerate()
                .filter(|(_, (_, param))| *param)
                .map(|(i, (p, _))| (format!("p{i}"), p.clone()))
                .collect();
            prop_assert_eq!(captures.unwrap(), expected);
        }

        /// Paths with a different segment count never match.
        #[test]
        fn segment_count_must_agree(
            parts in prop::collection::vec("[a-z]{1,5}", 1..5),
            extra in "[a-z]{1,5}"
        ) {
            let template = format!("/{}", parts.join("/"));
            let longer = format!("{template}/{extra}");
            prop_assert!(PathTemplate::parse(&template).matches(&longer).is_none());
        }
    }
}
