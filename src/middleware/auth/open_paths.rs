/*
 * Responsibility
 * - The allow-list of path+method combinations exempt from authentication
 * - Glob matching: `*` = exactly one segment, `**` = any depth (including
 *   zero segments); an empty method set matches any method
 * - Loaded once at startup, immutable, shared read-only across requests
 * - Nothing configured means nothing is open
 */
use std::collections::HashSet;

use axum::http::Method;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenPathsError {
    #[error("open path entry [{0}] must contain a '/'-prefixed pattern")]
    InvalidPattern(String),
    #[error("open path entry [{0}] names an invalid method")]
    InvalidMethod(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*`: exactly one segment.
    Any,
    /// `**`: any number of segments, including none.
    AnyDepth,
}

#[derive(Debug, Clone)]
struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    fn compile(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "**" => Segment::AnyDepth,
                "*" => Segment::Any,
                other => Segment::Literal(other.to_string()),
            })
            .collect();

        Self { segments }
    }

    fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        Self::matches_segments(&self.segments, &parts)
    }

    fn matches_segments(pattern: &[Segment], path: &[&str]) -> bool {
        match pattern.split_first() {
            None => path.is_empty(),
            Some((Segment::AnyDepth, rest)) => {
                (0..=path.len()).any(|skip| Self::matches_segments(rest, &path[skip..]))
            }
            Some((segment, rest)) => match path.split_first() {
                None => false,
                Some((head, tail)) => {
                    let head_matches = match segment {
                        Segment::Literal(lit) => lit == head,
                        Segment::Any => true,
                        Segment::AnyDepth => unreachable!(),
                    };
                    head_matches && Self::matches_segments(rest, tail)
                }
            },
        }
    }
}

#[derive(Debug, Clone)]
struct OpenPathRule {
    pattern: PathPattern,
    /// Empty = match regardless of method.
    methods: HashSet<Method>,
}

#[derive(Debug, Clone, Default)]
pub struct OpenPaths {
    rules: Vec<OpenPathRule>,
}

impl OpenPaths {
    /// Parse a comma-separated rule list: each entry is `"/pattern"` or
    /// `"METHOD|METHOD:/pattern"`, e.g.
    /// `"/health, GET:/public/**, POST|PUT:/v1/api/webhooks/*"`.
    pub fn parse(input: &str) -> Result<Self, OpenPathsError> {
        let mut rules = Vec::new();

        for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (methods, pattern) = if entry.starts_with('/') {
                (HashSet::new(), entry)
            } else {
                let (methods, pattern) = entry
                    .split_once(':')
                    .ok_or_else(|| OpenPathsError::InvalidPattern(entry.to_string()))?;

                let methods = methods
                    .split('|')
                    .map(str::trim)
                    .map(|m| {
                        m.parse::<Method>()
                            .map_err(|_| OpenPathsError::InvalidMethod(entry.to_string()))
                    })
                    .collect::<Result<HashSet<_>, _>>()?;

                (methods, pattern.trim())
            };

            if !pattern.starts_with('/') {
                return Err(OpenPathsError::InvalidPattern(entry.to_string()));
            }

            rules.push(OpenPathRule {
                pattern: PathPattern::compile(pattern),
                methods,
            });
        }

        Ok(Self { rules })
    }

    /// Whether this path+method bypasses authentication. Pure; safe from
    /// any number of concurrent requests.
    pub fn is_open(&self, path: &str, method: &Method) -> bool {
        self.rules.iter().any(|rule| {
            (rule.methods.is_empty() || rule.methods.contains(method))
                && rule.pattern.matches(path)
        })
    }
}
