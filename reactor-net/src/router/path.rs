//! Path predicates and matching (§4.C10 "Path link").

/// A path predicate: either an exact literal or a `{name}`-templated
/// pattern matched segment-by-segment.
#[derive(Debug, Clone)]
pub enum PathPredicate {
    Exact(String),
    Pattern(String),
}

impl PathPredicate {
    pub fn pattern(template: impl Into<String>) -> Self {
        Self::Pattern(template.into())
    }

    pub fn exact(path: impl Into<String>) -> Self {
        Self::Exact(path.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            PathPredicate::Exact(s) | PathPredicate::Pattern(s) => s,
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPredicate::Exact(exact) => exact == path,
            PathPredicate::Pattern(template) => segments_match(template, path),
        }
    }
}

fn segments_match(template: &str, path: &str) -> bool {
    let mut t = template.trim_matches('/').split('/');
    let mut p = path.trim_matches('/').split('/');
    loop {
        match (t.next(), p.next()) {
            (None, None) => return true,
            (Some(ts), Some(ps)) => {
                let is_wildcard = ts.starts_with('{') && ts.ends_with('}');
                if !is_wildcard && ts != ps {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// An exact map plus an insertion-ordered list of patterns, tried only when
/// the exact map misses. Exact match always wins over pattern match
/// (§4.C10 "Path link").
#[derive(Default)]
pub struct PathIndex<T> {
    exact: std::collections::HashMap<String, T>,
    patterns: Vec<(String, T)>,
}

impl<T> PathIndex<T> {
    pub fn new() -> Self {
        Self {
            exact: std::collections::HashMap::new(),
            patterns: Vec::new(),
        }
    }

    pub fn insert(&mut self, predicate: &PathPredicate, value: T) {
        match predicate {
            PathPredicate::Exact(path) => {
                self.exact.insert(path.clone(), value);
            }
            PathPredicate::Pattern(template) => {
                self.patterns.push((template.clone(), value));
            }
        }
    }

    pub fn lookup(&self, path: &str) -> Option<&T> {
        if let Some(v) = self.exact.get(path) {
            return Some(v);
        }
        self.patterns
            .iter()
            .find(|(template, _)| segments_match(template, path))
            .map(|(_, v)| v)
    }

    pub fn lookup_all<'a>(&'a self, path: &str) -> Vec<&'a T> {
        let mut out: Vec<&T> = self.exact.get(path).into_iter().collect();
        out.extend(
            self.patterns
                .iter()
                .filter(|(template, _)| segments_match(template, path))
                .map(|(_, v)| v),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_wins_over_pattern() {
        let mut index = PathIndex::new();
        index.insert(&PathPredicate::pattern("/users/{id}"), "pattern");
        index.insert(&PathPredicate::exact("/users/42"), "exact");
        assert_eq!(index.lookup("/users/42"), Some(&"exact"));
        assert_eq!(index.lookup("/users/7"), Some(&"pattern"));
    }

    #[test]
    fn pattern_precedence_follows_insertion_order() {
        let mut index = PathIndex::new();
        index.insert(&PathPredicate::pattern("/a/{x}"), "first");
        index.insert(&PathPredicate::pattern("/{x}/b"), "second");
        assert_eq!(index.lookup("/a/b"), Some(&"first"));
    }

    #[test]
    fn single_predicate_matches_path_exactly() {
        assert!(PathPredicate::exact("/test").matches("/test"));
        assert!(!PathPredicate::exact("/test").matches("/other"));
        assert!(PathPredicate::pattern("/users/{id}").matches("/users/42"));
    }
}
