//! The request router (§4.C10): a composable chain of predicates over
//! path, method, request content-type, accept (response content-type) and
//! accept-language, with scored best-match resolution.
//!
//! Modeled as tagged [`Predicates`] compared by one recursive scoring pass
//! rather than literal chained link objects (§9 design note: "Model this
//! as tagged variants ... with a single recursive `resolve` driver").

mod path;
mod route;

pub use path::PathPredicate;
pub use route::{Predicates, Route, RouteBuilder};

use crate::header::{
    best_match as best_media_match, parse_content_type, parse_language_ranges, parse_media_ranges,
    ContentType, LanguageRange, MediaRange,
};
use http::Method;
use std::sync::atomic::AtomicUsize;
use std::sync::{atomic::Ordering, Arc};

/// The request-side view a router matches against. Intentionally narrower
/// than the full [`crate::exchange::Request`] so the router has no
/// dependency on the connection engine.
pub struct MatchInput<'a> {
    pub path: &'a str,
    pub method: &'a Method,
    pub content_type: Option<&'a ContentType>,
    pub accept: Option<&'a str>,
    pub accept_language: Option<&'a str>,
}

/// A composable set of routes, resolved by predicate specificity
/// (§4.C10). `R` is the resource a matching route dispatches to (a
/// handler, an interceptor, or anything else the caller wires in).
pub struct Router<R> {
    routes: Vec<Arc<Route<R>>>,
    next_index: AtomicUsize,
}

impl<R> Default for Router<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Router<R> {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            next_index: AtomicUsize::new(0),
        }
    }

    pub fn route(&self) -> RouteBuilder {
        RouteBuilder::default()
    }

    /// Inserts every route the builder expands to, with `resource` cloned
    /// into each one.
    pub fn insert(&mut self, builder: RouteBuilder, resource: R)
    where
        R: Clone,
    {
        let prefix = format!("route-{}", self.next_index.fetch_add(1, Ordering::SeqCst));
        for (id, predicates) in builder.expand(&prefix) {
            self.routes.push(Arc::new(Route::new(id, predicates, resource.clone())));
        }
    }

    /// Inserts a single route under an explicit id, bypassing cartesian
    /// expansion — used when the caller already knows it wants exactly one
    /// route (as in the end-to-end scenarios).
    pub fn insert_with_id(&mut self, id: impl Into<String>, predicates: Predicates, resource: R) {
        self.routes.push(Arc::new(Route::new(id, predicates, resource)));
    }

    pub fn disable(&self, id: &str) {
        if let Some(route) = self.routes.iter().find(|r| r.id == id) {
            route.disable();
        }
    }

    pub fn enable(&self, id: &str) {
        if let Some(route) = self.routes.iter().find(|r| r.id == id) {
            route.enable();
        }
    }

    /// Every registered route, including disabled ones (§4.C10 route
    /// management: "a disabled Route ... still appears in `getRoutes()`").
    pub fn get_routes(&self) -> &[Arc<Route<R>>] {
        &self.routes
    }

    /// Routes whose predicate set is a superset of `predicates`
    /// (intersection semantics: every `Some` field in `predicates` must
    /// equal the route's corresponding field).
    pub fn find_routes(&self, predicates: &Predicates) -> Vec<&Arc<Route<R>>> {
        self.routes
            .iter()
            .filter(|route| includes(&route.predicates, predicates))
            .collect()
    }

    /// The single best-matching resource, or `None`.
    pub fn resolve(&self, input: &MatchInput) -> Option<&R> {
        self.resolve_all(input).into_iter().next()
    }

    /// Every matching resource, most specific first (§4.C10 "resolveAll").
    /// Used to derive the interceptor chain for a request.
    pub fn resolve_all(&self, input: &MatchInput) -> Vec<&R> {
        let mut scored: Vec<(Score, usize, &R)> = self
            .routes
            .iter()
            .enumerate()
            .filter(|(_, route)| route.is_enabled())
            .filter_map(|(i, route)| score(&route.predicates, input).map(|s| (s, i, &route.resource)))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, _, r)| r).collect()
    }
}

fn includes(route: &Predicates, subset: &Predicates) -> bool {
    field_includes(&route.path.as_ref().map(|p| p.as_str()), &subset.path.as_ref().map(|p| p.as_str()))
        && field_includes(&route.method, &subset.method)
        && field_includes(&route.request_content_type, &subset.request_content_type)
        && field_includes(&route.accept, &subset.accept)
        && field_includes(&route.language, &subset.language)
}

fn field_includes<T: PartialEq>(route_field: &Option<T>, wanted: &Option<T>) -> bool {
    match wanted {
        None => true,
        Some(w) => route_field.as_ref() == Some(w),
    }
}

/// Precedence tuple per §4.C10: path > method > content-type > accept >
/// language. Each component is 0 when the route has no predicate of that
/// kind (matches anything, ranks lowest within its tier).
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    path: u8,
    method: u8,
    content_type: u8,
    accept: u32,
    language: u32,
}

fn score(predicates: &Predicates, input: &MatchInput) -> Option<Score> {
    let path_score = match &predicates.path {
        None => 0,
        Some(PathPredicate::Pattern(template)) => {
            if path_matches_pattern(template, input.path) {
                1
            } else {
                return None;
            }
        }
        Some(PathPredicate::Exact(exact)) => {
            if exact == input.path {
                2
            } else {
                return None;
            }
        }
    };

    let method_score = match &predicates.method {
        None => 0,
        Some(m) if m == input.method => 1,
        Some(_) => return None,
    };

    let content_type_score = match (&predicates.request_content_type, input.content_type) {
        (None, _) => 0,
        (Some(expected), Some(actual)) => {
            let expected_ct = parse_content_type(expected).ok()?;
            if expected_ct.is_wildcard() {
                let range = MediaRange {
                    r#type: expected_ct.r#type,
                    subtype: expected_ct.subtype,
                    weight: 1.0,
                    params: Vec::new(),
                };
                if range.matches(actual) {
                    1
                } else {
                    return None;
                }
            } else if expected_ct.normalized() == actual.normalized() {
                2
            } else {
                return None;
            }
        }
        _ => return None,
    };

    let accept_score = match (&predicates.accept, input.accept) {
        (None, _) => 0,
        (Some(produced), accept_header) => {
            let produced_ct = parse_content_type(produced).ok()?;
            match accept_header {
                None => 1,
                Some(raw) => {
                    let ranges = parse_media_ranges(raw).unwrap_or_default();
                    let candidates = [produced_ct];
                    match best_media_match(&ranges, &candidates) {
                        Some(_) => 1 + (ranges.iter().map(|r| r.score()).fold(0.0, f64::max) as u32),
                        None => return None,
                    }
                }
            }
        }
    };

    let language_score = match (&predicates.language, input.accept_language) {
        (None, _) => 0,
        (Some(lang), None) => {
            let _ = lang;
            1
        }
        (Some(lang), Some(raw)) => {
            let ranges = parse_language_ranges(raw).unwrap_or_default();
            match ranges.iter().find(|r| language_range_matches(r, lang)) {
                Some(r) => 1 + (r.score() as u32),
                None => return None,
            }
        }
    };

    Some(Score {
        path: path_score,
        method: method_score,
        content_type: content_type_score,
        accept: accept_score,
        language: language_score,
    })
}

fn language_range_matches(range: &LanguageRange, tag: &str) -> bool {
    let (primary, subtag) = match tag.split_once('-') {
        Some((p, s)) => (p, Some(s)),
        None => (tag, None),
    };
    (range.primary == "*" || range.primary.eq_ignore_ascii_case(primary))
        && match &range.subtag {
            None => true,
            Some(rs) => subtag.is_some_and(|s| rs.eq_ignore_ascii_case(s)),
        }
}

fn path_matches_pattern(template: &str, path: &str) -> bool {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(path: &'a str, method: &'a Method, content_type: Option<&'a ContentType>) -> MatchInput<'a> {
        MatchInput {
            path,
            method,
            content_type,
            accept: Some("application/json"),
            accept_language: None,
        }
    }

    #[test]
    fn exact_path_outranks_pattern_and_catch_all() {
        let mut router: Router<&'static str> = Router::new();
        router.insert_with_id("catch-all", Predicates::default(), "catch-all");
        router.insert_with_id(
            "pattern",
            Predicates {
                path: Some(PathPredicate::pattern("/{any}")),
                ..Default::default()
            },
            "pattern",
        );
        router.insert_with_id(
            "exact",
            Predicates {
                path: Some(PathPredicate::exact("/test")),
                ..Default::default()
            },
            "exact",
        );

        let method = Method::GET;
        let results = router.resolve_all(&input("/test", &method, None));
        assert_eq!(results, vec![&"exact", &"pattern", &"catch-all"]);
    }

    #[test]
    fn more_specific_predicate_combination_wins() {
        let mut router: Router<&'static str> = Router::new();
        let json = parse_content_type("application/json").unwrap();

        router.insert_with_id(
            "path-only",
            Predicates {
                path: Some(PathPredicate::exact("/test")),
                ..Default::default()
            },
            "path-only",
        );
        router.insert_with_id(
            "path-and-method",
            Predicates {
                path: Some(PathPredicate::exact("/test")),
                method: Some(Method::GET),
                ..Default::default()
            },
            "path-and-method",
        );
        router.insert_with_id(
            "path-method-and-ct",
            Predicates {
                path: Some(PathPredicate::exact("/test")),
                method: Some(Method::GET),
                request_content_type: Some("application/json".to_string()),
                ..Default::default()
            },
            "path-method-and-ct",
        );

        let method = Method::GET;
        let results = router.resolve_all(&input("/test", &method, Some(&json)));
        assert_eq!(
            results,
            vec![&"path-method-and-ct", &"path-and-method", &"path-only"]
        );
    }

    #[test]
    fn disabled_route_is_skipped_but_still_listed() {
        let mut router: Router<&'static str> = Router::new();
        router.insert_with_id(
            "only",
            Predicates {
                path: Some(PathPredicate::exact("/test")),
                ..Default::default()
            },
            "only",
        );
        router.disable("only");

        let method = Method::GET;
        assert!(router.resolve(&input("/test", &method, None)).is_none());
        assert_eq!(router.get_routes().len(), 1);
    }

    #[test]
    fn cartesian_expansion_produces_one_route_per_combination() {
        let mut router: Router<&'static str> = Router::new();
        let builder = router
            .route()
            .path(PathPredicate::exact("/multi"))
            .content_type("application/json")
            .content_type("application/xml")
            .language("en")
            .language("fr");
        router.insert(builder, "handler");
        assert_eq!(router.get_routes().len(), 4);
    }

    #[test]
    fn wildcard_content_type_predicate_matches_any_subtype() {
        let mut router: Router<&'static str> = Router::new();
        let json = parse_content_type("application/json").unwrap();

        router.insert_with_id(
            "wildcard",
            Predicates {
                request_content_type: Some("application/*".to_string()),
                ..Default::default()
            },
            "wildcard",
        );

        let method = Method::POST;
        let results = router.resolve_all(&input("/test", &method, Some(&json)));
        assert_eq!(results, vec![&"wildcard"]);
    }

    #[test]
    fn exact_content_type_outranks_wildcard() {
        let mut router: Router<&'static str> = Router::new();
        let json = parse_content_type("application/json").unwrap();

        router.insert_with_id(
            "wildcard",
            Predicates {
                request_content_type: Some("application/*".to_string()),
                ..Default::default()
            },
            "wildcard",
        );
        router.insert_with_id(
            "exact",
            Predicates {
                request_content_type: Some("application/json".to_string()),
                ..Default::default()
            },
            "exact",
        );

        let method = Method::POST;
        let results = router.resolve_all(&input("/test", &method, Some(&json)));
        assert_eq!(results, vec![&"exact", &"wildcard"]);
    }

    #[test]
    fn fully_wildcard_content_type_matches_any_type() {
        let mut router: Router<&'static str> = Router::new();
        let xml = parse_content_type("text/xml").unwrap();

        router.insert_with_id(
            "any",
            Predicates {
                request_content_type: Some("*/*".to_string()),
                ..Default::default()
            },
            "any",
        );

        let method = Method::POST;
        let results = router.resolve_all(&input("/test", &method, Some(&xml)));
        assert_eq!(results, vec![&"any"]);
    }

    #[test]
    fn find_routes_matches_by_predicate_subset() {
        let mut router: Router<&'static str> = Router::new();
        router.insert_with_id(
            "a",
            Predicates {
                path: Some(PathPredicate::exact("/test")),
                method: Some(Method::GET),
                ..Default::default()
            },
            "a",
        );
        router.insert_with_id(
            "b",
            Predicates {
                path: Some(PathPredicate::exact("/other")),
                method: Some(Method::GET),
                ..Default::default()
            },
            "b",
        );

        let wanted = Predicates {
            method: Some(Method::GET),
            ..Default::default()
        };
        assert_eq!(router.find_routes(&wanted).len(), 2);
    }
}
