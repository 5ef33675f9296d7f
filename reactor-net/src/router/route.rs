use super::path::PathPredicate;
use http::Method;
use std::sync::atomic::{AtomicBool, Ordering};

/// The predicate set a [`Route`] matches on. `None`/empty fields match
/// anything (§4.C10's "any" branches and wildcard content-type/accept/
/// language lists).
#[derive(Debug, Clone, Default)]
pub struct Predicates {
    pub path: Option<PathPredicate>,
    pub method: Option<Method>,
    pub request_content_type: Option<String>,
    pub accept: Option<String>,
    pub language: Option<String>,
}

/// A tuple of predicates plus the resource they dispatch to. Two routes
/// with identical predicate sets compare equal (§3 "Route").
pub struct Route<R> {
    pub id: String,
    pub predicates: Predicates,
    pub resource: R,
    enabled: AtomicBool,
}

impl<R> Route<R> {
    pub fn new(id: impl Into<String>, predicates: Predicates, resource: R) -> Self {
        Self {
            id: id.into(),
            predicates,
            resource,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }
}

impl<R> PartialEq for Route<R> {
    fn eq(&self, other: &Self) -> bool {
        predicates_eq(&self.predicates, &other.predicates)
    }
}

fn predicates_eq(a: &Predicates, b: &Predicates) -> bool {
    a.path == b.path
        && a.method == b.method
        && a.request_content_type == b.request_content_type
        && a.accept == b.accept
        && a.language == b.language
}

impl PartialEq for PathPredicate {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.as_str() == other.as_str()
    }
}
impl Eq for PathPredicate {}

/// Builds one or more [`Route`]s from a fluent predicate description. Any
/// predicate given more than one alternative value expands into the
/// cartesian product of routes at `set()` time (§4.C10 route management:
/// "two content-types and two languages = four Route entries").
#[derive(Default)]
pub struct RouteBuilder {
    path: Option<PathPredicate>,
    methods: Vec<Method>,
    content_types: Vec<String>,
    accepts: Vec<String>,
    languages: Vec<String>,
}

impl RouteBuilder {
    pub fn path(mut self, predicate: PathPredicate) -> Self {
        self.path = Some(predicate);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn content_type(mut self, ct: impl Into<String>) -> Self {
        self.content_types.push(ct.into());
        self
    }

    pub fn accept(mut self, ct: impl Into<String>) -> Self {
        self.accepts.push(ct.into());
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.languages.push(lang.into());
        self
    }

    /// Expands the cartesian product of every multi-valued predicate and
    /// returns one `(id, Predicates)` per combination, assigning the
    /// resource uniformly. `id_prefix` is suffixed with a combination index
    /// when more than one route results.
    pub fn expand(self, id_prefix: &str) -> Vec<(String, Predicates)> {
        let methods: Vec<Option<Method>> = non_empty_or_none(self.methods);
        let content_types: Vec<Option<String>> = non_empty_or_none(self.content_types);
        let accepts: Vec<Option<String>> = non_empty_or_none(self.accepts);
        let languages: Vec<Option<String>> = non_empty_or_none(self.languages);

        let mut out = Vec::new();
        let mut index = 0usize;
        for method in &methods {
            for content_type in &content_types {
                for accept in &accepts {
                    for language in &languages {
                        let id = if methods.len() * content_types.len() * accepts.len() * languages.len() > 1 {
                            format!("{id_prefix}#{index}")
                        } else {
                            id_prefix.to_string()
                        };
                        out.push((
                            id,
                            Predicates {
                                path: self.path.clone(),
                                method: method.clone(),
                                request_content_type: content_type.clone(),
                                accept: accept.clone(),
                                language: language.clone(),
                            },
                        ));
                        index += 1;
                    }
                }
            }
        }
        out
    }
}

fn non_empty_or_none<T>(values: Vec<T>) -> Vec<Option<T>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.into_iter().map(Some).collect()
    }
}
