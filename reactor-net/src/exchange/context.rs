//! Exchange scratch space (§3 "context object (user-defined scratch
//! space)"). Backed by [`http::Extensions`] — the same type-erased,
//! per-type slot map `http::Request`/`http::Response` use for the same
//! purpose, so handlers stash typed values without the crate inventing
//! its own type-map.

use uuid::Uuid;

pub struct Context {
    request_id: Uuid,
    extensions: http::Extensions,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            request_id: Uuid::now_v7(),
            extensions: http::Extensions::default(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A per-exchange correlation id, generated once when the exchange is
    /// created, for tying log lines and downstream calls to one request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions.get_mut::<T>()
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions.remove::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_retrieves_typed_values() {
        let mut ctx = Context::new();
        assert!(ctx.get::<u32>().is_none());
        ctx.insert(42u32);
        assert_eq!(ctx.get::<u32>(), Some(&42));
        assert_eq!(ctx.remove::<u32>(), Some(42));
        assert!(ctx.get::<u32>().is_none());
    }

    #[test]
    fn each_context_gets_a_distinct_request_id() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.request_id(), b.request_id());
    }
}
