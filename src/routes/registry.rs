//! Router builder that remembers what it registered.
//!
//! An axum `Router` cannot be walked once built, so routes are registered
//! through [`RouteRegistry`], which records every `(method, path)` pair while
//! forwarding the registration to the wrapped router.

use axum::{handler::Handler, routing, Router};
use http::Method;

/// One registered route, with the full path including nest prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRoute {
    pub method: Method,
    pub path: String,
}

pub struct RouteRegistry<S = ()> {
    router: Router<S>,
    routes: Vec<RegisteredRoute>,
}

impl<S> RouteRegistry<S> {
    /// Routes in registration order.
    pub fn routes(&self) -> &[RegisteredRoute] {
        &self.routes
    }
}

impl<S> Default for RouteRegistry<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RouteRegistry<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            routes: Vec::new(),
        }
    }

    pub fn get<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::GET, path, routing::get(handler))
    }

    pub fn post<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::POST, path, routing::post(handler))
    }

    pub fn put<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::PUT, path, routing::put(handler))
    }

    pub fn patch<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::PATCH, path, routing::patch(handler))
    }

    pub fn delete<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::DELETE, path, routing::delete(handler))
    }

    /// Mount `other` under `prefix`, e.g. `/api`.
    ///
    /// Recorded paths are joined the way axum joins them: an inner `/`
    /// becomes the bare prefix. A root prefix merges `other` instead.
    pub fn nest(mut self, prefix: &str, other: RouteRegistry<S>) -> Self {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            self.routes.extend(other.routes);
            self.router = self.router.merge(other.router);
            return self;
        }

        self.routes
            .extend(other.routes.into_iter().map(|route| RegisteredRoute {
                method: route.method,
                path: nested_path(prefix, &route.path),
            }));
        self.router = self.router.nest(prefix, other.router);
        self
    }

    pub fn into_router(self) -> Router<S> {
        self.router
    }

    fn register(mut self, method: Method, path: &str, method_router: routing::MethodRouter<S>) -> Self {
        self.routes.push(RegisteredRoute {
            method,
            path: path.to_string(),
        });
        // Repeated paths merge their method routers
        self.router = self.router.route(path, method_router);
        self
    }
}

fn nested_path(prefix: &str, path: &str) -> String {
    if path == "/" {
        prefix.to_string()
    } else {
        format!("{prefix}{path}")
    }
}
