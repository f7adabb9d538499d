//! Declarative route tables.
//!
//! Each API area describes its routes as `(method, path, access, handler)`
//! descriptors. Tables are checked once and then resolved into an axum
//! `Router`; protected handlers get the auth gate as a route layer.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::{
    handler::Handler,
    http::Method,
    middleware::from_fn_with_state,
    routing::{self, MethodRouter},
    Router,
};
use thiserror::Error;
use tracing::debug;

use crate::error::AppError;
use crate::middleware::require_auth;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("duplicate route {method} {path}")]
    Duplicate { method: Method, path: String },

    #[error("route {path} has more than one positional parameter")]
    TooManyParams { path: String },

    #[error("route path '{path}' must start with '/'")]
    InvalidPath { path: String },

    #[error("route tables overlap on prefix '{prefix}'")]
    OverlappingPrefix { prefix: String },
}

pub struct RouteDescriptor {
    pub method: Method,
    pub path: &'static str,
    pub access: Access,
    handler: MethodRouter<Arc<AppState>>,
}

impl std::fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("access", &self.access)
            .finish()
    }
}

/// Routes sharing a mount prefix such as `/api/invoices`.
#[derive(Debug)]
pub struct RouteTable {
    prefix: &'static str,
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/'),
            routes: Vec::new(),
        }
    }

    pub fn descriptors(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    fn push(
        mut self,
        method: Method,
        path: &'static str,
        access: Access,
        handler: MethodRouter<Arc<AppState>>,
    ) -> Self {
        self.routes.push(RouteDescriptor {
            method,
            path,
            access,
            handler,
        });
        self
    }

    pub fn get<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, Arc<AppState>>,
        T: 'static,
    {
        self.push(Method::GET, path, access, routing::get(handler))
    }

    pub fn post<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, Arc<AppState>>,
        T: 'static,
    {
        self.push(Method::POST, path, access, routing::post(handler))
    }

    pub fn put<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, Arc<AppState>>,
        T: 'static,
    {
        self.push(Method::PUT, path, access, routing::put(handler))
    }

    pub fn delete<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, Arc<AppState>>,
        T: 'static,
    {
        self.push(Method::DELETE, path, access, routing::delete(handler))
    }

    fn full_path(&self, path: &str) -> String {
        join_path(self.prefix, path)
    }

    pub fn validate(&self) -> Result<(), RouteTableError> {
        let mut seen = HashSet::new();

        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(RouteTableError::InvalidPath {
                    path: route.path.to_string(),
                });
            }

            let params = route
                .path
                .split('/')
                .filter(|segment| segment.starts_with(':'))
                .count();
            if params > 1 {
                return Err(RouteTableError::TooManyParams {
                    path: self.full_path(route.path),
                });
            }

            if !seen.insert((route.method.clone(), route.path)) {
                return Err(RouteTableError::Duplicate {
                    method: route.method.clone(),
                    path: self.full_path(route.path),
                });
            }
        }

        Ok(())
    }

    /// Resolves the table into a router. Methods missing on a known path
    /// answer 404 like any other unknown route.
    pub fn into_router(
        self,
        state: &Arc<AppState>,
    ) -> Result<Router<Arc<AppState>>, RouteTableError> {
        self.validate()?;

        let mut by_path: BTreeMap<String, MethodRouter<Arc<AppState>>> = BTreeMap::new();

        for route in self.routes {
            let full_path = join_path(self.prefix, route.path);
            debug!(method = %route.method, path = %full_path, access = ?route.access, "Registering route");

            let handler = match route.access {
                Access::Public => route.handler,
                Access::Protected => route
                    .handler
                    .route_layer(from_fn_with_state(state.clone(), require_auth)),
            };

            let merged = match by_path.remove(&full_path) {
                Some(existing) => existing.merge(handler),
                None => handler,
            };
            by_path.insert(full_path, merged);
        }

        let router = by_path
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router.fallback(not_found))
            });

        Ok(router)
    }
}

/// Builds one router out of several tables. Two tables may not share a prefix.
pub fn mount_tables(
    tables: Vec<RouteTable>,
    state: &Arc<AppState>,
) -> Result<Router<Arc<AppState>>, RouteTableError> {
    let mut prefixes = HashSet::new();
    for table in &tables {
        if !prefixes.insert(table.prefix) {
            return Err(RouteTableError::OverlappingPrefix {
                prefix: table.prefix.to_string(),
            });
        }
    }

    let mut router = Router::new();
    for table in tables {
        router = router.merge(table.into_router(state)?);
    }
    Ok(router)
}

/// `/` resolves to the prefix itself.
fn join_path(prefix: &str, path: &str) -> String {
    match (prefix, path) {
        ("", "/") => "/".to_string(),
        (prefix, "/") => prefix.to_string(),
        (prefix, path) => format!("{}{}", prefix, path),
    }
}

pub async fn not_found() -> AppError {
    AppError::not_found("Route")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop() -> &'static str {
        "ok"
    }

    #[test]
    fn test_valid_table() {
        let table = RouteTable::new("/api/invoices")
            .get("/", Access::Protected, noop)
            .post("/", Access::Protected, noop)
            .get("/:id", Access::Protected, noop);

        assert!(table.validate().is_ok());
        assert_eq!(table.descriptors().len(), 3);
        assert_eq!(table.full_path("/"), "/api/invoices");
        assert_eq!(table.full_path("/:id"), "/api/invoices/:id");
    }

    #[test]
    fn test_root_table_paths() {
        let table = RouteTable::new("").get("/", Access::Public, noop);
        assert_eq!(table.full_path("/"), "/");
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let table = RouteTable::new("/api/auth")
            .post("/login", Access::Public, noop)
            .post("/login", Access::Public, noop);

        assert_eq!(
            table.validate(),
            Err(RouteTableError::Duplicate {
                method: Method::POST,
                path: "/api/auth/login".to_string(),
            })
        );
    }

    #[test]
    fn test_same_path_different_methods_allowed() {
        let table = RouteTable::new("/api/auth")
            .get("/me", Access::Protected, noop)
            .put("/me", Access::Protected, noop);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_two_params_rejected() {
        let table = RouteTable::new("/api/invoices").get("/:id/:line", Access::Protected, noop);
        assert!(matches!(
            table.validate(),
            Err(RouteTableError::TooManyParams { .. })
        ));
    }

    #[test]
    fn test_relative_path_rejected() {
        let table = RouteTable::new("/api/invoices").get("list", Access::Protected, noop);
        assert!(matches!(
            table.validate(),
            Err(RouteTableError::InvalidPath { .. })
        ));
    }
}
