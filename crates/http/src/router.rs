//! Router builder for the HTTP server

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::HeaderName, Method, StatusCode},
    routing::get,
    Router,
};
use tower::Layer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use bookshelf_kernel::ModuleRegistry;

use crate::{error::AppError, format, MakeRequestUuidV7};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builder for constructing the main HTTP router.
///
/// Add routes before layers: `Router::layer` only wraps what is already
/// registered.
pub struct RouterBuilder {
    router: Router,
    negotiated: Vec<&'static str>,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            negotiated: Vec::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Merge a module's router. Paths under `/{module_name}` get format
    /// suffix negotiation.
    pub fn mount_module(mut self, module_name: &'static str, module_router: Router) -> Self {
        self.router = self.router.merge(module_router);
        self.negotiated.push(module_name);
        self
    }

    /// Answer unmatched paths and unsupported methods with the standard
    /// error body. Call after every route is registered.
    pub fn with_fallback(mut self) -> Self {
        self.router = self
            .router
            .fallback(|| async { AppError::not_found("The requested resource was not found.") })
            .method_not_allowed_fallback(|method: Method| async move {
                AppError::method_not_allowed(&method)
            });
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Assign an `x-request-id` to every request and echo it on the response.
    /// Apply after [`Self::with_tracing`] so spans see the id.
    pub fn with_request_id(mut self) -> Self {
        let header = HeaderName::from_static(REQUEST_ID_HEADER);
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::new(header.clone()))
            .layer(SetRequestIdLayer::new(header, MakeRequestUuidV7));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self.router.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_millis(timeout_ms),
        ));
        self
    }

    /// Serve the merged OpenAPI document and a Swagger UI for it
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = openapi_document(registry);

        // Swagger UI wants a typed document
        match serde_json::from_value::<utoipa::openapi::OpenApi>(openapi_spec.clone()) {
            Ok(openapi_obj) => {
                self.router = self.router.merge(
                    utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                        .url("/api-docs/openapi.json", openapi_obj),
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "merged OpenAPI document is invalid; swagger ui disabled");
            }
        }

        // Raw JSON spec for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router, wrapped in format negotiation
    pub fn build(self) -> Router {
        let prefixes = Arc::new(self.negotiated);
        let negotiated = axum::middleware::from_fn_with_state(prefixes, format::negotiate)
            .layer(self.router);

        // The rewrite must happen before routing, so the real router sits
        // behind an outer one as its fallback service.
        Router::new().fallback_service(negotiated)
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge the OpenAPI fragments of all modules into one document
pub fn openapi_document(registry: &ModuleRegistry) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Bookshelf API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Book catalogue service"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "operationId": "health_check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "text/plain": {
                            "schema": {
                                "type": "string"
                            }
                        }
                    }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                openapi_spec["paths"][path] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }

        if let Some(tags) = module_spec.get("tags").and_then(|t| t.as_array()) {
            let merged = openapi_spec
                .as_object_mut()
                .map(|root| root.entry("tags").or_insert_with(|| serde_json::json!([])));
            if let Some(serde_json::Value::Array(existing)) = merged {
                existing.extend(tags.iter().cloned());
            }
        }
    }

    openapi_spec
}
