//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time with utoipa and served at
//! `/openapi.json` (and through `/swagger-ui` when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the drive-relay REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "drive-relay REST API",
        version = "0.1.0",
        description = "Relays remote files into Google Drive folders and reports the outcome to a callback URL",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Relay
        crate::api::routes::upload_file,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobRequest,
        crate::types::Notification,
        crate::types::JobId,
        crate::types::Stage,
        crate::types::Event,

        // API request/response types
        crate::api::routes::HealthResponse,

        // Reply body from error.rs
        crate::error::ApiResponse,
    )),
    tags(
        (name = "relay", description = "Job submission - Fetch a remote file and store it in Drive"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add API key authentication scheme to OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-API-Key"),
                    ),
                ),
            );
        }
    }
}
