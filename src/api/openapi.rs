use super::{
    error::ErrorBody,
    handlers::{
        auth::{
            self,
            types::{LoginRequest, LoginResponse, RefreshResponse},
        },
        health::{self, Health},
    },
};
use crate::{role::Role, user::UserRecord};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login::login,
        auth::session::refresh,
        auth::session::logout,
        auth::session::current_user,
    ),
    components(schemas(
        Role,
        UserRecord,
        LoginRequest,
        LoginResponse,
        RefreshResponse,
        ErrorBody,
        Health
    )),
    modifiers(&BearerScheme),
    tags(
        (name = "auth", description = "Admin and staff sessions"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// The generated `OpenAPI` document, titled from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = Some(env!("CARGO_PKG_DESCRIPTION").to_string());
    doc
}
