use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Perks Service API",
        version = "1.0.0",
        description = "CRUD API for merchant perks backed by MongoDB.\n\n**Authentication:** Listing your own perks and creating perks require a JWT Bearer token; the public catalog, title filter and per-id reads are open.\n\n**Features:**\n- Perk CRUD with validation (category enum, discount range, title length)\n- Exact title filter and public search/merchant filter\n- Best-effort creator resolution for legacy createdBy values\n- Health monitoring",
        contact(
            name = "Perks Service Team",
            email = "support@perks-service.com"
        )
    ),
    paths(
        // Health
        crate::api::health::health_check,

        // Perks
        crate::api::perks::list_perks,
        crate::api::perks::public_list,
        crate::api::perks::create_perk,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            crate::models::perk::Category,
            crate::models::perk::PerkResponse,
            crate::models::perk::PublicPerk,
            crate::models::user::CreatorInfo,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint for monitoring service status."),
        (name = "Perks", description = "Perk catalog endpoints. Create, list, search and manage merchant perks."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}
