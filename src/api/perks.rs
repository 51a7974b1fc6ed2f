use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::services::perk_service;
use crate::utils::error::AppError;

#[derive(Deserialize)]
pub struct ListPerksQuery {
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct PublicListQuery {
    pub search: Option<String>,
    pub merchant: Option<String>,
}

/// Mapeia AppError para status + body JSON (convenção success/error)
fn error_response(err: &AppError) -> HttpResponse {
    match err {
        AppError::Validation(errors) => HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": errors.join("; "),
            "errors": errors
        })),
        AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(serde_json::json!({
            "success": false,
            "error": msg
        })),
        AppError::NotFound(msg) => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": msg
        })),
        AppError::Conflict(msg) => HttpResponse::Conflict().json(serde_json::json!({
            "success": false,
            "error": msg
        })),
        AppError::Database(msg) => HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": format!("Database error: {}", msg)
        })),
    }
}

/// GET /perks - duas operações na mesma rota:
/// com ?title= filtra por título exato (público); sem title lista os
/// perks do caller autenticado.
#[utoipa::path(
    get,
    path = "/perks",
    tag = "Perks",
    params(
        ("title" = Option<String>, Query, description = "Exact title to filter by (public). Omit to list your own perks (requires auth)")
    ),
    responses(
        (status = 200, description = "Matching perks, newest first"),
        (status = 400, description = "Blank title filter"),
        (status = 401, description = "Listing own perks without authentication")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_perks(
    user: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    query: web::Query<ListPerksQuery>,
) -> impl Responder {
    if let Some(title) = &query.title {
        log::info!("🔍 GET /perks?title={}", title);

        if title.trim().is_empty() {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "title query parameter is required"
            }));
        }

        return match perk_service::filter_by_title(&db, title).await {
            Ok(perks) => {
                log::info!("✅ Found {} perks titled '{}'", perks.len(), title);
                HttpResponse::Ok().json(perks)
            }
            Err(e) => {
                log::error!("❌ Failed to filter perks: {}", e);
                error_response(&e)
            }
        };
    }

    let user = match user {
        Some(user) => user,
        None => {
            log::warn!("⚠️ GET /perks without authenticated user");
            return error_response(&AppError::Unauthorized(
                "Authentication required".to_string(),
            ));
        }
    };

    log::info!("📋 GET /perks - Listing perks for user {}", user.sub);

    match perk_service::list_owned(&db, &user.sub).await {
        Ok(perks) => {
            let count = perks.len();
            log::info!("✅ Listed {} perks", count);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "perks": perks,
                "count": count
            }))
        }
        Err(e) => {
            log::error!("❌ Failed to list perks: {}", e);
            error_response(&e)
        }
    }
}

/// GET /perks/public - listagem pública com busca e filtro por merchant,
/// criadores resolvidos para {name, email}
#[utoipa::path(
    get,
    path = "/perks/public",
    tag = "Perks",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive substring match on title"),
        ("merchant" = Option<String>, Query, description = "Exact merchant match (trimmed)")
    ),
    responses(
        (status = 200, description = "Perks with resolved creators, newest first")
    )
)]
pub async fn public_list(
    db: web::Data<MongoDB>,
    query: web::Query<PublicListQuery>,
) -> impl Responder {
    log::info!(
        "🌐 GET /perks/public - search: {:?}, merchant: {:?}",
        query.search,
        query.merchant
    );

    match perk_service::public_list(&db, query.search.as_deref(), query.merchant.as_deref()).await
    {
        Ok(perks) => {
            let count = perks.len();
            log::info!("✅ Public listing returned {} perks", count);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "perks": perks,
                "count": count
            }))
        }
        Err(e) => {
            log::error!("❌ Failed to list public perks: {}", e);
            error_response(&e)
        }
    }
}

/// GET /perks/{id} - sem checagem de dono (catálogo público)
pub async fn get_perk(db: web::Data<MongoDB>, path: web::Path<String>) -> impl Responder {
    let perk_id = path.into_inner();
    log::info!("🎟️  GET /perks/{}", perk_id);

    match perk_service::get_by_id(&db, &perk_id).await {
        Ok(perk) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "perk": perk
        })),
        Err(e) => {
            log::warn!("⚠️ Failed to get perk {}: {}", perk_id, e);
            error_response(&e)
        }
    }
}

/// POST /perks - cria perk com o dono forçado ao caller autenticado
#[utoipa::path(
    post,
    path = "/perks",
    tag = "Perks",
    responses(
        (status = 201, description = "Perk created"),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Missing authentication"),
        (status = 409, description = "Duplicate title/merchant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_perk(
    user: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    body: web::Json<serde_json::Value>,
) -> impl Responder {
    let user = match user {
        Some(user) => user,
        None => {
            log::warn!("⚠️ POST /perks without authenticated user");
            return error_response(&AppError::Unauthorized(
                "Authentication required".to_string(),
            ));
        }
    };

    log::info!("📝 POST /perks - Creating perk for user {}", user.sub);

    match perk_service::create_perk(&db, &user.sub, &body).await {
        Ok(perk) => {
            log::info!("✅ Perk created: {}", perk.id);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "perk": perk
            }))
        }
        Err(e) => {
            log::error!("❌ Failed to create perk: {}", e);
            error_response(&e)
        }
    }
}

/// PATCH|PUT /perks/{id} - merge parcial validado (coleta todos os erros)
pub async fn update_perk(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
) -> impl Responder {
    let perk_id = path.into_inner();
    log::info!("🔧 PATCH /perks/{}", perk_id);

    match perk_service::update_perk(&db, &perk_id, &body).await {
        Ok(perk) => {
            log::info!("✅ Perk {} updated", perk_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "perk": perk
            }))
        }
        Err(e) => {
            log::error!("❌ Failed to update perk {}: {}", perk_id, e);
            error_response(&e)
        }
    }
}

/// DELETE /perks/{id}
pub async fn delete_perk(db: web::Data<MongoDB>, path: web::Path<String>) -> impl Responder {
    let perk_id = path.into_inner();
    log::info!("🗑️  DELETE /perks/{}", perk_id);

    match perk_service::delete_perk(&db, &perk_id).await {
        Ok(()) => {
            log::info!("✅ Perk {} deleted", perk_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "ok": true
            }))
        }
        Err(e) => {
            log::warn!("⚠️ Failed to delete perk {}: {}", perk_id, e);
            error_response(&e)
        }
    }
}
