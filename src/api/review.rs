use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::review::{
    NewReplyRequest, NewReviewRequest, ReviewRecord, UpdateReplyRequest, UpdateReviewRequest,
};
use crate::middleware::auth::AuthContext;
use crate::thread::error::ErrorKind;
use crate::thread::permissions::{Actor, NodePermissions};
use crate::thread::service::ThreadService;
use crate::thread::tree::{ThreadForest, ThreadNode};
use crate::utils::api_response::ApiResponse;

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products/{product_id}/reviews",
            get(get_product_thread).post(create_review),
        )
        .route("/reviews/{review_id}/replies", post(create_reply))
        .route(
            "/reviews/{review_id}",
            patch(update_review).delete(delete_record),
        )
        .route("/replies/{reply_id}", patch(update_reply))
}

fn require_actor(auth: &AuthContext) -> Result<&Actor, ApiResponse<()>> {
    auth.actor().ok_or_else(|| {
        ApiResponse::error(
            StatusCode::UNAUTHORIZED,
            "Authentication required",
            Some(ErrorKind::PermissionDenied),
        )
    })
}

#[utoipa::path(
    get,
    path = "/products/{product_id}/reviews",
    tag = "Reviews",
    params(
        ("product_id" = Uuid, Path, description = "Product whose thread is requested"),
    ),
    responses(
        (status = 200, description = "Thread retrieved successfully", body = ThreadForest),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn get_product_thread(
    State(service): State<ThreadService>,
    Extension(auth): Extension<AuthContext>,
    AxumPath(product_id): AxumPath<Uuid>,
) -> Result<ApiResponse<ThreadForest>, ApiResponse<()>> {
    let forest = service.fetch_thread(product_id, auth.actor()).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Thread retrieved successfully",
        forest,
    ))
}

#[utoipa::path(
    post,
    path = "/products/{product_id}/reviews",
    tag = "Reviews",
    params(
        ("product_id" = Uuid, Path, description = "Product being reviewed"),
    ),
    request_body = NewReviewRequest,
    responses(
        (status = 201, description = "Review created successfully", body = ThreadForest),
        (status = 400, description = "Invalid rating or comment"),
        (status = 401, description = "Authentication required"),
        (status = 409, description = "Author already reviewed this product"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_review(
    State(service): State<ThreadService>,
    Extension(auth): Extension<AuthContext>,
    AxumPath(product_id): AxumPath<Uuid>,
    Json(payload): Json<NewReviewRequest>,
) -> Result<ApiResponse<ThreadForest>, ApiResponse<()>> {
    let actor = require_actor(&auth)?;
    let forest = service
        .add_review(product_id, actor, payload.rating, payload.comment)
        .await?;
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Review created successfully",
        forest,
    ))
}

#[utoipa::path(
    post,
    path = "/reviews/{review_id}/replies",
    tag = "Reviews",
    params(
        ("review_id" = Uuid, Path, description = "Review or reply being answered"),
    ),
    request_body = NewReplyRequest,
    responses(
        (status = 201, description = "Reply created successfully", body = ThreadForest),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Parent record not found"),
        (status = 422, description = "Reply depth limit reached"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_reply(
    State(service): State<ThreadService>,
    Extension(auth): Extension<AuthContext>,
    AxumPath(review_id): AxumPath<Uuid>,
    Json(payload): Json<NewReplyRequest>,
) -> Result<ApiResponse<ThreadForest>, ApiResponse<()>> {
    let actor = require_actor(&auth)?;
    let forest = service.add_reply(review_id, actor, payload.comment).await?;
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Reply created successfully",
        forest,
    ))
}

#[utoipa::path(
    patch,
    path = "/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("review_id" = Uuid, Path, description = "Top-level review to update"),
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated successfully", body = ThreadForest),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Only the author may edit"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn update_review(
    State(service): State<ThreadService>,
    Extension(auth): Extension<AuthContext>,
    AxumPath(review_id): AxumPath<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<ApiResponse<ThreadForest>, ApiResponse<()>> {
    let actor = require_actor(&auth)?;
    let forest = service
        .update_review(review_id, actor, payload.rating, payload.comment)
        .await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Review updated successfully",
        forest,
    ))
}

#[utoipa::path(
    patch,
    path = "/replies/{reply_id}",
    tag = "Reviews",
    params(
        ("reply_id" = Uuid, Path, description = "Reply to update"),
    ),
    request_body = UpdateReplyRequest,
    responses(
        (status = 200, description = "Reply updated successfully", body = ThreadForest),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Only the author may edit"),
        (status = 404, description = "Reply not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn update_reply(
    State(service): State<ThreadService>,
    Extension(auth): Extension<AuthContext>,
    AxumPath(reply_id): AxumPath<Uuid>,
    Json(payload): Json<UpdateReplyRequest>,
) -> Result<ApiResponse<ThreadForest>, ApiResponse<()>> {
    let actor = require_actor(&auth)?;
    let forest = service.update_reply(reply_id, actor, payload.comment).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Reply updated successfully",
        forest,
    ))
}

#[utoipa::path(
    delete,
    path = "/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("review_id" = Uuid, Path, description = "Review or reply to delete"),
    ),
    responses(
        (status = 200, description = "Record deleted successfully", body = ThreadForest),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Only the author or an admin may delete"),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn delete_record(
    State(service): State<ThreadService>,
    Extension(auth): Extension<AuthContext>,
    AxumPath(review_id): AxumPath<Uuid>,
) -> Result<ApiResponse<ThreadForest>, ApiResponse<()>> {
    let actor = require_actor(&auth)?;
    let forest = service.delete_record(review_id, actor).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Record deleted successfully",
        forest,
    ))
}

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::Modify;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_product_thread,
        create_review,
        create_reply,
        update_review,
        update_reply,
        delete_record
    ),
    components(
        schemas(
            ThreadForest, ThreadNode, ReviewRecord, NodePermissions, ErrorKind,
            NewReviewRequest, NewReplyRequest, UpdateReviewRequest, UpdateReplyRequest
        )
    ),
    tags(
        (name = "Reviews", description = "Threaded review and reply endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ReviewDoc;
