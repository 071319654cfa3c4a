pub mod auth;
pub mod extract;
pub mod health;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{
    dto::{auth_dto, user_dto},
    middleware::auth::require_bearer_auth,
    utils::validation::MAX_IMAGE_BYTES,
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::me,
        users::list_users,
        users::get_user,
        users::get_profile,
        users::update_profile,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::upload_profile_picture,
        users::delete_profile_picture,
    ),
    components(schemas(
        auth_dto::LoginPayload,
        auth_dto::LoginResponse,
        user_dto::UserResponse,
        user_dto::UserEnvelope,
        user_dto::UserListResponse,
        user_dto::UpdateProfilePayload,
        user_dto::CreateUserPayload,
        user_dto::AdminUpdateUserPayload,
        user_dto::MessageResponse,
        user_dto::ProfilePictureResponse,
    ))
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// All API routes with their auth layers applied. Static upload serving and
/// global layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/openapi.json", get(openapi))
        .route("/api/auth/login", post(auth::login));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route(
            "/api/users/profile/picture",
            post(users::upload_profile_picture)
                .delete(users::delete_profile_picture)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES * 2)),
        )
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            require_bearer_auth,
        ));

    public.merge(protected).with_state(state)
}
