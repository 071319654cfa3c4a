use axum::{
    extract::{multipart::Field, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use bytes::BytesMut;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::user_dto::{
        AdminUpdateUserPayload, CreateUserPayload, MessageResponse, ProfilePictureResponse,
        UpdateProfilePayload, UserEnvelope, UserListResponse,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::user::{ROLE_ADMIN, ROLE_MANAGER},
    routes::extract::{JsonBody, MultipartForm, PathParam},
    utils::validation::{UploadError, MAX_IMAGE_BYTES},
    AppState,
};

const STAFF: &[&str] = &[ROLE_ADMIN, ROLE_MANAGER];
const ADMIN: &[&str] = &[ROLE_ADMIN];

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users, passwords omitted", body = UserListResponse),
        (status = 403, description = "Caller is not an admin or manager")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    claims.require_role(STAFF)?;
    let users = state.user_service.list().await?;
    Ok(Json(UserListResponse::from(users)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserEnvelope),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require_role(STAFF)?;
    let user = state.user_service.get(id).await?;
    Ok(Json(UserEnvelope::success(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "The caller's own profile", body = UserEnvelope)
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get(claims.user_id()?).await?;
    Ok(Json(UserEnvelope::success(user)))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Profile updated", body = UserEnvelope),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(payload): JsonBody<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .user_service
        .update_profile(claims.user_id()?, payload)
        .await?;
    Ok(Json(UserEnvelope::success(user)))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created", body = UserEnvelope),
        (status = 400, description = "Invalid payload or email already registered")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(payload): JsonBody<CreateUserPayload>,
) -> Result<impl IntoResponse> {
    claims.require_role(ADMIN)?;
    payload.validate()?;
    let user = state.user_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(UserEnvelope::success(user))))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = AdminUpdateUserPayload,
    responses(
        (status = 200, description = "User updated", body = UserEnvelope),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<AdminUpdateUserPayload>,
) -> Result<impl IntoResponse> {
    claims.require_role(ADMIN)?;
    payload.validate()?;
    let user = state.user_service.update(id, payload).await?;
    Ok(Json(UserEnvelope::success(user)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require_role(ADMIN)?;
    state.user_service.delete(id).await?;
    Ok(Json(MessageResponse::success("User deleted successfully")))
}

/// Reads a multipart field, failing as soon as it exceeds the image cap so
/// oversized uploads are never buffered in full.
async fn read_capped(mut field: Field<'_>) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        if buf.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge {
                size: buf.len() + chunk.len(),
            }
            .into());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

#[utoipa::path(
    post,
    path = "/api/users/profile/picture",
    responses(
        (status = 200, description = "Picture stored", body = ProfilePictureResponse),
        (status = 400, description = "No file, wrong type or too large")
    )
)]
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    MultipartForm(mut multipart): MultipartForm,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;

    let mut stored = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to get next field: {}", e);
        Error::BadRequest(e.to_string())
    })? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = read_capped(field).await?;

        let file = state
            .user_service
            .uploads()
            .store(&file_name, &mime, &data)
            .await?;
        stored = Some(file);
        break;
    }

    let file = stored.ok_or(Error::Upload(UploadError::Missing))?;
    tracing::info!(
        user_id = %user_id,
        original = %file.original_name,
        size = file.size,
        mime = %file.mime,
        "File uploaded"
    );

    let user = state
        .user_service
        .replace_profile_picture(user_id, file)
        .await?;
    let profile_picture = user
        .profile_picture
        .ok_or_else(|| Error::Internal("Profile picture was not recorded".to_string()))?;

    Ok(Json(ProfilePictureResponse {
        status: "success".into(),
        message: "Profile picture uploaded successfully".into(),
        profile_picture,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/users/profile/picture",
    responses(
        (status = 200, description = "Picture removed, or there was none", body = MessageResponse)
    )
)]
pub async fn delete_profile_picture(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    state
        .user_service
        .remove_profile_picture(claims.user_id()?)
        .await?;
    Ok(Json(MessageResponse::success(
        "Profile picture deleted successfully",
    )))
}
