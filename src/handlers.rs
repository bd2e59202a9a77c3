use crate::{
    AppState,
    audit::{self, AuditAction},
    auth::{AdminUser, AuthUser, authorize},
    error::{ApiError, AuthError, ErrorBody},
    extract::{ApiJson, ApiQuery},
    models::{
        Account, CreateUserRequest, DownloadUrlQuery, DownloadUrlResponse, LoginRequest,
        MeResponse, MessageResponse, NewAccount, RegisterRequest, RegisterResponse, Role,
        TokenResponse, UpdateUserRequest, UploadUrlQuery, UploadUrlResponse, UserResponse,
    },
    namespace,
    token::ExtraClaims,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

// --- Shared Flow ---

/// Hashes the password off the executor and inserts the account. A taken
/// username surfaces as `DuplicateAccount` through `From<RepositoryError>`.
async fn create_account(
    state: &AppState,
    username: String,
    password: String,
    name: String,
    age: i32,
    role: Role,
) -> Result<Account, ApiError> {
    let password_hash = state
        .hasher
        .hash_async(password)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let new_account = NewAccount {
        username,
        password_hash,
        role,
        name,
        age,
    };

    state
        .repo
        .create_account(new_account)
        .await
        .map_err(ApiError::from)
}

// --- Authentication ---

/// register_user
///
/// [Public Route] Creates an account with role `user`. The password is stored
/// only as an Argon2 hash.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Username already exists", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    payload.validate()?;

    let account = create_account(
        &state,
        payload.username,
        payload.password,
        payload.name,
        payload.age,
        Role::User,
    )
    .await?;

    audit::record(
        AuditAction::RegisterUser,
        format!("User {} registered", account.id),
    );

    Ok(Json(RegisterResponse {
        message: "User registered successfully".to_string(),
        username: account.username,
        role: account.role,
    }))
}

/// login
///
/// [Public Route] Exchanges credentials for a 30-minute bearer token.
///
/// *Security*: unknown usernames and wrong passwords produce the same 401 and
/// cost the same hashing work.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some(account) = state.repo.find_by_username(&payload.username).await? else {
        state.hasher.verify_missing_async(payload.password).await;
        tracing::info!("login failed: unknown username");
        return Err(AuthError::InvalidCredentials.into());
    };

    let matches = state
        .hasher
        .verify_async(payload.password, account.password_hash.clone())
        .await;
    if !matches {
        tracing::info!(user_id = account.id, "login failed: wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.tokens.issue_now(
        account.id,
        ExtraClaims {
            username: Some(account.username.clone()),
            role: Some(account.role),
        },
    )?;

    tracing::info!(user_id = account.id, "login succeeded");
    Ok(Json(TokenResponse::bearer(token)))
}

/// get_me
///
/// [Authenticated Route] The caller's identity as resolved from the store.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Could not validate credentials", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}

// --- User Management ---

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = [UserResponse])),
    security(("bearer" = []))
)]
pub async fn list_users(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<UserResponse>> {
    let users = state
        .repo
        .list_accounts()
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Json(users)
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_user(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    match state.repo.get_account(id).await? {
        Some(account) => Ok(Json(account.into())),
        None => Err(ApiError::NotFound("User")),
    }
}

/// update_user
///
/// [Authenticated Route] Partial profile update.
///
/// *Authorization*: callers may update their own profile; anyone else's
/// requires the admin role.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 403, description = "Not your profile", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if user.id != id {
        authorize(user, Role::Admin)?;
    }
    payload.validate()?;

    match state.repo.update_profile(id, payload).await {
        Some(account) => Ok(Json(account.into())),
        None => Err(ApiError::NotFound("User")),
    }
}

/// create_user
///
/// [Admin Route] Creates an account with an explicit role.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserResponse),
        (status = 400, description = "Username already exists", body = ErrorBody),
        (status = 403, description = "Admin role required", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate()?;

    let account = create_account(
        &state,
        payload.username,
        payload.password,
        payload.name,
        payload.age,
        payload.role.unwrap_or_default(),
    )
    .await?;

    audit::record(
        AuditAction::CreateUser,
        format!("User {} created by admin {}", account.id, admin.id),
    );

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// delete_user
///
/// [Admin Route] Removes an account. Outstanding tokens for it stop working on
/// their next use because every request re-resolves the subject.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Admin role required", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_account(id).await {
        return Err(ApiError::NotFound("User"));
    }

    audit::record(
        AuditAction::DeleteUser,
        format!("User {} was deleted by admin {}", id, admin.id),
    );

    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

// --- Files ---

/// get_upload_url
///
/// [Authenticated Route] Presigned PUT URL for `"{caller_id}/{filename}"`,
/// valid for 10 minutes. The object name is always built under the caller's
/// own prefix, then checked before anything is signed.
#[utoipa::path(
    post,
    path = "/files/upload-url",
    params(UploadUrlQuery),
    responses(
        (status = 200, description = "URL", body = UploadUrlResponse),
        (status = 422, description = "Unusable file name", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_upload_url(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UploadUrlQuery>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let object_name = namespace::scoped_object_name(&user, &query.filename)
        .ok_or_else(|| ApiError::Validation("filename must name a file".to_string()))?;
    namespace::authorize_object_access(&user, &object_name)?;

    let upload_url = state
        .storage
        .presigned_upload_url(&object_name)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    Ok(Json(UploadUrlResponse {
        upload_url,
        object_name,
    }))
}

/// get_download_url
///
/// [Authenticated Route] Presigned GET URL, valid for 10 minutes.
///
/// *Security*: refused with 403 unless `object_name` is under the caller's
/// prefix. The check runs before the storage client is called.
#[utoipa::path(
    get,
    path = "/files/download-url",
    params(DownloadUrlQuery),
    responses(
        (status = 200, description = "URL", body = DownloadUrlResponse),
        (status = 403, description = "Access denied", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_download_url(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DownloadUrlQuery>,
) -> Result<Json<DownloadUrlResponse>, ApiError> {
    namespace::authorize_object_access(&user, &query.object_name)?;

    let download_url = state
        .storage
        .presigned_download_url(&query.object_name)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    Ok(Json(DownloadUrlResponse { download_url }))
}
