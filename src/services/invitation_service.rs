use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::invitations::{CreateInvitationRequest, InvitationList},
    entity::tenant_invitations::{
        ActiveModel as InvitationActive, Column as InvitationCol, Entity as Invitations,
    },
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ROLE_ADMIN, ROLE_STAFF, ensure_tenant_admin},
        tenant::TenantContext,
    },
    models::Invitation,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub const INVITATION_TTL_DAYS: i64 = 7;

pub async fn create_invitation(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    payload: CreateInvitationRequest,
) -> AppResult<ApiResponse<Invitation>> {
    ensure_tenant_admin(user, &ctx.tenant)?;

    let role = payload.role.unwrap_or_else(|| ROLE_STAFF.to_string());
    if role != ROLE_ADMIN && role != ROLE_STAFF {
        return Err(AppError::BadRequest(format!("role must be '{ROLE_ADMIN}' or '{ROLE_STAFF}'")));
    }
    let email = payload.email.trim().to_ascii_lowercase();

    let now = Utc::now();
    let pending = Invitations::find()
        .filter(
            Condition::all()
                .add(InvitationCol::TenantId.eq(ctx.id()))
                .add(InvitationCol::Email.eq(email.clone()))
                .add(InvitationCol::AcceptedAt.is_null())
                .add(InvitationCol::ExpiresAt.gt(now)),
        )
        .one(&state.orm)
        .await?;
    if pending.is_some() {
        return Err(AppError::BadRequest("an invitation is already pending for this email".into()));
    }

    let invitation = InvitationActive {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(ctx.id()),
        email: Set(email),
        role: Set(role),
        token: Set(Uuid::new_v4().to_string()),
        invited_by: Set(Some(user.user_id)),
        accepted_at: Set(None),
        expires_at: Set((now + Duration::days(INVITATION_TTL_DAYS)).into()),
        created_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "invitation_create",
        "tenant_invitations",
        serde_json::json!({ "invitation_id": invitation.id, "role": invitation.role }),
    )
    .await;

    Ok(ApiResponse::success(
        "Invitation created",
        Invitation::from(invitation),
        Some(Meta::empty()),
    ))
}

pub async fn list_invitations(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    pagination: Pagination,
) -> AppResult<ApiResponse<InvitationList>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Invitations::find()
        .filter(InvitationCol::TenantId.eq(ctx.id()))
        .order_by_desc(InvitationCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Invitation::from)
        .collect();

    Ok(ApiResponse::success(
        "Invitations",
        InvitationList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn revoke_invitation(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_tenant_admin(user, &ctx.tenant)?;

    let result = Invitations::delete_many()
        .filter(InvitationCol::Id.eq(id))
        .filter(InvitationCol::TenantId.eq(ctx.id()))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "invitation_revoke",
        "tenant_invitations",
        serde_json::json!({ "invitation_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
