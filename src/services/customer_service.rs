use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    dto::customers::{CustomerDetail, CustomerList},
    entity::{
        customers::{Column as CustomerCol, Entity as Customers},
        orders::{Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_tenant_staff},
        tenant::TenantContext,
    },
    models::Customer,
    response::{ApiResponse, Meta},
    routes::params::SearchQuery,
    state::AppState,
};

pub async fn list_customers(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    query: SearchQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_tenant_staff(user, &ctx.tenant)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(CustomerCol::TenantId.eq(ctx.id()));
    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(CustomerCol::Email).ilike(pattern.clone()))
                .add(Expr::col(CustomerCol::FirstName).ilike(pattern.clone()))
                .add(Expr::col(CustomerCol::LastName).ilike(pattern)),
        );
    }

    let finder = Customers::find()
        .filter(condition)
        .order_by_desc(CustomerCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Customer::from)
        .collect();

    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_customer(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
) -> AppResult<ApiResponse<CustomerDetail>> {
    ensure_tenant_staff(user, &ctx.tenant)?;

    let customer = Customers::find_by_id(id)
        .filter(CustomerCol::TenantId.eq(ctx.id()))
        .one(&state.orm)
        .await?;
    let customer = match customer {
        Some(c) => Customer::from(c),
        None => return Err(AppError::NotFound),
    };

    let order_count = Orders::find()
        .filter(OrderCol::TenantId.eq(ctx.id()))
        .filter(OrderCol::CustomerId.eq(id))
        .count(&state.orm)
        .await? as i64;

    let is_guest = customer.is_guest();
    Ok(ApiResponse::success(
        "Customer",
        CustomerDetail {
            customer,
            order_count,
            is_guest,
        },
        None,
    ))
}
