use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        money::{MAX_STORED_AMOUNT, line_amount},
        order_status::{FinancialStatus, FulfillmentStatus, order_number},
    },
    dto::orders::{
        CreateOrderRequest, CustomerInfo, LineFailure, OrderCreated, OrderItemInput, OrderList,
        OrderReconciliation, OrderWithItems, UpdateOrderStatusRequest,
    },
    entity::{
        customers::{ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers},
        order_line_items::{
            ActiveModel as LineItemActive, Column as LineItemCol, Entity as OrderLineItems,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_tenant_staff},
        tenant::TenantContext,
    },
    models::{Order, OrderLineItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Storefront checkout. The order row is the commit point: line items and
/// stock decrements after it are best-effort and reported back.
pub async fn create_order(
    state: &AppState,
    ctx: &TenantContext,
    shopper: Option<&AuthUser>,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderCreated>> {
    let line_totals = validate_lines(&payload.items)?;
    for (field, amount) in [
        ("subtotal", payload.totals.subtotal),
        ("shipping", payload.totals.shipping),
        ("tax", payload.totals.tax),
        ("discount", payload.totals.discount),
        ("total", payload.totals.total),
    ] {
        if amount < Decimal::ZERO {
            return Err(AppError::BadRequest(format!("{field} cannot be negative")));
        }
        if amount > MAX_STORED_AMOUNT {
            return Err(AppError::BadRequest(format!("{field} is out of range")));
        }
    }

    let email = payload
        .customer
        .email
        .as_deref()
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty());
    let customer_id = match email.as_deref() {
        Some(email) => Some(
            resolve_customer(
                state,
                ctx,
                email,
                &payload.customer,
                payload.shipping_address.as_ref(),
                shopper.map(|u| u.user_id),
            )
            .await?,
        ),
        None => None,
    };

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let number = order_number(now, &Uuid::new_v4().simple().to_string());
    let financial_status = payload.payment_status.unwrap_or(FinancialStatus::Pending);
    let currency = payload
        .currency
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or_else(|| ctx.currency().to_string());

    let order = OrderActive {
        id: Set(order_id),
        tenant_id: Set(ctx.id()),
        customer_id: Set(customer_id),
        order_number: Set(number),
        email: Set(email),
        financial_status: Set(financial_status.as_str().to_string()),
        fulfillment_status: Set(FulfillmentStatus::Unfulfilled.as_str().to_string()),
        payment_method: Set(payload.payment_method),
        subtotal: Set(payload.totals.subtotal),
        shipping_total: Set(payload.totals.shipping),
        tax_total: Set(payload.totals.tax),
        discount_total: Set(payload.totals.discount),
        total: Set(payload.totals.total),
        currency: Set(currency),
        shipping_method_id: Set(payload.shipping_method_id),
        shipping_address: Set(payload.shipping_address),
        billing_address: Set(payload.billing_address),
        notes: Set(payload.notes),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        tenant_id = %ctx.id(),
        order_id = %order.id,
        order_number = %order.order_number,
        "order created"
    );

    let mut reconciliation = OrderReconciliation::default();
    let mut items = Vec::with_capacity(payload.items.len());

    for (index, (line, line_total)) in payload.items.iter().zip(line_totals).enumerate() {
        let inserted = LineItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            tenant_id: Set(ctx.id()),
            product_id: Set(line.product_id),
            variant_id: Set(line.variant_id),
            title: Set(line.title.clone()),
            variant_title: Set(line.variant_title.clone()),
            sku: Set(line.sku.clone()),
            price: Set(line.price),
            quantity: Set(line.quantity),
            total: Set(line_total),
            created_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await;

        match inserted {
            Ok(item) => items.push(OrderLineItem::from(item)),
            Err(err) => {
                tracing::warn!(order_id = %order.id, index, error = %err, "line item not saved");
                reconciliation
                    .line_item_failures
                    .push(line_failure(index, line, err.to_string()));
            }
        }
    }

    for (index, line) in payload.items.iter().enumerate() {
        if !line.track_inventory {
            continue;
        }
        if let Err(err) = decrement_stock(state, ctx.id(), line).await {
            tracing::warn!(order_id = %order.id, index, error = %err, "inventory not decremented");
            reconciliation
                .inventory_failures
                .push(line_failure(index, line, err.to_string()));
        }
    }

    if !reconciliation.is_clean() {
        audit::record(
            &state.pool,
            Some(ctx.id()),
            shopper.map(|u| u.user_id),
            "order_reconciliation",
            "orders",
            serde_json::json!({ "order_id": order.id, "reconciliation": &reconciliation }),
        )
        .await;
    }
    audit::record(
        &state.pool,
        Some(ctx.id()),
        shopper.map(|u| u.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderCreated {
            order: Order::from(order),
            items,
            reconciliation,
        },
        Some(Meta::empty()),
    ))
}

/// Rejects malformed lines before anything is written and returns each
/// line's total.
fn validate_lines(items: &[OrderItemInput]) -> AppResult<Vec<Decimal>> {
    if items.is_empty() {
        return Err(AppError::BadRequest("order must contain at least one item".into()));
    }
    let mut totals = Vec::with_capacity(items.len());
    for (index, line) in items.iter().enumerate() {
        if line.title.trim().is_empty() {
            return Err(AppError::BadRequest(format!("item {index}: title is required")));
        }
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(format!("item {index}: quantity must be positive")));
        }
        if line.price < Decimal::ZERO {
            return Err(AppError::BadRequest(format!("item {index}: price cannot be negative")));
        }
        let total = line_amount(line.price, line.quantity).ok_or_else(|| {
            AppError::BadRequest(format!("item {index}: line total is out of range"))
        })?;
        totals.push(total);
    }
    Ok(totals)
}

fn line_failure(index: usize, line: &OrderItemInput, error: String) -> LineFailure {
    LineFailure {
        index,
        product_id: line.product_id,
        variant_id: line.variant_id,
        error,
    }
}

/// Existing customer for (tenant, email), or a new guest holding the
/// shipping address as its only address.
async fn resolve_customer(
    state: &AppState,
    ctx: &TenantContext,
    email: &str,
    info: &CustomerInfo,
    shipping_address: Option<&serde_json::Value>,
    user_id: Option<Uuid>,
) -> AppResult<Uuid> {
    if let Some(existing) = find_customer(state, ctx.id(), email).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let addresses = match shipping_address {
        Some(address) => serde_json::json!([address]),
        None => serde_json::json!([]),
    };
    let created = CustomerActive {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(ctx.id()),
        user_id: Set(user_id),
        email: Set(email.to_string()),
        first_name: Set(info.first_name.clone()),
        last_name: Set(info.last_name.clone()),
        phone: Set(info.phone.clone()),
        addresses: Set(addresses),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await;

    match created {
        Ok(customer) => Ok(customer.id),
        // a concurrent checkout may have won the (tenant, email) unique key
        Err(err) => match find_customer(state, ctx.id(), email).await? {
            Some(id) => Ok(id),
            None => Err(err.into()),
        },
    }
}

async fn find_customer(state: &AppState, tenant_id: Uuid, email: &str) -> AppResult<Option<Uuid>> {
    let found = Customers::find()
        .filter(CustomerCol::TenantId.eq(tenant_id))
        .filter(CustomerCol::Email.eq(email.to_string()))
        .one(&state.orm)
        .await?;
    Ok(found.map(|c| c.id))
}

/// Clamped at zero. Targets the variant row when the line names one.
async fn decrement_stock(state: &AppState, tenant_id: Uuid, line: &OrderItemInput) -> AppResult<()> {
    let quantity = i64::from(line.quantity);
    let result = match (line.variant_id, line.product_id) {
        (Some(variant_id), _) => {
            sqlx::query(
                r#"
                UPDATE product_variants
                SET inventory_quantity = GREATEST(inventory_quantity - $1, 0), updated_at = NOW()
                WHERE id = $2 AND tenant_id = $3
                "#,
            )
            .bind(quantity)
            .bind(variant_id)
            .bind(tenant_id)
            .execute(&state.pool)
            .await?
        }
        (None, Some(product_id)) => {
            sqlx::query(
                r#"
                UPDATE products
                SET inventory_quantity = GREATEST(inventory_quantity - $1, 0), updated_at = NOW()
                WHERE id = $2 AND tenant_id = $3 AND track_inventory
                "#,
            )
            .bind(quantity)
            .bind(product_id)
            .bind(tenant_id)
            .execute(&state.pool)
            .await?
        }
        (None, None) => {
            return Err(AppError::BadRequest("line has no product or variant".into()));
        }
    };

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_tenant_staff(user, &ctx.tenant)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(OrderCol::TenantId.eq(ctx.id()));
    if let Some(status) = query.financial_status.as_deref().filter(|s| !s.is_empty()) {
        let status: FinancialStatus = status.parse().map_err(AppError::BadRequest)?;
        condition = condition.add(OrderCol::FinancialStatus.eq(status.as_str()));
    }
    if let Some(status) = query.fulfillment_status.as_deref().filter(|s| !s.is_empty()) {
        let status: FulfillmentStatus = status.parse().map_err(AppError::BadRequest)?;
        condition = condition.add(OrderCol::FulfillmentStatus.eq(status.as_str()));
    }
    if let Some(customer_id) = query.customer_id {
        condition = condition.add(OrderCol::CustomerId.eq(customer_id));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_tenant_staff(user, &ctx.tenant)?;
    let order = load_order(state, ctx, id).await?;
    let items = load_items(state, ctx, id).await?;
    Ok(ApiResponse::success(
        "Order",
        OrderWithItems { order, items },
        None,
    ))
}

/// Moves either axis independently; each must be a legal step on its own machine.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_tenant_staff(user, &ctx.tenant)?;
    if payload.financial_status.is_none() && payload.fulfillment_status.is_none() {
        return Err(AppError::BadRequest("nothing to update".into()));
    }

    let existing = Orders::find_by_id(id)
        .filter(OrderCol::TenantId.eq(ctx.id()))
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    let current = Order::from(existing.clone());

    let mut active: OrderActive = existing.into();
    if let Some(next) = payload.financial_status {
        let next = current
            .financial_status
            .transition(next)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        active.financial_status = Set(next.as_str().to_string());
    }
    if let Some(next) = payload.fulfillment_status {
        let next = current
            .fulfillment_status
            .transition(next)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        active.fulfillment_status = Set(next.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "financial_status": order.financial_status,
            "fulfillment_status": order.fulfillment_status,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

async fn load_order(state: &AppState, ctx: &TenantContext, id: Uuid) -> AppResult<Order> {
    let order = Orders::find_by_id(id)
        .filter(OrderCol::TenantId.eq(ctx.id()))
        .one(&state.orm)
        .await?;
    match order {
        Some(o) => Ok(Order::from(o)),
        None => Err(AppError::NotFound),
    }
}

async fn load_items(state: &AppState, ctx: &TenantContext, order_id: Uuid) -> AppResult<Vec<OrderLineItem>> {
    let items = OrderLineItems::find()
        .filter(LineItemCol::OrderId.eq(order_id))
        .filter(LineItemCol::TenantId.eq(ctx.id()))
        .order_by_asc(LineItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderLineItem::from)
        .collect();
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: Decimal, quantity: i32) -> OrderItemInput {
        OrderItemInput {
            product_id: None,
            variant_id: None,
            title: "Mug".into(),
            variant_title: None,
            sku: None,
            price,
            quantity,
            track_inventory: false,
        }
    }

    #[test]
    fn validate_lines_returns_line_totals() {
        let totals = validate_lines(&[item(Decimal::new(1250, 2), 2), item(Decimal::ONE, 3)])
            .expect("valid lines");
        assert_eq!(totals, vec![Decimal::new(25, 0), Decimal::new(3, 0)]);
    }

    #[test]
    fn overflowing_line_is_rejected_before_any_write() {
        let huge = Decimal::from_scientific("5e28").expect("parses");
        let err = validate_lines(&[item(Decimal::ONE, 1), item(huge, 2)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("item 1")));

        let err = validate_lines(&[item(MAX_STORED_AMOUNT, 2)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
