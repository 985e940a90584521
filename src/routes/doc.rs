use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{
        inventory::{ProductType, StockStatus, StockSummary},
        order_status::{FinancialStatus, FulfillmentStatus},
        plans::Plan,
        shipping::{CartLine, Destination, ShippingOption, ShippingQuote},
    },
    dto::{
        customers::{CustomerDetail, CustomerList},
        invitations::{CreateInvitationRequest, InvitationList},
        orders::{
            CreateOrderRequest, OrderCreated, OrderList, OrderReconciliation, OrderWithItems,
            UpdateOrderStatusRequest,
        },
        platform::{CreateTenantRequest, PlatformTenantUpdate, TenantList},
        products::{CreateProductRequest, ProductList, ReplaceVariantsRequest, UpdateProductRequest},
        shipping::ShippingQuoteRequest,
        taxonomy::{BrandList, CategoryList, CreateTaxonRequest, UpdateTaxonRequest},
        tenants::{
            PaymentSettingsView, ResolveView, UpdatePaymentSettingsRequest, UpdateTenantRequest,
            UploadRequest, UploadTicket,
        },
    },
    models::{
        Brand, Category, Customer, Invitation, Order, OrderLineItem, Product, ProductVariant,
        Storefront, Subscription, Tenant, TenantSettings,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, health, orders, platform, products, shipping, taxonomy, tenant, webhooks,
    },
    services::billing_service::WebhookAck,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        tenant::current_tenant,
        tenant::resolve_host,
        tenant::update_tenant,
        tenant::get_payment_settings,
        tenant::put_payment_settings,
        tenant::prepare_upload,
        products::list_products,
        products::get_product,
        products::list_products_admin,
        products::create_product,
        products::update_product,
        products::replace_variants,
        products::delete_product,
        products::list_low_stock,
        taxonomy::list_categories,
        taxonomy::list_brands,
        taxonomy::list_categories_admin,
        taxonomy::create_category,
        taxonomy::update_category,
        taxonomy::delete_category,
        taxonomy::list_brands_admin,
        taxonomy::create_brand,
        taxonomy::update_brand,
        taxonomy::delete_brand,
        orders::create_order,
        shipping::quote,
        admin::list_orders,
        admin::get_order,
        admin::update_order_status,
        admin::list_customers,
        admin::get_customer,
        admin::list_invitations,
        admin::create_invitation,
        admin::revoke_invitation,
        platform::create_tenant,
        platform::list_tenants,
        platform::update_tenant,
        webhooks::stripe_webhook
    ),
    components(
        schemas(
            Tenant,
            TenantSettings,
            Storefront,
            Category,
            Brand,
            Product,
            ProductVariant,
            ProductType,
            StockStatus,
            StockSummary,
            Customer,
            Order,
            OrderLineItem,
            FinancialStatus,
            FulfillmentStatus,
            Subscription,
            Invitation,
            Plan,
            CartLine,
            Destination,
            ShippingOption,
            ShippingQuote,
            ShippingQuoteRequest,
            CreateOrderRequest,
            OrderCreated,
            OrderReconciliation,
            OrderList,
            OrderWithItems,
            UpdateOrderStatusRequest,
            CustomerList,
            CustomerDetail,
            CreateInvitationRequest,
            InvitationList,
            CreateTenantRequest,
            PlatformTenantUpdate,
            TenantList,
            CreateProductRequest,
            UpdateProductRequest,
            ReplaceVariantsRequest,
            ProductList,
            CreateTaxonRequest,
            UpdateTaxonRequest,
            CategoryList,
            BrandList,
            UpdateTenantRequest,
            ResolveView,
            UpdatePaymentSettingsRequest,
            PaymentSettingsView,
            UploadRequest,
            UploadTicket,
            WebhookAck,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderCreated>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Storefront>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Tenant", description = "Store resolution and public settings"),
        (name = "Products", description = "Storefront catalog"),
        (name = "Catalog", description = "Categories and brands"),
        (name = "Orders", description = "Checkout"),
        (name = "Shipping", description = "Shipping quotes"),
        (name = "Admin", description = "Store back office"),
        (name = "Platform", description = "Platform tenant management"),
        (name = "Billing", description = "Payment gateway webhooks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
