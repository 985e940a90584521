pub mod audit_logs;
pub mod brands;
pub mod categories;
pub mod customers;
pub mod order_line_items;
pub mod orders;
pub mod payment_settings;
pub mod product_variants;
pub mod products;
pub mod subscriptions;
pub mod tenant_invitations;
pub mod tenants;
pub mod webhook_events;

pub use audit_logs::Entity as AuditLogs;
pub use brands::Entity as Brands;
pub use categories::Entity as Categories;
pub use customers::Entity as Customers;
pub use order_line_items::Entity as OrderLineItems;
pub use orders::Entity as Orders;
pub use payment_settings::Entity as PaymentSettings;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use subscriptions::Entity as Subscriptions;
pub use tenant_invitations::Entity as TenantInvitations;
pub use tenants::Entity as Tenants;
pub use webhook_events::Entity as WebhookEvents;
