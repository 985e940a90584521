pub mod billing_service;
pub mod catalog_service;
pub mod customer_service;
pub mod invitation_service;
pub mod order_service;
pub mod platform_service;
pub mod shipping_service;
pub mod taxonomy_service;
pub mod tenant_service;
