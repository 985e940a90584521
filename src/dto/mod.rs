pub mod customers;
pub mod invitations;
pub mod orders;
pub mod platform;
pub mod products;
pub mod shipping;
pub mod taxonomy;
pub mod tenants;
