//! Pure business rules. Nothing in here touches the database or the network,
//! so handlers and services can call into it synchronously.

pub mod billing;
pub mod inventory;
pub mod money;
pub mod order_status;
pub mod plans;
pub mod resolver;
pub mod shipping;
pub mod signature;
pub mod slug;
pub mod storage;
