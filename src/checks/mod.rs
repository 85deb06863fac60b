/// Site record
pub mod site;

/// Site stores
pub mod store;
