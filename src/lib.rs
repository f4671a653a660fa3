pub mod allocator;
pub mod api;
pub mod catalog;
pub mod contracts;
pub mod model;
pub mod store;
