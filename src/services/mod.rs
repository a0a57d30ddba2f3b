pub mod aggregator;
pub mod github;
pub mod mapper;
pub mod pagination;
pub mod store;
pub mod tracker;
pub mod window;
