pub mod month;
pub mod org;
pub mod project;
pub mod pull_request;
pub mod user;
