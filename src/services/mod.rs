pub mod auth;
pub mod finalize;
pub mod form_links;
pub mod generation;
pub mod groups;
pub mod meals;
pub mod metrics;
pub mod plans;
pub mod public_form;
pub mod resolution;
pub mod responses;
pub mod shopping;
pub mod short_codes;
