pub mod auth;
pub mod form_link;
pub mod form_response;
pub mod group;
pub mod meal;
pub mod plan;
pub mod shopping_list;
pub mod user;

/// Returned when a TEXT column or request field holds a value outside its enum.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }
}
