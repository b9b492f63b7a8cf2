//! HTTP adapter for credits endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    AccessResponse, BalanceResponse, DenialResponse, TransactionListParams,
    TransactionListResponse, TransactionResponse,
};
pub use handlers::CreditsHandlers;
pub use routes::credits_routes;
