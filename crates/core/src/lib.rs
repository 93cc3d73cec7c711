pub mod config;
pub mod domain;
pub mod errors;

pub use domain::customer::{Customer, CustomerField, CustomerId};
pub use domain::paging::{PagedResult, SortDirection, SortField};
pub use errors::{ApplicationError, DomainError};
