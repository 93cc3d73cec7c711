pub mod customer;
pub mod paging;
