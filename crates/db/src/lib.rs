pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod service;
pub mod session;
pub mod unit_of_work;

pub use connection::{connect_with_settings, DbPool};
pub use fixtures::{CustomerSeedDataset, SeedResult};
pub use repositories::{
    CrudStore, CustomerQueries, CustomerRepository, InMemoryCustomerStore, InMemoryUnitOfWork,
    RepositoryError, SqlCustomerRepository,
};
pub use service::CustomerService;
pub use unit_of_work::{SqlUnitOfWork, UnitOfWork};
