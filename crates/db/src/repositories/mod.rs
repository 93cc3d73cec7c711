use std::fmt::{Debug, Display};

use async_trait::async_trait;
use thiserror::Error;

use clientele_core::domain::customer::{Customer, CustomerField, CustomerId};
use clientele_core::domain::paging::PagedResult;
use clientele_core::errors::ApplicationError;

pub mod customer;
pub mod memory;
pub mod query;

pub use customer::SqlCustomerRepository;
pub use memory::{InMemoryCustomerRepository, InMemoryCustomerStore, InMemoryUnitOfWork};
pub use query::{Filter, OrderTerm, Query};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("write conflict: no row with id `{id}` was affected")]
    Conflict { id: String },
    #[error("duplicate id `{id}`")]
    Duplicate { id: String },
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict { .. } | RepositoryError::Duplicate { .. } => {
                Self::Conflict(value.to_string())
            }
            RepositoryError::Database(_) | RepositoryError::Decode(_) => {
                Self::Persistence(value.to_string())
            }
        }
    }
}

/// A column an entity can be filtered or ordered on.
pub trait EntityField: Copy + Debug + PartialEq + Send + Sync + 'static {
    fn column(self) -> &'static str;
}

/// A row type stored in one table.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    type Id: Clone + Debug + Display + PartialEq + Send + Sync;
    type Field: EntityField;

    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> &Self::Id;
    fn field_value(&self, field: Self::Field) -> Option<String>;
}

impl EntityField for CustomerField {
    fn column(self) -> &'static str {
        CustomerField::column(self)
    }
}

impl Entity for Customer {
    type Id = CustomerId;
    type Field = CustomerField;

    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "company_name",
        "contact_name",
        "address",
        "city",
        "region",
        "postal_code",
        "country",
        "phone",
    ];

    fn id(&self) -> &CustomerId {
        &self.id
    }

    fn field_value(&self, field: CustomerField) -> Option<String> {
        field.value_of(self)
    }
}

/// A mutation recorded against a unit of work but not yet committed.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingChange<E> {
    Add(E),
    Update(E),
    Remove(E),
}

/// CRUD and query capability over one entity collection.
///
/// Reads hit the store immediately and hand back owned values that the
/// session does not track. `add`, `update` and `remove` only stage a change;
/// nothing is durable until the owning unit of work commits.
#[async_trait]
pub trait CrudStore<E: Entity>: Send + Sync {
    async fn get_by_id(&self, id: &E::Id) -> Result<Option<E>, RepositoryError>;

    async fn get_all(&self) -> Result<Vec<E>, RepositoryError>;

    /// Starts a deferred query. Nothing runs until it is handed to
    /// [`CrudStore::fetch`] or [`CrudStore::count_matching`].
    fn find(&self, filter: Filter<E::Field>) -> Query<E> {
        Query::new().filter(filter)
    }

    async fn fetch(&self, query: &Query<E>) -> Result<Vec<E>, RepositoryError>;

    /// Counts rows matching the query's filters, ignoring its ordering and paging.
    async fn count_matching(&self, query: &Query<E>) -> Result<u64, RepositoryError>;

    async fn add(&self, entity: E);

    async fn update(&self, entity: E);

    async fn remove(&self, entity: E);

    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait CustomerQueries: Send + Sync {
    /// One page of customers ordered by an allow-listed column.
    ///
    /// `page` and `page_size` are expected to be at least 1; callers clamp.
    async fn get_paged(
        &self,
        page: u32,
        page_size: u32,
        sort_field: Option<&str>,
        descending: bool,
    ) -> Result<PagedResult<Customer>, RepositoryError>;
}

pub trait CustomerRepository: CrudStore<Customer> + CustomerQueries {}

impl<T> CustomerRepository for T where T: CrudStore<Customer> + CustomerQueries + ?Sized {}
