use tracing::{debug, info};

use clientele_core::domain::customer::{Customer, CustomerId};
use clientele_core::domain::paging::PagedResult;

use crate::repositories::{CrudStore, CustomerQueries, RepositoryError};
use crate::unit_of_work::UnitOfWork;

/// Customer operations, each committed through one unit of work.
///
/// Missing rows and mismatched ids are reported as `Ok(false)` or `Ok(None)`.
/// Persistence failures propagate unchanged and are never retried.
pub struct CustomerService<U> {
    uow: U,
}

impl<U: UnitOfWork> CustomerService<U> {
    pub fn new(uow: U) -> Self {
        Self { uow }
    }

    pub fn unit_of_work(&self) -> &U {
        &self.uow
    }

    pub fn into_unit_of_work(self) -> U {
        self.uow
    }

    /// Stores a new customer, assigning a fresh id when none is set.
    pub async fn create(&self, mut customer: Customer) -> Result<Customer, RepositoryError> {
        if customer.id.is_unset() {
            customer.id = CustomerId::new();
        }

        self.uow.customers().add(customer.clone()).await;
        self.uow.complete().await?;

        info!(
            event_name = "service.customer.created",
            customer_id = %customer.id,
            "customer created"
        );
        Ok(customer)
    }

    pub async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        self.uow.customers().get_by_id(id).await
    }

    /// Replaces the stored customer. Returns `false` when `id` disagrees with
    /// the customer's own id or no such customer exists.
    pub async fn update(&self, id: &CustomerId, customer: Customer) -> Result<bool, RepositoryError> {
        if *id != customer.id {
            debug!(
                event_name = "service.customer.update_rejected",
                customer_id = %id,
                body_id = %customer.id,
                "path id does not match customer id"
            );
            return Ok(false);
        }

        let repo = self.uow.customers();
        if repo.get_by_id(id).await?.is_none() {
            debug!(event_name = "service.customer.update_missing", customer_id = %id, "customer not found");
            return Ok(false);
        }

        repo.update(customer).await;
        self.uow.complete().await?;

        info!(event_name = "service.customer.updated", customer_id = %id, "customer updated");
        Ok(true)
    }

    pub async fn delete(&self, id: &CustomerId) -> Result<bool, RepositoryError> {
        let repo = self.uow.customers();
        let Some(existing) = repo.get_by_id(id).await? else {
            debug!(event_name = "service.customer.delete_missing", customer_id = %id, "customer not found");
            return Ok(false);
        };

        repo.remove(existing).await;
        self.uow.complete().await?;

        info!(event_name = "service.customer.deleted", customer_id = %id, "customer deleted");
        Ok(true)
    }

    pub async fn get_page(
        &self,
        page: u32,
        page_size: u32,
        sort_field: Option<&str>,
        descending: bool,
    ) -> Result<PagedResult<Customer>, RepositoryError> {
        self.uow.customers().get_paged(page, page_size, sort_field, descending).await
    }
}
