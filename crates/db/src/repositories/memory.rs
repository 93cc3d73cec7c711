use std::collections::HashMap;
use std::io;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use clientele_core::domain::customer::{Customer, CustomerId};
use clientele_core::domain::paging::PagedResult;

use super::customer::get_customers_page;
use super::{CrudStore, CustomerQueries, PendingChange, Query, RepositoryError};
use crate::unit_of_work::UnitOfWork;

#[derive(Clone, Debug)]
struct StoredCustomer {
    seq: u64,
    customer: Customer,
}

#[derive(Default)]
struct StoreState {
    rows: HashMap<CustomerId, StoredCustomer>,
    next_seq: u64,
    fail_next_commit: bool,
}

/// Customer rows held in process memory. Clones share the same rows, so
/// several units of work can run against one store.
#[derive(Clone, Default)]
pub struct InMemoryCustomerStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit against this store fail before anything is
    /// written, as an unreachable database would.
    pub async fn fail_next_commit(&self) {
        self.state.write().await.fail_next_commit = true;
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Applies every change or none of them.
    async fn commit(&self, changes: &[PendingChange<Customer>]) -> Result<u64, RepositoryError> {
        let mut state = self.state.write().await;
        if std::mem::take(&mut state.fail_next_commit) {
            return Err(RepositoryError::Database(sqlx::Error::Io(io::Error::other(
                "injected commit failure",
            ))));
        }

        let mut rows = state.rows.clone();
        let mut next_seq = state.next_seq;
        for change in changes {
            match change {
                PendingChange::Add(customer) => {
                    if rows.contains_key(&customer.id) {
                        return Err(RepositoryError::Duplicate { id: customer.id.to_string() });
                    }
                    rows.insert(customer.id, StoredCustomer { seq: next_seq, customer: customer.clone() });
                    next_seq += 1;
                }
                PendingChange::Update(customer) => match rows.get_mut(&customer.id) {
                    Some(stored) => stored.customer = customer.clone(),
                    None => return Err(RepositoryError::Conflict { id: customer.id.to_string() }),
                },
                PendingChange::Remove(customer) => {
                    if rows.remove(&customer.id).is_none() {
                        return Err(RepositoryError::Conflict { id: customer.id.to_string() });
                    }
                }
            }
        }

        state.rows = rows;
        state.next_seq = next_seq;
        Ok(changes.len() as u64)
    }
}

/// Customer repository over an [`InMemoryCustomerStore`], staging writes in
/// its unit of work's change list.
pub struct InMemoryCustomerRepository {
    store: InMemoryCustomerStore,
    pending: Arc<Mutex<Vec<PendingChange<Customer>>>>,
}

impl InMemoryCustomerRepository {
    async fn stage(&self, change: PendingChange<Customer>) {
        self.pending.lock().await.push(change);
    }
}

#[async_trait]
impl CrudStore<Customer> for InMemoryCustomerRepository {
    async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let state = self.store.state.read().await;
        Ok(state.rows.get(id).map(|stored| stored.customer.clone()))
    }

    async fn get_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let state = self.store.state.read().await;
        let mut rows: Vec<&StoredCustomer> = state.rows.values().collect();
        rows.sort_by_key(|stored| stored.seq);
        Ok(rows.into_iter().map(|stored| stored.customer.clone()).collect())
    }

    async fn fetch(&self, query: &Query<Customer>) -> Result<Vec<Customer>, RepositoryError> {
        let state = self.store.state.read().await;
        Ok(query.evaluate(state.rows.values().map(|stored| (stored.seq, &stored.customer))))
    }

    async fn count_matching(&self, query: &Query<Customer>) -> Result<u64, RepositoryError> {
        let state = self.store.state.read().await;
        let matching = state.rows.values().filter(|stored| query.matches(&stored.customer)).count();
        Ok(matching as u64)
    }

    async fn add(&self, customer: Customer) {
        self.stage(PendingChange::Add(customer)).await;
    }

    async fn update(&self, customer: Customer) {
        self.stage(PendingChange::Update(customer)).await;
    }

    async fn remove(&self, customer: Customer) {
        self.stage(PendingChange::Remove(customer)).await;
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.store.len().await as u64)
    }
}

#[async_trait]
impl CustomerQueries for InMemoryCustomerRepository {
    async fn get_paged(
        &self,
        page: u32,
        page_size: u32,
        sort_field: Option<&str>,
        descending: bool,
    ) -> Result<PagedResult<Customer>, RepositoryError> {
        get_customers_page(self, page, page_size, sort_field, descending).await
    }
}

/// Unit of work over an [`InMemoryCustomerStore`].
pub struct InMemoryUnitOfWork {
    store: InMemoryCustomerStore,
    pending: Arc<Mutex<Vec<PendingChange<Customer>>>>,
    customers: OnceLock<InMemoryCustomerRepository>,
}

impl InMemoryUnitOfWork {
    pub fn new(store: InMemoryCustomerStore) -> Self {
        Self { store, pending: Arc::default(), customers: OnceLock::new() }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Customers = InMemoryCustomerRepository;

    fn customers(&self) -> &InMemoryCustomerRepository {
        self.customers.get_or_init(|| InMemoryCustomerRepository {
            store: self.store.clone(),
            pending: Arc::clone(&self.pending),
        })
    }

    async fn complete(&self) -> Result<u64, RepositoryError> {
        let changes = std::mem::take(&mut *self.pending.lock().await);
        let staged = changes.len();

        match self.store.commit(&changes).await {
            Ok(affected) => {
                info!(event_name = "db.unit_of_work.commit", staged, affected, "unit of work committed");
                Ok(affected)
            }
            Err(error) => {
                warn!(
                    event_name = "db.unit_of_work.commit_failed",
                    staged,
                    error = %error,
                    "unit of work commit rolled back"
                );
                Err(error)
            }
        }
    }

    async fn pending_changes(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use clientele_core::domain::customer::{Customer, CustomerField, CustomerId};

    use super::{InMemoryCustomerStore, InMemoryUnitOfWork};
    use crate::repositories::{CrudStore, CustomerQueries, Filter, RepositoryError};
    use crate::unit_of_work::UnitOfWork;

    fn customer(name: &str) -> Customer {
        Customer { id: CustomerId::new(), ..Customer::named(name) }
    }

    async fn seeded_store(names: &[&str]) -> InMemoryCustomerStore {
        let store = InMemoryCustomerStore::new();
        let uow = InMemoryUnitOfWork::new(store.clone());
        for name in names {
            uow.customers().add(customer(name)).await;
        }
        uow.complete().await.expect("seed commit");
        store
    }

    #[tokio::test]
    async fn staged_adds_become_visible_on_complete() {
        let store = InMemoryCustomerStore::new();
        let uow = InMemoryUnitOfWork::new(store.clone());
        let acme = customer("Acme");

        uow.customers().add(acme.clone()).await;
        assert_eq!(uow.customers().get_by_id(&acme.id).await.expect("lookup"), None);
        assert!(store.is_empty().await);

        assert_eq!(uow.complete().await.expect("commit"), 1);
        assert_eq!(uow.customers().get_by_id(&acme.id).await.expect("lookup"), Some(acme));
        assert_eq!(uow.pending_changes().await, 0);
    }

    #[tokio::test]
    async fn store_is_shared_between_units_of_work() {
        let store = seeded_store(&["Acme", "Globex"]).await;

        let reader = InMemoryUnitOfWork::new(store.clone());
        assert_eq!(reader.customers().count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn repository_is_built_once_per_unit_of_work() {
        let uow = InMemoryUnitOfWork::new(InMemoryCustomerStore::new());

        assert!(std::ptr::eq(uow.customers(), uow.customers()));
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing() {
        let store = seeded_store(&["Existing"]).await;
        let uow = InMemoryUnitOfWork::new(store.clone());

        uow.customers().add(customer("Fresh")).await;
        uow.customers().update(customer("Vanished")).await;

        let error = uow.complete().await.expect_err("update of missing row must fail");
        assert!(matches!(error, RepositoryError::Conflict { .. }));
        assert_eq!(store.len().await, 1, "the add staged before the conflict is not applied");
        assert_eq!(uow.pending_changes().await, 0);
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected() {
        let store = InMemoryCustomerStore::new();
        let uow = InMemoryUnitOfWork::new(store.clone());
        let acme = customer("Acme");

        uow.customers().add(acme.clone()).await;
        uow.customers().add(acme.clone()).await;

        let error = uow.complete().await.expect_err("duplicate id must fail");
        assert!(matches!(error, RepositoryError::Duplicate { ref id } if *id == acme.id.to_string()));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn injected_failure_drops_staged_changes() {
        let store = InMemoryCustomerStore::new();
        let uow = InMemoryUnitOfWork::new(store.clone());
        uow.customers().add(customer("Acme")).await;

        store.fail_next_commit().await;
        let error = uow.complete().await.expect_err("injected failure");
        assert!(matches!(error, RepositoryError::Database(_)));
        assert!(store.is_empty().await);

        assert_eq!(uow.pending_changes().await, 0);
        assert_eq!(uow.complete().await.expect("next commit"), 0);
        assert!(store.is_empty().await, "a failed write must not resurface on the next commit");
    }

    #[tokio::test]
    async fn remove_deletes_committed_row() {
        let store = InMemoryCustomerStore::new();
        let uow = InMemoryUnitOfWork::new(store.clone());
        let acme = customer("Acme");
        uow.customers().add(acme.clone()).await;
        uow.complete().await.expect("commit");

        uow.customers().remove(acme.clone()).await;
        assert_eq!(store.len().await, 1);
        uow.complete().await.expect("commit remove");

        assert_eq!(uow.customers().get_by_id(&acme.id).await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn get_all_returns_rows_in_insertion_order() {
        let store = seeded_store(&["Charlie", "Alpha", "Bravo"]).await;
        let uow = InMemoryUnitOfWork::new(store);

        let names: Vec<String> =
            uow.customers().get_all().await.expect("get all").into_iter().map(|c| c.company_name).collect();
        assert_eq!(names, vec!["Charlie", "Alpha", "Bravo"]);
    }

    #[tokio::test]
    async fn find_and_paging_follow_the_shared_query_contract() {
        let store = seeded_store(&["Delta", "Alpha", "Charlie", "Bravo"]).await;
        let uow = InMemoryUnitOfWork::new(store);
        let repo = uow.customers();

        let query = repo.find(Filter::Contains(CustomerField::CompanyName, "A".to_string()));
        assert_eq!(repo.count_matching(&query).await.expect("count"), 4);

        let page = repo.get_paged(2, 3, Some("companyName"), false).await.expect("page");
        assert_eq!(page.total_count, 4);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].company_name, "Delta");

        let past_end = repo.get_paged(3, 3, None, false).await.expect("page");
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_count, 4);
    }
}
