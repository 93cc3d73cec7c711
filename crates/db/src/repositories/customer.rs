use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use clientele_core::domain::customer::{Customer, CustomerId};
use clientele_core::domain::paging::{PagedResult, SortDirection, SortField};

use super::{CrudStore, CustomerQueries, PendingChange, Query, RepositoryError};
use crate::session::SharedSession;

const SELECT_CUSTOMER: &str = "SELECT
        id,
        company_name,
        contact_name,
        address,
        city,
        region,
        postal_code,
        country,
        phone
     FROM customers";

/// Customer store bound to one unit of work's session. Every call goes
/// through that session's connection.
pub struct SqlCustomerRepository {
    session: SharedSession,
}

impl SqlCustomerRepository {
    pub(crate) fn new(session: SharedSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl CrudStore<Customer> for SqlCustomerRepository {
    async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let mut session = self.session.lock().await;
        let row = sqlx::query(&format!("{SELECT_CUSTOMER} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *session.conn)
            .await?;

        row.map(customer_from_row).transpose()
    }

    async fn get_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let mut session = self.session.lock().await;
        let rows = sqlx::query(&format!("{SELECT_CUSTOMER} ORDER BY rowid ASC"))
            .fetch_all(&mut *session.conn)
            .await?;

        rows.into_iter().map(customer_from_row).collect()
    }

    async fn fetch(&self, query: &Query<Customer>) -> Result<Vec<Customer>, RepositoryError> {
        let mut builder = query.to_select();
        let mut session = self.session.lock().await;
        let rows = builder.build().fetch_all(&mut *session.conn).await?;

        rows.into_iter().map(customer_from_row).collect()
    }

    async fn count_matching(&self, query: &Query<Customer>) -> Result<u64, RepositoryError> {
        let mut builder = query.to_count();
        let mut session = self.session.lock().await;
        let count: i64 = builder.build_query_scalar().fetch_one(&mut *session.conn).await?;

        to_count(count)
    }

    async fn add(&self, customer: Customer) {
        self.session.lock().await.stage(PendingChange::Add(customer));
    }

    async fn update(&self, customer: Customer) {
        self.session.lock().await.stage(PendingChange::Update(customer));
    }

    async fn remove(&self, customer: Customer) {
        self.session.lock().await.stage(PendingChange::Remove(customer));
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let mut session = self.session.lock().await;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&mut *session.conn)
            .await?;

        to_count(count)
    }
}

#[async_trait]
impl CustomerQueries for SqlCustomerRepository {
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

/// Paged, sorted customer listing over any store.
///
/// The count runs on the filtered but unpaged query, so it reflects every
/// matching row; only the requested slice is ever materialized.
pub(crate) async fn get_customers_page<S>(
    store: &S,
    page: u32,
    page_size: u32,
    sort_field: Option<&str>,
    descending: bool,
) -> Result<PagedResult<Customer>, RepositoryError>
where
    S: CrudStore<Customer> + ?Sized,
{
    let (field, direction) = SortField::resolve(sort_field, descending);
    let query = Query::<Customer>::new().order_by(field.field(), direction);

    let total_count = store.count_matching(&query).await?;

    let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
    let items = if offset >= total_count {
        Vec::new()
    } else {
        store.fetch(&query.skip(offset).take(u64::from(page_size))).await?
    };

    tracing::debug!(
        event_name = "db.customers.page_loaded",
        page,
        page_size,
        sort_field = field.name(),
        descending = direction == SortDirection::Descending,
        total_count,
        returned = items.len(),
        "customer page loaded"
    );

    Ok(PagedResult { items, total_count, page, page_size })
}

/// Writes one staged change. Updates and removes that touch no row mean the
/// row disappeared since it was read, which fails the whole commit.
pub(crate) async fn apply_change(
    conn: &mut SqliteConnection,
    change: &PendingChange<Customer>,
) -> Result<u64, RepositoryError> {
    let affected = match change {
        PendingChange::Add(customer) => {
            sqlx::query(
                "INSERT INTO customers (
                    id,
                    company_name,
                    contact_name,
                    address,
                    city,
                    region,
                    postal_code,
                    country,
                    phone
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(customer.id.to_string())
            .bind(&customer.company_name)
            .bind(customer.contact_name.as_deref())
            .bind(customer.address.as_deref())
            .bind(customer.city.as_deref())
            .bind(customer.region.as_deref())
            .bind(customer.postal_code.as_deref())
            .bind(customer.country.as_deref())
            .bind(customer.phone.as_deref())
            .execute(&mut *conn)
            .await
            .map_err(|error| {
                if error.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                    RepositoryError::Duplicate { id: customer.id.to_string() }
                } else {
                    RepositoryError::Database(error)
                }
            })?
            .rows_affected()
        }
        PendingChange::Update(customer) => {
            let affected = sqlx::query(
                "UPDATE customers SET
                    company_name = ?,
                    contact_name = ?,
                    address = ?,
                    city = ?,
                    region = ?,
                    postal_code = ?,
                    country = ?,
                    phone = ?
                 WHERE id = ?",
            )
            .bind(&customer.company_name)
            .bind(customer.contact_name.as_deref())
            .bind(customer.address.as_deref())
            .bind(customer.city.as_deref())
            .bind(customer.region.as_deref())
            .bind(customer.postal_code.as_deref())
            .bind(customer.country.as_deref())
            .bind(customer.phone.as_deref())
            .bind(customer.id.to_string())
            .execute(&mut *conn)
            .await?
            .rows_affected();
            require_row(affected, &customer.id)?
        }
        PendingChange::Remove(customer) => {
            let affected = sqlx::query("DELETE FROM customers WHERE id = ?")
                .bind(customer.id.to_string())
                .execute(&mut *conn)
                .await?
                .rows_affected();
            require_row(affected, &customer.id)?
        }
    };

    Ok(affected)
}

fn require_row(affected: u64, id: &CustomerId) -> Result<u64, RepositoryError> {
    if affected == 0 {
        return Err(RepositoryError::Conflict { id: id.to_string() });
    }
    Ok(affected)
}

fn customer_from_row(row: SqliteRow) -> Result<Customer, RepositoryError> {
    let id_raw = row.try_get::<String, _>("id")?;
    let id = id_raw
        .parse::<CustomerId>()
        .map_err(|error| RepositoryError::Decode(format!("invalid customer id `{id_raw}`: {error}")))?;

    Ok(Customer {
        id,
        company_name: row.try_get("company_name")?,
        contact_name: row.try_get("contact_name")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        region: row.try_get("region")?,
        postal_code: row.try_get("postal_code")?,
        country: row.try_get("country")?,
        phone: row.try_get("phone")?,
    })
}

fn to_count(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("row count must be non-negative, got {value}")))
}
