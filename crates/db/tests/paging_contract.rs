use clientele_core::domain::customer::{Customer, CustomerId};
use clientele_core::domain::paging::SortField;
use clientele_db::{
    connect_with_settings, migrations, CrudStore, CustomerQueries, CustomerSeedDataset,
    CustomerService, DbPool, InMemoryCustomerStore, InMemoryUnitOfWork, RepositoryError,
    SqlUnitOfWork, UnitOfWork,
};

type ContractResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left != *right {
                    return Err(format!(
                        "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                        left, right
                    ));
                }
            }
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left != *right {
                    return Err(format!($($arg)*));
                }
            }
        }
    };
}

async fn migrated_pool() -> ContractResult<DbPool> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    Ok(pool)
}

async fn seeded_unit_of_work(pool: &DbPool, count: u32) -> ContractResult<SqlUnitOfWork> {
    let uow = SqlUnitOfWork::begin(pool).await.map_err(|error| format!("begin: {error}"))?;
    CustomerSeedDataset::load(&uow, count).await.map_err(|error| format!("seed: {error}"))?;
    Ok(uow)
}

fn names(items: &[Customer]) -> Vec<&str> {
    items.iter().map(|customer| customer.company_name.as_str()).collect()
}

#[tokio::test]
async fn five_thousand_customers_page_ten_starts_at_company_0451() -> ContractResult {
    let pool = migrated_pool().await?;
    let uow = seeded_unit_of_work(&pool, 5000).await?;

    let page = uow
        .customers()
        .get_paged(10, 50, Some("companyName"), false)
        .await
        .map_err(|error| format!("page: {error}"))?;

    require_eq!(page.total_count, 5000);
    require_eq!(page.items.len(), 50);
    require_eq!(page.items[0].company_name, "Company 0451");
    require_eq!(page.items[49].company_name, "Company 0500");
    require_eq!(page.total_pages(), 100);

    uow.release().await;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn two_customer_scenario_orders_both_ways() -> ContractResult {
    let pool = migrated_pool().await?;
    let uow = SqlUnitOfWork::begin(&pool).await.map_err(|error| format!("begin: {error}"))?;
    let service = CustomerService::new(uow);
    for name in ["B", "A"] {
        service.create(Customer::named(name)).await.map_err(|error| format!("create: {error}"))?;
    }

    let ascending = service
        .get_page(1, 10, Some("companyname"), false)
        .await
        .map_err(|error| format!("page: {error}"))?;
    require_eq!(ascending.items[0].company_name, "A");

    let descending = service
        .get_page(1, 10, Some("companyname"), true)
        .await
        .map_err(|error| format!("page: {error}"))?;
    require_eq!(descending.items[0].company_name, "B");

    service.into_unit_of_work().release().await;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn page_sizes_follow_the_slice_formula() -> ContractResult {
    let pool = migrated_pool().await?;
    let uow = seeded_unit_of_work(&pool, 23).await?;
    let total = 23u64;

    for page_size in [1u32, 5, 10, 23, 40] {
        for page in 1u32..=6 {
            let result = uow
                .customers()
                .get_paged(page, page_size, None, false)
                .await
                .map_err(|error| format!("page {page}/{page_size}: {error}"))?;

            let offset = u64::from(page - 1) * u64::from(page_size);
            let expected = total.saturating_sub(offset).min(u64::from(page_size));
            require_eq!(
                result.items.len() as u64,
                expected,
                "page {} of size {} returned {} items, expected {}",
                page,
                page_size,
                result.items.len(),
                expected
            );
            require_eq!(result.total_count, total, "total must not depend on the page");
            require_eq!(result.page, page);
            require_eq!(result.page_size, page_size);
        }
    }

    uow.release().await;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn descending_is_the_exact_reverse_of_ascending() -> ContractResult {
    let pool = migrated_pool().await?;
    let uow = seeded_unit_of_work(&pool, 30).await?;

    for field in SortField::ALL {
        let ascending = uow
            .customers()
            .get_paged(1, 30, Some(field.name()), false)
            .await
            .map_err(|error| format!("ascending {}: {error}", field.name()))?;
        let mut descending = uow
            .customers()
            .get_paged(1, 30, Some(field.name()), true)
            .await
            .map_err(|error| format!("descending {}: {error}", field.name()))?;
        descending.items.reverse();

        require_eq!(
            names(&ascending.items),
            names(&descending.items),
            "ordering by {} should reverse exactly",
            field.name()
        );
    }

    uow.release().await;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn unknown_sort_field_matches_default_listing() -> ContractResult {
    let pool = migrated_pool().await?;
    let uow = seeded_unit_of_work(&pool, 12).await?;
    let repo = uow.customers();

    let default = repo
        .get_paged(1, 12, Some("companyName"), false)
        .await
        .map_err(|error| format!("default: {error}"))?;

    for (sort_field, descending) in [(Some("shoeSize"), false), (Some("shoeSize"), true), (None, true)] {
        let listed = repo
            .get_paged(1, 12, sort_field, descending)
            .await
            .map_err(|error| format!("unknown sort: {error}"))?;
        require_eq!(
            names(&listed.items),
            names(&default.items),
            "sort {:?} desc={} should fall back to company name ascending",
            sort_field,
            descending
        );
    }

    uow.release().await;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn sql_and_in_memory_backends_agree() -> ContractResult {
    let pool = migrated_pool().await?;
    let sql = seeded_unit_of_work(&pool, 40).await?;
    let memory = InMemoryUnitOfWork::new(InMemoryCustomerStore::new());
    CustomerSeedDataset::load(&memory, 40).await.map_err(|error| format!("seed: {error}"))?;

    for field in SortField::ALL {
        for descending in [false, true] {
            let from_sql = sql
                .customers()
                .get_paged(2, 15, Some(field.name()), descending)
                .await
                .map_err(|error| format!("sql: {error}"))?;
            let from_memory = memory
                .customers()
                .get_paged(2, 15, Some(field.name()), descending)
                .await
                .map_err(|error| format!("memory: {error}"))?;
            require_eq!(from_sql, from_memory, "backends disagree on {} desc={}", field.name(), descending);
        }
    }

    sql.release().await;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn service_crud_round_trip_on_sqlite() -> ContractResult {
    let pool = migrated_pool().await?;
    let uow = SqlUnitOfWork::begin(&pool).await.map_err(|error| format!("begin: {error}"))?;
    let service = CustomerService::new(uow);

    let created = service
        .create(Customer { phone: Some("+30 210 1234567".to_string()), ..Customer::named("Acme") })
        .await
        .map_err(|error| format!("create: {error}"))?;
    require!(!created.id.is_unset(), "create should assign an id");

    let renamed = Customer { company_name: "Acme Hellas".to_string(), ..created.clone() };
    require!(service.update(&created.id, renamed.clone()).await.map_err(|error| error.to_string())?);
    require!(
        !service.update(&CustomerId::new(), renamed.clone()).await.map_err(|error| error.to_string())?,
        "mismatched id must not update"
    );

    let stored = service.get_by_id(&created.id).await.map_err(|error| error.to_string())?;
    require_eq!(stored, Some(renamed.clone()));

    require!(service.delete(&created.id).await.map_err(|error| error.to_string())?);
    require!(!service.delete(&created.id).await.map_err(|error| error.to_string())?);
    let gone = service.get_by_id(&created.id).await.map_err(|error| error.to_string())?;
    require_eq!(gone, None::<Customer>);

    let uow = service.into_unit_of_work();
    let remaining = uow.customers().count().await.map_err(|error| error.to_string())?;
    require_eq!(remaining, 0);
    uow.release().await;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn failed_commit_on_sqlite_does_not_leak_into_later_creates() -> ContractResult {
    let pool = migrated_pool().await?;
    let uow = SqlUnitOfWork::begin(&pool).await.map_err(|error| format!("begin: {error}"))?;
    let service = CustomerService::new(uow);

    let existing =
        service.create(Customer::named("Existing")).await.map_err(|error| format!("create: {error}"))?;
    let duplicate = service.create(Customer { id: existing.id, ..Customer::named("Copy") }).await;
    require!(
        matches!(duplicate, Err(RepositoryError::Duplicate { .. })),
        "reusing an id should fail as a duplicate, got {:?}",
        duplicate
    );

    let fresh = service
        .create(Customer::named("Fresh"))
        .await
        .map_err(|error| format!("create after duplicate: {error}"))?;

    let uow = service.into_unit_of_work();
    let stored = uow.customers().get_all().await.map_err(|error| error.to_string())?;
    require_eq!(names(&stored), vec!["Existing", "Fresh"]);
    require_eq!(stored[1].id, fresh.id);
    uow.release().await;
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn paged_result_serializes_total_pages() -> ContractResult {
    let pool = migrated_pool().await?;
    let uow = seeded_unit_of_work(&pool, 7).await?;

    let page = uow
        .customers()
        .get_paged(1, 3, None, false)
        .await
        .map_err(|error| format!("page: {error}"))?;
    let json = serde_json::to_value(&page).map_err(|error| format!("serialize: {error}"))?;

    require_eq!(json["totalCount"], 7);
    require_eq!(json["totalPages"], 3);
    require_eq!(json["items"][0]["companyName"], "Company 0001");

    uow.release().await;
    pool.close().await;
    Ok(())
}
