use uuid::Uuid;

use clientele_core::domain::customer::{Customer, CustomerId};

use crate::repositories::{CrudStore, RepositoryError};
use crate::unit_of_work::UnitOfWork;

const CITIES: &[(&str, &str)] = &[
    ("Athens", "Greece"),
    ("Berlin", "Germany"),
    ("Lisbon", "Portugal"),
    ("Madrid", "Spain"),
    ("Nicosia", "Cyprus"),
    ("Oslo", "Norway"),
    ("Vienna", "Austria"),
];

/// Deterministic customer rows `Company 0001..N`.
///
/// Ids derive from the row number, so loading the same count twice stages
/// nothing the second time.
pub struct CustomerSeedDataset;

impl CustomerSeedDataset {
    pub const DEFAULT_COUNT: u32 = 50;

    pub fn customer(index: u32) -> Customer {
        let (city, country) = CITIES[index as usize % CITIES.len()];
        Customer {
            id: Self::id(index),
            company_name: format!("Company {index:04}"),
            contact_name: Some(format!("Contact {index:04}")),
            address: Some(format!("{index} Market Street")),
            city: Some(city.to_string()),
            region: None,
            postal_code: Some(format!("{:05}", 10_000 + index)),
            country: Some(country.to_string()),
            phone: Some(format!("+30 210 {:07}", index)),
        }
    }

    pub fn id(index: u32) -> CustomerId {
        CustomerId(Uuid::from_u128(0xC0FF_EE00_0000_0000_0000_0000_0000_0000 | u128::from(index)))
    }

    /// Stages every missing row and commits them together.
    pub async fn load<U: UnitOfWork>(uow: &U, count: u32) -> Result<SeedResult, RepositoryError> {
        let repo = uow.customers();
        let mut inserted = 0u32;
        let mut skipped = 0u32;

        for index in 1..=count {
            if repo.get_by_id(&Self::id(index)).await?.is_some() {
                skipped += 1;
                continue;
            }
            repo.add(Self::customer(index)).await;
            inserted += 1;
        }
        uow.complete().await?;

        tracing::info!(
            event_name = "db.fixtures.seeded",
            requested = count,
            inserted,
            skipped,
            "customer seed dataset loaded"
        );
        Ok(SeedResult { requested: count, inserted, skipped })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SeedResult {
    pub requested: u32,
    pub inserted: u32,
    pub skipped: u32,
}
