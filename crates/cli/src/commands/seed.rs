use clientele_db::{CustomerSeedDataset, SqlUnitOfWork};

use crate::commands::{
    execute, execution_failure, open_database, to_data, CommandResult, Failure,
};

pub fn run(count: u32) -> CommandResult {
    execute("seed", |config| async move {
        let pool = open_database(&config).await?;

        let uow = SqlUnitOfWork::begin(&pool).await.map_err(execution_failure)?;
        let seeded = CustomerSeedDataset::load(&uow, count).await;
        uow.release().await;
        pool.close().await;

        let seeded = seeded.map_err(execution_failure)?;
        Ok::<_, Failure>((seed_message(seeded.inserted, seeded.skipped), to_data(&seeded)?))
    })
}

fn seed_message(inserted: u32, skipped: u32) -> String {
    match (inserted, skipped) {
        (0, 0) => "nothing to seed".to_string(),
        (inserted, 0) => format!("seeded {inserted} customers"),
        (inserted, skipped) => {
            format!("seeded {inserted} customers, {skipped} already present")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::seed_message;

    #[test]
    fn message_reports_skipped_rows_only_when_present() {
        assert_eq!(seed_message(50, 0), "seeded 50 customers");
        assert_eq!(seed_message(5, 45), "seeded 5 customers, 45 already present");
        assert_eq!(seed_message(0, 0), "nothing to seed");
    }
}
