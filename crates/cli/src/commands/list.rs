use clap::Args;

use clientele_db::{CustomerService, SqlUnitOfWork};

use crate::commands::{
    execute, execution_failure, open_database, to_data, CommandResult, Failure,
};

#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[arg(long, help = "1-based page number (defaults to 1)")]
    pub page: Option<u32>,
    #[arg(long = "page-size", help = "Rows per page (defaults to paging.default_page_size)")]
    pub page_size: Option<u32>,
    #[arg(
        long,
        help = "companyName, contactName, city, country or phone; anything else sorts by company name"
    )]
    pub sort: Option<String>,
    #[arg(long, help = "Sort descending")]
    pub desc: bool,
}

pub fn run(args: ListArgs) -> CommandResult {
    execute("list", |config| async move {
        let (page, page_size) = config.paging.clamp(args.page, args.page_size);
        let pool = open_database(&config).await?;

        let uow = SqlUnitOfWork::begin(&pool).await.map_err(execution_failure)?;
        let service = CustomerService::new(uow);
        let listed = service.get_page(page, page_size, args.sort.as_deref(), args.desc).await;
        service.into_unit_of_work().release().await;
        pool.close().await;

        let listed = listed.map_err(execution_failure)?;
        let message = format!(
            "page {} of {} ({} customers total)",
            listed.page,
            listed.total_pages(),
            listed.total_count
        );
        Ok::<_, Failure>((message, to_data(&listed)?))
    })
}
