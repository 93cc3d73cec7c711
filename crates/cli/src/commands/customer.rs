use clap::Args;

use clientele_core::domain::customer::{Customer, CustomerId};
use clientele_core::errors::{ApplicationError, DomainError};
use clientele_db::{CustomerService, DbPool, SqlUnitOfWork};

use crate::commands::{
    execute, execution_failure, open_database, to_data, CommandResult, Failure, EXIT_NOT_FOUND,
    EXIT_VALIDATION,
};

/// Customer fields accepted on the command line. An empty value clears an
/// optional field on update.
#[derive(Debug, Clone, Default, Args)]
pub struct CustomerFields {
    #[arg(long = "company-name")]
    pub company_name: Option<String>,
    #[arg(long = "contact-name")]
    pub contact_name: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long = "postal-code")]
    pub postal_code: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
}

impl CustomerFields {
    fn apply_to(self, customer: &mut Customer) {
        if let Some(company_name) = self.company_name {
            customer.company_name = company_name.trim().to_string();
        }
        set_optional(&mut customer.contact_name, self.contact_name);
        set_optional(&mut customer.address, self.address);
        set_optional(&mut customer.city, self.city);
        set_optional(&mut customer.region, self.region);
        set_optional(&mut customer.postal_code, self.postal_code);
        set_optional(&mut customer.country, self.country);
        set_optional(&mut customer.phone, self.phone);
    }
}

fn set_optional(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        let value = value.trim();
        *slot = (!value.is_empty()).then(|| value.to_string());
    }
}

pub fn show(id: &str) -> CommandResult {
    let id = match parse_id("show", id) {
        Ok(id) => id,
        Err(result) => return result,
    };

    execute("show", |config| async move {
        let pool = open_database(&config).await?;
        let service = open_service(&pool).await?;

        let found = service.get_by_id(&id).await;
        close(service, pool).await;

        match found.map_err(execution_failure)? {
            Some(customer) => Ok::<_, Failure>((format!("customer {id}"), to_data(&customer)?)),
            None => Err(not_found(&id)),
        }
    })
}

pub fn create(fields: CustomerFields) -> CommandResult {
    let mut customer = Customer::default();
    fields.apply_to(&mut customer);
    if let Err(error) = customer.validate() {
        return CommandResult::from_failure("create", validation_failure(error));
    }

    execute("create", |config| async move {
        let pool = open_database(&config).await?;
        let service = open_service(&pool).await?;

        let created = service.create(customer).await;
        close(service, pool).await;

        let created = created.map_err(execution_failure)?;
        Ok::<_, Failure>((format!("created customer {}", created.id), to_data(&created)?))
    })
}

/// Loads the stored customer, overlays the given fields and writes it back.
pub fn update(id: &str, fields: CustomerFields) -> CommandResult {
    let id = match parse_id("update", id) {
        Ok(id) => id,
        Err(result) => return result,
    };

    execute("update", |config| async move {
        let pool = open_database(&config).await?;
        let service = open_service(&pool).await?;

        let outcome: Result<Customer, Failure> = async {
            let Some(mut customer) = service.get_by_id(&id).await.map_err(execution_failure)?
            else {
                return Err(not_found(&id));
            };
            fields.apply_to(&mut customer);
            customer.validate().map_err(validation_failure)?;

            if !service.update(&id, customer.clone()).await.map_err(execution_failure)? {
                return Err(not_found(&id));
            }
            Ok(customer)
        }
        .await;
        close(service, pool).await;

        let updated = outcome?;
        Ok::<_, Failure>((format!("updated customer {id}"), to_data(&updated)?))
    })
}

pub fn delete(id: &str) -> CommandResult {
    let id = match parse_id("delete", id) {
        Ok(id) => id,
        Err(result) => return result,
    };

    execute("delete", |config| async move {
        let pool = open_database(&config).await?;
        let service = open_service(&pool).await?;

        let deleted = service.delete(&id).await;
        close(service, pool).await;

        if !deleted.map_err(execution_failure)? {
            return Err(not_found(&id));
        }
        let data = serde_json::json!({ "id": id.to_string() });
        Ok::<_, Failure>((format!("deleted customer {id}"), data))
    })
}

async fn open_service(pool: &DbPool) -> Result<CustomerService<SqlUnitOfWork>, Failure> {
    let uow = SqlUnitOfWork::begin(pool).await.map_err(execution_failure)?;
    Ok(CustomerService::new(uow))
}

async fn close(service: CustomerService<SqlUnitOfWork>, pool: DbPool) {
    service.into_unit_of_work().release().await;
    pool.close().await;
}

fn parse_id(command: &str, raw: &str) -> Result<CustomerId, CommandResult> {
    raw.trim().parse::<CustomerId>().map_err(|error| {
        CommandResult::failure(
            command,
            "validation",
            format!("invalid customer id `{raw}`: {error}"),
            EXIT_VALIDATION,
        )
    })
}

fn validation_failure(error: DomainError) -> Failure {
    let error = ApplicationError::from(error);
    (error.error_class(), error.to_string(), EXIT_VALIDATION)
}

fn not_found(id: &CustomerId) -> Failure {
    ("not_found", format!("no customer with id {id}"), EXIT_NOT_FOUND)
}
