use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+)?([\s-]?\d){7,15}[\s-]?$").expect("valid phone regex"));

/// Customer identity. The nil UUID stands for "not yet assigned".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn unset() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for CustomerId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: CustomerId,
    pub company_name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Customer {
    /// A customer with only the required field set and no identity yet.
    pub fn named(company_name: impl Into<String>) -> Self {
        Self { company_name: company_name.into(), ..Self::default() }
    }

    /// Checks field-level rules. Runs at the input boundary; the repository
    /// and service accept whatever they are given.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.company_name.trim().is_empty() {
            return Err(DomainError::InvalidCustomer {
                field: "companyName",
                reason: "company name is required".to_string(),
            });
        }

        if let Some(phone) = self.phone.as_deref() {
            if !is_valid_phone(phone) {
                return Err(DomainError::InvalidCustomer {
                    field: "phone",
                    reason: format!(
                        "`{phone}` must contain 7 to 15 digits with an optional leading `+`, spaces or dashes"
                    ),
                });
            }
        }

        Ok(())
    }
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

/// Columns a customer query may filter or sort on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CustomerField {
    Id,
    CompanyName,
    ContactName,
    Address,
    City,
    Region,
    PostalCode,
    Country,
    Phone,
}

impl CustomerField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CompanyName => "company_name",
            Self::ContactName => "contact_name",
            Self::Address => "address",
            Self::City => "city",
            Self::Region => "region",
            Self::PostalCode => "postal_code",
            Self::Country => "country",
            Self::Phone => "phone",
        }
    }

    /// Reads the field's value off a customer, `None` when the column is null.
    pub fn value_of(self, customer: &Customer) -> Option<String> {
        match self {
            Self::Id => Some(customer.id.to_string()),
            Self::CompanyName => Some(customer.company_name.clone()),
            Self::ContactName => customer.contact_name.clone(),
            Self::Address => customer.address.clone(),
            Self::City => customer.city.clone(),
            Self::Region => customer.region.clone(),
            Self::PostalCode => customer.postal_code.clone(),
            Self::Country => customer.country.clone(),
            Self::Phone => customer.phone.clone(),
        }
    }
}
