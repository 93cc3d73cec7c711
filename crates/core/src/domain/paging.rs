use serde::{Deserialize, Serialize, Serializer};

use crate::domain::customer::CustomerField;

/// One page of rows plus enough metadata to compute the page count.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }
}

impl<T: Serialize> Serialize for PagedResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a, T> {
            items: &'a [T],
            total_count: u64,
            page: u32,
            page_size: u32,
            total_pages: u64,
        }

        Wire {
            items: &self.items,
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages(),
        }
        .serialize(serializer)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Sortable customer columns. Each one is backed by an index, and nothing
/// outside this list can be sorted on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CompanyName,
    ContactName,
    City,
    Country,
    Phone,
}

impl SortField {
    pub const ALL: [SortField; 5] =
        [Self::CompanyName, Self::ContactName, Self::City, Self::Country, Self::Phone];

    /// Case-insensitive lookup against the allow-list.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "companyname" => Some(Self::CompanyName),
            "contactname" => Some(Self::ContactName),
            "city" => Some(Self::City),
            "country" => Some(Self::Country),
            "phone" => Some(Self::Phone),
            _ => None,
        }
    }

    /// Turns a caller-supplied sort request into a concrete ordering.
    /// Absent or unknown fields fall back to company name ascending, whatever
    /// direction was asked for.
    pub fn resolve(requested: Option<&str>, descending: bool) -> (Self, SortDirection) {
        match requested.and_then(Self::parse) {
            Some(field) => (field, SortDirection::from_descending(descending)),
            None => (Self::CompanyName, SortDirection::Ascending),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CompanyName => "companyName",
            Self::ContactName => "contactName",
            Self::City => "city",
            Self::Country => "country",
            Self::Phone => "phone",
        }
    }

    pub fn field(self) -> CustomerField {
        match self {
            Self::CompanyName => CustomerField::CompanyName,
            Self::ContactName => CustomerField::ContactName,
            Self::City => CustomerField::City,
            Self::Country => CustomerField::Country,
            Self::Phone => CustomerField::Phone,
        }
    }
}
