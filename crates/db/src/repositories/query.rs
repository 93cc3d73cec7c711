use std::cmp::Ordering;
use std::marker::PhantomData;

use sqlx::{QueryBuilder, Sqlite};

use clientele_core::domain::paging::SortDirection;

use super::{Entity, EntityField};

#[derive(Clone, Debug, PartialEq)]
pub enum Filter<F> {
    Eq(F, String),
    /// Case-insensitive substring match.
    Contains(F, String),
    IsNull(F),
    IsNotNull(F),
}

impl<F: EntityField> Filter<F> {
    pub fn matches<E: Entity<Field = F>>(&self, entity: &E) -> bool {
        match self {
            Self::Eq(field, expected) => entity.field_value(*field).as_deref() == Some(expected),
            Self::Contains(field, needle) => entity
                .field_value(*field)
                .map(|value| {
                    value.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
                })
                .unwrap_or(false),
            Self::IsNull(field) => entity.field_value(*field).is_none(),
            Self::IsNotNull(field) => entity.field_value(*field).is_some(),
        }
    }

    fn push_sql(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        match self {
            Self::Eq(field, value) => {
                builder.push(field.column()).push(" = ").push_bind(value.clone());
            }
            Self::Contains(field, value) => {
                builder
                    .push("instr(LOWER(")
                    .push(field.column())
                    .push("), LOWER(")
                    .push_bind(value.clone())
                    .push(")) > 0");
            }
            Self::IsNull(field) => {
                builder.push(field.column()).push(" IS NULL");
            }
            Self::IsNotNull(field) => {
                builder.push(field.column()).push(" IS NOT NULL");
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderTerm<F> {
    pub field: F,
    pub direction: SortDirection,
}

/// A deferred query: filter, ordering and paging intent collected up front
/// and executed exactly once by the store it is handed to.
#[derive(Clone, Debug)]
pub struct Query<E: Entity> {
    filters: Vec<Filter<E::Field>>,
    ordering: Vec<OrderTerm<E::Field>>,
    offset: u64,
    limit: Option<u64>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for Query<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Query<E> {
    pub fn new() -> Self {
        Self { filters: Vec::new(), ordering: Vec::new(), offset: 0, limit: None, _entity: PhantomData }
    }

    pub fn filter(mut self, filter: Filter<E::Field>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Replaces any existing ordering.
    pub fn order_by(mut self, field: E::Field, direction: SortDirection) -> Self {
        self.ordering = vec![OrderTerm { field, direction }];
        self
    }

    pub fn then_by(mut self, field: E::Field, direction: SortDirection) -> Self {
        self.ordering.push(OrderTerm { field, direction });
        self
    }

    pub fn skip(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn take(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Direction used to break ties between rows that compare equal on every
    /// ordering term: insertion order, following the leading term.
    fn tiebreak_direction(&self) -> SortDirection {
        self.ordering.first().map(|term| term.direction).unwrap_or_default()
    }

    pub(crate) fn to_select(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT ");
        builder.push(E::COLUMNS.join(", ")).push(" FROM ").push(E::TABLE);
        self.push_where(&mut builder);

        builder.push(" ORDER BY ");
        for term in &self.ordering {
            builder.push(term.field.column()).push(" ").push(term.direction.as_sql()).push(", ");
        }
        builder.push("rowid ").push(self.tiebreak_direction().as_sql());

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                builder.push(" LIMIT ").push_bind(to_i64(limit));
                if offset > 0 {
                    builder.push(" OFFSET ").push_bind(to_i64(offset));
                }
            }
            (None, 0) => {}
            (None, offset) => {
                builder.push(" LIMIT -1 OFFSET ").push_bind(to_i64(offset));
            }
        }

        builder
    }

    pub(crate) fn to_count(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM ");
        builder.push(E::TABLE);
        self.push_where(&mut builder);
        builder
    }

    fn push_where(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        for (index, filter) in self.filters.iter().enumerate() {
            builder.push(if index == 0 { " WHERE " } else { " AND " });
            filter.push_sql(builder);
        }
    }

    pub(crate) fn matches(&self, entity: &E) -> bool {
        self.filters.iter().all(|filter| filter.matches(entity))
    }

    /// Runs the query against rows held in memory. Each row carries its
    /// insertion sequence, which breaks ties the way `rowid` does in SQL.
    pub(crate) fn evaluate<'a>(&self, rows: impl Iterator<Item = (u64, &'a E)>) -> Vec<E> {
        let mut matched: Vec<(u64, &E)> = rows.filter(|(_, entity)| self.matches(entity)).collect();

        let tiebreak = self.tiebreak_direction();
        matched.sort_by(|(left_seq, left), (right_seq, right)| {
            for term in &self.ordering {
                let ordering = directed(
                    left.field_value(term.field).cmp(&right.field_value(term.field)),
                    term.direction,
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            directed(left_seq.cmp(right_seq), tiebreak)
        });

        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = self.limit.map(|limit| usize::try_from(limit).unwrap_or(usize::MAX));
        matched
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(_, entity)| entity.clone())
            .collect()
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
