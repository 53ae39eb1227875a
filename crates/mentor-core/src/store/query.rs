//! Collection queries: equality/range filters, one ordering field, a limit.

use super::Collection;
use serde_json::Value;

/// Sort direction for a single ordering field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Comparison operator of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A query against one collection.
///
/// ```
/// use mentor_core::store::{Collection, Direction, Query};
///
/// let query = Query::new(Collection::Tasks)
///     .where_eq("userId", "u1")
///     .order_by("createdAt", Direction::Descending)
///     .limit(5);
/// assert_eq!(query.filters.len(), 1);
/// assert_eq!(query.limit, Some(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Equal, value)
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The same query with the ordering clause and the limit removed.
    ///
    /// Used when the ordered query cannot be served for lack of an index:
    /// the unordered result is sorted and truncated in memory instead.
    pub fn without_ordering(&self) -> Self {
        Self {
            collection: self.collection,
            filters: self.filters.clone(),
            order_by: None,
            limit: None,
        }
    }
}

impl Filter {
    /// Evaluates this filter against a JSON field value.
    ///
    /// Numbers compare numerically and strings lexically; mixed or missing
    /// values never match a range operator.
    pub fn matches(&self, candidate: Option<&Value>) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        if self.op == FilterOp::Equal {
            return candidate == &self.value;
        }
        let ordering = match (candidate, &self.value) {
            (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        };
        let Some(ordering) = ordering else {
            return false;
        };
        match self.op {
            FilterOp::Equal => ordering.is_eq(),
            FilterOp::LessThan => ordering.is_lt(),
            FilterOp::LessThanOrEqual => ordering.is_le(),
            FilterOp::GreaterThan => ordering.is_gt(),
            FilterOp::GreaterThanOrEqual => ordering.is_ge(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_without_ordering_keeps_filters() {
        let query = Query::new(Collection::MoodEntries)
            .where_eq("userId", "u1")
            .order_by("date", Direction::Descending)
            .limit(7);
        let narrowed = query.without_ordering();
        assert_eq!(narrowed.filters, query.filters);
        assert!(narrowed.order_by.is_none());
        assert!(narrowed.limit.is_none());
    }

    #[test]
    fn test_range_filter_matches_numbers_and_strings() {
        let filter = Filter {
            field: "energy".into(),
            op: FilterOp::GreaterThanOrEqual,
            value: json!(5),
        };
        assert!(filter.matches(Some(&json!(7))));
        assert!(!filter.matches(Some(&json!(3))));
        assert!(!filter.matches(Some(&json!("7"))));
        assert!(!filter.matches(None));

        let filter = Filter {
            field: "date".into(),
            op: FilterOp::LessThan,
            value: json!("2025-02-01"),
        };
        assert!(filter.matches(Some(&json!("2025-01-15T10:00:00Z"))));
    }
}
