use crate::domain::{DomainError, DomainResult};
use tokio_postgres::types::ToSql;

/// Columns of the `devices` table that accept set-membership filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceColumn {
    Brand,
    State,
}

impl DeviceColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceColumn::Brand => "brand",
            DeviceColumn::State => "state",
        }
    }
}

/// Parameterized `column IN ($n, $n+1, ...)` predicate.
///
/// Emits exactly one positional placeholder per value. Values are only
/// ever bound as parameters, in input order; they never appear in the
/// SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InPredicate {
    sql: String,
    values: Vec<String>,
}

impl InPredicate {
    /// Builds a predicate whose placeholders start at `$1`
    pub fn new<S: AsRef<str>>(column: DeviceColumn, values: &[S]) -> DomainResult<Self> {
        Self::starting_at(column, values, 1)
    }

    /// Builds a predicate whose placeholders start at `$first_index`, for
    /// queries that bind other parameters before the filter
    pub fn starting_at<S: AsRef<str>>(
        column: DeviceColumn,
        values: &[S],
        first_index: usize,
    ) -> DomainResult<Self> {
        if values.is_empty() {
            return Err(DomainError::ValidationError("no value defined".to_string()));
        }
        if first_index == 0 {
            return Err(DomainError::ValidationError(
                "parameter indexes start at 1".to_string(),
            ));
        }

        let end = first_index.checked_add(values.len()).ok_or_else(|| {
            DomainError::ValidationError("parameter index out of range".to_string())
        })?;

        let placeholders = (first_index..end)
            .map(|idx| format!("${}", idx))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self {
            sql: format!("{} IN ({})", column.as_str(), placeholders),
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Bind arguments for tokio-postgres, one per placeholder
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect()
    }
}
