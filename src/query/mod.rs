//! Declarative filtering of record sequences.
//!
//! Query parameters are parsed into a validated [`QueryPlan`] and run as a
//! fixed pipeline over an in-memory sequence:
//!
//! 1. field predicates (`Category=c*`), AND-combined
//! 2. keywords (`keywords=paris,2020`) over the string fields
//! 3. projection (`fields=Category,Title`) with duplicate rows removed
//! 4. ranges (`Year.start=2020&Year.end=2024`), unioned across fields
//! 5. sort (`sort=Category,-Title`)
//! 6. page (`limit=10&offset=2`)
//!
//! Execution is pure CPU work over records the caller already owns; it takes
//! no locks.
//!
//! # Example
//!
//! ```ignore
//! let params = QueryParams::new().with("Category", "c*").with("sort", "-Title");
//! let page = query::filter(records, &params, &schema)?;
//! ```

mod compare;
mod fold;
mod params;
mod pattern;
mod plan;

pub use compare::{compare_text, compare_values};
pub use fold::fold;
pub use params::QueryParams;
pub use pattern::WildcardPattern;
pub use plan::{sort_records, Page, Predicate, QueryPlan, RangeSpec, SortKey};

use crate::error::Result;
use crate::schema::FieldSchema;
use crate::types::Record;

/// Parse `params` against `schema` and run the plan over `records`.
pub fn filter(records: Vec<Record>, params: &QueryParams, schema: &FieldSchema) -> Result<Vec<Record>> {
    Ok(QueryPlan::parse(params, schema)?.execute(records))
}
