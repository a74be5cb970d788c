pub mod http;
pub mod memory;

pub use http::HttpSource;
pub use memory::MemoryStore;

use crate::error::ChartResult;
use crate::query::QueryDescriptor;
use crate::series::SeriesRow;
use async_trait::async_trait;
use tracing::debug;

/// A datastore that can answer a bucketed-average query with rows ordered
/// by bucket time.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn fetch(&self, query: &QueryDescriptor) -> ChartResult<Vec<SeriesRow>>;
}

/// Executes `query`, skipping the datastore entirely when no numeric field
/// was selected.
pub async fn run_query<S>(source: &S, query: &QueryDescriptor) -> ChartResult<Vec<SeriesRow>>
where
    S: SeriesSource + ?Sized,
{
    if query.is_noop() {
        debug!("Skipping fetch for {}: empty field set", query.table);
        return Ok(Vec::new());
    }
    source.fetch(query).await
}
