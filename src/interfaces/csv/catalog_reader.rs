use crate::error::{PipelineError, Result};
use crate::infrastructure::in_memory::RewardEntry;
use std::io::Read;

/// Reads a reward catalog from a CSV source.
///
/// Expected header: `token, amount, brand_name, campaign_name, payout_target,
/// expires_at`. Everything after `amount` is optional and may be left empty
/// or omitted.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    /// Creates a new `CatalogReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one entry per row. A bad row yields an error and
    /// reading carries on with the next one.
    pub fn entries(self) -> impl Iterator<Item = Result<RewardEntry>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PipelineError::from))
    }
}
