//! Document pipeline services
//
// Upload side: classify, normalize, compress, store
pub mod ingest;
//
// Retrieval side: read-through cache over signed URL fetches
pub mod delivery;

#[cfg(test)]
pub(crate) mod test_support;
