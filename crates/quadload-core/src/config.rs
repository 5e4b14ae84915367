//! Loader configuration consumed by the core

use crate::accumulator::DEFAULT_BATCH_SIZE;
use crate::error::LoadError;
use crate::retry::RetryPolicy;
use crate::serializer::SerializerOptions;

/// Default number of writer workers (and in-flight batches)
pub const DEFAULT_WORKERS: usize = 2;

/// Default database name; the collection is derived from it
pub const DEFAULT_DATABASE: &str = "rya";

/// Collection holding the triples of `database`
pub fn triples_collection(database: &str) -> String {
    format!("{database}__triples")
}

/// Runtime configuration for a [`Loader`](crate::loader::Loader)
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Statements per dispatched batch
    pub batch_size: usize,
    /// Writer threads, which is also the in-flight batch limit
    pub workers: usize,
    /// Target collection name
    pub collection: String,
    pub serializer: SerializerOptions,
    pub retry: RetryPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            collection: triples_collection(DEFAULT_DATABASE),
            serializer: SerializerOptions::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl LoaderConfig {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.batch_size == 0 {
            return Err(LoadError::Config("batch_size must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(LoadError::Config("workers must be at least 1".to_string()));
        }
        if self.collection.is_empty() {
            return Err(LoadError::Config("collection name is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::GeoMode;

    #[test]
    fn default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.batch_size, 1_000_000);
        assert_eq!(config.workers, 2);
        assert_eq!(config.collection, "rya__triples");
        assert!(!config.serializer.hashed_fields);
        assert_eq!(config.serializer.geo, GeoMode::BestEffort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let config = LoaderConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LoadError::Config(_))));
    }

    #[test]
    fn zero_batch_rejected() {
        let config = LoaderConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn collection_naming() {
        assert_eq!(triples_collection("rya_exp"), "rya_exp__triples");
    }
}
