use std::sync::Arc;

use thiserror::Error;

use crate::admission::AdmissionIntake;
use crate::config::CoverageConfig;
use crate::coverage::{Aggregator, CoverageStore, Recorder};
use crate::forest::ResourceForest;
use crate::rules::{IgnoredFields, RuleSet, RulesError};
use crate::schema::{Catalog, SchemaError};

/// Startup failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// The assembled coverage engine: one store shared by a recorder, an
/// aggregator and the admission intake.
#[derive(Debug, Clone)]
pub struct Engine {
    pub store: Arc<CoverageStore>,
    pub recorder: Recorder,
    pub aggregator: Aggregator,
    pub intake: AdmissionIntake,
}

impl Engine {
    /// Builds everything from already loaded inputs.
    pub fn new(
        catalog: &Catalog,
        rules: RuleSet,
        ignored: IgnoredFields,
    ) -> Result<Self, EngineError> {
        let forest = ResourceForest::build(catalog, &rules)?;
        let intake = AdmissionIntake::new(forest.keys().cloned());
        let store = Arc::new(CoverageStore::new(forest));
        Ok(Self {
            recorder: Recorder::new(store.clone()),
            aggregator: Aggregator::new(store.clone(), ignored, rules.display),
            intake,
            store,
        })
    }

    /// Loads the catalog, rules and ignored fields named by `config`.
    ///
    /// A missing or malformed ignored-fields file is logged and treated as
    /// empty; every other failure is returned.
    pub fn from_config(config: &CoverageConfig) -> Result<Self, EngineError> {
        let catalog = Catalog::load(config.catalog_path().as_deref())?;
        let rules = RuleSet::load(config.rules_path().as_deref())?;
        let ignored = IgnoredFields::load_or_empty(config.ignored_fields_path());
        Self::new(&catalog, rules, ignored)
    }
}
