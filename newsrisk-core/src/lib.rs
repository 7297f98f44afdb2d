//! Newsrisk Core - the batch stages of the vendor risk-news pipeline.
//!
//! - [`merge`]: heterogeneous raw sources into canonical records
//! - [`classifier`]: multi-label risk tagging over a pluggable scoring model
//! - [`store`]: atomic CSV persistence and a read-side cache
//! - [`query`]: vendor / tag / recency / review filtering
//! - [`pipeline`]: orchestration of a full run

pub mod classifier;
pub mod error;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod table;
pub mod timestamp;

pub use classifier::{
    build_classifier, ClassificationOutcome, ClassificationStats, ClassifiedBatch, LabelScores,
    RiskClassifier, ScoringModel,
};
pub use error::{ClassifyError, SchemaError, StoreError, VocabularyError};
pub use merge::{merge_sources, MergeReport, RecordMerger, SourceTable};
pub use model::{CanonicalArticle, LabelVocabulary, RawArticle, RiskTags, TaggedArticle};
pub use pipeline::{Pipeline, RunReport};
pub use query::{facets, tag_facets, vendor_facets, ArticleFilter, Facets};
pub use store::{
    export_csv, read_store, write_atomic, write_store, StoreCache, StoreRow, StoreSnapshot,
};
pub use table::Table;
