mod cache;
mod category;
mod classifier;
mod embedded;
mod hash;
mod manager;
mod matcher;
mod normalize;
mod traits;
mod types;

pub use cache::ResultCache;
pub use category::BlockingCategory;
pub use classifier::{
    Classified, ClassificationResult, MatchTier, TieredClassifier, HEURISTIC_CONFIDENCE,
};
pub use embedded::{EmbeddedList, EmbeddedMatch};
pub use hash::{fingerprint32, DomainHash};
pub use manager::{BlockDecision, GuidedBlocker, SiteBlocker, StandardBlocker};
pub use matcher::PatternMatcher;
pub use normalize::{normalize, NormalizedAddress};
pub use traits::{BlocklistStore, DiagnosticsSink, FalsePositiveSink, GuidanceStore, StoreResult};
pub use types::{EntrySource, FalsePositiveReport, Guidance, SiteEntry};
