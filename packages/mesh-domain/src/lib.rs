pub mod consensus;
pub mod enrich;
pub mod model;
pub mod rank;
pub mod scoring;
pub mod text;
pub mod tokens;

pub use consensus::{AgentMessage, ConsensusResult, ConsensusStrategy, MessageKind};
pub use enrich::{SNIPPET_MAX_CHARS, build_citations, enrich_documents};
pub use model::{Citation, CorpusDoc, RankedDoc, RecallDiagnostics, RecallItem, RecallStrategy};
pub use scoring::{Subscores, ValidationRecord};
