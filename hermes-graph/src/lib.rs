//! Hermes knowledge-graph engine
//!
//! A local knowledge graph that serves an AI coding assistant through a tool
//! protocol. Search returns compact *pointers* — file path, line range,
//! summary, relevance — instead of raw file content; callers fetch bodies
//! only for the pointers they need, and the accountant journals the token
//! savings against a "ship whole files" counterfactual.
//!
//! ## Features
//!
//! - **Tiered hybrid search** — literal name match, FTS5/BM25 full text, and
//!   token-hash (or provider) cosine, fused with a tier-bonus rank merge
//! - **Incremental ingestion** — SHA-256 hash gates skip unchanged files and
//!   chunks; a stale sweep keeps the graph consistent with the workspace
//! - **Temporal facts** — append-only assertions with supersession chains
//! - **SQLite persistence** — one WAL-mode database file per project
//!
//! ## Example
//!
//! ```ignore
//! use hermes_graph::Hermes;
//!
//! let hermes = Hermes::open(&db_path, "my-project")?;
//! hermes.pipeline().ingest_directory(&project_root)?;
//!
//! let response = hermes.search_engine().search("alert handler", 10)?;
//! for pointer in &response.pointers {
//!     println!("{} {} ({:.2})", pointer.source, pointer.lines, pointer.relevance);
//! }
//! ```

pub mod accounting;
pub mod cache;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod node;
pub mod pointer;
pub mod schema;
pub mod search;
pub mod temporal;

// Re-exports for convenience
pub use accounting::{parse_since_window, Accountant, UsageTotals};
pub use cache::QueryCache;
pub use embedding::VectorEngine;
pub use error::{HermesError, Result};
pub use graph::{Db, KnowledgeGraph};
pub use ingest::{IngestPipeline, IngestReport};
pub use node::{Edge, EdgeType, Node, NodeType};
pub use pointer::{FetchResponse, Pointer, PointerResponse, QueryAccounting};
pub use search::{SearchEngine, SearchTier};
pub use temporal::{FactStore, FactType, TemporalFact};

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use uuid::Uuid;

/// Engine handle: the shared store plus the per-process state every
/// component hangs off. Cheap to clone; all clones share the same store,
/// caches, and session id.
#[derive(Clone)]
pub struct Hermes {
    db: Db,
    project_id: String,
    session_id: String,
    cache: Arc<QueryCache>,
    vectors: Arc<VectorEngine>,
}

impl Hermes {
    /// Open (or create) the store at `db_path` and run migrations.
    pub fn open(db_path: &Path, project_id: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::run_migrations(&conn)?;
        Ok(Self::with_connection(conn, project_id))
    }

    /// In-memory store, for tests.
    pub fn in_memory(project_id: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self::with_connection(conn, project_id))
    }

    fn with_connection(conn: Connection, project_id: &str) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            project_id: project_id.to_string(),
            session_id: Uuid::new_v4().to_string(),
            cache: Arc::new(QueryCache::new()),
            vectors: Arc::new(VectorEngine::from_env()),
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Unique id for this process invocation; scopes per-session accounting.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn graph(&self) -> KnowledgeGraph {
        KnowledgeGraph::new(self.db.clone(), &self.project_id)
    }

    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(self.graph())
    }

    pub fn search_engine(&self) -> SearchEngine {
        SearchEngine::new(self.graph(), self.vectors.clone(), self.cache.clone())
    }

    pub fn accountant(&self) -> Accountant {
        Accountant::new(self.db.clone(), &self.project_id, &self.session_id)
    }

    pub fn facts(&self) -> FactStore {
        FactStore::new(self.db.clone(), &self.project_id)
    }

    /// Flush the search and snippet caches. Call after every ingestion run.
    pub fn invalidate_caches(&self) {
        self.cache.invalidate_all();
    }
}
