//! Ingestion pipeline: crawl, chunk, hash-gate, upsert, stale sweep
//!
//! Each run walks the workspace, skips files whose content hash is already
//! recorded, upserts graph nodes and full-text rows for everything else, and
//! finally removes nodes whose file no longer exists on disk. Per-file
//! failures are counted and logged; they never abort the run.

pub mod chunker;
pub mod crawler;
pub mod hashes;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::KnowledgeGraph;
use crate::node::{Edge, EdgeType, Node, NodeType};

pub struct IngestPipeline {
    graph: KnowledgeGraph,
    hashes: hashes::HashGate,
}

/// Outcome of one pipeline run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub total_files: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub nodes_created: usize,
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files ({} indexed, {} skipped, {} errors), {} nodes",
            self.total_files, self.indexed, self.skipped, self.errors, self.nodes_created
        )
    }
}

impl IngestPipeline {
    pub fn new(graph: KnowledgeGraph) -> Self {
        let hashes = hashes::HashGate::new(graph.db().clone(), graph.project_id());
        Self { graph, hashes }
    }

    /// Run a full pass over `root`. Files are visited in lexicographic path
    /// order so node-creation traces are reproducible between runs.
    pub fn ingest_directory(&self, root: &Path) -> Result<IngestReport> {
        let files = crawler::crawl(root)?;
        let crawled: HashSet<String> = files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        let mut report = IngestReport {
            total_files: files.len(),
            ..Default::default()
        };

        for file_path in &files {
            let path_str = file_path.to_string_lossy().to_string();
            if self.hashes.is_unchanged(&path_str) {
                report.skipped += 1;
                continue;
            }
            match self.ingest_file(file_path) {
                Ok(created) => {
                    report.indexed += 1;
                    report.nodes_created += created;
                }
                Err(e) => {
                    log::warn!("failed to ingest {path_str}: {e}");
                    report.errors += 1;
                }
            }
        }

        self.sweep_stale(&crawled)?;
        Ok(report)
    }

    /// Ingest one file: upsert the file node, then a node per changed chunk
    /// with a `contains` edge from the file. Returns nodes touched.
    pub fn ingest_file(&self, file_path: &Path) -> Result<usize> {
        // Never fail on encoding: invalid sequences become replacement chars.
        let bytes = std::fs::read(file_path)?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let path_str = file_path.to_string_lossy().to_string();

        let chunks = chunker::chunk_source(file_path, &content);
        let file_hash = hashes::sha256_hex(&content);

        let file_node = Node::builder(self.graph.project_id())
            .name(&path_str)
            .node_type(NodeType::File)
            .file_path(&path_str)
            .lines(1, content.lines().count().max(1) as i64)
            .content_hash(&file_hash)
            .build();
        self.graph.add_node(&file_node)?;
        self.graph.index_fts(&file_node, &content)?;

        let mut created = 1;
        for chunk in &chunks {
            let chunk_key = format!("{path_str}::{}", chunk.name);
            let chunk_hash = hashes::sha256_hex(&chunk.content);
            if self.hashes.is_chunk_unchanged(&chunk_key, &chunk_hash) {
                continue;
            }

            let chunk_node = Node::builder(self.graph.project_id())
                .name(&chunk.name)
                .node_type(chunk.node_type)
                .file_path(&path_str)
                .lines(chunk.start_line as i64, chunk.end_line as i64)
                .summary(&chunk.summary)
                .content_hash(&chunk_hash)
                .build();
            self.graph.add_node(&chunk_node)?;
            self.graph.index_fts(&chunk_node, &chunk.content)?;

            let edge = Edge::builder(self.graph.project_id())
                .source(&file_node.id)
                .target(&chunk_node.id)
                .edge_type(EdgeType::Contains)
                .build();
            self.graph.add_edge(&edge)?;

            self.hashes.record(&chunk_key, &chunk_hash)?;
            created += 1;
        }

        self.hashes.record(&path_str, &file_hash)?;
        Ok(created)
    }

    /// Remove graph state for files that disappeared from the workspace.
    fn sweep_stale(&self, crawled: &HashSet<String>) -> Result<()> {
        let stored = self.graph.get_all_file_paths()?;
        for stale in stored.difference(crawled) {
            self.graph.delete_nodes_for_file(stale)?;
            log::info!("removed stale nodes for {stale}");
        }
        Ok(())
    }
}
