//! Language-aware source chunking
//!
//! Pure, deterministic line scanners. Each supported language contributes a
//! "does this line open a named item" predicate; blocks are terminated by
//! brace balance reaching zero after the first `{`. Braces inside strings
//! and comments are treated as structural — acceptable noise for retrieval,
//! so tests never pin `end_line` on such inputs.

use std::path::Path;

use crate::node::NodeType;

/// A nameable unit carved out of a source file
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub name: String,
    pub node_type: NodeType,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub summary: String,
}

/// Chunk a file by extension. Unknown (but crawled) extensions fall back to
/// one whole-file chunk.
pub fn chunk_source(path: &Path, content: &str) -> Vec<Chunk> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "rs" => chunk_rust(content),
        "kt" | "kts" | "java" => chunk_jvm(content),
        "md" => chunk_markdown(content),
        "ts" | "tsx" | "js" | "jsx" => chunk_typescript(content),
        _ => chunk_whole_file(path, content),
    }
}

// ---------------------------------------------------------------------------
// Rust
// ---------------------------------------------------------------------------

fn chunk_rust(content: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();
    for (i, raw) in lines.iter().enumerate() {
        if let Some((name, node_type)) = rust_item(raw.trim_start()) {
            chunks.push(make_chunk(&lines, i, name, node_type));
        }
    }
    chunks
}

fn rust_item(line: &str) -> Option<(String, NodeType)> {
    const FN_OPENERS: [&str; 4] = ["pub fn ", "fn ", "pub async fn ", "async fn "];
    if FN_OPENERS.iter().any(|p| line.starts_with(p)) {
        return Some((rust_fn_name(line)?, NodeType::Function));
    }
    if line.starts_with("pub struct ") || line.starts_with("struct ") {
        return Some((name_after_keyword(line, "struct")?, NodeType::Struct));
    }
    if line.starts_with("pub enum ") || line.starts_with("enum ") {
        return Some((name_after_keyword(line, "enum")?, NodeType::Enum));
    }
    if line.starts_with("impl ") {
        return Some((rust_impl_target(line)?, NodeType::Impl));
    }
    if line.starts_with("pub trait ") || line.starts_with("trait ") {
        return Some((name_after_keyword(line, "trait")?, NodeType::Trait));
    }
    None
}

fn rust_fn_name(line: &str) -> Option<String> {
    let after = line.split("fn ").nth(1)?;
    let name = after.split('(').next()?.split('<').next()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn name_after_keyword(line: &str, keyword: &str) -> Option<String> {
    let after = line.split(&format!("{keyword} ")).nth(1)?;
    let name = after
        .split('{')
        .next()?
        .split('<')
        .next()?
        .split('(')
        .next()?
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// For `impl Display for Foo` the interesting name is `Foo`; for a plain
/// `impl Foo` it is `Foo` as well.
fn rust_impl_target(line: &str) -> Option<String> {
    let after = line.strip_prefix("impl ")?;
    let name = after
        .split('{')
        .next()?
        .split("for ")
        .last()?
        .split('<')
        .next()?
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

// ---------------------------------------------------------------------------
// Kotlin / Java
// ---------------------------------------------------------------------------

fn chunk_jvm(content: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();
    for (i, raw) in lines.iter().enumerate() {
        if let Some((name, node_type)) = jvm_item(raw.trim_start()) {
            chunks.push(make_chunk(&lines, i, name, node_type));
        }
    }
    chunks
}

fn jvm_item(line: &str) -> Option<(String, NodeType)> {
    if line.starts_with("fun ") && line.contains('(') {
        return Some((leading_identifier(line.strip_prefix("fun ")?)?, NodeType::Function));
    }
    if let Some(rest) = line.strip_prefix("enum class ") {
        return Some((leading_identifier(rest)?, NodeType::Enum));
    }
    for prefix in ["public enum ", "enum "] {
        if line.starts_with(prefix) && line.contains('{') {
            return Some((leading_identifier(&line[prefix.len()..])?, NodeType::Enum));
        }
    }
    for prefix in [
        "public final class ",
        "public abstract class ",
        "public class ",
        "abstract class ",
        "final class ",
        "open class ",
        "data class ",
        "sealed class ",
        "class ",
    ] {
        if line.starts_with(prefix) && line.contains('{') {
            return Some((leading_identifier(&line[prefix.len()..])?, NodeType::Struct));
        }
    }
    for prefix in ["public interface ", "interface "] {
        if line.starts_with(prefix) {
            return Some((leading_identifier(&line[prefix.len()..])?, NodeType::Trait));
        }
    }
    if let Some(rest) = line.strip_prefix("object ") {
        return Some((leading_identifier(rest)?, NodeType::Struct));
    }
    None
}

fn leading_identifier(rest: &str) -> Option<String> {
    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

fn chunk_markdown(content: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();
    let mut open_section: Option<(usize, String)> = None;

    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("# ") || line.starts_with("## ") {
            if let Some((start, heading)) = open_section.take() {
                chunks.push(markdown_section(&lines, start, i, heading));
            }
            open_section = Some((i, line.trim_start_matches('#').trim().to_string()));
        }
    }
    if let Some((start, heading)) = open_section {
        chunks.push(markdown_section(&lines, start, lines.len(), heading));
    }
    chunks
}

fn markdown_section(lines: &[&str], start: usize, end: usize, heading: String) -> Chunk {
    Chunk {
        name: heading.clone(),
        node_type: NodeType::Document,
        content: lines[start..end].join("\n"),
        start_line: start + 1,
        end_line: end,
        summary: heading,
    }
}

// ---------------------------------------------------------------------------
// TypeScript / JavaScript
// ---------------------------------------------------------------------------

fn chunk_typescript(content: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim_start();
        if !ts_function_start(line) && !ts_default_export(line) {
            continue;
        }
        let name = ts_name(line).unwrap_or_else(|| format!("anonymous_{i}"));
        let end = block_end(&lines, i);
        chunks.push(Chunk {
            name: name.clone(),
            node_type: NodeType::Function,
            content: lines[i..=end].join("\n"),
            start_line: i + 1,
            end_line: end + 1,
            summary: format!("TypeScript function: {name}"),
        });
    }
    chunks
}

fn ts_function_start(line: &str) -> bool {
    (line.starts_with("export function ")
        || line.starts_with("function ")
        || line.starts_with("export const ")
        || line.starts_with("const "))
        && (line.contains("=>") || line.contains('('))
}

fn ts_default_export(line: &str) -> bool {
    line.starts_with("export default function ") || line.starts_with("export default class ")
}

fn ts_name(line: &str) -> Option<String> {
    for keyword in ["function ", "const ", "class "] {
        if let Some(after) = line.split(keyword).nth(1) {
            let name = after
                .split('(')
                .next()?
                .split('=')
                .next()?
                .split(':')
                .next()?
                .split('<')
                .next()?
                .trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

fn chunk_whole_file(path: &Path, content: &str) -> Vec<Chunk> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    vec![Chunk {
        name: name.clone(),
        node_type: NodeType::File,
        content: content.to_string(),
        start_line: 1,
        end_line: content.lines().count().max(1),
        summary: format!("File: {name}"),
    }]
}

fn make_chunk(lines: &[&str], start: usize, name: String, node_type: NodeType) -> Chunk {
    let end = block_end(lines, start);
    let summary = chunk_summary(&name, node_type, lines[start]);
    Chunk {
        name,
        node_type,
        content: lines[start..=end].join("\n"),
        start_line: start + 1,
        end_line: end + 1,
        summary,
    }
}

/// Index of the line where brace depth returns to zero after the first `{`.
/// A block that never opens a brace spans exactly two lines.
fn block_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i32 = 0;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            if ch == '{' {
                depth += 1;
                opened = true;
            } else if ch == '}' {
                depth -= 1;
            }
        }
        if opened && depth <= 0 {
            return i;
        }
    }
    (start + 1).min(lines.len().saturating_sub(1))
}

fn chunk_summary(name: &str, node_type: NodeType, first_line: &str) -> String {
    let line = first_line.trim();
    if line.len() > 80 {
        format!("{}: {}", node_type.as_str(), name)
    } else {
        format!("{}: {}", node_type.as_str(), line)
    }
}
