//! Importance scoring for pattern-based file selection

use super::detect::{file_name, is_config_file, is_entry_point, language_for_path};
use super::types::{FileKind, ImportantFile, SourceFile};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Files above this size are skipped entirely
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;

const LARGE_FILE_BYTES: u64 = 10_000;
const TINY_FILE_BYTES: u64 = 50;
/// Content bonuses only look at this many leading chars
const HEAD_WINDOW: usize = 1000;

const API_MARKERS: &[&str] = &["api/", "routes", "controllers", "endpoints", "handlers", "views.py"];
const MODEL_MARKERS: &[&str] = &["model", "schema", "entities", "entity"];

fn import_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:import\s|from\s+\S+\s+import|export\s|use\s|#include|package\s)|require\(").ok()
    })
    .as_ref()
}

fn definition_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:pub\s+)?(?:async\s+)?(?:function|def|class|fn|func|struct|interface|impl)\s").ok()
    })
    .as_ref()
}

/// True when the first 512 bytes contain a NUL
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(512).any(|b| *b == 0)
}

pub fn classify(path: &str) -> FileKind {
    let lower = path.to_lowercase();
    let name = file_name(&lower);

    if is_config_file(path) {
        FileKind::Config
    } else if is_test_path(&lower) {
        FileKind::Test
    } else if name.starts_with("readme")
        || name.ends_with(".md")
        || name.ends_with(".rst")
        || lower.starts_with("docs/")
    {
        FileKind::Docs
    } else if API_MARKERS.iter().any(|m| lower.contains(m)) {
        FileKind::Api
    } else if MODEL_MARKERS.iter().any(|m| lower.contains(m)) {
        FileKind::Model
    } else {
        FileKind::Source
    }
}

fn is_test_path(lower: &str) -> bool {
    let name = file_name(lower);
    lower.starts_with("test/")
        || lower.starts_with("tests/")
        || lower.contains("/test/")
        || lower.contains("/tests/")
        || lower.contains("__tests__")
        || name.starts_with("test_")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name.ends_with("_test.go")
        || name.ends_with("_test.py")
}

/// Heuristic importance of a single file; 0 means "never select"
pub fn score_file(path: &str, size: u64, content: &str) -> f32 {
    let lower = path.to_lowercase();
    let mut score = 0.0f32;

    if is_config_file(path) {
        score += 10.0;
    }
    if is_entry_point(path) {
        score += 8.0;
    }
    if API_MARKERS.iter().any(|m| lower.contains(m)) {
        score += 7.0;
    }
    if MODEL_MARKERS.iter().any(|m| lower.contains(m)) {
        score += 6.0;
    }
    if file_name(&lower).starts_with("readme") {
        score += 5.0;
    }
    if is_test_path(&lower) {
        score += 2.0;
    }
    if score == 0.0 && language_for_path(path).is_some() {
        score = 1.0;
    }
    if score == 0.0 {
        return 0.0;
    }

    if size > LARGE_FILE_BYTES {
        score *= 0.5;
    } else if size < TINY_FILE_BYTES {
        score *= 0.3;
    }

    let head = head_chars(content, HEAD_WINDOW);
    if import_re().is_some_and(|re| re.is_match(head)) {
        score += 2.0;
    }
    if definition_re().is_some_and(|re| re.is_match(head)) {
        score += 1.5;
    }

    score
}

fn head_chars(content: &str, limit: usize) -> &str {
    match content.char_indices().nth(limit) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Ranks text files and keeps at most `max_files`, highest score first
pub(crate) fn select_by_pattern(files: &[SourceFile], max_files: usize) -> Vec<ImportantFile> {
    if max_files == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<ImportantFile> = files
        .iter()
        .filter(|f| f.size <= MAX_FILE_BYTES)
        .filter_map(|f| {
            let content = f.content.as_ref()?;
            let score = score_file(&f.path, f.size, content);
            (score > 0.0).then(|| to_important(&f.path, content.clone(), score))
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    ranked.truncate(max_files);
    ranked
}

pub(crate) fn to_important(path: &str, content: String, score: f32) -> ImportantFile {
    ImportantFile {
        path: path.to_string(),
        content,
        file_type: classify(path),
        language: language_for_path(path).map(str::to_string),
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn text(path: &str, content: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            size: content.len() as u64,
            content: Some(content.to_string()),
        }
    }

    #[parameterized(
        manifest = { "package.json", FileKind::Config },
        nested_manifest = { "api/go.mod", FileKind::Config },
        jest = { "src/app.test.js", FileKind::Test },
        pytest = { "tests/test_views.py", FileKind::Test },
        readme = { "README.md", FileKind::Docs },
        routes = { "src/routes/users.js", FileKind::Api },
        model = { "app/models/user.py", FileKind::Model },
        plain = { "src/util.rs", FileKind::Source },
    )]
    fn test_classify(path: &str, expected: FileKind) {
        assert_eq!(classify(path), expected);
    }

    #[test]
    fn test_config_outranks_plain_source() {
        let body = "x".repeat(200);
        assert!(score_file("package.json", 200, &body) > score_file("src/util.js", 200, &body));
    }

    #[test]
    fn test_tiny_file_penalty() {
        let small = score_file("package.json", 2, "{}");
        let normal = score_file("package.json", 200, &" ".repeat(200));
        assert!((small - 3.0).abs() < 1e-4);
        assert!((normal - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_large_file_penalty() {
        let body = " ".repeat(20_000);
        assert!((score_file("main.py", 20_000, &body) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_content_bonuses() {
        let content = format!("import os\n\ndef run():\n    pass\n{}", " ".repeat(100));
        let score = score_file("tool.py", content.len() as u64, &content);
        // 1 (source) + 2 (imports) + 1.5 (definitions)
        assert!((score - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_content_bonuses_only_read_the_head() {
        let content = format!("{}\ndef late():\n    pass\n", "#".repeat(1200));
        let score = score_file("tool.py", content.len() as u64, &content);
        assert!((score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_unknown_files_score_zero() {
        assert_eq!(score_file("assets/logo.svg", 300, "<svg/>"), 0.0);
    }

    #[test]
    fn test_select_respects_max_files_and_order() {
        let files = vec![
            text("src/b.js", "console.log('b')"),
            text("package.json", "{\"name\": \"demo\"}"),
            text("src/a.js", "console.log('a')"),
            text("notes.txt", "nothing"),
        ];

        let selected = select_by_pattern(&files, 2);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].path, "package.json");
        // equal scores fall back to path order
        assert_eq!(selected[1].path, "src/a.js");
    }

    #[test]
    fn test_select_zero_max_files() {
        let files = vec![text("package.json", "{}")];
        assert!(select_by_pattern(&files, 0).is_empty());
    }

    #[test]
    fn test_select_skips_binary_and_oversized() {
        let files = vec![
            SourceFile {
                path: "main.go".to_string(),
                size: 10,
                content: None,
            },
            SourceFile {
                path: "server.js".to_string(),
                size: MAX_FILE_BYTES + 1,
                content: Some("x".to_string()),
            },
        ];
        assert!(select_by_pattern(&files, 5).is_empty());
    }

    #[test]
    fn test_looks_binary() {
        assert!(looks_binary(b"\x89PNG\x00\x00"));
        assert!(!looks_binary(b"fn main() {}"));
    }
}
