use std::collections::BTreeSet;

/// Upper bound on rendered lines; the tree is advisory only
pub const TREE_LINE_LIMIT: usize = 500;

/// Renders repository-relative file paths as an indented tree
pub fn render_tree(root_name: &str, paths: &[String]) -> String {
    let mut sorted: Vec<&str> = paths.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut lines = vec![format!("{}/", root_name)];
    let mut seen_dirs: BTreeSet<String> = BTreeSet::new();

    for path in sorted {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let Some((file, dirs)) = parts.split_last() else {
            continue;
        };

        for depth in 0..dirs.len() {
            let dir_key = dirs[..=depth].join("/");
            if seen_dirs.insert(dir_key) {
                lines.push(format!("{}├── {}/", "  ".repeat(depth), dirs[depth]));
            }
        }
        lines.push(format!("{}├── {}", "  ".repeat(dirs.len()), file));

        if lines.len() > TREE_LINE_LIMIT {
            lines.push(format!("... (truncated at {} entries)", TREE_LINE_LIMIT));
            break;
        }
    }

    lines.join("\n")
}
