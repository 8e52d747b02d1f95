//! Extension, filename and content heuristics

use super::types::{ApiEndpoint, ProjectType, SourceFile};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

const CONFIG_FILES: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "webpack.config.js",
    "vite.config.js",
    "vite.config.ts",
    "next.config.js",
    "Cargo.toml",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "Pipfile",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "composer.json",
    "Gemfile",
    "mix.exs",
    "Makefile",
    "CMakeLists.txt",
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".env.example",
];

const ENTRY_POINTS: &[&str] = &[
    "main.py", "main.rs", "main.go", "main.js", "main.ts", "index.js", "index.ts", "app.py",
    "server.js", "server.ts", "lib.rs", "manage.py",
];

/// Maps a file path to a language name by extension
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let name = file_name(path);
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;

    let language = match ext.as_str() {
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "py" => "Python",
        "rs" => "Rust",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "cpp" | "cc" | "cxx" | "hpp" => "C++",
        "c" | "h" => "C",
        "cs" => "C#",
        "php" => "PHP",
        "rb" => "Ruby",
        "swift" => "Swift",
        "ex" | "exs" => "Elixir",
        _ => return None,
    };
    Some(language)
}

pub fn is_config_file(path: &str) -> bool {
    CONFIG_FILES.contains(&file_name(path))
}

pub fn is_entry_point(path: &str) -> bool {
    ENTRY_POINTS.contains(&file_name(path))
}

pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn manifest_markers() -> &'static [(&'static str, &'static str, &'static str)] {
    &[
        ("package.json", "\"express\"", "Express.js"),
        ("package.json", "\"next\"", "Next.js"),
        ("package.json", "\"react\"", "React"),
        ("package.json", "\"fastify\"", "Fastify"),
        ("package.json", "\"@nestjs/core\"", "NestJS"),
        ("package.json", "\"vue\"", "Vue"),
        ("requirements.txt", "fastapi", "FastAPI"),
        ("requirements.txt", "django", "Django"),
        ("requirements.txt", "flask", "Flask"),
        ("pyproject.toml", "fastapi", "FastAPI"),
        ("pyproject.toml", "django", "Django"),
        ("pyproject.toml", "flask", "Flask"),
        ("Cargo.toml", "axum", "Axum"),
        ("Cargo.toml", "actix-web", "Actix Web"),
        ("Cargo.toml", "rocket", "Rocket"),
        ("go.mod", "gin-gonic/gin", "Gin"),
        ("go.mod", "labstack/echo", "Echo"),
        ("Gemfile", "rails", "Rails"),
    ]
}

fn import_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r#"require\(\s*['"]express['"]\s*\)|from\s+['"]express['"]"#, "Express.js"),
            (r"(?m)^\s*(?:from\s+fastapi\s+import|import\s+fastapi)", "FastAPI"),
            (r"(?m)^\s*(?:from\s+django[\s.]|import\s+django)", "Django"),
            (r"(?m)^\s*(?:from\s+flask\s+import|import\s+flask)", "Flask"),
            (r#"from\s+['"]next/"#, "Next.js"),
            (r#"from\s+['"]react['"]|require\(\s*['"]react['"]\s*\)"#, "React"),
        ]
        .into_iter()
        .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|re| (re, name)))
        .collect()
    })
}

/// Frameworks named in a manifest's dependency list
pub fn frameworks_from_manifest(path: &str, content: &str) -> BTreeSet<String> {
    let name = file_name(path);
    let lower = content.to_lowercase();
    manifest_markers()
        .iter()
        .filter(|(manifest, marker, _)| *manifest == name && lower.contains(marker))
        .map(|(_, _, framework)| framework.to_string())
        .collect()
}

/// Framework imported by a source file, if any
pub fn framework_from_content(content: &str) -> Option<&'static str> {
    import_patterns()
        .iter()
        .find(|(re, _)| re.is_match(content))
        .map(|(_, name)| *name)
}

fn js_route_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:app|router|server)\.(get|post|put|delete|patch)\s*\(\s*['"`]([^'"`]+)['"`]"#).ok()
    })
    .as_ref()
}

fn py_decorator_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)@(?:app|router|bp|blueprint)\.(get|post|put|delete|patch|route)\s*\(\s*['"]([^'"]+)['"]"#).ok()
    })
    .as_ref()
}

fn django_path_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\b(?:re_)?path\s*\(\s*r?['"]([^'"]*)['"]"#).ok())
        .as_ref()
}

/// Extracts HTTP routes from JavaScript/TypeScript and Python sources
pub fn extract_api_endpoints(path: &str, content: &str) -> Vec<ApiEndpoint> {
    let mut endpoints = Vec::new();
    let language = language_for_path(path);

    match language {
        Some("JavaScript") | Some("TypeScript") => {
            let framework = framework_from_content(content).unwrap_or("Express.js");
            if let Some(re) = js_route_pattern() {
                for caps in re.captures_iter(content) {
                    endpoints.push(ApiEndpoint {
                        method: caps[1].to_uppercase(),
                        path: caps[2].to_string(),
                        file: path.to_string(),
                        framework: framework.to_string(),
                    });
                }
            }
        }
        Some("Python") => {
            let framework = framework_from_content(content);
            if let Some(re) = py_decorator_pattern() {
                for caps in re.captures_iter(content) {
                    let method = caps[1].to_uppercase();
                    endpoints.push(ApiEndpoint {
                        method: if method == "ROUTE" { "ANY".to_string() } else { method },
                        path: caps[2].to_string(),
                        file: path.to_string(),
                        framework: framework.unwrap_or("FastAPI").to_string(),
                    });
                }
            }
            if framework == Some("Django") || file_name(path) == "urls.py" {
                if let Some(re) = django_path_pattern() {
                    for caps in re.captures_iter(content) {
                        endpoints.push(ApiEndpoint {
                            method: "ANY".to_string(),
                            path: format!("/{}", caps[1].trim_start_matches('/')),
                            file: path.to_string(),
                            framework: "Django".to_string(),
                        });
                    }
                }
            }
        }
        _ => {}
    }

    endpoints
}

/// Scores content indicators and returns the dominant project type
pub(crate) fn classify_project(files: &[SourceFile]) -> ProjectType {
    const ORDER: [ProjectType; 9] = [
        ProjectType::WebFrontend,
        ProjectType::WebBackend,
        ProjectType::Fullstack,
        ProjectType::Mobile,
        ProjectType::Desktop,
        ProjectType::Cli,
        ProjectType::Library,
        ProjectType::Microservice,
        ProjectType::DataScience,
    ];
    let mut scores = [0u32; 9];
    let idx = |t: ProjectType| ORDER.iter().position(|o| *o == t).unwrap_or(0);

    for file in files {
        let Some(content) = file.content.as_deref() else {
            continue;
        };
        let content = content.to_lowercase();
        let path = file.path.to_lowercase();
        let any = |terms: &[&str]| terms.iter().any(|t| content.contains(t));

        if any(&["react", "vue", "angular", "document."]) {
            scores[idx(ProjectType::WebFrontend)] += 2;
        }
        if any(&["express", "fastapi", "django", "flask", "gin-gonic", "labstack/echo", "axum", "actix"]) {
            scores[idx(ProjectType::WebBackend)] += 2;
        }
        if any(&["react-native", "flutter", "androidmanifest", "uikit"]) {
            scores[idx(ProjectType::Mobile)] += 3;
        }
        if any(&["electron", "tauri", "tkinter"]) {
            scores[idx(ProjectType::Desktop)] += 2;
        }
        if any(&["argparse", "cobra", "clap", "commander"]) {
            scores[idx(ProjectType::Cli)] += 2;
        }
        if path.contains("lib") || any(&["module.exports", "export "]) {
            scores[idx(ProjectType::Library)] += 1;
        }
        if path.starts_with("docker-compose") || any(&["grpc"]) {
            scores[idx(ProjectType::Microservice)] += 2;
        }
        if any(&["pandas", "numpy", "scikit", "tensorflow", "torch"]) {
            scores[idx(ProjectType::DataScience)] += 3;
        }
    }

    let frontend = scores[idx(ProjectType::WebFrontend)];
    let backend = scores[idx(ProjectType::WebBackend)];
    if frontend > 0 && backend > 0 {
        scores[idx(ProjectType::Fullstack)] = frontend + backend;
    }

    let mut best = ProjectType::Unknown;
    let mut best_score = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > best_score {
            best_score = *score;
            best = ORDER[i];
        }
    }
    best
}
