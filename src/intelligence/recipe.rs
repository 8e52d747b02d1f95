//! Dockerfile templates keyed on the detected stack

use crate::analyzer::AnalysisResult;

/// Ecosystem a template targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeKind {
    Node,
    Rust,
    Python,
    Go,
    Generic,
}

impl RecipeKind {
    pub fn detect(analysis: &AnalysisResult) -> Self {
        let js = analysis.has_language("JavaScript") || analysis.has_language("TypeScript");
        if analysis.has_config("package.json") && js {
            RecipeKind::Node
        } else if analysis.has_config("Cargo.toml") && analysis.has_language("Rust") {
            RecipeKind::Rust
        } else if (analysis.has_config("requirements.txt")
            || analysis.has_config("pyproject.toml")
            || analysis.has_config("setup.py"))
            && analysis.has_language("Python")
        {
            RecipeKind::Python
        } else if analysis.has_config("go.mod") && analysis.has_language("Go") {
            RecipeKind::Go
        } else {
            RecipeKind::Generic
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            RecipeKind::Node => 3000,
            RecipeKind::Python => 8000,
            RecipeKind::Rust | RecipeKind::Go | RecipeKind::Generic => 8080,
        }
    }
}

fn python_command(analysis: &AnalysisResult, port: u16) -> String {
    if analysis.frameworks.contains("FastAPI") {
        format!(
            "[\"uvicorn\", \"main:app\", \"--host\", \"0.0.0.0\", \"--port\", \"{}\"]",
            port
        )
    } else if analysis.frameworks.contains("Django") {
        format!("[\"python\", \"manage.py\", \"runserver\", \"0.0.0.0:{}\"]", port)
    } else {
        "[\"python\", \"-m\", \"app\"]".to_string()
    }
}

/// Renders a build recipe for `analysis`; `port` overrides the template default
pub fn recipe_for(analysis: &AnalysisResult, port: Option<u16>) -> String {
    let kind = RecipeKind::detect(analysis);
    let port = port.unwrap_or_else(|| kind.default_port());

    match kind {
        RecipeKind::Node => format!(
            "FROM node:18-alpine\n\
             WORKDIR /app\n\
             COPY package*.json ./\n\
             RUN npm ci --omit=dev\n\
             COPY . .\n\
             ENV PORT={port}\n\
             EXPOSE {port}\n\
             CMD [\"npm\", \"start\"]\n"
        ),
        RecipeKind::Rust => format!(
            "FROM rust:1.75 AS builder\n\
             WORKDIR /usr/src/app\n\
             COPY . .\n\
             RUN cargo build --release\n\
             RUN find target/release -maxdepth 1 -type f -perm -111 -exec cp {{}} /usr/local/bin/app \\; -quit\n\
             \n\
             FROM debian:bookworm-slim\n\
             RUN apt-get update && apt-get install -y ca-certificates && rm -rf /var/lib/apt/lists/*\n\
             COPY --from=builder /usr/local/bin/app /usr/local/bin/app\n\
             ENV PORT={port}\n\
             EXPOSE {port}\n\
             CMD [\"/usr/local/bin/app\"]\n"
        ),
        RecipeKind::Python => format!(
            "FROM python:3.11-slim\n\
             WORKDIR /app\n\
             COPY requirements.txt* pyproject.toml* ./\n\
             RUN pip install --no-cache-dir -r requirements.txt || pip install --no-cache-dir . || echo \"No requirements found\"\n\
             COPY . .\n\
             ENV PORT={port}\n\
             EXPOSE {port}\n\
             CMD {cmd}\n",
            cmd = python_command(analysis, port)
        ),
        RecipeKind::Go => format!(
            "FROM golang:1.22-alpine AS builder\n\
             WORKDIR /src\n\
             COPY go.* ./\n\
             RUN go mod download\n\
             COPY . .\n\
             RUN CGO_ENABLED=0 go build -o /out/app .\n\
             \n\
             FROM alpine:3.19\n\
             COPY --from=builder /out/app /usr/local/bin/app\n\
             ENV PORT={port}\n\
             EXPOSE {port}\n\
             CMD [\"/usr/local/bin/app\"]\n"
        ),
        RecipeKind::Generic => format!(
            "FROM alpine:latest\n\
             WORKDIR /app\n\
             COPY . .\n\
             EXPOSE {port}\n\
             CMD [\"echo\", \"Generated from repository analysis - configure as needed\"]\n"
        ),
    }
}

/// Port from the first `EXPOSE` instruction, if any
pub fn exposed_port(recipe: &str) -> Option<u16> {
    recipe.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if !parts.next()?.eq_ignore_ascii_case("EXPOSE") {
            return None;
        }
        parts
            .next()?
            .split('/')
            .next()
            .and_then(|p| p.parse().ok())
    })
}

/// True when `recipe` has at least one `FROM` instruction
pub fn has_from_instruction(recipe: &str) -> bool {
    recipe.lines().any(|line| {
        line.split_whitespace()
            .next()
            .is_some_and(|word| word.eq_ignore_ascii_case("FROM"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(languages: &[&str], configs: &[&str]) -> AnalysisResult {
        AnalysisResult {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            config_files: configs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_node_recipe() {
        let recipe = recipe_for(&analysis(&["JavaScript"], &["package.json"]), None);
        assert!(recipe.starts_with("FROM node:18-alpine"));
        assert_eq!(exposed_port(&recipe), Some(3000));
    }

    #[test]
    fn test_rust_recipe_is_multi_stage() {
        let recipe = recipe_for(&analysis(&["Rust"], &["Cargo.toml"]), None);
        assert_eq!(recipe.matches("FROM ").count(), 2);
        assert!(recipe.contains("debian:bookworm-slim"));
        assert!(recipe.contains("-exec cp {} /usr/local/bin/app"));
    }

    #[test]
    fn test_python_recipe_uses_framework_command() {
        let mut a = analysis(&["Python"], &["requirements.txt"]);
        a.frameworks.insert("FastAPI".to_string());
        let recipe = recipe_for(&a, None);
        assert!(recipe.contains("python:3.11-slim"));
        assert!(recipe.contains("uvicorn"));
        assert_eq!(exposed_port(&recipe), Some(8000));
    }

    #[test]
    fn test_go_recipe() {
        let recipe = recipe_for(&analysis(&["Go"], &["go.mod"]), None);
        assert!(recipe.contains("golang:1.22-alpine"));
        assert_eq!(exposed_port(&recipe), Some(8080));
    }

    #[test]
    fn test_manifest_without_language_is_generic() {
        let recipe = recipe_for(&analysis(&[], &["package.json"]), None);
        assert!(recipe.starts_with("FROM alpine:latest"));
    }

    #[test]
    fn test_explicit_port_override() {
        let recipe = recipe_for(&analysis(&["JavaScript"], &["package.json"]), Some(4500));
        assert_eq!(exposed_port(&recipe), Some(4500));
        assert!(recipe.contains("ENV PORT=4500"));
    }

    #[test]
    fn test_exposed_port_parsing() {
        assert_eq!(exposed_port("FROM x\nexpose 9000/tcp\n"), Some(9000));
        assert_eq!(exposed_port("FROM x\nCMD run"), None);
    }

    #[test]
    fn test_has_from_instruction() {
        assert!(has_from_instruction("# base\nfrom alpine\n"));
        assert!(!has_from_instruction("RUN echo FROM\n"));
    }
}
