use super::prompt::{
    docs_prompt, dockerfile_prompt, rank_prompt, repository_context, server_prompt, tools_prompt,
    DOCKERFILE_SYSTEM, DOCS_SYSTEM, RANK_SYSTEM, SERVER_SYSTEM, TOOLS_SYSTEM,
};
use super::recipe::{recipe_for, RecipeKind};
use super::response::{
    parse_documentation, parse_dockerfile, parse_ranked_paths, parse_server_files, parse_tools,
};
use super::server::template_server_files;
use super::{CodeIntelligence, GeneratedArtifacts, GenerationRequest, IntelligenceError, RankRequest};
use crate::llm::{ChatMessage, LLMClient, LLMRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Code intelligence backed by a chat model
pub struct LlmIntelligence {
    client: Arc<dyn LLMClient>,
    max_tokens: u32,
}

impl LlmIntelligence {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            max_tokens: 4096,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn ask(
        &self,
        system: &str,
        prompt: String,
        temperature: f32,
    ) -> Result<String, IntelligenceError> {
        let request = LLMRequest::new(vec![ChatMessage::system(system), ChatMessage::user(prompt)])
            .with_temperature(temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.client.chat(request).await?;
        debug!(
            backend = self.client.name(),
            chars = response.content.len(),
            elapsed_ms = response.response_time.as_millis() as u64,
            "Model responded"
        );
        Ok(response.content)
    }
}

#[async_trait]
impl CodeIntelligence for LlmIntelligence {
    async fn rank_files(&self, request: &RankRequest) -> Result<Vec<String>, IntelligenceError> {
        let raw = self.ask(RANK_SYSTEM, rank_prompt(request), 0.1).await?;
        parse_ranked_paths(&raw)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifacts, IntelligenceError> {
        let context = repository_context(request);

        let raw_tools = self.ask(TOOLS_SYSTEM, tools_prompt(&context), 0.4).await?;
        let tools = parse_tools(&raw_tools)?;

        let raw_docs = self
            .ask(
                DOCS_SYSTEM,
                docs_prompt(&context, &tools, request.display_name()),
                0.4,
            )
            .await?;
        let documentation = parse_documentation(&raw_docs)?;

        let port = request
            .port
            .unwrap_or_else(|| RecipeKind::detect(&request.analysis).default_port());
        let template = recipe_for(&request.analysis, Some(port));
        let raw_recipe = self
            .ask(DOCKERFILE_SYSTEM, dockerfile_prompt(&context, &template, port), 0.2)
            .await?;
        let build_recipe = parse_dockerfile(&raw_recipe)?;

        // the template server serves any tool list, so a bad answer here is not fatal
        let server_files = match self
            .ask(SERVER_SYSTEM, server_prompt(&tools, request.display_name()), 0.3)
            .await
            .and_then(|raw| parse_server_files(&raw))
        {
            Ok(files) => files,
            Err(e) => {
                warn!(repo_id = %request.repo_id, error = %e, "Using template MCP server files");
                template_server_files(request, &tools)
            }
        };

        info!(
            repo_id = %request.repo_id,
            tools = tools.len(),
            docs_chars = documentation.len(),
            server_files = server_files.len(),
            "Generation complete"
        );

        Ok(GeneratedArtifacts {
            tools,
            documentation,
            build_recipe,
            server_files,
        })
    }

    fn name(&self) -> &str {
        self.client.name()
    }

    fn model_info(&self) -> Option<String> {
        self.client.model_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisResult;
    use crate::llm::{BackendError, MockLLMClient, MockResponse};

    const TOOLS: &str = r#"```json
[{"name": "list-users", "title": "List Users", "description": "GET /users", "input_schema": {"type": "object"}}]
```"#;

    fn setup() -> (Arc<MockLLMClient>, LlmIntelligence) {
        let mock = Arc::new(MockLLMClient::new());
        let intelligence = LlmIntelligence::new(mock.clone());
        (mock, intelligence)
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            repo_id: "r1".to_string(),
            tree_structure: "r1/".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_generate_runs_four_prompts() {
        let (mock, intelligence) = setup();
        mock.add_responses(vec![
            MockResponse::text(TOOLS),
            MockResponse::text("# r1 - Developer Guide\n"),
            MockResponse::text("```Dockerfile\nFROM alpine\nEXPOSE 8080\n```"),
            MockResponse::text(r#"{"package.json": "{\"name\": \"mcp-server-r1\"}", "server.ts": "// list-users"}"#),
        ]);

        let artifacts = intelligence.generate(&request()).await.unwrap();
        assert_eq!(artifacts.tools[0].name, "list-users");
        assert_eq!(artifacts.documentation, "# r1 - Developer Guide");
        assert_eq!(artifacts.build_recipe, "FROM alpine\nEXPOSE 8080\n");
        assert_eq!(artifacts.server_files["server.ts"], "// list-users");

        let requests = mock.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[2].user_text().contains("EXPOSE 8080"));
        assert!(requests[3].user_text().contains("list-users"));
    }

    #[tokio::test]
    async fn test_malformed_server_files_fall_back_to_template() {
        let (mock, intelligence) = setup();
        mock.add_responses(vec![
            MockResponse::text(TOOLS),
            MockResponse::text("docs"),
            MockResponse::text("FROM alpine\n"),
            MockResponse::text("here is your server: server.ts"),
        ]);

        let artifacts = intelligence.generate(&request()).await.unwrap();
        assert!(artifacts.server_files.contains_key("package.json"));
        assert!(artifacts.server_files["README.md"].contains("list-users"));
    }

    #[tokio::test]
    async fn test_generate_fails_on_malformed_tools() {
        let (mock, intelligence) = setup();
        mock.add_response(MockResponse::text("I cannot help with that"));

        let result = intelligence.generate(&request()).await;
        assert!(matches!(result, Err(IntelligenceError::InvalidResponse(_))));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_fails_on_recipe_without_from() {
        let (mock, intelligence) = setup();
        mock.add_responses(vec![
            MockResponse::text(TOOLS),
            MockResponse::text("docs"),
            MockResponse::text("RUN make"),
        ]);

        assert!(intelligence.generate(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_rank_files_propagates_backend_error() {
        let (mock, intelligence) = setup();
        mock.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 60 }));

        let result = intelligence
            .rank_files(&RankRequest {
                tree_structure: String::new(),
                analysis: AnalysisResult::default(),
                max_files: 5,
            })
            .await;
        assert!(matches!(result, Err(IntelligenceError::Backend(_))));
    }

    #[tokio::test]
    async fn test_rank_files_parses_paths() {
        let (mock, intelligence) = setup();
        mock.add_response(MockResponse::text(r#"{"files": ["package.json"]}"#));

        let paths = intelligence
            .rank_files(&RankRequest {
                tree_structure: "demo/".to_string(),
                analysis: AnalysisResult::default(),
                max_files: 5,
            })
            .await
            .unwrap();
        assert_eq!(paths, vec!["package.json"]);
        assert_eq!(intelligence.name(), "MockLLM");
    }
}
