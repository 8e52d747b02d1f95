//! The MCP server file set that serves a repository's generated tools
//!
//! Files are keyed by path relative to [`SERVER_DIR`]. The deployed server reads
//! `mcp-tools.json` and `DOCUMENTATION.md` from the build-context root at startup,
//! so the same file set works for any tool list.

use super::{GenerationRequest, ToolDescriptor};
use serde_json::json;
use std::collections::BTreeMap;

/// Directory in the build context that holds the server files
pub const SERVER_DIR: &str = "mcp-server";

const SERVER_TS: &str = r#"import { existsSync, readFileSync } from "node:fs";
import { join } from "node:path";
import { Server } from "@modelcontextprotocol/sdk/server/index.js";
import { StdioServerTransport } from "@modelcontextprotocol/sdk/server/stdio.js";
import {
  CallToolRequestSchema,
  ListResourcesRequestSchema,
  ListToolsRequestSchema,
  ReadResourceRequestSchema,
} from "@modelcontextprotocol/sdk/types.js";

interface ToolDescriptor {
  name: string;
  title: string;
  description: string;
  inputSchema: Record<string, unknown>;
  category?: string;
}

const root = process.env.MCP_TOOLS_ROOT ?? join(__dirname, "..", "..");
const tools: ToolDescriptor[] = JSON.parse(readFileSync(join(root, "mcp-tools.json"), "utf8"));
const docsPath = join(root, "DOCUMENTATION.md");

const server = new Server(
  { name: "__NAME__", version: "1.0.0" },
  { capabilities: { tools: {}, resources: {} } }
);

server.setRequestHandler(ListToolsRequestSchema, async () => ({
  tools: tools.map((tool) => ({
    name: tool.name,
    description: tool.description,
    inputSchema: tool.inputSchema,
  })),
}));

server.setRequestHandler(CallToolRequestSchema, async (request) => {
  const tool = tools.find((t) => t.name === request.params.name);
  if (!tool) {
    return {
      isError: true,
      content: [{ type: "text", text: `Unknown tool: ${request.params.name}` }],
    };
  }
  console.error(`[${new Date().toISOString()}] call ${tool.name}`);
  return {
    content: [
      {
        type: "text",
        text: JSON.stringify({ tool: tool.name, category: tool.category, arguments: request.params.arguments ?? {} }, null, 2),
      },
    ],
  };
});

server.setRequestHandler(ListResourcesRequestSchema, async () => ({
  resources: existsSync(docsPath)
    ? [{ uri: "docs://developer-guide", name: "Developer Guide", mimeType: "text/markdown" }]
    : [],
}));

server.setRequestHandler(ReadResourceRequestSchema, async (request) => {
  if (request.params.uri !== "docs://developer-guide" || !existsSync(docsPath)) {
    throw new Error(`Unknown resource: ${request.params.uri}`);
  }
  return {
    contents: [{ uri: request.params.uri, mimeType: "text/markdown", text: readFileSync(docsPath, "utf8") }],
  };
});

async function main(): Promise<void> {
  await server.connect(new StdioServerTransport());
  console.error(`__NAME__ MCP server ready with ${tools.length} tools`);
}

main().catch((error) => {
  console.error(error);
  process.exit(1);
});
"#;

/// npm package name derived from a display name
fn package_slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug.to_string()
    }
}

/// Deterministic server file set for `tools`
pub(crate) fn template_server_files(
    request: &GenerationRequest,
    tools: &[ToolDescriptor],
) -> BTreeMap<String, String> {
    let name = package_slug(request.display_name());
    let mut files = BTreeMap::new();

    let package = json!({
        "name": format!("mcp-server-{}", name),
        "version": "1.0.0",
        "private": true,
        "main": "dist/server.js",
        "scripts": {
            "build": "tsc",
            "start": "node dist/server.js"
        },
        "dependencies": {
            "@modelcontextprotocol/sdk": "^1.0.0"
        },
        "devDependencies": {
            "@types/node": "^20.0.0",
            "typescript": "^5.4.0"
        }
    });
    files.insert(
        "package.json".to_string(),
        format!("{}\n", serde_json::to_string_pretty(&package).unwrap_or_default()),
    );

    let tsconfig = json!({
        "compilerOptions": {
            "target": "ES2022",
            "module": "commonjs",
            "outDir": "dist",
            "rootDir": ".",
            "strict": true,
            "esModuleInterop": true,
            "skipLibCheck": true
        },
        "include": ["server.ts"]
    });
    files.insert(
        "tsconfig.json".to_string(),
        format!("{}\n", serde_json::to_string_pretty(&tsconfig).unwrap_or_default()),
    );

    files.insert("server.ts".to_string(), SERVER_TS.replace("__NAME__", &name));

    let mut readme = format!(
        "# {} MCP Server\n\nServes {} generated tools over stdio.\n\n```bash\nnpm install\nnpm run build\nnpm start\n```\n\n## Tools\n\n",
        request.display_name(),
        tools.len()
    );
    for tool in tools {
        readme.push_str(&format!("- `{}`: {}\n", tool.name, tool.description));
    }
    files.insert("README.md".to_string(), readme);

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            title: name.to_string(),
            description: format!("{} tool", name),
            input_schema: json!({"type": "object"}),
            category: "development".to_string(),
            example_input: Value::Null,
        }
    }

    #[test]
    fn test_template_file_set() {
        let request = GenerationRequest {
            repo_id: "r1".to_string(),
            project_name: Some("Shop API".to_string()),
            ..Default::default()
        };
        let files = template_server_files(&request, &[tool("list-orders"), tool("run-npm-commands")]);

        let names: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["README.md", "package.json", "server.ts", "tsconfig.json"]);

        let package: Value = serde_json::from_str(&files["package.json"]).unwrap();
        assert_eq!(package["name"], "mcp-server-shop-api");
        assert!(package["dependencies"]["@modelcontextprotocol/sdk"].is_string());

        assert!(files["server.ts"].contains("name: \"shop-api\""));
        assert!(!files["server.ts"].contains("__NAME__"));
        assert!(files["README.md"].contains("- `list-orders`: list-orders tool"));
    }

    #[test]
    fn test_package_slug() {
        assert_eq!(package_slug("My_Repo v2"), "my-repo-v2");
        assert_eq!(package_slug("__"), "project");
    }
}
