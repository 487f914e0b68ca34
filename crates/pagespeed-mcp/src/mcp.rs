use pagespeed_core::{strategy_or_default, AnalysisResult, Coordinator};
use rmcp::{
    handler::server::router::tool::ToolRouter as RmcpToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    service::RequestContext,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, RoleServer, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize, JsonSchema, Default)]
struct AnalyzePageArgs {
    /// The URL to analyze (required).
    #[serde(default)]
    url: Option<String>,
    /// Analysis strategy: mobile, desktop, or both. Defaults to both.
    #[serde(default)]
    strategy: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
struct AnalyzePagesArgs {
    /// URLs to analyze.
    #[serde(default)]
    urls: Vec<String>,
    /// Analysis strategy: mobile, desktop, or both. Defaults to both.
    #[serde(default)]
    strategy: Option<String>,
}

fn tool_result(results: &[AnalysisResult]) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string(results)
        .map_err(|e| McpError::internal_error(format!("serializing results: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[derive(Clone)]
pub(crate) struct PageSpeedMcp {
    tool_router: RmcpToolRouter<Self>,
    coordinator: Coordinator,
}

#[tool_router]
impl PageSpeedMcp {
    pub(crate) fn new(coordinator: Coordinator) -> Self {
        Self {
            tool_router: Self::tool_router(),
            coordinator,
        }
    }

    async fn analyze(
        &self,
        tool: &str,
        urls: Vec<String>,
        strategy: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<CallToolResult, McpError> {
        let strategy = strategy_or_default(strategy.as_deref());
        tracing::info!(tool, urls = urls.len(), %strategy, "tool call");
        let results = self.coordinator.run(&urls, &strategy, cancel).await;
        tool_result(&results)
    }

    #[tool(
        description = "Analyze a single URL using Google PageSpeed Insights. Returns Core Web Vitals (FCP, LCP, CLS, TBT, TTFB, Speed Index), category scores (performance, SEO, accessibility, best-practices), and actionable audit findings."
    )]
    async fn analyze_page(
        &self,
        params: Parameters<Option<AnalyzePageArgs>>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0.unwrap_or_default();
        let url = args.url.unwrap_or_default();
        if url.trim().is_empty() {
            return Err(McpError::invalid_params("url must be non-empty", None));
        }
        self.analyze("analyze_page", vec![url], args.strategy, &context.ct)
            .await
    }

    #[tool(
        description = "Analyze multiple URLs using Google PageSpeed Insights in a single call. Returns an array of results, one per URL and strategy."
    )]
    async fn analyze_pages(
        &self,
        params: Parameters<Option<AnalyzePagesArgs>>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0.unwrap_or_default();
        self.analyze("analyze_pages", args.urls, args.strategy, &context.ct)
            .await
    }
}

#[tool_handler]
impl rmcp::ServerHandler for PageSpeedMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Google PageSpeed Insights analysis. Each tool returns a JSON array of results (one per url and strategy); failed analyses carry an `error` field instead of scores."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub(crate) async fn serve_stdio(coordinator: Coordinator) -> Result<(), McpError> {
    let svc = PageSpeedMcp::new(coordinator);
    let running = svc
        .serve(stdio())
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    // Runs until the client closes stdin.
    running
        .waiting()
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(())
}
