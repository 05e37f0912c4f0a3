use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use futures_util::StreamExt;
use realty_auth::{SessionHandle, SessionStore};
use realty_query::{GridQuery, SortDir};
use realty_sdk::{
    Attachment, DEFAULT_EXPORT_FILENAME, ExportClient, GridClient, HttpExecutor, MutationClient,
    RequestExecutor,
};
use serde_json::{Value, json};

use crate::config::AppConfig;

/// Executor and session shared by every client of one invocation.
pub struct Clients {
    pub session: Arc<SessionStore>,
    pub executor: Arc<dyn RequestExecutor>,
}

impl Clients {
    /// # Errors
    /// Returns an error if the API or session settings are invalid.
    ///
    /// # Panics
    /// Panics outside a Tokio runtime.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api = config.api_config()?;
        let executor = HttpExecutor::from_config(api).context("failed to build API client")?;
        Ok(Self {
            session: Arc::new(config.session_store()?),
            executor: Arc::new(executor),
        })
    }

    fn handle(&self) -> Arc<dyn SessionHandle> {
        self.session.clone()
    }
}

/// Grid parameters shared by `grid` and `export`.
#[derive(Args, Clone, Default)]
pub struct QueryArgs {
    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,

    /// Column to sort by
    #[arg(long)]
    pub sort_field: Option<String>,

    /// Sort direction (asc or desc)
    #[arg(long)]
    pub sort: Option<SortDir>,

    /// Column filter, repeatable
    #[arg(long = "filter", value_name = "FIELD=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    /// Explicitly enable or disable filtering
    #[arg(long)]
    pub filtration: Option<bool>,

    /// Set to false to fetch the whole result set in one response
    #[arg(long)]
    pub pagination: Option<bool>,

    /// 1-based page number
    #[arg(long)]
    pub page: Option<u64>,

    /// Page size
    #[arg(long)]
    pub limit: Option<u64>,
}

impl QueryArgs {
    #[must_use]
    pub fn to_query(&self) -> GridQuery {
        let mut builder = GridQuery::builder();
        if let Some(search) = &self.search {
            builder = builder.search(search.clone());
        }
        if let Some(field) = &self.sort_field {
            builder = builder.sort_by(field.clone(), self.sort.unwrap_or(SortDir::Asc));
        }
        for (field, value) in &self.filters {
            builder = builder.filter(field.clone(), value.clone());
        }
        if let Some(enabled) = self.filtration {
            builder = builder.filtration(enabled);
        }
        if let Some(enabled) = self.pagination {
            builder = builder.pagination(enabled);
        }
        if let Some(page) = self.page {
            builder = builder.page(page);
        }
        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }
        let mut query = builder.build();
        if query.sort_field.is_none() {
            query.sort = self.sort;
        }
        query
    }
}

#[derive(Args)]
pub struct GridArgs {
    /// Endpoint path, e.g. `properties`
    pub endpoint: String,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Walk every page and print all rows
    #[arg(long)]
    pub all: bool,
}

impl GridArgs {
    /// Rows as JSON. Read failures degrade to an empty result.
    ///
    /// # Errors
    /// Returns an error only if the result cannot be serialized.
    pub async fn execute(&self, clients: &Clients) -> Result<Value> {
        let grid = GridClient::new(clients.executor.clone(), clients.handle());
        let query = self.query.to_query();

        if !self.all {
            let response = grid.fetch_grid(&self.endpoint, &query).await;
            return serde_json::to_value(response).context("failed to serialize grid response");
        }

        let mut rows = Vec::new();
        let mut pages = std::pin::pin!(grid.pages(&self.endpoint, query));
        while let Some(page) = pages.next().await {
            rows.extend(page.into_rows().into_iter().map(Value::Object));
        }
        tracing::info!(endpoint = %self.endpoint, rows = rows.len(), "fetched all pages");
        Ok(Value::Array(rows))
    }
}

#[derive(Args)]
pub struct ExportArgs {
    /// Endpoint path, e.g. `properties/export`
    pub endpoint: String,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Write the decoded file here instead of printing the base64 payload
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

impl ExportArgs {
    /// # Errors
    /// Returns the API error, or an I/O error when writing to `--out-dir`.
    pub async fn execute(&self, clients: &Clients) -> Result<Value> {
        let export = ExportClient::new(clients.executor.clone(), clients.handle());
        let file = export
            .export_binary(&self.endpoint, &self.query.to_query())
            .await
            .with_context(|| format!("export from '{}' failed", self.endpoint))?;

        let Some(dir) = &self.out_dir else {
            return Ok(json!({ "filename": file.filename, "payload": file.payload }));
        };

        let bytes = file.decode().context("export payload is not valid base64")?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("cannot create '{}'", dir.display()))?;
        let path = dir.join(safe_file_name(&file.filename));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("cannot write '{}'", path.display()))?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "export written");
        Ok(json!({
            "filename": file.filename,
            "path": path.display().to_string(),
            "bytes": bytes.len(),
        }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MutationMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl MutationMethod {
    #[must_use]
    pub fn as_method(self) -> realty_http::Method {
        match self {
            Self::Post => realty_http::Method::POST,
            Self::Put => realty_http::Method::PUT,
            Self::Patch => realty_http::Method::PATCH,
            Self::Delete => realty_http::Method::DELETE,
        }
    }
}

#[derive(Args)]
pub struct MutateArgs {
    /// Endpoint path, e.g. `properties/42`
    pub endpoint: String,

    #[arg(long, value_enum, default_value_t = MutationMethod::Post)]
    pub method: MutationMethod,

    /// JSON payload
    #[arg(long)]
    pub data: Option<String>,

    /// File to upload, repeatable; sends the request as multipart
    #[arg(long = "attach", value_name = "FIELD=PATH", value_parser = parse_key_value)]
    pub attachments: Vec<(String, String)>,
}

impl MutateArgs {
    /// The backend's JSON reply.
    ///
    /// # Errors
    /// Returns an error for invalid `--data`, unreadable attachments, or any
    /// API failure. Nothing is re-sent on failure.
    pub async fn execute(&self, clients: &Clients) -> Result<Value> {
        let payload = match &self.data {
            Some(raw) => serde_json::from_str(raw).context("--data is not valid JSON")?,
            None => Value::Null,
        };

        let mut attachments = Vec::with_capacity(self.attachments.len());
        for (field, path) in &self.attachments {
            let attachment = Attachment::from_path(field.as_str(), Path::new(path))
                .await
                .with_context(|| format!("cannot read attachment '{path}'"))?;
            attachments.push(attachment);
        }

        let client = MutationClient::new(clients.executor.clone(), clients.handle());
        client
            .mutate(&self.endpoint, self.method.as_method(), &payload, &attachments)
            .await
            .with_context(|| format!("{} {} failed", self.method.as_method(), self.endpoint))
    }
}

/// Split `KEY=VALUE` on the first `=`.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

/// Last path component of a server-supplied name, so it cannot escape the
/// output directory.
fn safe_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty() && n != "..")
        .unwrap_or_else(|| DEFAULT_EXPORT_FILENAME.to_owned())
}
