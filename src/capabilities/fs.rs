//! Filesystem capability handlers
//!
//! Every operation runs its fs check before touching the disk and then works
//! on the sanitized path the check returned, never on the raw input.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::KernelResult;
use crate::permissions::{Capability, FsAccess, Policy};
use crate::router::{parse_params, Handler, HandlerError, HandlerResult, Router};

/// The filesystem methods exposed to content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    ReadTextFile,
    ReadFile,
    WriteTextFile,
    WriteFile,
    ReadDir,
    Exists,
    Mkdir,
    Remove,
    Stat,
}

impl FsOp {
    pub const ALL: [FsOp; 9] = [
        FsOp::ReadTextFile,
        FsOp::ReadFile,
        FsOp::WriteTextFile,
        FsOp::WriteFile,
        FsOp::ReadDir,
        FsOp::Exists,
        FsOp::Mkdir,
        FsOp::Remove,
        FsOp::Stat,
    ];

    pub fn method(&self) -> &'static str {
        match self {
            FsOp::ReadTextFile => "fs.readTextFile",
            FsOp::ReadFile => "fs.readFile",
            FsOp::WriteTextFile => "fs.writeTextFile",
            FsOp::WriteFile => "fs.writeFile",
            FsOp::ReadDir => "fs.readDir",
            FsOp::Exists => "fs.exists",
            FsOp::Mkdir => "fs.mkdir",
            FsOp::Remove => "fs.remove",
            FsOp::Stat => "fs.stat",
        }
    }

    pub fn access(&self) -> FsAccess {
        match self {
            FsOp::ReadTextFile | FsOp::ReadFile | FsOp::ReadDir | FsOp::Exists | FsOp::Stat => {
                FsAccess::Read
            }
            FsOp::WriteTextFile | FsOp::WriteFile | FsOp::Mkdir | FsOp::Remove => FsAccess::Write,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PathInput {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteTextInput {
    path: String,
    contents: String,
}

#[derive(Debug, Deserialize)]
struct WriteBytesInput {
    path: String,
    /// Base64 encoded bytes
    data: String,
}

#[derive(Debug, Deserialize)]
struct DirInput {
    path: String,
    #[serde(default)]
    recursive: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DirEntryInfo {
    name: String,
    is_file: bool,
    is_dir: bool,
}

/// Handler for one filesystem method
pub struct FsHandler {
    policy: Arc<Policy>,
    op: FsOp,
}

impl FsHandler {
    pub fn new(policy: Arc<Policy>, op: FsOp) -> Self {
        Self { policy, op }
    }

    /// Run the family and path checks; yields the path to operate on
    fn authorize(&self, raw: &str) -> Result<PathBuf, HandlerError> {
        let method = self.op.method();
        self.policy
            .check_family(Capability::Fs)
            .and_then(|_| self.policy.check_fs(raw, self.op.access()))
            .map_err(|e| HandlerError::from(e.with_method(method)))
    }

    async fn read_text_file(&self, params: Value) -> HandlerResult {
        let input: PathInput = parse_params(params)?;
        let path = self.authorize(&input.path)?;
        let contents = tokio::fs::read_to_string(&path).await?;
        Ok(Value::String(contents))
    }

    async fn read_file(&self, params: Value) -> HandlerResult {
        let input: PathInput = parse_params(params)?;
        let path = self.authorize(&input.path)?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(Value::String(BASE64.encode(bytes)))
    }

    async fn write_text_file(&self, params: Value) -> HandlerResult {
        let input: WriteTextInput = parse_params(params)?;
        let path = self.authorize(&input.path)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, input.contents.as_bytes()).await?;

        tracing::debug!("Wrote {} bytes to {}", input.contents.len(), path.display());
        Ok(Value::Null)
    }

    async fn write_file(&self, params: Value) -> HandlerResult {
        let input: WriteBytesInput = parse_params(params)?;
        let bytes = BASE64
            .decode(input.data.as_bytes())
            .map_err(|e| HandlerError::InvalidParams(format!("data is not base64: {}", e)))?;
        let path = self.authorize(&input.path)?;

        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(Value::Null)
    }

    async fn read_dir(&self, params: Value) -> HandlerResult {
        let input: PathInput = parse_params(params)?;
        let path = self.authorize(&input.path)?;

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                is_file: file_type.is_file(),
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        serde_json::to_value(entries).map_err(|e| HandlerError::failed(e.to_string()))
    }

    async fn exists(&self, params: Value) -> HandlerResult {
        let input: PathInput = parse_params(params)?;
        let path = self.authorize(&input.path)?;
        Ok(Value::Bool(tokio::fs::try_exists(&path).await?))
    }

    async fn mkdir(&self, params: Value) -> HandlerResult {
        let input: DirInput = parse_params(params)?;
        let path = self.authorize(&input.path)?;

        if input.recursive {
            tokio::fs::create_dir_all(&path).await?;
        } else {
            tokio::fs::create_dir(&path).await?;
        }
        Ok(Value::Null)
    }

    async fn remove(&self, params: Value) -> HandlerResult {
        let input: DirInput = parse_params(params)?;
        let path = self.authorize(&input.path)?;

        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_dir() {
            tokio::fs::remove_file(&path).await?;
        } else if input.recursive {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_dir(&path).await?;
        }

        tracing::info!("Removed {}", path.display());
        Ok(Value::Null)
    }

    async fn stat(&self, params: Value) -> HandlerResult {
        let input: PathInput = parse_params(params)?;
        let path = self.authorize(&input.path)?;

        let metadata = tokio::fs::metadata(&path).await?;
        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64);

        Ok(json!({
            "isFile": metadata.is_file(),
            "isDir": metadata.is_dir(),
            "size": metadata.len(),
            "readonly": metadata.permissions().readonly(),
            "modifiedMs": modified_ms,
        }))
    }
}

#[async_trait]
impl Handler for FsHandler {
    async fn call(&self, params: Value) -> HandlerResult {
        match self.op {
            FsOp::ReadTextFile => self.read_text_file(params).await,
            FsOp::ReadFile => self.read_file(params).await,
            FsOp::WriteTextFile => self.write_text_file(params).await,
            FsOp::WriteFile => self.write_file(params).await,
            FsOp::ReadDir => self.read_dir(params).await,
            FsOp::Exists => self.exists(params).await,
            FsOp::Mkdir => self.mkdir(params).await,
            FsOp::Remove => self.remove(params).await,
            FsOp::Stat => self.stat(params).await,
        }
    }
}

/// Register every `fs.*` method
pub fn register(router: &Router, policy: &Arc<Policy>) -> KernelResult<()> {
    for op in FsOp::ALL {
        router.handle(op.method(), FsHandler::new(Arc::clone(policy), op))?;
    }
    Ok(())
}
