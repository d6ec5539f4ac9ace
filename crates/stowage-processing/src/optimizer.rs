//! Lossless image optimization
//!
//! Optimizers work on files: the encoded variant is written to disk, optimized
//! into a second file and that file is what gets stored.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use stowage_core::{Error, Result};
use tokio::process::Command;

#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Write an optimized copy of `input` to `output`
    async fn optimize(&self, input: &Path, output: &Path, mime_type: &str) -> Result<()>;
}

/// An external optimizer binary and the MIME types it handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerTool {
    pub binary: String,
    pub args: Vec<String>,
    pub mime_types: Vec<String>,
}

impl OptimizerTool {
    pub fn new(binary: &str, args: &[&str], mime_types: &[&str]) -> Self {
        Self {
            binary: binary.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            mime_types: mime_types.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn handles(&self, mime_type: &str) -> bool {
        self.mime_types.iter().any(|m| m == mime_type)
    }
}

/// Copies the input and runs every known tool for its type on the copy in place.
///
/// Tools that are not installed are skipped. A tool that fails is logged and the
/// file is kept as the previous tool left it.
#[derive(Debug, Clone)]
pub struct CommandOptimizer {
    tools: Vec<OptimizerTool>,
}

impl CommandOptimizer {
    pub fn new(tools: Vec<OptimizerTool>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &[OptimizerTool] {
        &self.tools
    }

    async fn run(&self, tool: &OptimizerTool, target: &Path) -> Result<()> {
        let output = match Command::new(&tool.binary)
            .args(&tool.args)
            .arg(target)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(tool = %tool.binary, "Optimizer not installed, skipping");
                return Ok(());
            }
            Err(e) => {
                return Err(Error::Optimizer(format!(
                    "Failed to run {}: {}",
                    tool.binary, e
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                tool = %tool.binary,
                path = %target.display(),
                status = ?output.status.code(),
                stderr = %stderr.trim(),
                "Optimizer failed, keeping unoptimized image"
            );
        }

        Ok(())
    }
}

impl Default for CommandOptimizer {
    fn default() -> Self {
        Self::new(vec![
            OptimizerTool::new(
                "jpegoptim",
                &["--strip-all", "--all-progressive", "--quiet"],
                &["image/jpeg", "image/jpg"],
            ),
            OptimizerTool::new("optipng", &["-i0", "-o2", "-quiet"], &["image/png"]),
            OptimizerTool::new("gifsicle", &["-b", "-O3"], &["image/gif"]),
        ])
    }
}

#[async_trait]
impl Optimizer for CommandOptimizer {
    async fn optimize(&self, input: &Path, output: &Path, mime_type: &str) -> Result<()> {
        copy(input, output).await?;

        for tool in self.tools.iter().filter(|t| t.handles(mime_type)) {
            self.run(tool, output).await?;
        }

        Ok(())
    }
}

/// Stores the encoded image as is
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughOptimizer;

#[async_trait]
impl Optimizer for PassthroughOptimizer {
    async fn optimize(&self, input: &Path, output: &Path, _mime_type: &str) -> Result<()> {
        copy(input, output).await
    }
}

async fn copy(input: &Path, output: &Path) -> Result<()> {
    tokio::fs::copy(input, output).await.map_err(|e| {
        Error::Optimizer(format!(
            "Failed to copy {} to {}: {}",
            input.display(),
            output.display(),
            e
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tools_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        std::fs::write(&input, b"not really a png").unwrap();

        let optimizer = CommandOptimizer::new(vec![OptimizerTool::new(
            "stowage-no-such-optimizer",
            &[],
            &["image/png"],
        )]);
        optimizer.optimize(&input, &output, "image/png").await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"not really a png");
    }

    #[tokio::test]
    async fn test_passthrough_copies() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.gif");
        let output = dir.path().join("out.gif");
        std::fs::write(&input, b"GIF89a").unwrap();

        PassthroughOptimizer
            .optimize(&input, &output, "image/gif")
            .await
            .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"GIF89a");

        let result = PassthroughOptimizer
            .optimize(&dir.path().join("missing.gif"), &output, "image/gif")
            .await;
        assert!(matches!(result, Err(Error::Optimizer(_))));
    }

    #[test]
    fn test_default_tools() {
        let optimizer = CommandOptimizer::default();
        let jpeg: Vec<_> = optimizer
            .tools()
            .iter()
            .filter(|t| t.handles("image/jpeg"))
            .map(|t| t.binary.as_str())
            .collect();
        assert_eq!(jpeg, vec!["jpegoptim"]);
        assert!(optimizer.tools().iter().all(|t| !t.handles("image/webp")));
    }
}
