//! Graphviz invocation.
//!
//! The DOT text is piped to the layout program's stdin and the SVG is read
//! from its stdout. A failure to start, a non-zero exit, or (by default) any
//! stderr output is reported as [`Error::Layout`] carrying the diagnostics.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::common::{Error, Result};

/// The external layout program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEngine {
    /// Executable name or path
    pub program: String,
    /// Treat stderr output as failure even when the exit status is zero
    pub fail_on_stderr: bool,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            program: "dot".to_string(),
            fail_on_stderr: true,
        }
    }
}

impl LayoutEngine {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[inline]
    pub fn with_fail_on_stderr(mut self, fail: bool) -> Self {
        self.fail_on_stderr = fail;
        self
    }

    /// Whether the program starts and reports its version.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    /// Lay out `dot` and return the engine's SVG output.
    pub async fn render_svg(&self, dot: &str) -> Result<Vec<u8>> {
        debug!(program = %self.program, bytes = dot.len(), "running layout engine");

        let mut child = Command::new(&self.program)
            .arg("-Tsvg")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Layout(format!("failed to start `{}`: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Layout("layout engine stdin unavailable".to_string()))?;
        let input = dot.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Layout(format!("`{}` did not complete: {e}", self.program)))?;
        let write_result = writer
            .await
            .map_err(|e| Error::Layout(format!("writing to `{}` failed: {e}", self.program)))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            let detail = if stderr.is_empty() {
                format!("`{}` exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(Error::Layout(detail));
        }
        if self.fail_on_stderr && !stderr.is_empty() {
            return Err(Error::Layout(stderr));
        }
        write_result
            .map_err(|e| Error::Layout(format!("writing to `{}` failed: {e}", self.program)))?;

        debug!(bytes = output.stdout.len(), "layout engine finished");
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_a_layout_error() {
        let engine = LayoutEngine::new().with_program("dex-no-such-layout-program");
        assert!(!engine.is_available().await);
        let err = engine.render_svg("digraph {}").await.unwrap_err();
        assert!(matches!(err, Error::Layout(ref msg) if msg.contains("failed to start")));
    }

    #[tokio::test]
    async fn syntax_errors_surface_engine_diagnostics() {
        if !LayoutEngine::new().is_available().await {
            return;
        }
        let err = LayoutEngine::new()
            .render_svg("digraph { -> }")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Layout(ref msg) if !msg.is_empty()));
    }

    #[tokio::test]
    async fn renders_svg() {
        if !LayoutEngine::new().is_available().await {
            return;
        }
        let svg = LayoutEngine::new()
            .render_svg("digraph { a -> b }")
            .await
            .unwrap();
        let text = String::from_utf8(svg).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("viewBox"));
    }
}
