//! Workflow progress output
//!
//! `WorkflowLogger` prints the staged progress banners the user watches while
//! the pipeline runs, and mirrors every line into `tracing` so the same events
//! show up in structured logs.

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Progress printer shared by every workflow stage
#[derive(Clone)]
pub struct WorkflowLogger {
    sink: Sink,
}

impl Default for WorkflowLogger {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for WorkflowLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowLogger").finish_non_exhaustive()
    }
}

impl WorkflowLogger {
    /// Logger writing to standard output
    pub fn stdout() -> Self {
        Self::with_writer(std::io::stdout())
    }

    /// Logger writing to an arbitrary sink
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Log the start of a workflow stage
    pub fn log_stage(&self, stage_name: &str, description: &str) {
        tracing::info!(stage = stage_name, "{}", description);
        let rule = "=".repeat(60);
        let mut out = format!("\n{}\n🔄 RAGワークフロー: {}\n", rule, stage_name);
        if !description.is_empty() {
            out.push_str(&format!("   {}\n", description));
        }
        out.push_str(&rule);
        self.write_line(&out);
    }

    /// Log the start of a sub-stage
    pub fn log_substage(&self, substage_name: &str, description: &str) {
        tracing::debug!(substage = substage_name, "{}", description);
        let rule = "─".repeat(40);
        let mut out = format!("\n{}\n⚙️  {}\n", rule, substage_name);
        if !description.is_empty() {
            out.push_str(&format!("   {}\n", description));
        }
        out.push_str(&rule);
        self.write_line(&out);
    }

    /// Log a success, optionally with the time the step took
    pub fn log_success(&self, message: &str, elapsed: Option<Duration>) {
        match elapsed {
            Some(elapsed) => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", message);
                self.write_line(&format!(
                    "  ✅ {} (処理時間: {:.2}秒)",
                    message,
                    elapsed.as_secs_f64()
                ));
            }
            None => {
                tracing::info!("{}", message);
                self.write_line(&format!("  ✅ {}", message));
            }
        }
    }

    /// Log an informational message
    pub fn log_info(&self, message: &str) {
        tracing::info!("{}", message);
        self.write_line(&format!("  📄 {}", message));
    }

    /// Log a warning
    pub fn log_warning(&self, message: &str) {
        tracing::warn!("{}", message);
        self.write_line(&format!("⚠️ {}", message));
    }

    /// Log an error
    pub fn log_error(&self, message: &str) {
        tracing::error!("{}", message);
        self.write_line(&format!("❌ エラー: {}", message));
    }

    /// Write a raw line to the sink without a tracing event
    pub fn print(&self, line: &str) {
        self.write_line(line);
    }

    /// Write text without a trailing newline, for input prompts
    pub fn prompt(&self, text: &str) {
        let mut sink = self.sink.lock();
        let _ = write!(sink, "{}", text);
        let _ = sink.flush();
    }

    fn write_line(&self, line: &str) {
        let mut sink = self.sink.lock();
        // Progress output is best effort; a closed stdout must not abort the run.
        let _ = writeln!(sink, "{}", line);
        let _ = sink.flush();
    }
}

/// In-memory sink whose contents can be read back
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).to_string()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_banner() {
        let sink = MemorySink::new();
        let logger = WorkflowLogger::with_writer(sink.clone());

        logger.log_stage("ステージ1: システム初期化", "LLMモデルと埋め込みモデルの設定");

        let out = sink.contents();
        assert!(out.contains(&"=".repeat(60)));
        assert!(out.contains("🔄 RAGワークフロー: ステージ1: システム初期化"));
        assert!(out.contains("   LLMモデルと埋め込みモデルの設定"));
    }

    #[test]
    fn test_substage_without_description() {
        let sink = MemorySink::new();
        let logger = WorkflowLogger::with_writer(sink.clone());

        logger.log_substage("インデックス保存", "");

        let out = sink.contents();
        assert!(out.contains("⚙️  インデックス保存"));
        assert_eq!(out.matches(&"─".repeat(40)).count(), 2);
    }

    #[test]
    fn test_success_with_elapsed() {
        let sink = MemorySink::new();
        let logger = WorkflowLogger::with_writer(sink.clone());

        logger.log_success("保存完了", Some(Duration::from_millis(1234)));
        logger.log_success("QueryEngine設定完了", None);
        logger.log_error("ファイルが見つかりません");
        logger.log_warning("読み込みに失敗しました");

        let out = sink.contents();
        assert!(out.contains("  ✅ 保存完了 (処理時間: 1.23秒)"));
        assert!(out.contains("  ✅ QueryEngine設定完了\n"));
        assert!(out.contains("❌ エラー: ファイルが見つかりません"));
        assert!(out.contains("⚠️ 読み込みに失敗しました"));
    }
}
