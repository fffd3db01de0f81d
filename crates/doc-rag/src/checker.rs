//! Ollama connectivity check

use std::time::Instant;

use crate::config::LlmConfig;
use crate::logger::WorkflowLogger;
use crate::providers::OllamaClient;

/// Prompt sent by the connectivity check
pub const CHECK_PROMPT: &str = "Hello! Can you introduce yourself in one sentence?";

/// Ask `model` a one-line question and report the result
///
/// Returns whether the model answered.
pub async fn check_llm(config: &LlmConfig, model: &str, logger: &WorkflowLogger) -> bool {
    logger.print(&format!("🔍 {}モデルの接続テスト中...", model));

    let client = match OllamaClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            report_failure(logger, model, &e.to_string());
            return false;
        }
    };

    match client.list_models().await {
        Ok(models) if !models.iter().any(|m| model_matches(m, model)) => {
            logger.log_warning(&format!(
                "モデル {} はインストールされていないようです (インストール済み: {})",
                model,
                if models.is_empty() { "なし".to_string() } else { models.join(", ") }
            ));
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("Could not list models: {}", e),
    }

    let start = Instant::now();
    match client.generate(model, CHECK_PROMPT).await {
        Ok(response) => {
            logger.print(&format!(
                "\n✅ LLMのテスト成功!\n⏱️  応答時間: {:.2}秒\n\n📝 応答文:\n{}",
                start.elapsed().as_secs_f64(),
                response
            ));
            true
        }
        Err(e) => {
            report_failure(logger, model, &e.to_string());
            false
        }
    }
}

/// `gemma` matches an installed `gemma:latest`
fn model_matches(installed: &str, requested: &str) -> bool {
    installed == requested
        || (!requested.contains(':') && installed == format!("{}:latest", requested))
}

fn report_failure(logger: &WorkflowLogger, model: &str, error: &str) {
    logger.print(&format!(
        "\n❌ エラーが発生しました: {}\n\n考えられる原因:\n1. Ollamaがインストールされていないか、実行されていない\n2. 指定されたモデルがダウンロードされていない\n3. ネットワーク接続に問題がある\n\n解決方法:\n1. Ollamaをインストールして実行: `ollama serve`\n2. モデルをダウンロード: `ollama pull {}`",
        error, model
    ));
}
