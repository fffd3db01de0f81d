//! Decides whether to build a fresh index or load the persisted one

use std::time::Instant;

use crate::config::RagConfig;
use crate::logger::WorkflowLogger;
use crate::pipeline::RagPipeline;

/// Builds or loads the index for the configured document
pub struct IndexManager {
    config: RagConfig,
    logger: WorkflowLogger,
}

impl IndexManager {
    pub fn new(config: RagConfig, logger: WorkflowLogger) -> Self {
        Self { config, logger }
    }

    /// Make an index available to `pipeline`
    ///
    /// Builds when a rebuild is requested or nothing is persisted yet. A load
    /// failure falls back to building. Returns whether an index is ready.
    pub async fn prepare_index(&self, pipeline: &mut RagPipeline) -> bool {
        if self.config.index.rebuild_index || !self.config.index_path().exists() {
            self.build_index(pipeline).await
        } else {
            self.load_existing_index(pipeline).await
        }
    }

    async fn build_index(&self, pipeline: &mut RagPipeline) -> bool {
        self.logger.log_stage(
            "ステージ2: インデックス構築",
            &format!("{}からベクトルインデックスを作成", self.config.file_type_label()),
        );

        let index_name = self.config.index_name();
        match pipeline
            .build_index_from_document(
                &self.config.document_path,
                self.config.index.save_index,
                Some(index_name.as_str()),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                self.logger
                    .log_error(&format!("インデックス構築に失敗しました: {}", e));
                false
            }
        }
    }

    async fn load_existing_index(&self, pipeline: &mut RagPipeline) -> bool {
        self.logger
            .log_stage("ステージ2: インデックス読み込み", "既存のインデックスを読み込み");
        self.logger.log_info(&format!(
            "既存のインデックスを読み込んでいます: {}",
            self.config.index_path().display()
        ));

        let start = Instant::now();
        match pipeline.load_index(&self.config.index_name()).await {
            Ok(()) => {
                self.logger
                    .log_success("インデックス読み込み完了", Some(start.elapsed()));
                true
            }
            Err(e) => {
                self.logger
                    .log_warning(&format!("インデックスの読み込みに失敗しました: {}", e));
                self.logger.log_info("新しいインデックスを構築します");
                self.build_index(pipeline).await
            }
        }
    }
}
