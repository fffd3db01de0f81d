//! Interactive and sample-question loops

use std::io::BufRead;

use crate::config::RagConfig;
use crate::display::ResultDisplayer;
use crate::logger::WorkflowLogger;
use crate::pipeline::RagPipeline;

/// Words that end the interactive loop, compared case-insensitively
const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "終了"];

/// Feeds questions to the pipeline and prints the answers
pub struct QuestionAnswerHandler {
    config: RagConfig,
    logger: WorkflowLogger,
    displayer: ResultDisplayer,
}

impl QuestionAnswerHandler {
    pub fn new(config: RagConfig, logger: WorkflowLogger, displayer: ResultDisplayer) -> Self {
        Self {
            config,
            logger,
            displayer,
        }
    }

    /// Answer questions read line by line from `input` until an exit command or EOF
    ///
    /// Returns the number of questions answered successfully.
    pub async fn run_interactive_mode<R: BufRead>(&self, pipeline: &RagPipeline, mut input: R) -> usize {
        let rule = "=".repeat(60);
        self.logger.print(&format!(
            "\n{}\n🔍 {}ファイルに関する質問ができます。\n終了するには 'exit'、'quit' または '終了' と入力してください。\n{}",
            rule,
            self.config.file_type_label(),
            rule
        ));

        let mut answered = 0;
        loop {
            self.logger.print(&format!("\n{}", "-".repeat(40)));
            self.logger.prompt("質問を入力してください: ");

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => {
                    self.logger.print("");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    self.logger.log_error(&format!("入力の読み取りに失敗しました: {}", e));
                    break;
                }
            }

            let question = line.trim();
            if is_exit_command(question) {
                self.logger.print("\n👋 ありがとうございました！");
                break;
            }
            if question.is_empty() {
                continue;
            }

            if self.process_question(pipeline, question).await {
                answered += 1;
            }
            self.logger.print(&format!("\n{}", rule));
        }
        answered
    }

    /// Answer the configured sample questions in order
    pub async fn run_sample_mode(&self, pipeline: &RagPipeline) -> usize {
        let mut answered = 0;
        for question in &self.config.sample_questions {
            self.logger
                .print(&format!("\n質問: {}\n{}", question, "-".repeat(40)));
            if self.process_question(pipeline, question).await {
                answered += 1;
            }
            self.logger.print(&format!("\n{}", "=".repeat(60)));
        }
        answered
    }

    async fn process_question(&self, pipeline: &RagPipeline, question: &str) -> bool {
        match pipeline.answer_question(question).await {
            Ok(result) => {
                self.displayer.display_result(&result);
                true
            }
            Err(e) => {
                self.logger
                    .log_error(&format!("質問処理中にエラーが発生しました: {}", e));
                false
            }
        }
    }
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.iter().any(|c| *c == lower)
}
