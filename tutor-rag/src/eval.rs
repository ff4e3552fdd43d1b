//! LLM-as-judge evaluation of answer quality.
//!
//! Each question is answered by the [`CourseAssistant`]; a judge model then
//! scores the answer from 1 to 5 on two axes:
//!
//! - **faithfulness** - is the answer supported by the retrieved context?
//! - **relevancy** - does it address the question completely?
//!
//! A judge failure never aborts the run: the question is recorded with
//! scores of 0 and an "evaluation failed" comment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assistant::CourseAssistant;
use crate::error::Result;
use crate::model::{ChatMessage, ChatModel, ChatRequest};

const JUDGE_SYSTEM_PROMPT: &str =
    "You are a fair and strict evaluator. You always reply with a valid JSON object.";

const JUDGE_TEMPERATURE: f32 = 0.1;

const FAILED_COMMENT: &str = "evaluation failed";

/// Per-axis scores, 1 (worst) to 5 (best); 0 marks a failed evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub faithfulness: u8,
    pub relevancy: u8,
}

/// One-line judge comments per axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comments {
    pub faithfulness: String,
    pub relevancy: String,
}

/// The judge's structured reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub scores: Scores,
    pub comments: Comments,
}

impl Verdict {
    fn failed() -> Self {
        Self {
            scores: Scores::default(),
            comments: Comments {
                faithfulness: FAILED_COMMENT.to_string(),
                relevancy: FAILED_COMMENT.to_string(),
            },
        }
    }

    /// Parse a judge reply, tolerating a surrounding markdown code fence.
    ///
    /// Scores outside `1..=5` are rejected.
    pub fn parse(reply: &str) -> Option<Self> {
        let body = reply.trim();
        let body = body
            .strip_prefix("```json")
            .or_else(|| body.strip_prefix("```"))
            .and_then(|rest| rest.trim_end().strip_suffix("```"))
            .unwrap_or(body);

        let verdict: Verdict = serde_json::from_str(body.trim()).ok()?;
        let in_range = |score: u8| (1..=5).contains(&score);
        (in_range(verdict.scores.faithfulness) && in_range(verdict.scores.relevancy))
            .then_some(verdict)
    }
}

/// The evaluation of one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub question: String,
    pub answer: String,
    /// Content of every retrieved chunk, best first.
    pub contexts: Vec<String>,
    pub scores: Scores,
    pub comments: Comments,
}

/// Row layout of the CSV summary.
#[derive(Serialize)]
struct SummaryRow<'a> {
    question: String,
    faithfulness_score: u8,
    relevancy_score: u8,
    faithfulness_comment: &'a str,
    relevancy_comment: &'a str,
}

/// Results of an evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub records: Vec<EvaluationRecord>,
}

impl EvaluationReport {
    /// Mean faithfulness score, or `None` for an empty report.
    pub fn mean_faithfulness(&self) -> Option<f64> {
        self.mean(|scores| scores.faithfulness)
    }

    /// Mean relevancy score, or `None` for an empty report.
    pub fn mean_relevancy(&self) -> Option<f64> {
        self.mean(|scores| scores.relevancy)
    }

    fn mean(&self, axis: impl Fn(&Scores) -> u8) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let total: u32 = self.records.iter().map(|r| u32::from(axis(&r.scores))).sum();
        Some(f64::from(total) / self.records.len() as f64)
    }

    /// Write `detailed_results_<timestamp>.json` and
    /// `scores_summary_<timestamp>.csv` into `dir`, creating it if needed.
    ///
    /// Returns the two paths in that order.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

        let json_path = dir.join(format!("detailed_results_{timestamp}.json"));
        std::fs::write(&json_path, serde_json::to_string_pretty(&self.records)?)?;

        let csv_path = dir.join(format!("scores_summary_{timestamp}.csv"));
        let mut writer = csv::Writer::from_path(&csv_path).map_err(std::io::Error::from)?;
        for record in &self.records {
            let row = SummaryRow {
                question: summarize(&record.question, 100),
                faithfulness_score: record.scores.faithfulness,
                relevancy_score: record.scores.relevancy,
                faithfulness_comment: &record.comments.faithfulness,
                relevancy_comment: &record.comments.relevancy,
            };
            writer.serialize(row).map_err(std::io::Error::from)?;
        }
        writer.flush()?;

        info!(json = %json_path.display(), csv = %csv_path.display(), "saved evaluation results");
        Ok((json_path, csv_path))
    }
}

fn summarize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}

/// Build the judge's user prompt.
pub fn judge_prompt(question: &str, answer: &str, contexts: &[String]) -> String {
    let context_text = contexts.join("\n---\n");
    let context_text =
        if context_text.trim().is_empty() { "(no context)" } else { context_text.as_str() };

    format!(
        "Act as a strict academic teaching assistant and evaluate the quality of the \
         following question and answer.\n\
         \n\
         [Student question]\n{question}\n\
         \n\
         [Course material the assistant used (context)]\n{context_text}\n\
         \n\
         [Assistant's answer]\n{answer}\n\
         \n\
         Score the answer on the two dimensions below with an integer from 1 to 5 \
         (1 is worst, 5 is best) and give a one-sentence comment for each.\n\
         \n\
         1. faithfulness: is the answer strictly based on the context above, or does it \
         contain information that cannot be inferred from it?\n\
         2. relevancy: does the answer respond directly and completely to the question?\n\
         \n\
         Reply with JSON in exactly this shape:\n\
         {{\"scores\": {{\"faithfulness\": 0, \"relevancy\": 0}}, \
         \"comments\": {{\"faithfulness\": \"...\", \"relevancy\": \"...\"}}}}"
    )
}

/// Runs questions through the assistant and scores them with a judge model.
pub struct Evaluator {
    assistant: Arc<CourseAssistant>,
    judge: Arc<dyn ChatModel>,
}

impl Evaluator {
    pub fn new(assistant: Arc<CourseAssistant>, judge: Arc<dyn ChatModel>) -> Self {
        Self { assistant, judge }
    }

    /// Ask the judge to score one answer.
    pub async fn judge(&self, question: &str, answer: &str, contexts: &[String]) -> Verdict {
        let request = ChatRequest::new(
            vec![
                ChatMessage::system(JUDGE_SYSTEM_PROMPT),
                ChatMessage::user(judge_prompt(question, answer, contexts)),
            ],
            JUDGE_TEMPERATURE,
        )
        .with_json_response();

        match self.judge.complete(request).await {
            Ok(reply) => Verdict::parse(&reply).unwrap_or_else(|| {
                warn!(model = self.judge.name(), reply = %reply, "unparseable judge verdict");
                Verdict::failed()
            }),
            Err(e) => {
                warn!(model = self.judge.name(), error = %e, "judge request failed");
                Verdict::failed()
            }
        }
    }

    /// Answer and score one question.
    pub async fn evaluate_question(&self, question: &str) -> EvaluationRecord {
        let answer = self.assistant.answer_question(question, None).await;
        let contexts: Vec<String> =
            answer.retrieved_docs.iter().map(|doc| doc.content.clone()).collect();
        let verdict = self.judge(question, &answer.answer, &contexts).await;

        EvaluationRecord {
            question: question.to_string(),
            answer: answer.answer,
            contexts,
            scores: verdict.scores,
            comments: verdict.comments,
        }
    }

    /// Evaluate every question in order.
    pub async fn run(&self, questions: &[String]) -> EvaluationReport {
        let mut records = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            info!(progress = i + 1, total = questions.len(), "evaluating question");
            records.push(self.evaluate_question(question).await);
        }
        EvaluationReport { records }
    }
}

/// Read evaluation questions, one per line; blank lines and `#` comments
/// are ignored.
pub fn load_questions(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
