//! Subcommand handlers and component wiring.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};
use tutor_rag::eval::load_questions;
use tutor_rag::{
    ChatModel, ChatSession, Chunker, CourseAssistant, DocumentLoader, EmbeddingProvider,
    Evaluator, MockChatModel, MockEmbeddingProvider, OpenAIChatModel, OpenAIEmbeddingProvider,
    ProviderConfig, RagConfig, ResilientEmbedder, SentenceChunker, SqliteVectorStore,
    VectorIndex,
};

use crate::cli::{Commands, Settings};
use crate::repl::{format_answer, is_exit_command, record_history};

/// Build the validated [`RagConfig`] from defaults plus any overrides.
pub fn rag_config(settings: &Settings) -> Result<RagConfig> {
    let mut builder = RagConfig::builder();
    if let Some(size) = settings.chunk_size {
        builder = builder.chunk_size(size);
    }
    if let Some(overlap) = settings.chunk_overlap {
        builder = builder.chunk_overlap(overlap);
    }
    if let Some(k) = settings.top_k {
        builder = builder.top_k(k);
    }
    if let Some(dims) = settings.embedding_dimensions {
        builder = builder.embedding_dimensions(dims);
    }
    if let Some(temperature) = settings.temperature {
        builder = builder.temperature(temperature);
    }
    if let Some(tokens) = settings.max_output_tokens {
        builder = builder.max_output_tokens(tokens);
    }
    Ok(builder.build()?)
}

fn provider_config(settings: &Settings) -> Result<ProviderConfig> {
    let api_key = settings
        .api_key
        .clone()
        .context("OPENAI_API_KEY is not set (pass --api-key or use --offline)")?;

    let mut provider = ProviderConfig::new(api_key);
    if let Some(base) = &settings.api_base {
        provider = provider.with_api_base(base);
    }
    if let Some(model) = &settings.chat_model {
        provider = provider.with_chat_model(model);
    }
    if let Some(model) = &settings.embedding_model {
        provider = provider.with_embedding_model(model);
    }
    Ok(provider)
}

/// The components every subcommand works with, constructed once.
pub struct App {
    pub config: RagConfig,
    pub index: Arc<VectorIndex>,
    pub chat_model: Arc<dyn ChatModel>,
}

impl App {
    pub async fn open(settings: &Settings) -> Result<Self> {
        let config = rag_config(settings)?;

        let (embeddings, chat_model): (Arc<dyn EmbeddingProvider>, Arc<dyn ChatModel>) =
            if settings.offline {
                warn!("offline mode: using local mock providers");
                (
                    Arc::new(MockEmbeddingProvider::new(config.embedding_dimensions)),
                    Arc::new(MockChatModel::echo()),
                )
            } else {
                let provider = provider_config(settings)?;
                (
                    Arc::new(
                        OpenAIEmbeddingProvider::new(&provider)?
                            .with_dimensions(config.embedding_dimensions),
                    ),
                    Arc::new(OpenAIChatModel::new(&provider)?),
                )
            };

        let store = SqliteVectorStore::open(&settings.vector_db_path).await.with_context(|| {
            format!("failed to open vector index at {}", settings.vector_db_path.display())
        })?;
        let embedder = ResilientEmbedder::new(embeddings, &config);
        let index =
            VectorIndex::open(embedder, Arc::new(store), settings.collection.clone(), &config)
                .await?;

        Ok(Self { config, index: Arc::new(index), chat_model })
    }

    fn assistant(&self) -> Result<Arc<CourseAssistant>> {
        let assistant = CourseAssistant::builder()
            .config(self.config.clone())
            .index(self.index.clone())
            .model(self.chat_model.clone())
            .build()?;
        Ok(Arc::new(assistant))
    }
}

/// Run one subcommand to completion.
pub async fn run(settings: &Settings, command: Commands) -> Result<()> {
    let app = App::open(settings).await?;

    match command {
        Commands::Ingest { rebuild } => ingest(&app, settings, rebuild).await,
        Commands::Chat => chat(&app).await,
        Commands::Ask { question, top_k } => ask(&app, &question, top_k).await,
        Commands::Eval { questions, output } => {
            let questions = load_questions(&questions)
                .with_context(|| format!("failed to read {}", questions.display()))?;
            evaluate(&app, &questions, &output).await
        }
        Commands::Stats => {
            let count = app.index.count().await?;
            println!("Collection: {}", app.index.collection());
            println!("Location:   {}", settings.vector_db_path.display());
            println!("Chunks:     {count}");
            Ok(())
        }
        Commands::Clear => {
            app.index.clear().await?;
            println!("Cleared collection '{}'.", app.index.collection());
            Ok(())
        }
    }
}

async fn ingest(app: &App, settings: &Settings, rebuild: bool) -> Result<()> {
    if rebuild {
        app.index.clear().await?;
    }

    let records = DocumentLoader::new(&settings.data_dir).load_all();
    if records.is_empty() {
        warn!(path = %settings.data_dir.display(), "no course material found");
        println!("No documents found in {}.", settings.data_dir.display());
        return Ok(());
    }

    let chunks = SentenceChunker::from_config(&app.config).split_documents(&records);
    info!(records = records.len(), chunks = chunks.len(), "indexing course material");
    let report = app.index.add_documents(&chunks).await;

    println!("Indexed {} chunks from {} records.", chunks.len(), records.len());
    println!("{report}");
    Ok(())
}

async fn chat(app: &App) -> Result<()> {
    let mut session = ChatSession::new(app.assistant()?);
    let mut editor = DefaultEditor::new()?;

    println!("Course tutor ready. Type 'quit', 'exit', 'bye' or '退出' to leave.");
    loop {
        let line = match editor.readline("\nYou: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            break;
        }
        record_history(&mut editor, question);

        let answer = session.ask(question).await;
        print!("{}", format_answer(&answer));
    }

    println!("Goodbye!");
    Ok(())
}

async fn ask(app: &App, question: &str, top_k: Option<usize>) -> Result<()> {
    let assistant = app.assistant()?;
    let top_k = top_k.unwrap_or(app.config.top_k);
    let answer = assistant.answer_with_top_k(question, None, top_k).await;
    print!("{}", format_answer(&answer));
    Ok(())
}

async fn evaluate(app: &App, questions: &[String], output: &std::path::Path) -> Result<()> {
    if questions.is_empty() {
        println!("No questions to evaluate.");
        return Ok(());
    }

    let evaluator = Evaluator::new(app.assistant()?, app.chat_model.clone());
    let report = evaluator.run(questions).await;
    let (json_path, csv_path) = report.save(output)?;

    println!("Evaluated {} questions.", report.records.len());
    if let (Some(faithfulness), Some(relevancy)) =
        (report.mean_faithfulness(), report.mean_relevancy())
    {
        println!("Mean faithfulness: {faithfulness:.2}");
        println!("Mean relevancy:    {relevancy:.2}");
    }
    println!("Details: {}", json_path.display());
    println!("Summary: {}", csv_path.display());
    Ok(())
}
