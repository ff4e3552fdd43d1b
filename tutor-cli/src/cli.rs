use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(about = "Answers questions grounded in your course material", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every subcommand; each one is also read from the
/// environment (and from `.env`).
#[derive(Args, Debug, Clone)]
pub struct Settings {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_BASE", global = true, help = "OpenAI-compatible API base URL")]
    pub api_base: Option<String>,

    #[arg(long, env = "TUTOR_CHAT_MODEL", global = true)]
    pub chat_model: Option<String>,

    #[arg(long, env = "TUTOR_EMBEDDING_MODEL", global = true)]
    pub embedding_model: Option<String>,

    #[arg(
        long,
        env = "TUTOR_DATA_DIR",
        default_value = "./data",
        global = true,
        help = "Directory holding the course material"
    )]
    pub data_dir: PathBuf,

    #[arg(
        long,
        env = "TUTOR_VECTOR_DB_PATH",
        default_value = "./vector_db",
        global = true,
        help = "Directory of the persistent vector index"
    )]
    pub vector_db_path: PathBuf,

    #[arg(long, env = "TUTOR_COLLECTION", default_value = "course_materials", global = true)]
    pub collection: String,

    #[arg(long, env = "TUTOR_TOP_K", global = true, help = "Chunks retrieved per question")]
    pub top_k: Option<usize>,

    #[arg(long, env = "TUTOR_CHUNK_SIZE", global = true)]
    pub chunk_size: Option<usize>,

    #[arg(long, env = "TUTOR_CHUNK_OVERLAP", global = true)]
    pub chunk_overlap: Option<usize>,

    #[arg(long, env = "TUTOR_EMBEDDING_DIMENSIONS", global = true)]
    pub embedding_dimensions: Option<usize>,

    #[arg(long, env = "TUTOR_TEMPERATURE", global = true)]
    pub temperature: Option<f32>,

    #[arg(long, env = "TUTOR_MAX_OUTPUT_TOKENS", global = true)]
    pub max_output_tokens: Option<u32>,

    #[arg(
        long,
        env = "TUTOR_OFFLINE",
        global = true,
        help = "Use deterministic local providers instead of the API (no key needed)"
    )]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Load, chunk and index the course material")]
    Ingest {
        #[arg(long, help = "Clear the collection before indexing")]
        rebuild: bool,
    },

    #[command(about = "Start an interactive tutoring session")]
    Chat,

    #[command(about = "Answer a single question")]
    Ask {
        #[arg(help = "The question to answer")]
        question: String,

        #[arg(short = 'k', long, help = "Chunks to retrieve (overrides --top-k)")]
        top_k: Option<usize>,
    },

    #[command(about = "Score answers to a question set with an LLM judge")]
    Eval {
        #[arg(short, long, help = "File with one question per line")]
        questions: PathBuf,

        #[arg(short, long, default_value = "./evaluation_results", help = "Output directory")]
        output: PathBuf,
    },

    #[command(about = "Show the number of indexed chunks")]
    Stats,

    #[command(about = "Remove every chunk from the collection")]
    Clear,
}
