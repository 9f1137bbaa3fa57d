//! `mcqgen` command-line interface.
//!
//! ```bash
//! export GOOGLE_API_KEY=...
//! mcqgen --file chapter3.pdf --questions 5 --subject Biology --difficulty medium
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use mcqgen::{Difficulty, GeneratorConfigBuilder, MAX_QUESTIONS, QuizGenerator, QuizRequest, ResponseSchema};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Generate a multiple-choice quiz from a PDF or text file")]
struct Args {
    /// PDF or TXT file to build the quiz from
    #[arg(short, long)]
    file: PathBuf,

    /// Model family: google, gpt-3.5-turbo, gpt-4 or gpt-4-turbo (defaults to MCQGEN_MODEL, then google)
    #[arg(short, long)]
    model: Option<String>,

    /// Number of questions
    #[arg(short = 'n', long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_QUESTIONS)))]
    questions: u32,

    #[arg(short, long, default_value = "General Knowledge")]
    subject: String,

    /// Easy, Medium or Hard
    #[arg(short, long, default_value = "easy")]
    difficulty: Difficulty,

    /// Focus retrieval on this topic
    #[arg(short, long)]
    query: Option<String>,

    /// Custom response.json exemplar
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Also write the quiz to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(e) = mcqgen_telemetry::init_telemetry("mcqgen") {
        eprintln!("warning: logging disabled: {e}");
    }

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut builder = GeneratorConfigBuilder::from_env()?;
    if let Some(model) = args.model {
        builder = builder.model(model);
    }
    let generator = QuizGenerator::new(builder.build()?)?;

    let mut request = QuizRequest::new(args.questions, args.subject, args.difficulty);
    if let Some(query) = args.query {
        request = request.with_query(query);
    }
    request.validate()?;

    let schema = match &args.schema {
        Some(path) => ResponseSchema::from_path(path)?,
        None => ResponseSchema::builtin()?,
    };

    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .context("file path has no usable file name")?
        .to_string();
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("cannot read {}", args.file.display()))?;

    let index = generator.process_file(&file_name, bytes).await?;
    let quiz = generator.generate(&index, &request, &schema).await?;
    let rendered = quiz.to_string();
    print!("{rendered}");

    if let Some(output) = args.output {
        tokio::fs::write(&output, &rendered)
            .await
            .with_context(|| format!("cannot write {}", output.display()))?;
        info!(path = %output.display(), "quiz saved");
    }

    Ok(())
}
