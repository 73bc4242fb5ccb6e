// evaluate: submit one résumé to a running evaluator and print the report.
//
// Usage:
//   evaluate cv.pdf
//   evaluate cv.pdf --server http://localhost:8080 --language en
//   evaluate cv.pdf --export reporte.txt

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use resume_evaluator::reconstructor::{reconstruct, Progress};
use resume_evaluator::report::{AssembledReport, ScoreBand};

/// Log progress every this many fragments.
const PROGRESS_EVERY: usize = 25;

#[derive(Parser)]
#[command(
    name = "evaluate",
    about = "Upload a PDF résumé to the evaluator and print the streamed report."
)]
struct Cli {
    /// PDF file to evaluate.
    file: PathBuf,

    /// Base URL of the evaluator service.
    #[arg(long, env = "EVALUATOR_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Language code for the generated texts.
    #[arg(long, default_value = "es")]
    language: String,

    /// Also write the paginated export document to this path.
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Give up when the stream is silent this long (0 waits forever).
    #[arg(long, default_value_t = 120)]
    idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    evaluation_id: String,
    file_data: String,
    filename: String,
    language: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateRequest<'a> {
    file_data: &'a str,
    filename: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let client = Client::new();
    let server = cli.server.trim_end_matches('/');

    let upload = upload(&client, server, &cli.file, &cli.language).await?;
    info!(
        evaluation_id = %upload.evaluation_id,
        filename = %upload.filename,
        "upload accepted"
    );

    let idle_timeout =
        (cli.idle_timeout_secs > 0).then_some(Duration::from_secs(cli.idle_timeout_secs));
    let report = evaluate(&client, server, &upload, idle_timeout).await?;
    print_report(&report);

    if let Some(path) = &cli.export {
        export(&client, server, &report, path).await?;
        info!(path = %path.display(), "export written");
    }

    Ok(())
}

async fn upload(
    client: &Client,
    server: &str,
    path: &Path,
    language: &str,
) -> Result<UploadResponse> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "curriculum.pdf".to_string());

    let part = Part::bytes(bytes)
        .file_name(filename)
        .mime_str("application/pdf")?;
    let form = Form::new()
        .part("file", part)
        .text("language", language.to_string());

    let response = client
        .post(format!("{server}/api/upload"))
        .multipart(form)
        .send()
        .await
        .context("upload request failed")?;
    Ok(check(response).await?.json().await?)
}

async fn evaluate(
    client: &Client,
    server: &str,
    upload: &UploadResponse,
    idle_timeout: Option<Duration>,
) -> Result<AssembledReport> {
    let response = client
        .post(format!("{server}/api/evaluate"))
        .json(&EvaluateRequest {
            file_data: &upload.file_data,
            filename: &upload.filename,
            language: &upload.language,
        })
        .send()
        .await
        .context("evaluate request failed")?;
    let response = check(response).await?;

    let mut next_log = PROGRESS_EVERY;
    let report = reconstruct(response.bytes_stream(), idle_timeout, |p: Progress| {
        if p.fragments >= next_log {
            info!(fragments = p.fragments, bytes = p.bytes, "still receiving");
            next_log = p.fragments + PROGRESS_EVERY;
        }
    })
    .await
    .context("evaluation did not produce a report")?;
    Ok(report)
}

async fn export(
    client: &Client,
    server: &str,
    report: &AssembledReport,
    path: &Path,
) -> Result<()> {
    let response = client
        .post(format!("{server}/api/export"))
        .json(report)
        .send()
        .await
        .context("export request failed")?;
    let text = check(response).await?.text().await?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// Passes success responses through; turns errors into their `message`.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => bail!("{} ({status})", err.message),
        Err(_) => bail!("server returned {status}"),
    }
}

fn print_report(report: &AssembledReport) {
    println!("Candidato: {}", report.candidate_name);
    println!(
        "Puntuación global: {}/100 ({})",
        report.overall_score,
        ScoreBand::of(report.overall_score).label()
    );
    println!();
    for (label, score) in report.category_scores() {
        println!("  {label:<24} {score:>3}  {}", ScoreBand::of(score).label());
    }

    let lists = [
        ("Fortalezas", &report.strengths),
        ("Áreas de mejora", &report.weaknesses),
        ("Recomendaciones", &report.recommendations),
    ];
    for (title, items) in lists {
        println!();
        println!("{title}:");
        for item in items.iter() {
            println!("  • {item}");
        }
    }

    if !report.market_comparison.is_empty() {
        println!();
        println!("Comparación con el mercado: {}", report.market_comparison);
    }
}
