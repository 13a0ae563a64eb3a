use std::fs::File;
use std::io::{self, BufRead, BufReader};

use canvas::camera::Point;
use canvas::consts::DEFAULT_STROKE_COLOR;
use canvas::doc::{BoardId, StrokeId};
use clap::{Parser, Subcommand};
use client::net::{BoardChannel, HttpStrokeApi, NewStroke, StrokeApi, WsBoardChannel};
use client::{ClientConfig, SyncError};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("invalid point {0:?}; expected `x,y`")]
    InvalidPoint(String),
    #[error("stroke needs at least one point")]
    EmptyPath,
    #[error("line {line}: {source}")]
    InvalidLine { line: usize, source: serde_json::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "drawboard-cli", about = "Drawboard REST and relay CLI")]
struct Cli {
    #[arg(long, env = "DRAWBOARD_URL", default_value = client::config::DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server health endpoint.
    Ping,
    /// Mint an unused board code.
    NewBoard,
    /// Print a board's strokes as JSON.
    Strokes { board: BoardId },
    /// Post one stroke.
    Draw {
        board: BoardId,
        /// Whitespace-separated `x,y` pairs in canvas coordinates.
        #[arg(long)]
        points: String,
        #[arg(long, default_value = DEFAULT_STROKE_COLOR)]
        color: String,
    },
    /// Post strokes from JSON lines: `{"path":[{"x":..,"y":..}],"color":".."}` or a bare point array.
    Import {
        board: BoardId,
        #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
        input: String,
    },
    /// Delete one stroke.
    Erase { board: BoardId, stroke_id: StrokeId },
    /// Stream a board's relay events as JSON lines.
    Watch {
        board: BoardId,
        #[arg(long, help = "Exit after this many events")]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::new(cli.base_url);

    match cli.command {
        Command::Ping => run_ping(&config).await,
        Command::NewBoard => {
            let board = HttpStrokeApi::new(config).generate_board_id().await?;
            println!("{board}");
            Ok(())
        }
        Command::Strokes { board } => {
            let strokes = HttpStrokeApi::new(config).fetch_strokes(&board).await?;
            print_json(&serde_json::to_value(strokes)?)
        }
        Command::Draw { board, points, color } => {
            let path = parse_points(&points)?;
            let api = HttpStrokeApi::new(config);
            let stroke = api.create_stroke(&NewStroke { board_id: board, path, color }).await?;
            print_json(&serde_json::to_value(stroke)?)
        }
        Command::Import { board, input } => run_import(&HttpStrokeApi::new(config), board, &input).await,
        Command::Erase { board, stroke_id } => {
            HttpStrokeApi::new(config).delete_stroke(&board, stroke_id).await?;
            println!("erased {stroke_id}");
            Ok(())
        }
        Command::Watch { board, count } => run_watch(&WsBoardChannel::new(config), &board, count).await,
    }
}

async fn run_ping(config: &ClientConfig) -> Result<(), CliError> {
    let response = reqwest::Client::new().get(config.api_url("/healthz")).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_import(api: &dyn StrokeApi, board: BoardId, input: &str) -> Result<(), CliError> {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };

    let mut created = 0_usize;
    for (index, line) in reader.lines().enumerate() {
        let Some(line_stroke) = parse_stroke_line(&line?, index + 1)? else {
            continue;
        };
        let body = NewStroke { board_id: board.clone(), path: line_stroke.path, color: line_stroke.color };
        let stroke = api.create_stroke(&body).await?;
        created += 1;
        tracing::debug!(stroke_id = stroke.id, "stroke imported");
    }
    println!("imported {created} strokes into {board}");
    Ok(())
}

async fn run_watch(channel: &dyn BoardChannel, board: &BoardId, count: Option<usize>) -> Result<(), CliError> {
    let mut events = channel.subscribe(board).await?;
    let mut seen = 0_usize;
    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event?)?);
        seen += 1;
        if count.is_some_and(|limit| seen >= limit) {
            break;
        }
    }
    Ok(())
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_points(raw: &str) -> Result<Vec<Point>, CliError> {
    let path = raw
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',').ok_or_else(|| CliError::InvalidPoint(pair.to_owned()))?;
            match (x.trim().parse::<f64>(), y.trim().parse::<f64>()) {
                (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => Ok(Point::new(x, y)),
                _ => Err(CliError::InvalidPoint(pair.to_owned())),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    if path.is_empty() {
        return Err(CliError::EmptyPath);
    }
    Ok(path)
}

#[derive(Debug, PartialEq, Deserialize)]
struct LineStroke {
    path: Vec<Point>,
    #[serde(default = "default_color")]
    color: String,
}

fn default_color() -> String {
    DEFAULT_STROKE_COLOR.to_owned()
}

/// One import line. Blank lines and strokes with no points are skipped.
fn parse_stroke_line(line: &str, line_number: usize) -> Result<Option<LineStroke>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let invalid = |source| CliError::InvalidLine { line: line_number, source };
    let value = serde_json::from_str::<Value>(trimmed).map_err(invalid)?;
    let stroke = if value.is_array() {
        LineStroke { path: serde_json::from_value(value).map_err(invalid)?, color: default_color() }
    } else {
        serde_json::from_value::<LineStroke>(value).map_err(invalid)?
    };
    if stroke.path.is_empty() {
        return Ok(None);
    }
    Ok(Some(stroke))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
