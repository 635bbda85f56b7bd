use clap::Parser;
use serde_json::Value;
use json_path_extract::{parse_return_expr, Engine, EngineOptions};
use tracing::Level;

/// Match a path expression against a JSON document.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON document (string). You can also pipe a file using shell quoting.
    json: String,
    /// Path expression, e.g. `$.nodes.${nodeId}.jvm`
    path: String,
    /// Drop matches that resolve to an already reported path
    #[arg(long)]
    distinct: bool,
    /// Reduce the matches with a return expression (`countMatches`, `pathTags:<name>`, ...)
    #[arg(long = "return", value_name = "EXPR")]
    return_expr: Option<String>,
    /// Read this attribute from the single matched object
    #[arg(long, conflicts_with = "return_expr")]
    attribute: Option<String>,
    /// Engine options as a JSON file
    #[arg(long, value_name = "FILE")]
    config: Option<std::path::PathBuf>,
    /// Reject paths ending in a dangling escape character
    #[arg(long)]
    strict_escapes: bool,
    /// Fallback JSON printed when nothing matches (optional)
    #[arg(long)]
    default: Option<String>,
    /// Log debug output to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    if let Err(msg) = run(&args) {
        eprintln!("{msg}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    // Parse input JSON.
    let data: Value = serde_json::from_str(&args.json).map_err(|e| format!("Invalid JSON: {e}"))?;

    // Build options.
    let mut opts = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {e}", path.display()))?;
            serde_json::from_str::<EngineOptions>(&text)
                .map_err(|e| format!("Invalid config {}: {e}", path.display()))?
        }
        None => EngineOptions::default(),
    };
    if args.strict_escapes {
        opts.strict_escapes = true;
    }
    let engine = Engine::with_options(opts);

    let out = if let Some(attribute) = &args.attribute {
        engine
            .read_attribute(&data, &args.path, attribute)
            .map_err(|e| e.to_string())?
            .unwrap_or(Value::Null)
    } else if let Some(expr) = &args.return_expr {
        let ret = parse_return_expr(expr).map_err(|e| e.to_string())?;
        engine.extract(&data, &args.path, &ret).map_err(|e| e.to_string())?
    } else {
        let matches = if args.distinct {
            engine.find_distinct_matching_paths(&data, &args.path)
        } else {
            engine.find_matching_paths(&data, &args.path)
        }
        .map_err(|e| e.to_string())?;
        serde_json::to_value(matches).map_err(|e| e.to_string())?
    };

    // Substitute the fallback for an empty result.
    let empty = matches!(&out, Value::Null) || matches!(&out, Value::Array(a) if a.is_empty());
    let out = match &args.default {
        Some(def) if empty => parse_default(def),
        _ => out,
    };

    // Output result.
    let text = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn parse_default(def: &str) -> Value {
    serde_json::from_str::<Value>(def).unwrap_or_else(|_| Value::String(def.to_string()))
}
