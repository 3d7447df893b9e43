use std::path::Path;
use std::process::exit;

use finder_query::{
    FindOptions, NormalizeConfig, Pagination, QuerySchema, enable_grouping, parse_find_options,
    to_query_request,
};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: finder-inspect <schema.json> <find-options.json> [--group]";

fn read_json<T: DeserializeOwned>(path: &Path) -> T {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("failed to read {}: {e}", path.display());
        exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("failed to parse {}: {e}", path.display());
        exit(1);
    })
}

fn config_from_env() -> NormalizeConfig {
    let strict = std::env::var("FINDER_STRICT")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let page_size: Option<u32> = std::env::var("FINDER_PAGE_SIZE")
        .ok()
        .and_then(|s| s.parse().ok());

    let mut config = NormalizeConfig {
        strict,
        ..NormalizeConfig::default()
    };
    if let Some(size) = page_size {
        config.default_pagination = Pagination::paginate(size, 1);
    }
    config
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let group = args.iter().any(|a| a == "--group");
    let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let [schema_path, options_path] = paths.as_slice() else {
        eprintln!("{USAGE}");
        exit(2);
    };

    let schema: QuerySchema = read_json(Path::new(schema_path.as_str()));
    let fo: FindOptions = read_json(Path::new(options_path.as_str()));
    let config = config_from_env();

    let normalized = parse_find_options(&fo, &schema, &config).unwrap_or_else(|e| {
        eprintln!("{e}");
        exit(1);
    });
    for skipped in &normalized.skipped {
        eprintln!("skipped: {skipped}");
    }

    let mut fop = normalized.into_inner();
    if group {
        if let Err(e) = enable_grouping(&mut fop, &schema).await {
            eprintln!("{e}");
            exit(1);
        }
    }

    tracing::info!(query = %fop.query_key, grouped = fop.group_results, "built query request");
    match serde_json::to_string_pretty(&to_query_request(&fop)) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("failed to serialize request: {e}");
            exit(1);
        }
    }
}
