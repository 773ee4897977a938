use std::env;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use pubrag_core::config::{expand_path, Config, Settings};
use pubrag_core::{Condition, FilterValue, GroupingMode, IndexField, LocalStorage, MetadataFilters, SearchRequest, VectorIndex};
use pubrag_embed::build_embedder;
use pubrag_engine::{Ingestor, RetrievalEngine};
use pubrag_vector::LanceIndex;

const USAGE: &str = "Usage: pubrag <command> [args...]

Commands:
  create-index                 create the vector index for the configured model
  ingest [documents_dir]       chunk, embed and index documents (dir relative to storage.root)
  query \"<text>\" [options]     semantic search
      --journal J --article-type T --year Y --years-after Y --years-before Y
      --date YYYY-MM-DD --year-month YYYY-MM --title T --authors A --keyword K
      --top-k N --top-n N --threshold S --global-sort
  distinct <field> [value]     distinct values of an index field with counts
  delete <field> <value>       delete records whose field equals value
  count                        number of indexed chunks";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

async fn open_index(settings: &Settings) -> anyhow::Result<LanceIndex> {
    let uri = expand_path(&settings.index.uri);
    let index = LanceIndex::connect(&uri.to_string_lossy(), &settings.index.table)
        .await
        .with_context(|| format!("opening index at {}", uri.display()))?;
    Ok(index)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn field_value(field: IndexField, raw: &str) -> anyhow::Result<FilterValue> {
    if field.is_numeric() {
        let n: i64 = raw.parse().with_context(|| format!("{} expects a number, got '{raw}'", field.name()))?;
        Ok(FilterValue::from(n))
    } else {
        Ok(FilterValue::from(raw))
    }
}

struct QueryArgs {
    request: SearchRequest,
    global_sort: bool,
}

fn parse_query(args: &[String], settings: &Settings) -> anyhow::Result<QueryArgs> {
    let mut query = None;
    let mut filters = MetadataFilters::default();
    let mut top_k = settings.retrieval.top_k;
    let mut top_n = settings.retrieval.top_n;
    let mut threshold = settings.retrieval.score_threshold;
    let mut global_sort = settings.retrieval.grouping == GroupingMode::GlobalSort;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--global-sort" {
            global_sort = true;
            i += 1;
            continue;
        }
        if !flag.starts_with("--") {
            if query.replace(args[i].clone()).is_some() {
                bail!("unexpected argument '{flag}'");
            }
            i += 1;
            continue;
        }
        let value = args.get(i + 1).cloned().ok_or_else(|| anyhow!("{flag} requires a value"))?;
        let number = |v: &str| v.parse::<i32>().with_context(|| format!("{flag} expects a number, got '{v}'"));
        match flag {
            "--journal" => filters.journal = Some(value),
            "--article-type" => filters.article_type = Some(value),
            "--year" => filters.year = Some(number(&value)?),
            "--years-after" => filters.years_after = Some(number(&value)?),
            "--years-before" => filters.years_before = Some(number(&value)?),
            "--date" => filters.date = Some(value),
            "--year-month" => filters.year_month = Some(value),
            "--title" => filters.title = Some(value),
            "--authors" => filters.authors = Some(value),
            "--keyword" => filters.keyword = Some(value),
            "--top-k" => top_k = value.parse().with_context(|| format!("--top-k expects a number, got '{value}'"))?,
            "--top-n" => top_n = value.parse().with_context(|| format!("--top-n expects a number, got '{value}'"))?,
            "--threshold" => {
                threshold = value.parse().with_context(|| format!("--threshold expects a number, got '{value}'"))?;
            }
            other => bail!("unknown option '{other}'"),
        }
        i += 2;
    }

    let query = query.ok_or_else(|| anyhow!("query text is required\n\n{USAGE}"))?;
    Ok(QueryArgs {
        request: SearchRequest {
            query,
            filters,
            top_k,
            top_n,
            score_threshold: threshold,
            embeddings_model: Some(settings.embedding.model.clone()),
        },
        global_sort,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = Config::load()
        .and_then(|c| c.settings())
        .map_err(|e| {
            eprintln!("Error loading config: {e}");
            e
        })?;
    let (cmd, args) = parse_args();

    match cmd.as_str() {
        "create-index" => {
            let embedder = build_embedder(&settings.embedding)?;
            let index = open_index(&settings).await?;
            index.create(embedder.dim()).await?;
            tracing::info!(table = %settings.index.table, dim = embedder.dim(), model = embedder.model_id(), "index created");
            print_json(&json!({ "table": settings.index.table, "dimension": embedder.dim() }))?;
        }
        "ingest" => {
            let storage = Arc::new(LocalStorage::new(settings.storage.root_path()));
            let embedder = build_embedder(&settings.embedding)?;
            let index = Arc::new(open_index(&settings).await?);
            let mut ingestor = Ingestor::new(&settings, storage, embedder, index)?.with_progress(true);
            if let Some(dir) = args.first() {
                ingestor = ingestor.with_documents_dir(dir.clone());
            }
            let report = ingestor.run().await?;
            print_json(&report)?;
        }
        "query" => {
            let parsed = parse_query(&args, &settings)?;
            let embedder = build_embedder(&settings.embedding)?;
            let index = Arc::new(open_index(&settings).await?);
            let mut engine = RetrievalEngine::from_settings(&settings.retrieval, embedder, index);
            if parsed.global_sort {
                engine = engine.with_grouping(GroupingMode::GlobalSort);
            }
            let response = engine.search(&parsed.request).await?;
            print_json(&response)?;
        }
        "distinct" => {
            let field = IndexField::parse(args.first().ok_or_else(|| anyhow!("distinct requires a field"))?)?;
            let index = open_index(&settings).await?;
            let values = index.distinct_values(field, args.get(1).map(String::as_str)).await?;
            print_json(&json!({ "field": field.name(), "values": values }))?;
        }
        "delete" => {
            let (Some(name), Some(raw)) = (args.first(), args.get(1)) else {
                bail!("delete requires <field> <value>");
            };
            let field = IndexField::parse(name)?;
            let index = open_index(&settings).await?;
            let deleted = index.delete_by_filter(&[Condition::eq(field, field_value(field, raw)?)]).await?;
            print_json(&json!({ "field": field.name(), "value": raw, "deleted": deleted }))?;
        }
        "count" => {
            let index = open_index(&settings).await?;
            print_json(&json!({ "table": settings.index.table, "count": index.count().await? }))?;
        }
        _ => {
            eprintln!("Unknown command: {cmd}\n\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}
