use anyhow::{Context, Result};
use presswork::{
    catalog::ImportProfile,
    mapping::store::MappingStore,
    parse,
    session::ImportSession,
    store::{json::JsonFileStore, RecordStore},
};
use std::{env, fs, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "usage: presswork <print-jobs|maintenance-tasks> <input-file> [data-dir]";

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) arguments ────────────────────────────────────────────────
    let mut args = env::args().skip(1);
    let profile_key = args.next().context(USAGE)?;
    let profile = ImportProfile::from_key(&profile_key)
        .with_context(|| format!("unknown profile '{}'\n{}", profile_key, USAGE))?;
    let input = args.next().context(USAGE)?;
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data".to_string()));
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {:?}", data_dir))?;

    // ─── 3) parse the input file ─────────────────────────────────────
    let text =
        fs::read_to_string(&input).with_context(|| format!("reading input file {}", input))?;
    let parsed = parse::parse_delimited(&text)?;
    if !parsed.duplicate_headers.is_empty() {
        warn!(
            headers = ?parsed.duplicate_headers,
            "duplicate header names; only the last column per name is used"
        );
    }
    info!(
        headers = parsed.headers.len(),
        rows = parsed.rows.len(),
        "parsed {}",
        input
    );

    // ─── 4) build the session from persisted mapping + known entities ─
    let mapping_store = MappingStore::new(data_dir.join("mappings"))?;
    let record_store = JsonFileStore::new(data_dir.join("records"))?;
    let persisted = mapping_store.load(profile);
    let known = record_store.list_entities(profile.entity_type()).await?;
    let session = ImportSession::new(profile, parsed, &persisted, known);

    // ─── 5) mapping gate ─────────────────────────────────────────────
    let missing = session.missing_required();
    if !missing.is_empty() {
        for label in &missing {
            eprintln!("required field unmapped: {}", label);
        }
        anyhow::bail!("{} required field(s) unmapped", missing.len());
    }

    // ─── 6) preview ──────────────────────────────────────────────────
    let preview = session.preview();
    println!("{} valid, {} invalid", preview.valid, preview.invalid);
    for row in session.processed_rows().iter().filter(|r| !r.is_valid) {
        println!("  row {}: {}", row.index + 1, row.errors.join("; "));
    }
    for (name, _) in session.resolutions().iter() {
        println!("  new {}: '{}'", profile.entity_type(), name);
    }

    // ─── 7) commit ───────────────────────────────────────────────────
    let outcome = session.commit(&record_store).await?;
    println!(
        "committed {} row(s), skipped {}, created {} new entit{}",
        outcome.committed,
        outcome.skipped,
        outcome.created_entities.len(),
        if outcome.created_entities.len() == 1 {
            "y"
        } else {
            "ies"
        }
    );
    if let Some(reason) = &outcome.aborted {
        anyhow::bail!(
            "import aborted after {} committed row(s): {}",
            outcome.committed,
            reason
        );
    }

    // ─── 8) save mapping for the next session ────────────────────────
    mapping_store.save(profile, &session.persisted_state())?;
    info!("mapping saved; done");
    Ok(())
}
