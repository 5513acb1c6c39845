//! Demo driver: runs the blocking pipeline and its analytics over a
//! small bundled dataset and prints the results as JSON.
//!
//! Usage: `blocklink_demo [config.toml]`. With a config file, the source
//! tables named there are seeded with the sample rows.

use anyhow::Result;
use blocklink_rs::model::{row, Row, Value};
use blocklink_rs::{BlockingRule, Blocklink, LinkType, PipelineConfig};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_env(Some(&path))?,
        None => demo_config(),
    };
    info!(link_type = %config.link_type, tables = config.source_tables.len(), "starting demo run");

    let mut linker = Blocklink::new(config)?;
    for table in linker.config().source_tables.clone() {
        linker.engine_mut().register(&table, sample_people())?;
    }
    linker.engine_mut().register("self_link", sample_self_link())?;

    let rules = BlockingRule::sequence([
        "l.surname = r.surname",
        "l.surname = r.surname and l.dob = r.dob",
        "l.city = r.city and l.dob = r.dob",
    ]);

    let stats = linker.cumulative_comparisons(&rules)?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    let unlinkables = linker.unlinkables("self_link", "match_probability")?;
    println!("{}", serde_json::to_string_pretty(&unlinkables)?);

    let blocked = linker.block_into(&rules, "blocked_pairs")?;
    info!(pairs = blocked, "candidate pairs materialised");
    linker.engine_mut().drop_table("blocked_pairs");

    Ok(())
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn demo_config() -> PipelineConfig {
    PipelineConfig {
        link_type: LinkType::DedupeOnly,
        unique_id_column: "unique_id".to_string(),
        source_tables: vec!["people".to_string()],
        retain_columns: vec!["surname".to_string(), "dob".to_string()],
    }
}

fn sample_people() -> Vec<Row> {
    let entries: &[(i64, &str, &str, &str)] = &[
        (0, "Jones", "1990-01-01", "Leeds"),
        (1, "Jones", "1990-01-01", "York"),
        (2, "Jones", "1971-06-30", "Leeds"),
        (3, "Smith", "1971-06-30", "Leeds"),
        (4, "Smith", "1982-11-12", "Hull"),
        (5, "Taylor", "1982-11-12", "Hull"),
        (6, "Evans", "1955-03-09", "York"),
    ];
    entries
        .iter()
        .map(|&(id, surname, dob, city)| {
            row([
                ("unique_id", Value::Int(id)),
                ("surname", surname.into()),
                ("dob", dob.into()),
                ("city", city.into()),
            ])
        })
        .collect()
}

fn sample_self_link() -> Vec<Row> {
    let scores: &[(f64, f64)] = &[
        (-4.2, 0.41),
        (-1.6, 0.68),
        (-1.5, 0.68),
        (2.8, 0.93),
        (11.0, 1.0),
    ];
    scores
        .iter()
        .map(|&(weight, probability)| {
            row([
                ("match_weight", Value::Float(weight)),
                ("match_probability", Value::Float(probability)),
            ])
        })
        .collect()
}
