use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use blocklink_rs::config::PipelineConfig;
use blocklink_rs::model::{row, LinkType, Row, Value};

const SURNAMES: &[&str] = &[
    "Jones", "Smith", "Taylor", "Brown", "Wilson", "Evans", "Thomas", "Roberts",
];
const CITIES: &[&str] = &["Leeds", "York", "Hull", "Sheffield", "Bradford"];

/// Generate a person table with `unique_id`, `surname`, `dob` and `city`
/// columns. With probability `shared_probability` a record draws its
/// surname and birth date from small shared pools (creating blockable
/// duplicates); otherwise both are unique to the record.
#[allow(dead_code)]
pub fn generate_people(count: u32, shared_probability: f64, seed: u64) -> Vec<Row> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(count as usize);

    for i in 0..count {
        let (surname, dob) = if rng.random_bool(shared_probability) {
            let surname = SURNAMES[rng.random_range(0..SURNAMES.len())].to_string();
            let dob = format!("19{:02}-01-01", rng.random_range(50..60));
            (surname, dob)
        } else {
            let surname = format!("Surname{:06}", i);
            let dob = format!(
                "19{:02}-{:02}-{:02}",
                rng.random_range(10..99),
                rng.random_range(1..13),
                rng.random_range(1..29)
            );
            (surname, dob)
        };
        let city = CITIES[rng.random_range(0..CITIES.len())].to_string();

        rows.push(row([
            ("unique_id", Value::Int(i as i64)),
            ("surname", Value::Text(surname)),
            ("dob", Value::Text(dob)),
            ("city", Value::Text(city)),
        ]));
    }

    rows
}

/// A scored self-link table with `match_weight` / `match_probability`
/// columns, one row per (weight, probability) entry.
#[allow(dead_code)]
pub fn scored_self_link(scores: &[(f64, f64)]) -> Vec<Row> {
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

/// Dedupe configuration over a single `people` table.
#[allow(dead_code)]
pub fn dedupe_config() -> PipelineConfig {
    PipelineConfig {
        link_type: LinkType::DedupeOnly,
        unique_id_column: "unique_id".to_string(),
        source_tables: vec!["people".to_string()],
        retain_columns: vec!["surname".to_string(), "dob".to_string()],
    }
}

/// Link configuration over two tables.
#[allow(dead_code)]
pub fn link_config(link_type: LinkType) -> PipelineConfig {
    PipelineConfig {
        link_type,
        unique_id_column: "unique_id".to_string(),
        source_tables: vec!["left_people".to_string(), "right_people".to_string()],
        retain_columns: vec!["surname".to_string()],
    }
}
