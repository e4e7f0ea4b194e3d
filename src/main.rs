use std::process::ExitCode;

use litestore::catalog::{Catalog, CreateIndexData, CreateTableData, InsertData, QueryData};
use litestore::common::StorageConfig;
use litestore::record::{Schema, Value};
use litestore::scan::{CompareOp, Predicate, Term};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "litestore-demo".to_string());

    match run(&data_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}

fn run(data_dir: &str) -> litestore::Result<()> {
    let config = StorageConfig::new(data_dir).with_pool_size(10);
    info!(data_dir, "starting");

    let catalog = Catalog::open(&config)?;

    let schema = Schema::builder()
        .integer("id")
        .varchar("name", 32)
        .varchar("city", 32)
        .build();
    catalog.create_table(&CreateTableData::new("users", schema))?;

    let users = [
        (1, "alice", "lisbon"),
        (2, "bob", "oslo"),
        (3, "carol", "lisbon"),
        (4, "dave", "quito"),
    ];
    for (id, name, city) in users {
        let rid = catalog.insert(&InsertData::new(
            "users",
            vec!["id".into(), "name".into(), "city".into()],
            vec![Value::Int(id), Value::from(name), Value::from(city)],
        ))?;
        println!("Inserted {} at {}", name, rid);
    }

    catalog.create_index(&CreateIndexData::new("users_id", "users", "id"), true)?;
    catalog.create_index(&CreateIndexData::new("users_city", "users", "city"), false)?;

    let query = QueryData::new(
        "users",
        vec!["name".into()],
        Predicate::from_term(Term::new("city", CompareOp::Equals, "lisbon")),
    );
    println!("\nUsers in lisbon:");
    for record in catalog.query(&query)? {
        println!("  - {}", record.values()[0]);
    }

    {
        let table = catalog.table("users")?;
        let table = table.lock();
        println!("\nTable {} ({}):", table.name(), table.file_name());
        for index in table.indexes() {
            println!(
                "  - index {} on {} ({} entries, height {})",
                index.name(),
                index.column_name(),
                index.len(),
                index.tree().height()
            );
        }
    }

    catalog.flush_all()?;
    let pool = catalog.buffer_pool();
    println!("\nBuffer pool:");
    println!("  - Frames: {}", pool.pool_size());
    println!("  - Cached blocks: {}", pool.cached_block_count());
    println!("  - Hit ratio: {:.1}%", pool.hit_ratio());
    println!("  - Disk reads: {}", pool.file_manager().num_reads());
    println!("  - Disk writes: {}", pool.file_manager().num_writes());

    catalog.close()
}
