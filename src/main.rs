use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reviewgraph::db::{migrate, Db};
use reviewgraph::error::ReviewgraphError;
use reviewgraph::{store, Config, EntityKind, Serializer};

#[derive(Parser, Debug)]
#[command(name = "reviewgraph")]
#[command(about = "Customers, items and reviews with cycle-safe JSON output", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations
    Migrate,
    /// Check tables, foreign keys and database integrity (default)
    Verify,
    /// Insert the sample customer, item and review into an empty database
    Seed,
    /// Create a customer
    AddCustomer {
        #[arg(long)]
        name: String,
    },
    /// Create an item
    AddItem {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
    },
    /// Create a review linking a customer and an item
    AddReview {
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        customer: Option<i64>,
        #[arg(long)]
        item: Option<i64>,
    },
    /// Add an item to a customer's items (creates a review without comment)
    AppendItem {
        #[arg(long)]
        customer: i64,
        #[arg(long)]
        item: i64,
    },
    /// Print one record as JSON
    Show {
        kind: EntityKind,
        id: i64,
        /// Extra serialize rule, e.g. `-reviews.item` or `items`; repeatable
        #[arg(short, long = "rule")]
        rules: Vec<String>,
    },
    /// List all records of a type
    List {
        kind: EntityKind,
        /// Print serialized JSON instead of one line per record
        #[arg(long)]
        json: bool,
    },
    /// Delete a record (fails while reviews still refer to it)
    Delete { kind: EntityKind, id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.reviewgraph.log_level.as_str())
    ).init();

    log::debug!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());
    let applied = db
        .with_connection(migrate::run_migrations)
        .await
        .context("Failed to run migrations")?;
    if applied > 0 {
        log::info!("Schema upgraded to version {}", migrate::LATEST_VERSION);
    }

    match args.command.unwrap_or(Command::Verify) {
        // migrations already ran above
        Command::Migrate => log::info!("Database is up to date"),
        Command::Verify => verify_database_schema(&db).await?,
        Command::Seed => seed(&db).await?,
        Command::AddCustomer { name } => {
            let customer = store::insert_customer(&db, &name).await?;
            println!("{}", customer);
        }
        Command::AddItem { name, price } => {
            let item = store::insert_item(&db, &name, price).await?;
            println!("{}", item);
        }
        Command::AddReview { comment, customer, item } => {
            let review = store::insert_review(&db, comment.as_deref(), customer, item).await?;
            let graph = store::load_graph(&db).await?;
            println!("{}", graph.describe(EntityKind::Review, review.id)?);
        }
        Command::AppendItem { customer, item } => {
            let review = store::append_customer_item(&db, customer, item).await?;
            let graph = store::load_graph(&db).await?;
            println!("{}", graph.describe(EntityKind::Review, review.id)?);
        }
        Command::Show { kind, id, rules } => {
            let serializer = Serializer::from_config(&config.serializer)?;
            let graph = store::load_graph(&db).await?;
            let record = graph.record(kind, id)?;
            let value = serializer.serialize_with_rules(&graph, record, rules.as_slice())?;
            print_json(&value, config.serializer.pretty)?;
        }
        Command::List { kind, json } => {
            let graph = store::load_graph(&db).await?;
            if json {
                let serializer = Serializer::from_config(&config.serializer)?;
                let value = serializer.serialize_many(&graph, graph.records(kind))?;
                print_json(&value, config.serializer.pretty)?;
            } else {
                for record in graph.records(kind) {
                    println!("{}", graph.describe(kind, record.id())?);
                }
            }
        }
        Command::Delete { kind, id } => {
            match kind {
                EntityKind::Customer => store::delete_customer(&db, id).await?,
                EntityKind::Item => store::delete_item(&db, id).await?,
                EntityKind::Review => store::delete_review(&db, id).await?,
            }
            log::info!("Deleted {} {}", kind, id);
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

/// Sample data: Ana reviews the Mug.
async fn seed(db: &Db) -> Result<()> {
    let graph = store::load_graph(db).await?;
    if !graph.is_empty() {
        log::warn!("Database already has data, skipping seed");
        return Ok(());
    }

    let ana = store::insert_customer(db, "Ana").await?;
    let mug = store::insert_item(db, "Mug", 9.99).await?;
    let review = store::insert_review(db, Some("Nice"), Some(ana.id), Some(mug.id)).await?;
    log::info!("Seeded customer {}, item {}, review {}", ana.id, mug.id, review.id);
    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let mut all_tables_exist = true;
        for kind in EntityKind::ALL {
            if tables.iter().any(|t| t == kind.table()) {
                log::debug!("✓ Table exists: {}", kind.table());
            } else {
                log::error!("Missing table: {}", kind.table());
                all_tables_exist = false;
            }
        }
        if !all_tables_exist {
            return Err(ReviewgraphError::Config("Not all required tables exist".to_string()));
        }

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(ReviewgraphError::Config("Foreign keys not enabled".to_string()));
        }
        log::debug!("✓ Foreign keys enabled");

        // Rows violating a foreign key (e.g. written with enforcement off)
        let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
        let violations = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        if !violations.is_empty() {
            return Err(ReviewgraphError::Integrity(format!(
                "{} row(s) violate foreign keys (tables: {})",
                violations.len(),
                violations.join(", ")
            )));
        }
        log::debug!("✓ No foreign key violations");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(ReviewgraphError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    }).await?;

    // Model rules are checked once here so misconfiguration shows up at startup
    Serializer::new(1)?;
    log::info!("✓ Database schema verification complete");
    Ok(())
}
