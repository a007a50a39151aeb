//! Command-line probe for `grocery_core`.
//!
//! # Responsibility
//! - Open the core against one data directory and run a single command.
//! - Keep output plain and deterministic for local sanity checks.
//!
//! Usage:
//!   grocery_cli version
//!   grocery_cli summary <data-dir>
//!   grocery_cli add <data-dir> <list-name> <text>
//!   grocery_cli export <data-dir>
//!   grocery_cli import <data-dir> <file>
//!
//! Set `GROCERY_LOG_DIR` to an absolute path to enable file logging.

use grocery_core::{open_data_dir, GroceryStore, StoreConfig};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    if let Ok(log_dir) = std::env::var("GROCERY_LOG_DIR") {
        grocery_core::init_logging(grocery_core::default_log_level(), log_dir)?;
    }

    let command = args.first().map(String::as_str).unwrap_or("version");
    if command == "version" {
        println!("grocery_core version={}", grocery_core::core_version());
        return Ok(());
    }

    let data_dir = args.get(1).ok_or_else(|| format!("`{command}` needs a data directory"))?;
    let mut store = open_store(data_dir)?;
    info!(
        "event=cli_command module=cli status=start command={command} mode={}",
        store.storage_mode().as_str()
    );

    match command {
        "summary" => print_summary(&store),
        "add" => {
            let list_name = args.get(2).ok_or("`add` needs a list name")?;
            let text = args.get(3).ok_or("`add` needs item text")?;
            let list_id = match store.lists().iter().find(|list| &list.name == list_name) {
                Some(list) => list.id.clone(),
                None => store.create_list(list_name).map_err(|err| err.to_string())?,
            };
            let created = store
                .add_item_quick(&list_id, text, None)
                .map_err(|err| err.to_string())?;
            println!("added={}", created.len());
        }
        "export" => {
            let json = store.export_json().map_err(|err| err.to_string())?;
            println!("{json}");
        }
        "import" => {
            let path = args.get(2).ok_or("`import` needs a file")?;
            let text = std::fs::read_to_string(path)
                .map_err(|err| format!("cannot read `{path}`: {err}"))?;
            let warnings = store.import_json(&text).map_err(|err| err.to_string())?;
            for warning in &warnings {
                println!("warning: {warning}");
            }
            print_summary(&store);
        }
        other => return Err(format!("unknown command `{other}`")),
    }

    match store.persist_error() {
        Some(message) => Err(format!("changes kept in memory but not saved: {message}")),
        None => Ok(()),
    }
}

fn open_store(data_dir: &str) -> Result<GroceryStore, String> {
    let data_dir = open_data_dir(data_dir).map_err(|err| err.to_string())?;
    let mut store = GroceryStore::from_data_dir(data_dir, StoreConfig::default());
    store.init();
    if let Some(advisory) = store.error() {
        eprintln!("note: {advisory}");
    }
    Ok(store)
}

fn print_summary(store: &GroceryStore) {
    println!("storage={}", store.storage_mode().as_str());
    for list in store.lists() {
        println!(
            "list name={:?} items={} purchased={}",
            list.name,
            store.items_for_list(&list.id).len(),
            store.purchased_count(&list.id)
        );
    }
    println!(
        "history={} categories={}",
        store.item_history().len(),
        store.categories().len()
    );
}
