use anyhow::{Context, Result};
use dramatis_config::ProjectConfig;
use dramatis_engine::{export, Block, CharacterVerseTable, QuoteParser};
use std::{env, fs, process};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut as_script = false;
    let mut paths = Vec::new();
    for arg in &args[1..] {
        if arg == "--script" {
            as_script = true;
        } else {
            paths.push(arg.as_str());
        }
    }

    let (project_path, blocks_path) = match paths.as_slice() {
        [project, blocks] => (*project, *blocks),
        _ => {
            eprintln!("Usage: {} <project.toml> <blocks.json> [--script]", args[0]);
            eprintln!();
            eprintln!("Reads a book's unattributed blocks, attributes each block to a");
            eprintln!("speaker, and writes the result as JSON (or, with --script, as");
            eprintln!("tab-delimited script rows).");
            process::exit(1);
        }
    };

    let config = match ProjectConfig::load_from_path(project_path) {
        Ok(Some(config)) => config,
        Ok(None) => {
            eprintln!("Error: No project file found at {project_path}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let system = config
        .quote_system()
        .context("Invalid quote system in project file")?;
    let table = CharacterVerseTable::load(&config.control_file)
        .with_context(|| format!("Loading {}", config.control_file.display()))?;

    let blocks_json = fs::read_to_string(blocks_path)
        .with_context(|| format!("Reading {blocks_path}"))?;
    let blocks: Vec<Block> =
        serde_json::from_str(&blocks_json).with_context(|| format!("Parsing {blocks_path}"))?;

    let parser = QuoteParser::new(&table, &config.book_id, system);
    let attributed = parser.parse(&blocks);

    if as_script {
        for (index, block) in attributed.iter().enumerate() {
            println!(
                "{}",
                export::tab_delimited_line(block, index, &config.book_id, None)
            );
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&attributed)?);
    }

    Ok(())
}
