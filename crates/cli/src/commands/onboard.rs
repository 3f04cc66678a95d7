//! `anvil onboard` — First-time setup.

use std::path::PathBuf;

use anvil_config::AppConfig;
use anvil_tools::KvStore;

pub async fn run(config_path: Option<&PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .cloned()
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("⚒️  Anvil — First-Time Setup");
    println!("============================\n");

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.exists() {
            std::fs::create_dir_all(config_dir)?;
            println!("✅ Created config directory: {}", config_dir.display());
        } else {
            println!("  Config directory exists: {}", config_dir.display());
        }
    }

    // Create config file
    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    // Everything below follows whatever the config now says
    let config = crate::load_config(Some(&config_path))?;

    if !config.agent.base_dir.exists() {
        std::fs::create_dir_all(&config.agent.base_dir)?;
        println!("✅ Created workspace directory: {}", config.agent.base_dir.display());
    } else {
        println!("  Workspace exists: {}", config.agent.base_dir.display());
    }

    let store = KvStore::open(&config.database.path)?;
    println!("✅ Database ready at: {}", store.path().display());

    println!("\n📝 Next steps:");
    println!("   1. Edit {} and add your API key", config_path.display());
    println!("      (or set ANVIL_API_KEY)");
    println!("   2. Run: anvil agent");
    println!("   3. Give it a task!\n");

    Ok(())
}
