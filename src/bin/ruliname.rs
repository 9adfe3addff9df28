//! ruliname 命令行：校验规则文件、测试URL匹配、对本地HTML执行一次完整的重命名流程

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ruliname::{
    ConfigManager, ContentScript, Coordinator, Document, MemoryScriptRegistry, PageDocument, RuleMap,
    TabInfo, channel,
};

#[derive(Parser)]
#[command(name = "ruliname")]
#[command(about = "Rule-based page title renaming", long_about = None)]
struct Cli {
    /// Enable debug-level logging to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a rules file and list its rules in order.
    Check {
        /// Rules file (`{ruleId: {match, rename}}`).
        rules: PathBuf,
    },

    /// Print the first rule matching a URL.
    Match {
        rules: PathBuf,
        url: String,
    },

    /// Resolve the title of a local HTML page with the rule matching `url`.
    Resolve {
        rules: PathBuf,
        url: String,
        /// HTML file standing in for the page.
        html: PathBuf,
        #[arg(long, default_value_t = 10)]
        attempts: u32,
        /// Polling interval in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval: u64,
    },
}

async fn load_rules(path: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read rules file {}", path.display()))?;
    debug!("读取规则文件：{}（{} 字节）", path.display(), text.len());
    Ok(text)
}

async fn check(rules: PathBuf) -> Result<()> {
    let map = RuleMap::import_json(&load_rules(&rules).await?)?;
    println!("{} rule(s) OK", map.len());
    for id in map.keys() {
        if let Some(Some(rule)) = map.get(id) {
            println!(
                "  {}: {} -> {} '{}'",
                id,
                rule.match_pattern(),
                rule.rename_definition().rule_type().as_str(),
                rule.rename_definition().value()
            );
        }
    }
    Ok(())
}

async fn match_url(rules: PathBuf, url: String) -> Result<()> {
    let map = RuleMap::import_json(&load_rules(&rules).await?)?;
    match map.get_by_url(&url) {
        Some(rule) => println!("{}", serde_json::to_string_pretty(&rule.to_json())?),
        None => println!("no rule matches {}", url),
    }
    Ok(())
}

async fn resolve(rules: PathBuf, url: String, html: PathBuf, attempts: u32, interval: u64) -> Result<()> {
    let stored = load_rules(&rules).await?;
    let page = tokio::fs::read_to_string(&html)
        .await
        .with_context(|| format!("failed to read page {}", html.display()))?;

    let config = ConfigManager::custom()
        .attempts(attempts)
        .interval(Duration::from_millis(interval))
        .observe_title_changes(false)
        .build();
    let coordinator = Coordinator::new(config, MemoryScriptRegistry::new());
    coordinator.init(Some(&stored)).await;
    if coordinator.rules().is_empty() {
        bail!("no valid rules loaded from {}", rules.display());
    }

    let document = PageDocument::parse(&page);
    let (client, receiver) = channel();
    let page_side = document.clone();
    let server = tokio::spawn(async move {
        ContentScript::new(page_side).serve(receiver).await;
    });

    let tab = TabInfo { id: 1, url };
    let response = coordinator
        .dispatch(&ContentScript::<PageDocument>::ready_signal(), &tab, &client)
        .await;
    drop(client);
    server.await?;

    match response {
        None => println!("no rule matches {}", tab.url),
        Some(response) => {
            let response = response?;
            println!("{}", serde_json::to_string(&response)?);
            println!("title: {}", document.title());
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();
    info!("ruliname 启动");

    match cli.command {
        Commands::Check { rules } => check(rules).await,
        Commands::Match { rules, url } => match_url(rules, url).await,
        Commands::Resolve {
            rules,
            url,
            html,
            attempts,
            interval,
        } => resolve(rules, url, html, attempts, interval).await,
    }
}
