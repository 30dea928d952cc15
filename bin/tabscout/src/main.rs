use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use tabscout_core::Config;
use tabscout_tools::{ToolContext, ToolRegistry};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "tabscout")]
#[command(about = "Research toolkit over a DevTools-enabled browser", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: ~/.tabscout/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// DevTools host override
    #[arg(long, global = true)]
    host: Option<String>,

    /// DevTools port override
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List inspectable browser tabs
    Tabs,

    /// Read the main content of a tab
    Read {
        /// Pick the tab by URL pattern
        #[arg(long)]
        url: Option<String>,
        /// Pick the tab by title pattern
        #[arg(long)]
        title: Option<String>,
        /// Pick the tab by index (0-based, discovery order)
        #[arg(long)]
        index: Option<usize>,
        /// Extract structured data instead of text: links, images,
        /// emails, prices or tables
        #[arg(long, value_name = "DATA_TYPE")]
        extract: Option<String>,
    },

    /// Evaluate a JavaScript expression in a tab
    Eval {
        expression: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        index: Option<usize>,
    },

    /// Summarize the first DOM element matching a CSS selector
    Inspect {
        selector: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        index: Option<usize>,
    },

    /// Capture a PNG screenshot of a tab
    Screenshot {
        /// File to write the image to (default: print base64 data)
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        index: Option<usize>,
    },

    /// Compare and rank sources from open tabs
    Compare {
        /// URL/title patterns selecting tabs
        patterns: Vec<String>,
    },

    /// Fact-check a claim across open tabs
    FactCheck {
        claim: String,
        /// URL/title patterns selecting tabs
        #[arg(long)]
        pattern: Vec<String>,
    },

    /// Chronological overview of dates mentioned per source
    Timeline {
        patterns: Vec<String>,
    },

    /// Extract references and links per source
    References {
        patterns: Vec<String>,
    },

    /// List registered tools
    Tools,
}

fn tab_selector(url: Option<String>, title: Option<String>, index: Option<usize>) -> Value {
    let mut params = json!({});
    if let Some(url) = url {
        params["url"] = json!(url);
    }
    if let Some(title) = title {
        params["title"] = json!(title);
    }
    if let Some(index) = index {
        params["tab_index"] = json!(index);
    }
    params
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.devtools.host = host;
    }
    if let Some(port) = cli.port {
        config.devtools.port = port;
    }

    let registry = ToolRegistry::with_defaults();
    let ctx = ToolContext::new(config);

    let (tool, params) = match cli.command {
        Commands::Tabs => ("devtools", json!({"action": "tabs"})),
        Commands::Read { url, title, index, extract } => {
            let mut params = tab_selector(url, title, index);
            match extract {
                Some(data_type) => {
                    params["action"] = json!("extract");
                    params["data_type"] = json!(data_type);
                }
                None => params["action"] = json!("read"),
            }
            ("read_page", params)
        }
        Commands::Eval { expression, url, title, index } => {
            let mut params = tab_selector(url, title, index);
            params["action"] = json!("evaluate");
            params["expression"] = json!(expression);
            ("devtools", params)
        }
        Commands::Inspect { selector, url, title, index } => {
            let mut params = tab_selector(url, title, index);
            params["action"] = json!("inspect");
            params["selector"] = json!(selector);
            ("devtools", params)
        }
        Commands::Screenshot { output, url, title, index } => {
            let mut params = tab_selector(url, title, index);
            params["action"] = json!("screenshot");
            if let Some(output) = output {
                params["path"] = json!(output);
            }
            ("devtools", params)
        }
        Commands::Compare { patterns } => (
            "research",
            json!({"action": "compare", "patterns": patterns}),
        ),
        Commands::FactCheck { claim, pattern } => (
            "research",
            json!({"action": "fact_check", "claim": claim, "patterns": pattern}),
        ),
        Commands::Timeline { patterns } => (
            "research",
            json!({"action": "timeline", "patterns": patterns}),
        ),
        Commands::References { patterns } => (
            "research",
            json!({"action": "references", "patterns": patterns}),
        ),
        Commands::Tools => {
            for schema in registry.get_tool_schemas() {
                println!(
                    "{:<12} {}",
                    schema["name"].as_str().unwrap_or(""),
                    schema["description"].as_str().unwrap_or("")
                );
            }
            return Ok(());
        }
    };

    let result = registry.execute(tool, ctx, params).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
