use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use varline::config::load_effective_config;
use varline::loader::FsLoader;
use varline::logging::init_logging;
use varline::model::{ExtractionRequest, FileRequest, VariableRequest};
use varline::resolver::process_request;
use varline::server::run_stdio_server;

#[derive(Debug, Parser)]
#[command(name = "varline")]
#[command(version)]
#[command(about = "Corrects caller-supplied variable line numbers against TypeScript/JavaScript source")]
struct Cli {
    /// Debug-level diagnostics on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start MCP stdio server
    Mcp,

    /// Resolve corrected lines and print the result as JSON
    Resolve {
        /// JSON request file (`{"files": [...]}`); use `-` for stdin
        #[arg(long, value_name = "PATH", conflicts_with_all = ["file", "vars"])]
        request: Option<PathBuf>,

        /// Source file to analyze (with --var)
        #[arg(long, value_name = "FILE", requires = "vars")]
        file: Option<String>,

        /// Variable to correct, as NAME:LINE (repeatable)
        #[arg(long = "var", value_name = "NAME:LINE", requires = "file")]
        vars: Vec<String>,
    },
}

fn parse_var(spec: &str) -> Result<VariableRequest> {
    let (name, line) = spec
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("expected NAME:LINE, got `{spec}`"))?;
    let line_number: u32 = line
        .trim()
        .parse()
        .with_context(|| format!("invalid line number in `{spec}`"))?;
    Ok(VariableRequest {
        name: name.trim().to_string(),
        line_number,
    })
}

fn read_request(path: &PathBuf) -> Result<ExtractionRequest> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).context("Request is not a valid {\"files\": [...]} document")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("Failed to get current dir")?;
    let cfg = load_effective_config(&cwd);
    init_logging(cli.verbose || cfg.verbose);

    match cli.cmd {
        Command::Mcp => run_stdio_server(),
        Command::Resolve { request, file, vars } => {
            let request = match (request, file) {
                (Some(path), _) => read_request(&path)?,
                (None, Some(file_name)) => ExtractionRequest {
                    files: vec![FileRequest {
                        file_name,
                        variables: vars.iter().map(|v| parse_var(v)).collect::<Result<_>>()?,
                    }],
                },
                (None, None) => bail!("Provide --request PATH or --file FILE --var NAME:LINE"),
            };

            let problems = request.validate();
            if !problems.is_empty() {
                bail!("Invalid request: {}", problems.join("; "));
            }

            let loader = FsLoader::new(&cwd, cfg.max_file_bytes);
            let result = process_request(&loader, &request);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}
