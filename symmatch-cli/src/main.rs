use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use symmatch::{
    collect_pdf_paths, collect_template_paths, FileSource, MatchRecord, MatchScanner, ScanConfig,
    ScanResult, SymbolFinder, Template, DEFAULT_MAX_TEMPLATES, DEFAULT_THRESHOLD,
};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Find symbol images embedded in PDF documents"
)]
struct Cli {
    /// PDF files or folders of PDF files to scan.
    #[arg(value_name = "PDF")]
    documents: Vec<PathBuf>,
    /// Template image; repeat for several templates (index order).
    #[arg(short, long = "template", value_name = "FILE")]
    templates: Vec<PathBuf>,
    /// Folder of template images, appended in file-name order.
    #[arg(long, value_name = "DIR")]
    template_dir: Option<PathBuf>,
    /// Exclusive minimum ZNCC score for a match (default 0.8).
    #[arg(long)]
    threshold: Option<f32>,
    /// Maximum number of templates (default 9).
    #[arg(long)]
    max_templates: Option<usize>,
    /// Scan documents in parallel.
    #[arg(long)]
    parallel: bool,
    /// Stop at the first match of a single template and report found/not found.
    #[arg(long)]
    find: bool,
    /// Emit a JSON report instead of text lines.
    #[arg(long)]
    json: bool,
    /// Write the report to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Path to a JSON configuration file; command-line options take precedence.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for scan progress.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum Mode {
    #[default]
    Scan,
    Find,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    documents: Vec<PathBuf>,
    templates: Vec<PathBuf>,
    template_dir: Option<PathBuf>,
    threshold: f32,
    max_templates: usize,
    parallel: bool,
    mode: Mode,
    format: Format,
    output_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            templates: Vec::new(),
            template_dir: None,
            threshold: DEFAULT_THRESHOLD,
            max_templates: DEFAULT_MAX_TEMPLATES,
            parallel: false,
            mode: Mode::Scan,
            format: Format::Text,
            output_path: None,
        }
    }
}

impl Config {
    /// Layers command-line options over the file config.
    fn apply_cli(mut self, cli: Cli) -> Self {
        self.documents.extend(cli.documents);
        self.templates.extend(cli.templates);
        if cli.template_dir.is_some() {
            self.template_dir = cli.template_dir;
        }
        if let Some(threshold) = cli.threshold {
            self.threshold = threshold;
        }
        if let Some(max_templates) = cli.max_templates {
            self.max_templates = max_templates;
        }
        self.parallel |= cli.parallel;
        if cli.find {
            self.mode = Mode::Find;
        }
        if cli.json {
            self.format = Format::Json;
        }
        if cli.output.is_some() {
            self.output_path = cli.output;
        }
        self
    }
}

#[derive(Debug, Serialize)]
struct MatchJson {
    page: usize,
    image_index: usize,
    template_index: usize,
    template: String,
    score: f32,
}

impl From<&MatchRecord> for MatchJson {
    fn from(value: &MatchRecord) -> Self {
        Self {
            page: value.page,
            image_index: value.image_index,
            template_index: value.template_index,
            template: value.template_name.clone(),
            score: value.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct DocumentJson {
    document: String,
    images_seen: usize,
    matches: Vec<MatchJson>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    threshold: f32,
    templates: Vec<String>,
    documents: Vec<DocumentJson>,
}

#[derive(Debug, Serialize)]
struct FindReport {
    template: String,
    found: bool,
    document: Option<String>,
    #[serde(rename = "match")]
    first: Option<MatchJson>,
}

fn display_name(document: &str) -> String {
    Path::new(document)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| document.to_owned())
}

fn render_scan_text(result: &ScanResult) -> String {
    let mut out = String::new();
    for entry in result.documents() {
        let name = display_name(&entry.document);
        if let Some(err) = &entry.error {
            out.push_str(&format!("{name}: error: {err}\n"));
        } else if entry.images_seen == 0 {
            out.push_str(&format!("{name}: no images found\n"));
        } else if entry.matches.is_empty() {
            out.push_str(&format!("{name}: no matches\n"));
        } else {
            for m in &entry.matches {
                out.push_str(&format!(
                    "{name}: page {}, image {}: template {} ({}) score {:.3}\n",
                    m.page, m.image_index, m.template_index, m.template_name, m.score
                ));
            }
        }
    }
    out
}

fn render_find_text(template: &str, first: Option<&MatchRecord>) -> String {
    match first {
        Some(m) => format!(
            "Symbol {template} found in {}: page {}, image {} (score {:.3})\n",
            display_name(&m.document),
            m.page,
            m.image_index,
            m.score
        ),
        None => format!("Symbol {template} not found.\n"),
    }
}

fn resolve_documents(config: &Config) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut documents = Vec::new();
    for path in &config.documents {
        documents.extend(collect_pdf_paths(path)?);
    }
    Ok(documents)
}

fn resolve_templates(config: &Config) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut templates = config.templates.clone();
    if let Some(dir) = &config.template_dir {
        templates.extend(collect_template_paths(dir)?);
    }
    Ok(templates)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.trace { "symmatch=info" } else { "symmatch=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => serde_json::from_str::<Config>(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    let config = config.apply_cli(cli);

    let documents = resolve_documents(&config)?;
    let templates = resolve_templates(&config)?;
    if documents.is_empty() {
        return Err("no PDF documents to scan".into());
    }
    if templates.is_empty() {
        return Err("at least one template image is required".into());
    }

    let report = match config.mode {
        Mode::Find => {
            if templates.len() != 1 {
                return Err("find mode takes exactly one template".into());
            }
            let finder = SymbolFinder::new(Template::load(&templates[0])?, config.threshold)?
                .with_parallel(config.parallel);
            let first = finder.first_match(&FileSource, &documents);
            let template = finder.template().name().to_owned();
            match config.format {
                Format::Text => render_find_text(&template, first.as_ref()),
                Format::Json => serde_json::to_string_pretty(&FindReport {
                    template,
                    found: first.is_some(),
                    document: first.as_ref().map(|m| m.document.clone()),
                    first: first.as_ref().map(MatchJson::from),
                })? + "\n",
            }
        }
        Mode::Scan => {
            let scanner = MatchScanner::from_template_paths(
                &templates,
                ScanConfig {
                    threshold: config.threshold,
                    max_templates: config.max_templates,
                    parallel: config.parallel,
                },
            )?;
            let result = scanner.scan_paths(&documents);
            match config.format {
                Format::Text => render_scan_text(&result),
                Format::Json => serde_json::to_string_pretty(&ScanReport {
                    threshold: config.threshold,
                    templates: scanner
                        .templates()
                        .iter()
                        .map(|tpl| tpl.name().to_owned())
                        .collect(),
                    documents: result
                        .documents()
                        .iter()
                        .map(|entry| DocumentJson {
                            document: entry.document.clone(),
                            images_seen: entry.images_seen,
                            matches: entry.matches.iter().map(MatchJson::from).collect(),
                            error: entry.error.as_ref().map(ToString::to_string),
                        })
                        .collect(),
                })? + "\n",
            }
        }
    };

    tracing::info!(
        documents = documents.len(),
        templates = templates.len(),
        "scan finished"
    );
    match config.output_path {
        Some(path) => fs::write(path, report)?,
        None => print!("{report}"),
    }

    Ok(())
}
