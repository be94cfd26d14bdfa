//! Sectional CLI
//!
//! Usage:
//!   sectional [OPTIONS] <CATALOG>
//!
//! Options:
//!   -t, --type <TYPE>          Template type to render
//!   -n, --name <NAME>          Template name (defaults to the type's default)
//!   -c, --compiler <NAME>      Render a compiler instead of a typed template
//!   -d, --data <FILE>          JSON data passed to the render call ("-" for stdin)
//!   -l, --list                 List types, templates and compilers
//!   -v, --verbose              Debug logging
//!   -h, --help                 Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use sectional::{Catalog, TemplateRegistry};

#[derive(Parser)]
#[command(name = "sectional")]
#[command(about = "Render section templates declared in a TOML catalog")]
struct Cli {
    /// Catalog file declaring templates and compilers (TOML format)
    catalog: PathBuf,

    /// Template type to render
    #[arg(short = 't', long = "type")]
    template_type: Option<String>,

    /// Template name (defaults to the type's default template)
    #[arg(short, long)]
    name: Option<String>,

    /// Render a named compiler instead of a typed template
    #[arg(short, long, conflicts_with_all = ["template_type", "name"])]
    compiler: Option<String>,

    /// JSON data file passed to the render call ("-" reads stdin)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// List registered types, templates and compilers
    #[arg(short, long)]
    list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let catalog = match Catalog::from_file(&cli.catalog) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error loading catalog '{}': {}", cli.catalog.display(), e);
            process::exit(1);
        }
    };

    let mut registry = TemplateRegistry::new();
    if let Err(e) = catalog.install(&mut registry) {
        eprintln!("Error installing catalog '{}': {}", cli.catalog.display(), e);
        process::exit(1);
    }

    if cli.list {
        print_listing(&mut registry);
        return;
    }

    let data = match &cli.data {
        Some(path) => match read_data(path) {
            Ok(data) => Some(data),
            Err(e) => {
                eprintln!("Error reading data '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => None,
    };

    if let Some(name) = &cli.compiler {
        match registry.render(name, data.as_ref()) {
            Some(output) => println!("{}", output),
            None => {
                eprintln!("Error: no compiler named '{}'", name);
                process::exit(1);
            }
        }
        return;
    }

    let template_type = match cli.template_type.clone().map_or_else(|| single_type(&registry), Ok) {
        Ok(template_type) => template_type,
        Err(message) => {
            eprintln!("Error: {}", message);
            process::exit(1);
        }
    };

    let mut template = match registry.template_instance(&template_type, cli.name.as_deref()) {
        Ok(template) => template,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match template.render(data.as_ref()) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e.report(&template_type));
            process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_data(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&content)?)
}

/// The type to render when `--type` is not given
fn single_type(registry: &TemplateRegistry) -> Result<String, &'static str> {
    match registry.types().as_slice() {
        [only] => Ok(only.clone()),
        [] => Err("the catalog declares no templates"),
        _ => Err("the catalog declares several types, choose one with --type"),
    }
}

fn print_listing(registry: &mut TemplateRegistry) {
    for template_type in registry.types() {
        let default = registry.default_template(&template_type);
        println!("{}", template_type);
        for name in registry.template_names(&template_type) {
            let marker = if default.as_deref() == Some(name.as_str()) { " (default)" } else { "" };
            println!("  {}{}", name, marker);
        }
    }

    let compilers = registry.compilers();
    if !compilers.is_empty() {
        println!("compilers");
        for name in compilers {
            println!("  {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use sectional::Template;

    use super::*;

    #[test]
    fn test_single_type_needs_templates() {
        let registry = TemplateRegistry::new();
        assert_eq!(single_type(&registry), Err("the catalog declares no templates"));
    }

    #[test]
    fn test_single_type_picks_the_only_type() {
        let mut registry = TemplateRegistry::new();
        registry.register("page", "a", Template::new);
        registry.register("page", "b", Template::new);
        assert_eq!(single_type(&registry), Ok("page".to_string()));
    }

    #[test]
    fn test_single_type_asks_for_a_choice() {
        let mut registry = TemplateRegistry::new();
        registry.register("page", "a", Template::new);
        registry.register("card", "b", Template::new);
        let message = single_type(&registry).unwrap_err();
        assert!(message.contains("--type"));
    }
}
