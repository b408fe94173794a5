use std::env;
use std::fs;
use std::process;

use tela::{Engine, TelaError, ViewModel};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: tela-render <template> [--model <model.json>] [--views <dir>]...");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  tela-render page.html");
        eprintln!("  tela-render page.html --model data.json --views views/");
        process::exit(1);
    }

    let mut template: Option<String> = None;
    let mut model_path: Option<String> = None;
    let mut view_dirs: Vec<String> = Vec::new();

    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--model" => match iter.next() {
                Some(path) => model_path = Some(path.clone()),
                None => {
                    eprintln!("--model requires a path");
                    process::exit(1);
                }
            },
            "--views" => match iter.next() {
                Some(dir) => view_dirs.push(dir.clone()),
                None => {
                    eprintln!("--views requires a directory");
                    process::exit(1);
                }
            },
            other => template = Some(other.to_string()),
        }
    }

    let Some(template) = template else {
        eprintln!("No template file given");
        process::exit(1);
    };

    match run(&template, model_path.as_deref(), &view_dirs) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("✗ {} failed to render:", template);
            print_error(&e);
            process::exit(1);
        }
    }
}

fn run(template: &str, model_path: Option<&str>, view_dirs: &[String]) -> Result<String, TelaError> {
    let src = fs::read_to_string(template).map_err(|e| TelaError::FileNotFound {
        path: format!("{} ({})", template, e),
        search_paths: Vec::new(),
    })?;

    let model = match model_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| TelaError::InvalidModel(format!("{}: {}", path, e)))?;
            ViewModel::from_json_str(&json)?
        }
        None => ViewModel::new(),
    };

    let engine = if view_dirs.is_empty() {
        Engine::new()
    } else {
        Engine::with_view_dirs(view_dirs.iter().cloned())
    };
    engine.render_str(&src, &model)
}

fn print_error(error: &TelaError) {
    match error {
        TelaError::Parse {
            position,
            fragment,
            message,
        } => {
            eprintln!("  Parse error at offset {}:", position);
            eprintln!("    {}", message);
            eprintln!("    near: {}", fragment);
        }
        TelaError::UnknownAttribute {
            component,
            attribute,
        } => {
            eprintln!("  Unknown attribute '{}' for component '{}'", attribute, component);
        }
        TelaError::InvalidValue {
            attribute,
            expected,
            got,
        } => {
            eprintln!("  Invalid value for attribute '{}':", attribute);
            eprintln!("    expected {}, got {}", expected, got);
        }
        TelaError::InvalidEnum {
            attribute,
            value,
            allowed,
        } => {
            eprintln!("  Invalid value '{}' for attribute '{}':", value, attribute);
            eprintln!("    expected one of: {}", allowed);
        }
        TelaError::MissingAttribute {
            component,
            attribute,
        } => {
            eprintln!(
                "  Missing required attribute '{}' for component '{}'",
                attribute, component
            );
        }
        TelaError::ViewNotFound { name, search_paths } => {
            eprintln!("  View '{}' not found. Searched:", name);
            for path in search_paths {
                eprintln!("    - {}", path);
            }
        }
        TelaError::FileNotFound { path, search_paths } => {
            eprintln!("  Cannot read file '{}'. Searched:", path);
            for dir in search_paths {
                eprintln!("    - {}", dir);
            }
        }
        e => {
            eprintln!("  {}", e);
        }
    }
}
