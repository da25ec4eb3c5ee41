use std::{
    env, fs,
    io::{self, Write},
    path::Path,
    process,
};

use tracing_subscriber::EnvFilter;
use twine::{
    bridge::Bridge,
    config::BridgeConfig,
    object::Runtime,
    script::{leak_detector, Interp},
};

fn main() {
    let mut args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|arg| arg == "--verbose");
    let trace = args.iter().any(|arg| arg == "--trace");
    let leak_detector = args.iter().any(|arg| arg == "--leak-detector");
    let object_first = args.iter().any(|arg| arg == "--object-first");
    if verbose {
        args.retain(|arg| arg != "--verbose");
    }
    if trace {
        args.retain(|arg| arg != "--trace");
    }
    if leak_detector {
        args.retain(|arg| arg != "--leak-detector");
    }
    if object_first {
        args.retain(|arg| arg != "--object-first");
    }
    let config = match extract_config(&mut args) {
        Some(config) => config,
        None => process::exit(2),
    };

    init_logging(verbose, trace);

    if args.len() < 2 {
        print_help();
        return;
    }

    let bridge = match start(config, object_first) {
        Ok(bridge) => bridge,
        Err(error) => {
            eprintln!("Error: {error}");
            process::exit(1);
        }
    };

    let status = match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
            0
        }
        "-c" => {
            if args.len() < 3 {
                eprintln!("Usage: twine -c <script>");
                2
            } else {
                run_script(&bridge, &args[2])
            }
        }
        "interact" => interact(&bridge),
        "shell" => shell(&bridge),
        path => run_file(&bridge, path),
    };

    if leak_detector {
        print_leak_stats();
    }
    if status != 0 {
        process::exit(status);
    }
}

fn print_help() {
    println!(
        "\
Twine CLI

Usage:
  twine <file>
  twine -c <script>
  twine interact
  twine shell

Flags:
  --verbose          Log bridge crossings (debug level)
  --trace            Log everything (trace level)
  --config <file>    Load bridge settings from a JSON file
  --object-first     Start the object runtime first and pair the interpreter with it
  --leak-detector    Print live value and proxy counts on exit
  -h, --help         Show this help message

RUST_LOG overrides the level chosen by --verbose and --trace.
"
    );
}

fn init_logging(verbose: bool, trace: bool) {
    let default = if trace {
        "trace"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Pull `--config <file>` out of the arguments. `None` after reporting an
/// unusable configuration.
fn extract_config(args: &mut Vec<String>) -> Option<BridgeConfig> {
    let Some(index) = args.iter().position(|arg| arg == "--config") else {
        return Some(BridgeConfig::default());
    };
    if index + 1 >= args.len() {
        eprintln!("Usage: --config <file.json>");
        return None;
    }
    let path = args.remove(index + 1);
    args.remove(index);
    match BridgeConfig::load(Path::new(&path)) {
        Ok(config) => Some(config),
        Err(error) => {
            eprintln!("Error: {error}");
            None
        }
    }
}

fn start(config: BridgeConfig, object_first: bool) -> twine::Result<Bridge> {
    if object_first {
        Bridge::from_runtime(Runtime::new(), config)
    } else {
        Bridge::from_interp(&Interp::new(), config)
    }
}

fn run_file(bridge: &Bridge, path: &str) -> i32 {
    match fs::read_to_string(path) {
        Ok(source) => run_script(bridge, &source),
        Err(error) => {
            eprintln!("Error reading {path}: {error}");
            1
        }
    }
}

fn run_script(bridge: &Bridge, source: &str) -> i32 {
    match bridge.interp().eval_global(source) {
        Ok(_) => 0,
        Err(error) => {
            eprintln!("{}", error.error_info());
            1
        }
    }
}

fn interact(bridge: &Bridge) -> i32 {
    let stdin = io::stdin();
    match bridge.session().interact(&mut stdin.lock(), &mut io::stdout()) {
        Ok(()) => {
            println!();
            0
        }
        Err(error) => {
            eprintln!("Error: {error}");
            1
        }
    }
}

fn shell(bridge: &Bridge) -> i32 {
    let stdin = io::stdin();
    match bridge.session().shell(&mut stdin.lock(), &mut io::stdout()) {
        Ok(()) => {
            println!();
            0
        }
        Err(error) => {
            eprintln!("Error: {error}");
            1
        }
    }
}

fn print_leak_stats() {
    let stats = leak_detector::snapshot();
    let mut stderr = io::stderr();
    let _ = writeln!(
        stderr,
        "leaks: values {} live ({} created, {} released), proxies {} live ({} created, {} released)",
        stats.live_objs(),
        stats.objs_created,
        stats.objs_released,
        stats.live_proxies(),
        stats.proxies_created,
        stats.proxies_released,
    );
}
