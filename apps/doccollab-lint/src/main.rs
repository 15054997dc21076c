//! doccollab-lint CLI binary entry point.
//! Delegates to the library runner and prints results.

use clap::Parser;
use doccollab_lint::cli::{Cli, Commands};
use doccollab_lint::config::{self, Effective};
use doccollab_lint::error::{exit_code, LintError};
use doccollab_lint::utils::{error_prefix, note_prefix};
use doccollab_lint::{lint, output};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOCCOLLAB_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn note_defaults(eff: &Effective) {
    if eff.output != "json" && config::load_config(&eff.repo_root).is_none() {
        eprintln!("{} No doccollab.toml found; using defaults.", note_prefix());
    }
}

fn run(cli: Cli) -> Result<i32, LintError> {
    let repo_root = cli.repo_root.as_deref();
    let out = cli.output.as_deref();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_code::CLEAN)
        }
        Commands::Lint { paths } => {
            let eff = config::resolve_effective(repo_root, out, None, None, None);
            note_defaults(&eff);
            let res = lint::run_lint(&eff, &paths)?;
            output::print_lint(&res, &eff.output);
            Ok(if res.has_errors() {
                exit_code::ISSUES
            } else {
                exit_code::CLEAN
            })
        }
        Commands::Fix {
            paths,
            write,
            diff,
            check,
        } => {
            let eff = config::resolve_effective(
                repo_root,
                out,
                write.then_some(true),
                diff.then_some(true),
                check.then_some(true),
            );
            note_defaults(&eff);
            // --diff and --check never write, whatever the config says.
            let eff_write = eff.write && !(eff.diff || eff.check);
            let results = lint::run_fix(&eff, &paths, eff_write, eff.diff)?;
            output::print_fix(&results, &eff.output);
            Ok(if eff.check && results.iter().any(|r| r.changed) {
                exit_code::ISSUES
            } else {
                exit_code::CLEAN
            })
        }
        Commands::Refactor {
            kind,
            file,
            write,
            diff,
        } => {
            let eff = config::resolve_effective(repo_root, out, None, None, None);
            let path = Path::new(&file);
            let res = lint::run_refactor(path, &kind, write)?;
            let shown = lint::display_path(&eff.repo_root, path);
            output::print_patch(&shown, &res, &eff.output, write, diff);
            Ok(exit_code::CLEAN)
        }
        Commands::Suggest { file } => {
            let eff = config::resolve_effective(repo_root, out, None, None, None);
            let rep = lint::run_suggest(&eff.repo_root, Path::new(&file))?;
            output::print_suggest(&rep, &eff.output);
            Ok(exit_code::CLEAN)
        }
        Commands::Apply {
            patch,
            file,
            write,
            diff,
        } => {
            let eff = config::resolve_effective(repo_root, out, None, None, None);
            let path = Path::new(&file);
            let res = lint::run_apply(path, &patch, write)?;
            let shown = lint::display_path(&eff.repo_root, path);
            output::print_patch(&shown, &res, &eff.output, write, diff);
            Ok(exit_code::CLEAN)
        }
        Commands::Sanitize { file, patch, strip } => {
            let eff = config::resolve_effective(repo_root, out, None, None, None);
            let verdict = if strip {
                lint::run_strip(&eff.repo_root, Path::new(&file))?
            } else {
                lint::run_sanitize(&eff.repo_root, Path::new(&file), patch.as_deref())?
            };
            output::print_verdict(&verdict, &eff.output);
            Ok(if verdict.safe {
                exit_code::CLEAN
            } else {
                exit_code::ISSUES
            })
        }
        Commands::Log { file } => {
            let eff = config::resolve_effective(repo_root, out, None, None, None);
            let rep = lint::run_log(&eff.repo_root, Path::new(&file))?;
            output::print_log(&rep, &eff.output);
            Ok(if rep.errors() > 0 {
                exit_code::ISSUES
            } else {
                exit_code::CLEAN
            })
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", error_prefix(), e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}
