mod binding;
mod cli;
mod error;
mod generators;
mod naming;
mod output;
mod resolver;
mod source;

use std::process::ExitCode;

use clap::Parser;
use dt_candid::ServiceFile;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use error::Error;
use generators::EmitOptions;
use source::Input;

/// Used when neither the command line, the file nor the input location names the service.
const DEFAULT_SERVICE_NAME: &str = "Service";

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &cli::Cli) -> Result<(), Error> {
    let input = Input::parse(&cli.input);
    let text = input.read()?;
    let file = dt_candid::parse_service_file(&text)?;
    debug!(
        declared_types = file.declared_types.len(),
        methods = file.service.methods.len(),
        "loaded service description"
    );

    let service_name = service_name(cli.service_name.as_deref(), &file, &input);
    let bindings = resolver::resolve_service_file(&service_name, &file)?;

    let options = EmitOptions {
        namespace: cli.namespace.clone(),
        runtime: cli.runtime.clone(),
    };
    let artifacts = cli.generator.generate(&bindings, &options)?;
    debug!(count = artifacts.len(), generator = ?cli.generator, "emitted artifacts");

    match &cli.out_dir {
        Some(out_dir) => {
            output::write_artifacts(out_dir, &options.namespace_dir()?, &artifacts)?;
        }
        None => output::print_artifacts(std::io::stdout().lock(), &artifacts).map_err(
            |source| Error::Write {
                path: "<stdout>".to_string(),
                source,
            },
        )?,
    }
    Ok(())
}

fn service_name(requested: Option<&str>, file: &ServiceFile, input: &Input) -> String {
    match (requested, file.service_name.as_deref()) {
        (Some(requested), Some(declared)) => {
            if requested != declared {
                warn!(%requested, %declared, "overriding the service name given in the file");
            }
            requested.to_string()
        }
        (Some(name), None) | (None, Some(name)) => name.to_string(),
        (None, None) => input
            .fallback_service_name()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use indoc::indoc;

    use super::*;

    fn cli(args: &[&str]) -> cli::Cli {
        cli::Cli::parse_from(std::iter::once("dt-candid-generator").chain(args.iter().copied()))
    }

    #[test]
    fn service_name_precedence() {
        let named = dt_candid::parse_service_file("service ledger : {}").unwrap();
        let anonymous = dt_candid::parse_service_file("service : {}").unwrap();
        let input = Input::parse("candid/governance.did");
        assert_eq!(service_name(Some("icp"), &named, &input), "icp");
        assert_eq!(service_name(None, &named, &input), "ledger");
        assert_eq!(service_name(None, &anonymous, &input), "governance");
    }

    #[test]
    fn generates_into_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let did = dir.path().join("ledger.did");
        std::fs::write(
            &did,
            indoc! {"
                // The ledger
                type Tokens = record { e8s : nat64 };
                type Memo = nat64;
                service : {
                    account_balance : (record { account : blob }) -> (Tokens) query;
                }
            "},
        )
        .unwrap();
        let out_dir = dir.path().join("out");

        let args = cli(&[
            did.to_str().unwrap(),
            "--namespace",
            "api::ledger",
            "--generator",
            "rust",
            "--out-dir",
            out_dir.to_str().unwrap(),
        ]);
        run(&args).unwrap();

        let namespace = out_dir.join(Path::new("api").join("ledger"));
        for file in ["tokens.rs", "aliases.rs", "ledger.rs", "mod.rs"] {
            assert!(namespace.join(file).is_file(), "missing {file}");
        }
        let client = std::fs::read_to_string(namespace.join("ledger.rs")).unwrap();
        assert!(client.contains("pub struct LedgerApiClient"));
        assert!(client.contains("crate::api::ledger::Tokens"));
    }

    #[test]
    fn failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.did");
        assert!(matches!(
            run(&cli(&[missing.to_str().unwrap()])),
            Err(Error::Read { .. })
        ));

        let broken = dir.path().join("broken.did");
        std::fs::write(&broken, "type A = record { a : nat").unwrap();
        assert!(matches!(
            run(&cli(&[broken.to_str().unwrap()])),
            Err(Error::Parse(_))
        ));

        let unresolved = dir.path().join("unresolved.did");
        std::fs::write(&unresolved, "service : { m : (Missing) -> () }").unwrap();
        assert!(matches!(
            run(&cli(&[unresolved.to_str().unwrap()])),
            Err(Error::Resolve(_))
        ));
    }
}
