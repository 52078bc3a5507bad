//! Command-line front end for shpbundle.
//!
//! Prints the path of the extracted `.shp` on success, or the bundle's parts
//! when run with `-n`. Rejected archives exit non-zero with the reason.

use anyhow::{Result, bail};
use clap::Parser;

use shpbundle::{Cli, Outcome, Rejection, ValidationOutcome, process};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    // reqwest and rustls may both bring a crypto backend; pin one for HTTPS sources.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    match process(&cli.archive, &cli.options()).await? {
        Outcome::Extracted(path) => println!("{}", path.display()),
        Outcome::Validated(ValidationOutcome::Valid(bundle)) => {
            for (part, name) in bundle.members() {
                println!("{:>8}  {}", part, name);
            }
        }
        Outcome::Validated(ValidationOutcome::Invalid(rejection)) => {
            if let Rejection::MultiplePrimaryFiles(candidates) = &rejection {
                eprintln!("Candidates:");
                for name in candidates {
                    eprintln!("  {}", name);
                }
                eprintln!("Rerun with -s <NAME> to choose one.");
            }
            bail!("[{}] {}", rejection.kind(), rejection);
        }
    }

    Ok(())
}
