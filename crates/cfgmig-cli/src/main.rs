use anyhow::Result;
use cfgmig_cli::{commands, Inputs};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn input_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Migration configuration (YAML or JSON)"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Subtree document to migrate (YAML or JSON)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the report as JSON"),
        )
}

fn cli() -> Command {
    Command::new("cfgmig")
        .version(cfgmig_cli::VERSION)
        .about("Ordered-group configuration migration")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(input_args(
            Command::new("plan").about("Show the changes a migration would make"),
        ))
        .subcommand(
            input_args(Command::new("run").about("Migrate the subtree document"))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Where to write the migrated document (default: stdout)"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_inputs(args: &ArgMatches) -> Result<Inputs> {
    let config = args
        .get_one::<PathBuf>("config")
        .ok_or_else(|| anyhow::anyhow!("--config is required"))?;
    let input = args
        .get_one::<PathBuf>("input")
        .ok_or_else(|| anyhow::anyhow!("--input is required"))?;
    Inputs::load(config, input)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("plan", args)) => {
            let inputs = load_inputs(args)?;
            print!("{}", commands::plan(&inputs, args.get_flag("json"))?);
        }
        Some(("run", args)) => {
            let inputs = load_inputs(args)?;
            let outcome = commands::run(&inputs, args.get_flag("json")).await?;

            let output = args.get_one::<PathBuf>("output").map(PathBuf::as_path);

            // Stdout carries the document unless it goes to a file
            if output.is_some() {
                print!("{}", outcome.report);
            } else {
                eprint!("{}", outcome.report);
            }
            if outcome.exit_code == 0 {
                commands::write_document(&outcome.document, output)?;
            }
            std::process::exit(outcome.exit_code);
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn run_accepts_output_and_global_log_flag() {
        let matches = cli()
            .try_get_matches_from([
                "cfgmig", "run", "-c", "m.yaml", "-i", "s.yaml", "-o", "out.json", "--log-json",
            ])
            .unwrap();
        assert!(matches.get_flag("log-json"));

        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(args.get_one::<PathBuf>("output"), Some(&PathBuf::from("out.json")));
        assert!(!args.get_flag("json"));
    }

    #[test]
    fn plan_requires_input() {
        assert!(cli().try_get_matches_from(["cfgmig", "plan", "-c", "m.yaml"]).is_err());
    }
}
