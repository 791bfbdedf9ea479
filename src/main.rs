use anyhow::Result;
use clap::Parser as ClapParser;

use cli::caf::cmd_caf;
use cli::command::{Cli, Commands, LogFormat};
use cli::devices::cmd_devices;
use cli::format::cmd_format;
use cli::layout::cmd_layout;

mod cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base_level = cli.loglevel.to_level_filter();

    let mut env_builder = env_logger::Builder::from_default_env();
    env_builder.filter_level(base_level);
    match cli.log_format {
        LogFormat::Plain => {
            env_builder.format_timestamp_secs();
        }
        LogFormat::Json => {
            env_builder.format(|buf, record| {
                use std::io::Write;
                writeln!(
                    buf,
                    "{{\"ts\":\"{}\",\"lvl\":\"{}\",\"target\":\"{}\",\"msg\":{:?}}}",
                    buf.timestamp(),
                    record.level(),
                    record.target(),
                    record.args().to_string()
                )
            });
        }
    }
    env_builder.try_init()?;

    match cli.command {
        Commands::Format(ref args) => cmd_format(args, &cli)?,
        Commands::Layout(ref args) => cmd_layout(args, &cli)?,
        Commands::Caf(ref args) => cmd_caf(args, &cli)?,
        Commands::Devices(ref args) => cmd_devices(args, &cli)?,
    }

    Ok(())
}
