use clap::Command;
use clap_complete::Shell;
use std::io;

/// Generates shell completions straight from the `clap::Command` the caller
/// built from its own `Parser`-derived CLI struct, so completions can never
/// drift out of sync with the actual subcommands/flags.
pub fn generate(shell: Shell, mut cmd: Command) {
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}
