use clap::Parser;
use riverbed_supply::logger::Logger;

mod commands;
mod output;

use commands::supply;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "supply")]
#[command(version = VERSION)]
#[command(about = "Stage the Riverbed AppInternals .NET Core profiler when the app is bound to AppInternals")]
struct Cli {
    #[command(flatten)]
    args: supply::SupplyArgs,

    /// Print a JSON result envelope on stdout (staging log goes to stderr)
    #[arg(long)]
    json: bool,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let mut log = if cli.json {
        Logger::new(Box::new(std::io::stderr()))
    } else {
        Logger::stdout()
    };

    let result = supply::run(cli.args, &mut log);
    let exit_code = match &result {
        Ok((_, code)) => *code,
        Err(err) => output::exit_code_for_error(err.code),
    };

    if cli.json {
        let payload = result.map(|(outcome, _)| outcome);
        // Exit status already carries the outcome if stdout is gone.
        let _ = output::print_result(&payload);
    } else if let Err(err) = &result {
        output::report_error(&mut log, err);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
