use anyhow::Result;
use workout_dash::cli;

fn main() -> Result<()> {
    cli::handle_calls()
}
