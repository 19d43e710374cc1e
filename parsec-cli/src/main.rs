use clap::Parser;

use parsec_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match parsec_cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("parsec: {e}");
            e.exit_code()
        }
    };

    std::process::exit(code);
}
