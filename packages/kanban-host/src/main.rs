use clap::Parser;
use kanban_host::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = kanban_host::run(cli).await {
        log::error!("[kanban.host] {}", e);
        eprintln!("kanban: {}", e);
        std::process::exit(1);
    }
}
