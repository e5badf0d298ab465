use clap::Parser;
use respkv::config::PORT;
use respkv::{server, Config, Error};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The port to listen on
    #[arg(default_value_t = PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    server::run(Config::default().with_port(args.port)).await
}
