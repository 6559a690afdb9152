mod config;
mod connection;
mod library;
mod mpris;
mod player;
mod runtime;
mod shortcuts;
mod ui;
mod voice;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    runtime::run()
}
