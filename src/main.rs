use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let cli = face_console::Cli::parse();
    let config = face_console::load_config(&cli)?;
    face_console::init_tracing(&config.log_level);

    face_console::run(cli, &config)
}
