use anyhow::Result;
use log::info;
use soundy::app::SynthApp;
use soundy::config::Settings;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting soundy");

    let settings = Settings::load_default()?;
    let app = SynthApp::new(&settings)?;
    app.run()
}
