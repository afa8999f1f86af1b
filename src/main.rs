/*!
Here we go!

Usage: `appraise [CONFIG_FILE]`

Without a config file argument, every setting takes its default. A `PORT`
environment variable overrides the configured port either way.
*/
use std::sync::Arc;

use simplelog::{ColorChoice, TerminalMode, TermLogger};

use appraise::config::{self, Cfg};
use appraise::inter;

fn load_cfg() -> Result<Cfg, String> {
    let mut cfg = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Reading configuration from {:?}.", &path);
            Cfg::from_file(&path)?
        },
        None => {
            log::info!("No config file specified; using defaults.");
            Cfg::default()
        },
    };
    cfg.apply_env()?;
    Ok(cfg)
}

fn die(msg: &str) -> ! {
    log::error!("{}", msg);
    eprintln!("{}", msg);
    std::process::exit(1);
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("appraise")
        .build();
    if let Err(e) = TermLogger::init(
        appraise::log_level_from_env(),
        log_cfg,
        TerminalMode::Stdout,
        ColorChoice::Auto
    ) {
        eprintln!("Unable to start logging: {}", &e);
    }
    log::info!("Logging started.");

    let cfg = match load_cfg() {
        Ok(cfg) => cfg,
        Err(e) => die(&e),
    };

    let glob = match config::load_configuration(&cfg) {
        Ok(glob) => glob,
        Err(e) => die(&format!("Error loading configuration: {}", &e)),
    };

    if let Err(e) = inter::init(&cfg.template_dir) {
        die(&e);
    }

    let addr = glob.addr;
    let app = inter::router(Arc::new(glob), &cfg.static_dir);

    log::info!("Listening on {}", &addr);

    if let Err(e) = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
    {
        die(&format!("Server error: {}", &e));
    }
}
