use helioscope::{AppConfig, Starfield, Sun, run_with_config};

fn main() {
    env_logger::init();

    let result = run_with_config(
        AppConfig::new().title("Helioscope").size(1280, 720),
        vec![Box::new(Starfield::default()), Box::new(Sun::default())],
    );

    if let Err(err) = result {
        log::error!("{err}");
        std::process::exit(1);
    }
}
