use env_logger::{Builder, Env};
use log::LevelFilter;

/// Environment variable that, when set, overrides the level derived from the command line.
const LOG_ENV_VAR: &str = "KQM_LOG";

/// Initialize logging, given a `verbosity_level`.
///
/// The level is the difference between the `-v` and `-q` counters: see [`crate::cli::Cli`].
pub fn init(verbosity_level: i8) {
    let default_level = level_filter_for(verbosity_level);

    Builder::from_env(Env::default().filter_or(LOG_ENV_VAR, default_level.as_str()))
        .format_timestamp_millis()
        .init();

    trace!("Logging initialized: default level '{default_level}'");
}

fn level_filter_for(verbosity_level: i8) -> LevelFilter {
    match verbosity_level {
        i8::MIN..=-2 => LevelFilter::Off,
        -1 => LevelFilter::Error,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        3..=i8::MAX => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_map_verbosity_to_level() {
        assert_eq!(level_filter_for(-5), LevelFilter::Off);
        assert_eq!(level_filter_for(-1), LevelFilter::Error);
        assert_eq!(level_filter_for(0), LevelFilter::Warn);
        assert_eq!(level_filter_for(1), LevelFilter::Info);
        assert_eq!(level_filter_for(2), LevelFilter::Debug);
        assert_eq!(level_filter_for(7), LevelFilter::Trace);
    }
}
