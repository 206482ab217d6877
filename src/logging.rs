use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Route `log` output into a file. The terminal is owned by the TUI, so
/// nothing may be written to stderr while it runs.
///
/// `RUST_LOG` wins over `level` when set. Failing to open the file leaves
/// logging disabled rather than aborting startup.
pub fn init(path: &Path, level: LevelFilter) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(_) => return,
    };

    let mut builder = Builder::from_env(Env::default().default_filter_or(level.as_str()));
    builder
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    // A second init (tests, embedding) is harmless.
    let _ = builder.try_init();
}
