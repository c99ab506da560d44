//! Logger setup, filtered with `RUST_LOG`

use std::io::Write;

use chrono::Utc;
use env_logger::Builder;

pub fn init() {
    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:5} {}: {}",
                Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
