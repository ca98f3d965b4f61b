//! `shiftpoints init` implementation

use serde_json::json;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;

pub fn run(storage: Storage, output: OutputOptions) -> Result<()> {
    let already = storage.is_initialized();
    storage.init()?;

    let config_file = storage.config_file();
    if !config_file.exists() {
        Config::default().save(&config_file)?;
    }

    let mut human = HumanOutput::new(if already {
        "Data directory already initialized"
    } else {
        "Initialized data directory"
    });
    human.push_summary("path", storage.data_dir().display().to_string());
    human.push_summary("config", config_file.display().to_string());

    emit_success(
        output,
        "init",
        &json!({
            "data_dir": storage.data_dir(),
            "already_initialized": already,
        }),
        Some(&human),
    )
}
