use clap::Subcommand;
use kidschores_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "schedule.utc_offset_minutes", "defaults.chore_points")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List config values as dotted keys, optionally for one section
    List {
        /// Section to show (e.g. "schedule", "rewards")
        section: Option<String>,
    },
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List { section } => {
            let config = Config::load()?;
            let mut entries = Vec::new();
            flatten("", &serde_json::to_value(&config)?, &mut entries);
            if let Some(section) = &section {
                let prefix = format!("{section}.");
                entries.retain(|(key, _)| key.starts_with(&prefix));
                if entries.is_empty() {
                    return Err(format!("unknown section: {section}").into());
                }
            }
            for (key, value) in entries {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

/// Dotted `section.key` paths, the same ones `get` and `set` accept.
fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        serde_json::Value::Null => out.push((prefix.to_string(), "(unset)".to_string())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
