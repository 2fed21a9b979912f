//! Scene config validation command

use anyhow::{Context, Result};
use skyglass_particles::SceneConfig;
use std::path::Path;

pub fn run(path: &Path) -> Result<()> {
    let config = SceneConfig::load(path)
        .with_context(|| format!("Invalid scene config: {}", path.display()))?;

    println!("{} is valid (seed {:#x})", path.display(), config.seed);
    for (name, enabled, capacity) in sections(&config) {
        let state = if enabled { "enabled" } else { "disabled" };
        println!("  {:<16} {:>6} slot(s)  {}", name, capacity, state);
    }

    Ok(())
}

fn sections(config: &SceneConfig) -> [(&'static str, bool, usize); 4] {
    [
        ("vapor", config.vapor.enabled, config.vapor.capacity),
        ("meteors", config.meteors.enabled, config.meteors.capacity),
        (
            "shooting_stars",
            config.shooting_stars.enabled,
            config.shooting_stars.capacity,
        ),
        ("bubbles", config.bubbles.enabled, config.bubbles.capacity),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sections_reflect_overrides() {
        let config = SceneConfig::from_toml_str(
            r#"
[meteors]
capacity = 12

[bubbles]
enabled = false
"#,
        )
        .unwrap();

        let rows = sections(&config);
        assert_eq!(rows[1], ("meteors", true, 12));
        assert!(!rows[3].1);
    }

    #[test]
    fn test_run_rejects_bad_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[vapor]\ncapacity = 0").unwrap();
        assert!(run(file.path()).is_err());
    }

    #[test]
    fn test_run_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("absent.toml")).is_err());
    }
}
