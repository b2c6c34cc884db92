use jailtab_mount::MountSpec;
use serde::Deserialize;
use std::path::Path;

/// Declarative description of one jail's fstab, as read from a JSON file.
///
/// ```json
/// {
///   "jail": "the-jail-name",
///   "append": false,
///   "fstab": [
///     { "src": "/mnt/data/my-data", "mount": "/mnt/data/iocage/jails/the-jail-name/root/my-data" },
///     { "src": "/mnt/data/more-data", "mount": "data/more", "options": "rw" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JailConfig {
    #[serde(default)]
    pub jail: Option<String>,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub fstab: Vec<MountSpec>,
}

impl JailConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let config: JailConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Apply command-line overrides and check the result is usable.
    pub fn merge(
        mut self,
        jail: Option<String>,
        append: Option<bool>,
    ) -> Result<(String, Self), Box<dyn std::error::Error>> {
        if jail.is_some() {
            self.jail = jail;
        }
        if let Some(append) = append {
            self.append = append;
        }

        let jail = self
            .jail
            .clone()
            .filter(|j| !j.is_empty())
            .ok_or("No jail given: use --jail or set \"jail\" in the config file")?;

        for spec in &self.fstab {
            spec.validate()?;
        }

        Ok((jail, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config() {
        let file = write_config(
            r#"{
                "jail": "the-jail-name",
                "fstab": [
                    {"src": "/mnt/data/my-data", "mount": "/mnt/data/iocage/jails/the-jail-name/root/my-data",
                     "fstype": "nullfs", "options": "ro", "dump": 0, "pass": 0},
                    {"src": "/mnt/data/more-data", "mount": "data/more"}
                ]
            }"#,
        );

        let config = JailConfig::load(file.path()).unwrap();

        assert_eq!(config.jail.as_deref(), Some("the-jail-name"));
        assert!(!config.append);
        assert_eq!(config.fstab.len(), 2);
        assert_eq!(config.fstab[1], MountSpec::new("/mnt/data/more-data", "data/more"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let file = write_config(r#"{"jail": "j1", "fstabs": []}"#);
        assert!(JailConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = JailConfig::load(Path::new("/nonexistent/jailtab.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_merge_overrides() {
        let config = JailConfig {
            jail: Some("from-file".to_string()),
            append: false,
            fstab: vec![MountSpec::new("/a", "b")],
        };

        let (jail, merged) = config.merge(Some("j1".to_string()), Some(true)).unwrap();
        assert_eq!(jail, "j1");
        assert!(merged.append);
    }

    #[test]
    fn test_merge_requires_jail() {
        assert!(JailConfig::default().merge(None, None).is_err());
        assert!(JailConfig::default().merge(Some(String::new()), None).is_err());
    }

    #[test]
    fn test_merge_rejects_empty_source() {
        let config = JailConfig {
            jail: Some("j1".to_string()),
            append: false,
            fstab: vec![MountSpec::new("", "b")],
        };
        assert!(config.merge(None, None).is_err());
    }
}
