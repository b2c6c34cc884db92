use crate::error::MountError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FS_TYPE: &str = "nullfs";
pub const DEFAULT_OPTIONS: &str = "ro";

fn default_fs_type() -> String {
    DEFAULT_FS_TYPE.to_string()
}

fn default_options() -> String {
    DEFAULT_OPTIONS.to_string()
}

/// A desired mount point inside a jail.
///
/// Field names on the wire follow the declarative config surface
/// (`src`, `mount`, `fstype`, `options`, `dump`, `fsck_pass`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    #[serde(rename = "src")]
    pub source: String,
    /// Absolute (host view) when it starts with `/`, otherwise relative to
    /// the jail's root filesystem.
    #[serde(rename = "mount")]
    pub target: String,
    #[serde(rename = "fstype", default = "default_fs_type")]
    pub fs_type: String,
    #[serde(default = "default_options")]
    pub options: String,
    #[serde(default)]
    pub dump: u32,
    #[serde(rename = "fsck_pass", alias = "pass", default)]
    pub pass: u32,
}

impl MountSpec {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            fs_type: default_fs_type(),
            options: default_options(),
            dump: 0,
            pass: 0,
        }
    }

    pub fn with_fs_type(mut self, fs_type: &str) -> Self {
        self.fs_type = fs_type.to_string();
        self
    }

    pub fn with_options(mut self, options: &str) -> Self {
        self.options = options.to_string();
        self
    }

    pub fn with_dump(mut self, dump: u32) -> Self {
        self.dump = dump;
        self
    }

    pub fn with_pass(mut self, pass: u32) -> Self {
        self.pass = pass;
        self
    }

    pub fn validate(&self) -> Result<(), MountError> {
        if self.source.is_empty() {
            return Err(MountError::InvalidSpec(format!(
                "empty source for mount point {:?}",
                self.target
            )));
        }
        if self.target.is_empty() {
            return Err(MountError::InvalidSpec(format!(
                "empty mount point for source {:?}",
                self.source
            )));
        }
        Ok(())
    }

    /// Build the fstab record for this spec, using an already resolved
    /// absolute target.
    pub fn to_entry(&self, resolved_target: &str) -> FstabEntry {
        FstabEntry {
            source: self.source.clone(),
            target: resolved_target.to_string(),
            fs_type: self.fs_type.clone(),
            options: self.options.clone(),
            dump: self.dump,
            pass: self.pass,
        }
    }
}

/// One fstab(5) record. Serialized as the six-element array the
/// middleware speaks: `[source, target, fstype, options, dump, pass]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub struct FstabEntry {
    pub source: String,
    pub target: String,
    pub fs_type: String,
    pub options: String,
    pub dump: u32,
    pub pass: u32,
}

impl std::fmt::Display for FstabEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.source, self.target, self.fs_type, self.options, self.dump, self.pass
        )
    }
}

// Numeric columns sometimes come back as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Column {
    Number(u32),
    Text(String),
}

impl Column {
    fn into_u32(self, name: &str) -> Result<u32, String> {
        match self {
            Column::Number(n) => Ok(n),
            Column::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("invalid {} field in fstab entry: {:?}", name, s)),
        }
    }
}

type RawEntry = (String, String, String, String, Column, Column);

impl TryFrom<RawEntry> for FstabEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let (source, target, fs_type, options, dump, pass) = raw;
        Ok(Self {
            source,
            target,
            fs_type,
            options,
            dump: dump.into_u32("dump")?,
            pass: pass.into_u32("pass")?,
        })
    }
}

impl From<FstabEntry> for RawEntry {
    fn from(e: FstabEntry) -> Self {
        (
            e.source,
            e.target,
            e.fs_type,
            e.options,
            Column::Number(e.dump),
            Column::Number(e.pass),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Origin {
    /// Intrinsic to the jail; never touched by reconciliation.
    System,
    User,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::System => write!(f, "SYSTEM"),
            Origin::User => write!(f, "USER"),
        }
    }
}

/// An fstab entry as reported by the middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedEntry {
    pub id: String,
    pub origin: Origin,
    pub entry: FstabEntry,
}

impl ObservedEntry {
    pub fn is_user(&self) -> bool {
        self.origin == Origin::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults() {
        let spec: MountSpec =
            serde_json::from_str(r#"{"src": "/mnt/data/more-data", "mount": "data/more"}"#)
                .unwrap();

        assert_eq!(spec, MountSpec::new("/mnt/data/more-data", "data/more"));
        assert_eq!(spec.fs_type, "nullfs");
        assert_eq!(spec.options, "ro");
        assert_eq!(spec.dump, 0);
        assert_eq!(spec.pass, 0);
    }

    #[test]
    fn test_spec_pass_alias() {
        let spec: MountSpec = serde_json::from_str(
            r#"{"src": "/a", "mount": "/b", "fstype": "nullfs", "options": "rw", "dump": 1, "pass": 2}"#,
        )
        .unwrap();

        assert_eq!(spec.options, "rw");
        assert_eq!(spec.dump, 1);
        assert_eq!(spec.pass, 2);
    }

    #[test]
    fn test_spec_validate() {
        assert!(MountSpec::new("/a", "/b").validate().is_ok());
        assert!(matches!(
            MountSpec::new("", "/b").validate(),
            Err(MountError::InvalidSpec(_))
        ));
        assert!(matches!(
            MountSpec::new("/a", "").validate(),
            Err(MountError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_entry_wire_form() {
        let entry = MountSpec::new("/mnt/data", "data")
            .with_options("rw")
            .to_entry("/mnt/pool/iocage/jails/j1/root/data");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                "/mnt/data",
                "/mnt/pool/iocage/jails/j1/root/data",
                "nullfs",
                "rw",
                0,
                0
            ])
        );
    }

    #[test]
    fn test_entry_accepts_string_numbers() {
        let entry: FstabEntry =
            serde_json::from_str(r#"["/a", "/b", "nullfs", "ro", "0", "2"]"#).unwrap();
        assert_eq!(entry.dump, 0);
        assert_eq!(entry.pass, 2);

        let bad: Result<FstabEntry, _> =
            serde_json::from_str(r#"["/a", "/b", "nullfs", "ro", "x", 0]"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_origin_wire_names() {
        let origin: Origin = serde_json::from_str(r#""SYSTEM""#).unwrap();
        assert_eq!(origin, Origin::System);
        assert_eq!(serde_json::to_string(&Origin::User).unwrap(), r#""USER""#);
    }
}
