use crate::error::MountError;

pub fn is_absolute(raw_target: &str) -> bool {
    raw_target.starts_with('/')
}

/// Turn a mount point into an absolute host path.
///
/// Absolute targets are returned as-is. Relative ones are placed under the
/// jail's root filesystem, `{jail_root}/jails/{jail}/root/{raw_target}`.
/// This is plain string composition: `..`, repeated separators and symlinks
/// are left alone, since the middleware stores the same literal form.
pub fn resolve_target(raw_target: &str, jail_root: &str, jail: &str) -> String {
    if is_absolute(raw_target) {
        raw_target.to_string()
    } else {
        format!("{}/jails/{}/root/{}", jail_root, jail, raw_target)
    }
}

/// Resolution context for one jail during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailPaths {
    jail: String,
    root: Option<String>,
}

impl JailPaths {
    pub fn new(jail: &str, root: Option<String>) -> Self {
        Self {
            jail: jail.to_string(),
            root,
        }
    }

    pub fn jail(&self) -> &str {
        &self.jail
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn resolve(&self, raw_target: &str) -> Result<String, MountError> {
        if is_absolute(raw_target) {
            return Ok(raw_target.to_string());
        }

        let root = self
            .root
            .as_deref()
            .ok_or_else(|| MountError::RootUnavailable(self.jail.clone()))?;

        let resolved = resolve_target(raw_target, root, &self.jail);
        tracing::debug!(jail = %self.jail, raw = %raw_target, resolved = %resolved, "Resolved mount point");
        Ok(resolved)
    }
}
