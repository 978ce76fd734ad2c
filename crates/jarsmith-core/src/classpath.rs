//! Compilation classpath assembly.
//!
//! Entries are collected in a fixed order and deduplicated by canonical
//! path, keeping the first occurrence:
//!
//! 1. the archive being patched
//! 2. standard-library JARs of the JDK
//! 3. caller-supplied entries
//! 4. the selected dependency artifact
//! 5. sibling archives
//! 6. extra roots (configured, then `CLASSPATH` when enabled)

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};

/// Why an entry is on the classpath. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Archive,
    StandardLibrary,
    CallerSupplied,
    ResolvedDependency,
    Sibling,
    ExtraRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClasspathEntry {
    pub path: PathBuf,
    pub origin: Origin,
}

/// An ordered, duplicate-free compilation classpath.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classpath {
    entries: Vec<ClasspathEntry>,
}

impl Classpath {
    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|entry| entry.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a platform path list for `-cp`.
    pub fn to_path_list(&self) -> Result<OsString> {
        std::env::join_paths(self.paths())
            .map_err(|e| Error::Config(format!("cannot build classpath: {e}")))
    }
}

/// Inputs that vary per pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct ClasspathSources<'a> {
    pub archive: &'a Path,
    pub java_home: Option<&'a Path>,
    pub caller_supplied: &'a [PathBuf],
    pub dependency: Option<&'a Path>,
    pub siblings: &'a [PathBuf],
}

/// Builds classpaths from per-run sources plus the configured extra roots.
#[derive(Debug, Clone)]
pub struct ClasspathAssembler {
    extra_roots: Vec<PathBuf>,
    env_classpath: Option<OsString>,
}

impl ClasspathAssembler {
    /// Create an assembler. Reads `CLASSPATH` now if the configuration asks
    /// for it.
    pub fn new(config: &PipelineConfig) -> Self {
        let env_classpath = if config.use_env_classpath {
            std::env::var_os("CLASSPATH")
        } else {
            None
        };
        Self {
            extra_roots: config.extra_roots.clone(),
            env_classpath,
        }
    }

    /// Replace the `CLASSPATH` value used for extra roots.
    pub fn with_env_classpath(mut self, value: Option<OsString>) -> Self {
        self.env_classpath = value;
        self
    }

    /// Assemble the classpath. Never fails; missing sources are skipped.
    pub fn assemble(&self, sources: ClasspathSources<'_>) -> Classpath {
        let mut builder = Builder::default();

        builder.push(sources.archive, Origin::Archive);

        if let Some(java_home) = sources.java_home {
            for dir in [java_home.join("lib"), java_home.join("jre").join("lib")] {
                for jar in jars_in(&dir) {
                    builder.push(&jar, Origin::StandardLibrary);
                }
            }
        }

        for entry in sources.caller_supplied {
            builder.push(entry, Origin::CallerSupplied);
        }

        if let Some(dependency) = sources.dependency {
            builder.push(dependency, Origin::ResolvedDependency);
        }

        for sibling in sources.siblings {
            builder.push(sibling, Origin::Sibling);
        }

        for root in &self.extra_roots {
            for path in expand_root(root) {
                builder.push(&path, Origin::ExtraRoot);
            }
        }
        if let Some(value) = &self.env_classpath {
            for entry in std::env::split_paths(value) {
                for path in expand_env_entry(&entry) {
                    builder.push(&path, Origin::ExtraRoot);
                }
            }
        }

        let classpath = builder.finish();
        tracing::debug!("Assembled classpath with {} entries", classpath.len());
        classpath
    }
}

#[derive(Default)]
struct Builder {
    seen: FxHashSet<PathBuf>,
    entries: Vec<ClasspathEntry>,
}

impl Builder {
    fn push(&mut self, path: &Path, origin: Origin) {
        if path.as_os_str().is_empty() {
            return;
        }
        let Ok(canonical) = fs::canonicalize(path) else {
            tracing::debug!("Skipping missing classpath entry {}", path.display());
            return;
        };
        if self.seen.insert(canonical) {
            self.entries.push(ClasspathEntry {
                path: path.to_path_buf(),
                origin,
            });
        }
    }

    fn finish(self) -> Classpath {
        Classpath {
            entries: self.entries,
        }
    }
}

/// `.jar` files directly inside `dir`, sorted.
fn jars_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut jars: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
        })
        .collect();
    jars.sort();
    jars
}

/// A configured root: a JAR itself, or a directory whose JARs are used.
fn expand_root(root: &Path) -> Vec<PathBuf> {
    if root.is_dir() {
        jars_in(root)
    } else {
        vec![root.to_path_buf()]
    }
}

/// A `CLASSPATH` entry: `dir/*` expands to the directory's JARs, anything
/// else is used as is.
fn expand_env_entry(entry: &Path) -> Vec<PathBuf> {
    if entry.file_name().is_some_and(|name| name == "*") {
        entry.parent().map(jars_in).unwrap_or_default()
    } else {
        vec![entry.to_path_buf()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
        path.to_path_buf()
    }

    fn origins(classpath: &Classpath) -> Vec<Origin> {
        classpath.entries().iter().map(|e| e.origin).collect()
    }

    #[test]
    fn test_assemble_orders_sources() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let archive = touch(&root.join("plugins/MyPlugin.jar"));
        let java_home = root.join("jdk");
        touch(&java_home.join("lib/rt.jar"));
        touch(&java_home.join("lib/README"));
        let caller = touch(&root.join("caller/extra.jar"));
        let dependency = touch(&root.join("libs/spigot-api-1.20.jar"));
        let sibling = touch(&root.join("plugins/Vault.jar"));
        let extra = touch(&root.join("extra/gson.jar"));

        let config = PipelineConfig {
            extra_roots: vec![root.join("extra")],
            ..Default::default()
        };
        let classpath = ClasspathAssembler::new(&config)
            .with_env_classpath(None)
            .assemble(ClasspathSources {
                archive: &archive,
                java_home: Some(&java_home),
                caller_supplied: &[caller.clone()],
                dependency: Some(&dependency),
                siblings: &[sibling.clone()],
            });

        let paths: Vec<_> = classpath.paths().map(Path::to_path_buf).collect();
        assert_eq!(
            paths,
            vec![
                archive,
                java_home.join("lib/rt.jar"),
                caller,
                dependency,
                sibling,
                extra
            ]
        );
        assert_eq!(
            origins(&classpath),
            vec![
                Origin::Archive,
                Origin::StandardLibrary,
                Origin::CallerSupplied,
                Origin::ResolvedDependency,
                Origin::Sibling,
                Origin::ExtraRoot,
            ]
        );
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let temp = TempDir::new().unwrap();
        let archive = touch(&temp.path().join("plugins/MyPlugin.jar"));
        let dependency = touch(&temp.path().join("plugins/spigot-api-1.20.jar"));
        let indirect = temp.path().join("plugins/../plugins/spigot-api-1.20.jar");

        let classpath = ClasspathAssembler::new(&PipelineConfig::default())
            .with_env_classpath(None)
            .assemble(ClasspathSources {
                archive: &archive,
                java_home: None,
                caller_supplied: &[indirect.clone()],
                dependency: Some(&dependency),
                siblings: &[dependency.clone()],
            });

        assert_eq!(classpath.len(), 2);
        assert_eq!(classpath.entries()[1].path, indirect);
        assert_eq!(classpath.entries()[1].origin, Origin::CallerSupplied);
    }

    #[test]
    fn test_missing_sources_are_skipped() {
        let temp = TempDir::new().unwrap();
        let archive = touch(&temp.path().join("MyPlugin.jar"));
        let missing = temp.path().join("missing.jar");

        let classpath = ClasspathAssembler::new(&PipelineConfig::default())
            .with_env_classpath(None)
            .assemble(ClasspathSources {
                archive: &archive,
                java_home: Some(&temp.path().join("no-jdk")),
                caller_supplied: &[missing.clone()],
                dependency: Some(&missing),
                siblings: &[],
            });

        assert_eq!(origins(&classpath), vec![Origin::Archive]);
    }

    #[test]
    fn test_env_classpath_wildcard_and_plain_entries() {
        let temp = TempDir::new().unwrap();
        let archive = touch(&temp.path().join("MyPlugin.jar"));
        let a = touch(&temp.path().join("env/a.jar"));
        let b = touch(&temp.path().join("env/b.jar"));
        let classes = temp.path().join("classes");
        fs::create_dir(&classes).unwrap();

        let value =
            std::env::join_paths([temp.path().join("env").join("*"), classes.clone()]).unwrap();
        let classpath = ClasspathAssembler::new(&PipelineConfig::default())
            .with_env_classpath(Some(value))
            .assemble(ClasspathSources {
                archive: &archive,
                java_home: None,
                caller_supplied: &[],
                dependency: None,
                siblings: &[],
            });

        let paths: Vec<_> = classpath.paths().map(Path::to_path_buf).collect();
        assert_eq!(paths, vec![archive, a, b, classes]);
    }

    #[test]
    fn test_to_path_list_joins_entries() {
        let temp = TempDir::new().unwrap();
        let archive = touch(&temp.path().join("MyPlugin.jar"));
        let dependency = touch(&temp.path().join("spigot.jar"));

        let classpath = ClasspathAssembler::new(&PipelineConfig::default())
            .with_env_classpath(None)
            .assemble(ClasspathSources {
                archive: &archive,
                java_home: None,
                caller_supplied: &[],
                dependency: Some(&dependency),
                siblings: &[],
            });

        let joined = classpath.to_path_list().unwrap();
        let split: Vec<_> = std::env::split_paths(&joined).collect();
        assert_eq!(split, vec![archive, dependency]);
    }
}
