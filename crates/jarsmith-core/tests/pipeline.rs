//! End-to-end tests: probe, locate, compile and patch a plugin archive.
//!
//! Tests that compile return early when no Java compiler is installed.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use jarsmith_core::compile::{CompileOutcome, CompileRequest, CompilerGateway, ToolchainManager};
use jarsmith_core::{
    Classpath, DependencyCache, DetectionSource, Error, PatchJob, PatchService, Pipeline,
    PipelineConfig, Version,
};
use tempfile::TempDir;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

// =============================================================================
// Test Helpers
// =============================================================================

const API_SOURCE: &str = "package org.bukkit;\npublic class Bukkit {\n    public static String getVersion() { return \"1.20\"; }\n}\n";

const MAIN_SOURCE: &str = "package com.example;\nimport org.bukkit.Bukkit;\npublic class Main {\n    public String describe() { return \"running on \" + Bukkit.getVersion(); }\n}\n";

const GREETER_SOURCE: &str = "public class Greeter {\n    public static void main(String[] args) {\n        System.out.println(\"hello, world\");\n    }\n}\n";

const BROKEN_SOURCE: &str = "package com.example;\npublic class Main {\n    public String describe() { return Missing.value(); }\n}\n";

/// A plugin directory with one archive and a bundled API JAR.
struct Workspace {
    temp: TempDir,
    plugin: PathBuf,
    libs: PathBuf,
}

impl Workspace {
    fn new(toolchain: &ToolchainManager) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let plugins = temp.path().join("plugins");
        let libs = temp.path().join("libs");
        fs::create_dir(&plugins).expect("Failed to create plugins dir");
        fs::create_dir(&libs).expect("Failed to create libs dir");

        let api = compile(toolchain, "Bukkit", API_SOURCE);
        write_jar(
            &libs.join("spigot-api-1.20.jar"),
            &[("org/bukkit/Bukkit.class", &api)],
        );

        let plugin = plugins.join("MyPlugin.jar");
        write_plugin(&plugin);

        Self { temp, plugin, libs }
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            bundle: Some(self.libs.clone()),
            ..Default::default()
        }
    }
}

fn toolchain() -> Option<ToolchainManager> {
    match ToolchainManager::locate(None) {
        Ok(toolchain) => Some(toolchain),
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

fn compile(toolchain: &ToolchainManager, unit: &str, source: &str) -> Vec<u8> {
    let gateway = CompilerGateway::new(&PipelineConfig::default());
    let request = CompileRequest {
        source_text: source.to_string(),
        unit_name: unit.to_string(),
        classpath: Classpath::default(),
        target_version: Version::new(1, 20, 0),
    };
    match gateway.compile_with(toolchain, &request) {
        CompileOutcome::Success(unit) => unit.bytecode,
        other => panic!("Expected successful compile, got {:?}", other),
    }
}

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = ZipWriter::new(File::create(path).expect("Failed to create jar"));
    for (name, bytes) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start entry");
        writer.write_all(bytes).expect("Failed to write entry");
    }
    writer.finish().expect("Failed to finish jar");
}

fn write_plugin(path: &Path) {
    write_jar(
        path,
        &[
            (
                "plugin.yml",
                b"name: MyPlugin\nversion: 1.0.0\nmain: com.example.Main\napi-version: '1.20'\n",
            ),
            ("com/example/Main.class", b"stale bytecode"),
            ("config.yml", b"debug: false\n"),
        ],
    );
}

fn entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(File::open(path).expect("Failed to open jar"))
        .expect("Failed to read jar");
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).expect("Failed to read entry");
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).expect("Failed to read bytes");
            (entry.name().to_string(), bytes)
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_patch_archive_replaces_class_and_keeps_other_entries() {
    let Some(toolchain) = toolchain() else { return };
    let ws = Workspace::new(&toolchain);
    let original = fs::read(&ws.plugin).expect("Failed to read plugin");

    let pipeline = Pipeline::new(ws.config()).expect("Failed to create pipeline");
    let output = pipeline
        .patch_archive(&ws.plugin, "com.example.Main", MAIN_SOURCE)
        .expect("Failed to patch archive");

    assert_eq!(output, ws.plugin.with_file_name("MyPlugin_PATCHED.jar"));
    assert_eq!(fs::read(&ws.plugin).expect("Failed to read plugin"), original);

    let before = entries(&ws.plugin);
    let after = entries(&output);
    let names: Vec<_> = after.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["plugin.yml", "com/example/Main.class", "config.yml"]);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert_eq!(&after[1].1[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
}

#[test]
fn test_patch_report_names_dependency_and_target() {
    let Some(toolchain) = toolchain() else { return };
    let ws = Workspace::new(&toolchain);

    let pipeline = Pipeline::new(ws.config()).expect("Failed to create pipeline");
    let report = pipeline
        .patch(&PatchJob::new(&ws.plugin, "com/example/Main.class", MAIN_SOURCE))
        .expect("Failed to patch archive");

    assert!(report.replaced);
    assert_eq!(report.entry_name, "com/example/Main.class");
    assert_eq!(report.target_version, Version::new(1, 20, 0));
    assert_eq!(report.dependency, Some(ws.libs.join("spigot-api-1.20.jar")));
}

#[test]
fn test_compile_failure_leaves_archives_untouched() {
    let Some(toolchain) = toolchain() else { return };
    let ws = Workspace::new(&toolchain);
    let previous = ws.plugin.with_file_name("MyPlugin_PATCHED.jar");
    fs::write(&previous, "previous output").expect("Failed to write previous output");

    let pipeline = Pipeline::new(ws.config()).expect("Failed to create pipeline");
    let result = pipeline.patch_archive(&ws.plugin, "com.example.Main", BROKEN_SOURCE);

    match result {
        Err(Error::Compilation { unit, diagnostics }) => {
            assert_eq!(unit, "com.example.Main");
            assert_eq!(diagnostics[0].line, Some(3));
        }
        other => panic!("Expected Compilation error, got {:?}", other),
    }
    assert_eq!(
        fs::read_to_string(&previous).expect("Failed to read previous output"),
        "previous output"
    );
}

#[test]
fn test_missing_entry_produces_unmodified_copy() {
    let Some(toolchain) = toolchain() else { return };
    let ws = Workspace::new(&toolchain);

    let source = "package com.example;\npublic class Extra {}\n";
    let pipeline = Pipeline::new(ws.config()).expect("Failed to create pipeline");
    let report = pipeline
        .patch(&PatchJob::new(&ws.plugin, "com.example.Extra", source))
        .expect("Failed to patch archive");

    assert!(!report.replaced);
    assert_eq!(entries(&report.output), entries(&ws.plugin));
}

#[test]
fn test_service_runs_jobs_concurrently_with_shared_cache() {
    let Some(toolchain) = toolchain() else { return };
    let ws = Workspace::new(&toolchain);
    let second = ws.temp.path().join("plugins").join("OtherPlugin.jar");
    write_plugin(&second);

    let cache = Arc::new(DependencyCache::new());
    let pipeline =
        Pipeline::with_cache(ws.config(), Arc::clone(&cache)).expect("Failed to create pipeline");
    let service = PatchService::new(pipeline).expect("Failed to start service");

    let jobs = vec![
        PatchJob::new(&ws.plugin, "com.example.Main", MAIN_SOURCE),
        PatchJob::new(&second, "com.example.Main", MAIN_SOURCE),
        PatchJob::new(&second, "com.example.Main", BROKEN_SOURCE),
    ];
    let results = service.run_all(&jobs);

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(Error::Compilation { .. })));
    assert!(cache.snapshot().is_some());
    assert!(ws.temp.path().join("plugins/OtherPlugin_PATCHED.jar").is_file());
}

#[test]
fn test_inspect_reads_descriptor_without_toolchain() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let plugin = temp.path().join("MyPlugin.jar");
    write_plugin(&plugin);

    let pipeline = Pipeline::new(PipelineConfig::default()).expect("Failed to create pipeline");
    let info = pipeline.inspect(&plugin).expect("Failed to inspect plugin");

    assert_eq!(info.descriptor.name.as_deref(), Some("MyPlugin"));
    assert_eq!(info.descriptor.main_class.as_deref(), Some("com.example.Main"));
    assert_eq!(info.target_version, Version::new(1, 20, 0));
    assert_eq!(
        info.detected_by,
        DetectionSource::Descriptor("plugin.yml".to_string())
    );
}

#[test]
fn test_replace_strings_changes_runtime_output() {
    let Some(toolchain) = toolchain() else { return };
    let temp = TempDir::new().expect("Failed to create temp dir");
    let jar = temp.path().join("Greeter.jar");
    let class = compile(&toolchain, "Greeter", GREETER_SOURCE);
    write_jar(&jar, &[("plugin.yml", b"name: Greeter\n"), ("Greeter.class", &class)]);

    let pipeline = Pipeline::new(PipelineConfig::default()).expect("Failed to create pipeline");
    let patch = pipeline
        .replace_strings(&jar, "hello", "welcome")
        .expect("Failed to replace strings");

    assert_eq!(patch.path, temp.path().join("Greeter_STRING_PATCHED.jar"));
    assert_eq!(patch.classes_changed, 1);
    assert_eq!(entries(&patch.path)[0], entries(&jar)[0]);

    let Some(java) = toolchain
        .java_home()
        .map(|home| home.join("bin").join(format!("java{}", std::env::consts::EXE_SUFFIX)))
        .filter(|java| java.is_file())
    else {
        return;
    };
    let output = Command::new(java)
        .arg("-cp")
        .arg(&patch.path)
        .arg("Greeter")
        .output()
        .expect("Failed to run java");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "welcome, world");
}

#[test]
fn test_replace_strings_requires_existing_archive() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let pipeline = Pipeline::new(PipelineConfig::default()).expect("Failed to create pipeline");

    let result = pipeline.replace_strings(&temp.path().join("missing.jar"), "a", "b");
    assert!(matches!(result, Err(Error::Archive { .. })));
}
