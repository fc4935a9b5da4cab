// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

//! # Job Manifests
//!
//! A manifest describes one external tool: how to launch it, which contexts it
//! can run against and how its output lines turn into [`EventKind`]s.
//!
//! Manifests are TOML documents:
//!
//! ```toml
//! description = "ARP sweep of the local subnet"
//! command = "arp-scan"
//! args = ["--interface", "{interface}", "{network}"]
//! contexts = ["interface"]
//!
//! [[rules]]
//! pattern = '^(?P<ip>\d+\.\d+\.\d+\.\d+)\s+(?P<mac>[0-9a-f:]{17})'
//! event = "host"
//! fields = { state = "up" }
//! ```
//!
//! Every pattern is compiled when the manifest is loaded, so a broken rule is
//! reported by [`ManifestStore::load`] and never while a job is running.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;

use crate::error::ManifestError;
use crate::models::event::EventKind;
use crate::models::object::ContextKind;

/// Values substituted into `{placeholder}` arguments.
pub type Bindings = BTreeMap<&'static str, String>;

/// Every placeholder an argument may use, with the shallowest context
/// that provides it.
pub const PLACEHOLDERS: [(&str, ContextKind); 8] = [
    ("interface", ContextKind::Interface),
    ("ip", ContextKind::Interface),
    ("mask", ContextKind::Interface),
    ("network", ContextKind::Interface),
    ("gateway", ContextKind::Interface),
    ("host", ContextKind::Host),
    ("proto", ContextKind::Port),
    ("port", ContextKind::Port),
];

/// Keys every report carries besides the rule's fields.
pub const RESERVED_FIELDS: [&str; 4] = ["type", "job", "device", "at"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default)]
    description: Option<String>,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default = "default_contexts")]
    contexts: Vec<String>,
    #[serde(default)]
    rules: Vec<RuleFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    pattern: String,
    event: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

fn default_contexts() -> Vec<String> {
    vec![ContextKind::Global.as_str().to_string()]
}

/// One output pattern and the event it produces.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    kind: EventKind,
    fields: BTreeMap<String, String>,
}

impl Rule {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Matches one line. Named captures override the static fields.
    pub fn apply(&self, line: &str) -> Option<BTreeMap<String, String>> {
        let captures = self.pattern.captures(line)?;
        let mut fields = self.fields.clone();

        for name in self.pattern.capture_names().flatten() {
            if let Some(value) = captures.name(name) {
                fields.insert(name.to_string(), value.as_str().to_string());
            }
        }
        Some(fields)
    }
}

/// A loaded, validated manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    name: String,
    description: Option<String>,
    command: String,
    args: Vec<String>,
    contexts: Vec<ContextKind>,
    rules: Vec<Rule>,
}

impl Manifest {
    /// Parses and validates manifest text.
    pub fn parse(name: &str, text: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = toml::from_str(text).map_err(|source| ManifestError::Syntax {
            name: name.to_string(),
            source,
        })?;

        if file.command.trim().is_empty() {
            return Err(ManifestError::Empty(name.to_string()));
        }

        let contexts = file
            .contexts
            .iter()
            .map(|ctx| parse_context(name, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        if contexts.is_empty() {
            return Err(ManifestError::Empty(name.to_string()));
        }

        // Placeholders must be available in the shallowest accepted context.
        let shallowest = contexts.iter().copied().min().unwrap_or(ContextKind::Global);
        for arg in &file.args {
            for placeholder in placeholders(arg) {
                if let Some((_, needs)) = PLACEHOLDERS.iter().find(|(p, _)| *p == placeholder)
                    && *needs > shallowest
                {
                    return Err(ManifestError::Placeholder {
                        name: name.to_string(),
                        placeholder: placeholder.to_string(),
                        context: shallowest,
                    });
                }
            }
        }

        let rules = file
            .rules
            .into_iter()
            .map(|rule| compile_rule(name, rule))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            description: file.description,
            command: file.command,
            args: file.args,
            contexts,
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn contexts(&self) -> &[ContextKind] {
        &self.contexts
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns `true` if jobs of this manifest may run in a `kind` context.
    pub fn accepts(&self, kind: ContextKind) -> bool {
        self.contexts.contains(&kind)
    }

    /// Runs `line` through the rules. The first matching rule wins.
    pub fn match_line(&self, line: &str) -> Option<(EventKind, BTreeMap<String, String>)> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(line).map(|fields| (rule.kind, fields)))
    }

    /// Substitutes the bindings into the argument list.
    pub fn render_args(&self, bindings: &Bindings) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                bindings.iter().fold(arg.clone(), |acc, (key, value)| {
                    acc.replace(&format!("{{{key}}}"), value)
                })
            })
            .collect()
    }
}

fn parse_context(manifest: &str, ctx: &str) -> Result<ContextKind, ManifestError> {
    match ctx {
        "global" => Ok(ContextKind::Global),
        "interface" => Ok(ContextKind::Interface),
        "host" => Ok(ContextKind::Host),
        "port" => Ok(ContextKind::Port),
        other => Err(ManifestError::UnknownContext {
            name: manifest.to_string(),
            context: other.to_string(),
        }),
    }
}

fn compile_rule(manifest: &str, rule: RuleFile) -> Result<Rule, ManifestError> {
    let kind = match rule.event.as_str() {
        "host" => EventKind::Host,
        "port" => EventKind::Port,
        "os" => EventKind::Os,
        "notice" => EventKind::Notice,
        other => {
            return Err(ManifestError::UnknownEvent {
                name: manifest.to_string(),
                event: other.to_string(),
            });
        }
    };

    let pattern = Regex::new(&rule.pattern).map_err(|source| ManifestError::Pattern {
        name: manifest.to_string(),
        source,
    })?;

    let reserved = pattern
        .capture_names()
        .flatten()
        .chain(rule.fields.keys().map(String::as_str))
        .find(|field| RESERVED_FIELDS.contains(field));
    if let Some(field) = reserved {
        return Err(ManifestError::ReservedField {
            name: manifest.to_string(),
            field: field.to_string(),
        });
    }

    Ok(Rule {
        pattern,
        kind,
        fields: rule.fields,
    })
}

/// Extracts `{word}` tokens. Anything else in braces is left alone.
fn placeholders(arg: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = arg;

    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else { break };
        let token = &after[..end];
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_lowercase()) {
            found.push(token);
        }
        rest = &after[end + 1..];
    }
    found
}

/// Anything able to look a manifest up by name.
pub trait ManifestStore {
    fn load(&self, name: &str) -> Result<Arc<Manifest>, ManifestError>;
}

/// Loads `<dir>/<name>.toml` files.
#[derive(Debug, Clone)]
pub struct ManifestDir {
    dir: PathBuf,
}

impl ManifestDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of every manifest in the directory, sorted.
    pub fn available(&self) -> io::Result<Vec<String>> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }
}

impl ManifestStore for ManifestDir {
    fn load(&self, name: &str) -> Result<Arc<Manifest>, ManifestError> {
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains(char::is_whitespace);
        if !plain {
            return Err(ManifestError::NotFound(name.to_string()));
        }

        let path = self.dir.join(format!("{name}.toml"));
        let text = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ManifestError::NotFound(name.to_string()),
            _ => ManifestError::Io {
                name: name.to_string(),
                source,
            },
        })?;

        Manifest::parse(name, &text).map(Arc::new)
    }
}

/// Keeps manifests in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    manifests: BTreeMap<String, Arc<Manifest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, manifest: Manifest) {
        self.manifests
            .insert(manifest.name().to_string(), Arc::new(manifest));
    }

    pub fn with(mut self, manifest: Manifest) -> Self {
        self.insert(manifest);
        self
    }
}

impl ManifestStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Arc<Manifest>, ManifestError> {
        self.manifests
            .get(name)
            .cloned()
            .ok_or_else(|| ManifestError::NotFound(name.to_string()))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    const SWEEP: &str = r#"
        description = "ping sweep"
        command = "sweep"
        args = ["-i", "{interface}", "{network}"]
        contexts = ["interface", "host"]

        [[rules]]
        pattern = '^up (?P<ip>\S+)$'
        event = "host"
        fields = { state = "up" }

        [[rules]]
        pattern = '^(?P<ip>\S+) (?P<state>\w+)$'
        event = "host"

        [[rules]]
        pattern = '^up'
        event = "notice"
    "#;

    #[test]
    fn parse_reads_every_section() {
        let manifest = Manifest::parse("sweep", SWEEP).unwrap();
        assert_eq!(manifest.name(), "sweep");
        assert_eq!(manifest.description(), Some("ping sweep"));
        assert_eq!(manifest.command(), "sweep");
        assert_eq!(manifest.contexts(), &[ContextKind::Interface, ContextKind::Host]);
        assert_eq!(manifest.rules().len(), 3);
        assert!(manifest.accepts(ContextKind::Host));
        assert!(!manifest.accepts(ContextKind::Global));
    }

    #[test]
    fn contexts_default_to_global() {
        let manifest = Manifest::parse("echo", r#"command = "echo""#).unwrap();
        assert_eq!(manifest.contexts(), &[ContextKind::Global]);
        assert!(manifest.rules().is_empty());
    }

    #[test]
    fn first_matching_rule_wins_and_captures_override() {
        let manifest = Manifest::parse("sweep", SWEEP).unwrap();

        let (kind, fields) = manifest.match_line("up 10.0.0.7").unwrap();
        assert_eq!(kind, EventKind::Host);
        assert_eq!(fields.get("ip").map(String::as_str), Some("10.0.0.7"));
        assert_eq!(fields.get("state").map(String::as_str), Some("up"));

        let (_, fields) = manifest.match_line("10.0.0.8 down").unwrap();
        assert_eq!(fields.get("state").map(String::as_str), Some("down"));

        assert!(manifest.match_line("nothing to see").is_none());
    }

    #[test]
    fn render_args_substitutes_bindings() {
        let manifest = Manifest::parse("sweep", SWEEP).unwrap();
        let mut bindings = Bindings::new();
        bindings.insert("interface", "eth0".into());
        bindings.insert("network", "10.0.0.0/24".into());

        assert_eq!(manifest.render_args(&bindings), vec!["-i", "eth0", "10.0.0.0/24"]);
    }

    #[test]
    fn broken_manifests_are_rejected_at_load() {
        let bad_regex = "command = \"x\"\n[[rules]]\npattern = '('\nevent = \"host\"";
        assert!(matches!(
            Manifest::parse("x", bad_regex),
            Err(ManifestError::Pattern { .. })
        ));

        let exit_rule = "command = \"x\"\n[[rules]]\npattern = 'x'\nevent = \"exit\"";
        assert!(matches!(
            Manifest::parse("x", exit_rule),
            Err(ManifestError::UnknownEvent { event, .. }) if event == "exit"
        ));

        let bad_ctx = "command = \"x\"\ncontexts = [\"planet\"]";
        assert!(matches!(
            Manifest::parse("x", bad_ctx),
            Err(ManifestError::UnknownContext { context, .. }) if context == "planet"
        ));

        assert!(matches!(
            Manifest::parse("x", "command = \"  \""),
            Err(ManifestError::Empty(_))
        ));
        assert!(matches!(
            Manifest::parse("x", "command = \"x\"\nbogus = 1"),
            Err(ManifestError::Syntax { .. })
        ));
    }

    #[test]
    fn placeholders_must_exist_in_every_context() {
        let text = "command = \"x\"\nargs = [\"{host}\"]\ncontexts = [\"interface\", \"host\"]";
        assert!(matches!(
            Manifest::parse("x", text),
            Err(ManifestError::Placeholder { placeholder, context: ContextKind::Interface, .. })
                if placeholder == "host"
        ));

        let global = "command = \"x\"\nargs = [\"{interface}\"]";
        assert_eq!(
            Manifest::parse("x", global).unwrap_err().to_string(),
            "manifest x uses {interface} which a global context does not provide"
        );

        let literal = "command = \"awk\"\nargs = [\"{print $1}\", \"{unknown}\"]";
        assert!(Manifest::parse("awk", literal).is_ok());
    }

    #[test]
    fn rules_can_not_shadow_report_keys() {
        let capture = "command = \"x\"\n[[rules]]\npattern = '(?P<ip>\\S+) (?P<at>\\S+)'\nevent = \"host\"";
        assert!(matches!(
            Manifest::parse("x", capture),
            Err(ManifestError::ReservedField { field, .. }) if field == "at"
        ));

        let fixed = "command = \"x\"\n[[rules]]\npattern = 'up'\nevent = \"notice\"\nfields = { type = \"banner\" }";
        assert_eq!(
            Manifest::parse("x", fixed).unwrap_err().to_string(),
            "manifest x uses reserved field name: type"
        );

        let fine = "command = \"x\"\n[[rules]]\npattern = '(?P<jobs>\\d+)'\nevent = \"notice\"";
        assert!(Manifest::parse("x", fine).is_ok());
    }

    #[test]
    fn memory_store_reports_missing_names() {
        let store = MemoryStore::new().with(Manifest::parse("echo", "command = \"echo\"").unwrap());
        assert_eq!(store.load("echo").unwrap().name(), "echo");
        assert!(matches!(store.load("nmap"), Err(ManifestError::NotFound(n)) if n == "nmap"));
    }

    #[test]
    fn manifest_dir_refuses_paths() {
        let store = ManifestDir::new("/nonexistent");
        for name in ["", "../etc/passwd", "a/b", ".hidden", "missing"] {
            assert!(
                matches!(store.load(name), Err(ManifestError::NotFound(_))),
                "{name:?} should be not found"
            );
        }
    }

    #[test]
    fn bundled_manifests_load() {
        let bundled = [
            ("arp-scan", include_str!("../../manifests/arp-scan.toml")),
            ("nmap", include_str!("../../manifests/nmap.toml")),
            ("ping", include_str!("../../manifests/ping.toml")),
            ("port-check", include_str!("../../manifests/port-check.toml")),
        ];
        for (name, text) in bundled {
            let manifest = Manifest::parse(name, text).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(manifest.description().is_some(), "{name}");
        }

        let nmap = Manifest::parse("nmap", bundled[1].1).unwrap();
        let (kind, fields) = nmap.match_line("22/tcp open  ssh OpenSSH 9.6").unwrap();
        assert_eq!(kind, EventKind::Port);
        assert_eq!(fields["port"], "22");
        assert_eq!(fields["state"], "open");
    }
}
