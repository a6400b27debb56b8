//! Parsing and static checking of a multi-stage container manifest.
//!
//! The checks cover what must hold before anything is built: two stages,
//! one pinned toolchain parameter, an artifact copy whose source is what the
//! builder produces, and a runtime stage that only places that one file and
//! starts it directly.

use crate::pipeline::config::{PipelineConfig, VERSION_ARG};
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::validate_pinned_image;
use regex::{NoExpand, Regex};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub keyword: String,
    pub args: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub base: String,
    pub alias: Option<String>,
    pub line: usize,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    /// `ARG`s declared before the first `FROM`.
    pub global_args: Vec<Instruction>,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopySpec {
    pub from: Option<String>,
    pub sources: Vec<String>,
    pub dest: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self> {
        let mut manifest = Manifest::default();

        for (line, text) in logical_lines(content) {
            let (keyword, args) = match text.split_once(char::is_whitespace) {
                Some((keyword, args)) => (keyword.to_ascii_uppercase(), args.trim().to_string()),
                None => (text.to_ascii_uppercase(), String::new()),
            };
            let instruction = Instruction {
                keyword,
                args,
                line,
            };

            if instruction.keyword == "FROM" {
                manifest.stages.push(parse_from(&instruction)?);
                continue;
            }

            match manifest.stages.last_mut() {
                Some(stage) => stage.instructions.push(instruction),
                None if instruction.keyword == "ARG" => manifest.global_args.push(instruction),
                None => {
                    return Err(ApiError::ManifestError {
                        message: format!(
                            "line {}: {} appears before the first FROM",
                            line, instruction.keyword
                        ),
                    })
                }
            }
        }

        if manifest.stages.is_empty() {
            return Err(ApiError::ManifestError {
                message: "manifest declares no FROM stage".to_string(),
            });
        }
        Ok(manifest)
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Default value of a global `ARG`, if declared with one.
    pub fn global_arg_default(&self, name: &str) -> Option<String> {
        self.global_args
            .iter()
            .map(|arg| parse_arg(&arg.args))
            .find(|(arg_name, _)| arg_name == name)
            .and_then(|(_, default)| default)
    }

    pub fn stage_by_alias(&self, alias: &str) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| stage.alias.as_deref() == Some(alias))
    }
}

impl Stage {
    pub fn instructions_named<'a>(
        &'a self,
        keyword: &'a str,
    ) -> impl Iterator<Item = &'a Instruction> + 'a {
        self.instructions
            .iter()
            .filter(move |instruction| instruction.keyword == keyword)
    }

    /// The effective working directory after the last `WORKDIR`.
    pub fn workdir(&self) -> Option<String> {
        self.instructions_named("WORKDIR")
            .fold(None, |current: Option<String>, instruction| {
                Some(resolve_path(current.as_deref(), &instruction.args))
            })
    }
}

/// Joins `\` continuations and drops blanks and comments, keeping start line numbers.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in content.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.starts_with('#') || (trimmed.is_empty() && pending.is_none()) {
            continue;
        }

        let (body, continues) = match trimmed.strip_suffix('\\') {
            Some(body) => (body.trim_end(), true),
            None => (trimmed, false),
        };

        let entry = pending.get_or_insert_with(|| (index + 1, String::new()));
        if !entry.1.is_empty() && !body.is_empty() {
            entry.1.push(' ');
        }
        entry.1.push_str(body);

        if !continues {
            if let Some(done) = pending.take() {
                if !done.1.is_empty() {
                    lines.push(done);
                }
            }
        }
    }

    if let Some(done) = pending.take() {
        if !done.1.is_empty() {
            lines.push(done);
        }
    }
    lines
}

fn parse_from(instruction: &Instruction) -> Result<Stage> {
    let tokens: Vec<&str> = instruction
        .args
        .split_whitespace()
        .filter(|token| !token.starts_with("--"))
        .collect();

    let (base, alias) = match tokens.as_slice() {
        [base] => (base.to_string(), None),
        [base, as_kw, alias] if as_kw.eq_ignore_ascii_case("as") => {
            (base.to_string(), Some(alias.to_string()))
        }
        _ => {
            return Err(ApiError::ManifestError {
                message: format!(
                    "line {}: malformed FROM `{}`",
                    instruction.line, instruction.args
                ),
            })
        }
    };

    Ok(Stage {
        base,
        alias,
        line: instruction.line,
        instructions: Vec::new(),
    })
}

pub fn parse_arg(args: &str) -> (String, Option<String>) {
    match args.split_once('=') {
        Some((name, default)) => (
            name.trim().to_string(),
            Some(default.trim().trim_matches('"').to_string()),
        ),
        None => (args.trim().to_string(), None),
    }
}

/// Parses exec form (`["a", "b"]`); `None` means shell form.
pub fn parse_exec_form(args: &str) -> Option<Vec<String>> {
    if !args.trim_start().starts_with('[') {
        return None;
    }
    serde_json::from_str::<Vec<String>>(args).ok()
}

pub fn parse_copy(args: &str) -> Option<CopySpec> {
    let mut from = None;
    let mut rest = Vec::new();

    for token in args.split_whitespace() {
        match token.strip_prefix("--") {
            Some(flag) => {
                if let Some(stage) = flag.strip_prefix("from=") {
                    from = Some(stage.to_string());
                }
            }
            None => rest.push(token),
        }
    }

    let mut paths = match parse_exec_form(&rest.join(" ")) {
        Some(paths) => paths,
        None => rest.into_iter().map(str::to_string).collect(),
    };

    if paths.len() < 2 {
        return None;
    }
    let dest = paths.pop()?;
    Some(CopySpec {
        from,
        sources: paths,
        dest,
    })
}

/// Resolves `path` against `workdir` the way the image builder does.
pub fn resolve_path(workdir: Option<&str>, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", workdir.unwrap_or("/"), path)
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Matches `${NAME}` or `$NAME` ending at an identifier boundary.
fn arg_reference(name: &str) -> Option<Regex> {
    let name = regex::escape(name);
    Regex::new(&format!(r"\$(?:\{{{name}\}}|{name}\b)")).ok()
}

fn references_arg(text: &str, name: &str) -> bool {
    arg_reference(name).is_some_and(|re| re.is_match(text))
}

fn substitute_args(text: &str, manifest: &Manifest) -> String {
    let mut out = text.to_string();
    for arg in &manifest.global_args {
        if let (name, Some(default)) = parse_arg(&arg.args) {
            if let Some(re) = arg_reference(&name) {
                out = re.replace_all(&out, NoExpand(&default)).into_owned();
            }
        }
    }
    out
}

/// Checks `manifest` against `config`; an empty result means it is sound.
pub fn check(manifest: &Manifest, config: &PipelineConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut report = |rule: &'static str, message: String| {
        findings.push(Finding { rule, message });
    };

    if manifest.stages.len() != 2 {
        report(
            "stage-count",
            format!(
                "expected a builder and a runtime stage, found {} stage(s)",
                manifest.stages.len()
            ),
        );
    }
    if manifest.stages.len() < 2 {
        return findings;
    }

    let builder = &manifest.stages[0];
    let runtime = &manifest.stages[manifest.stages.len() - 1];

    // version-param
    let version_args = manifest
        .global_args
        .iter()
        .filter(|arg| parse_arg(&arg.args).0 == VERSION_ARG)
        .count();
    if version_args != 1 {
        report(
            "version-param",
            format!(
                "expected exactly one global ARG {}, found {}",
                VERSION_ARG, version_args
            ),
        );
    }
    match manifest.global_arg_default(VERSION_ARG) {
        Some(version) if version != config.rust_version => report(
            "version-param",
            format!(
                "manifest pins {}={} but the configuration says {}",
                VERSION_ARG, version, config.rust_version
            ),
        ),
        None if version_args > 0 => report(
            "version-param",
            format!("ARG {} has no default value", VERSION_ARG),
        ),
        _ => {}
    }
    for stage in &manifest.stages {
        for arg in stage.instructions_named("ARG") {
            if let (name, Some(_)) = parse_arg(&arg.args) {
                if name == VERSION_ARG {
                    report(
                        "version-param",
                        format!("line {}: {} is redefined inside a stage", arg.line, VERSION_ARG),
                    );
                }
            }
        }
    }
    if !references_arg(&builder.base, VERSION_ARG) {
        report(
            "version-param",
            format!(
                "line {}: builder base `{}` does not use ${{{}}}",
                builder.line, builder.base, VERSION_ARG
            ),
        );
    }

    // pinned-base
    for stage in &manifest.stages {
        if manifest.stage_by_alias(&stage.base).is_some() {
            continue;
        }
        let image = substitute_args(&stage.base, manifest);
        if let Err(e) = validate_pinned_image("FROM", &image) {
            report("pinned-base", format!("line {}: {}", stage.line, e));
        }
    }

    // artifact-path
    let builds_release = builder
        .instructions_named("RUN")
        .any(|run| run.args.contains("cargo build") && run.args.contains("--release"));
    if !builds_release {
        report(
            "artifact-path",
            "builder stage never runs `cargo build --release`".to_string(),
        );
    }
    if config.locked {
        let builds_locked = builder
            .instructions_named("RUN")
            .any(|run| run.args.contains("cargo build") && run.args.contains("--locked"));
        if !builds_locked {
            report(
                "reproducibility",
                "builder stage must run `cargo build --locked` against the committed Cargo.lock"
                    .to_string(),
            );
        }
    }

    let runtime_workdir = runtime.workdir();
    if runtime_workdir.as_deref() != Some(config.workdir.trim_end_matches('/')) {
        report(
            "workdir",
            format!(
                "runtime working directory is {:?}, expected {}",
                runtime_workdir, config.workdir
            ),
        );
    }

    let copies: Vec<&Instruction> = runtime.instructions_named("COPY").collect();
    match copies.as_slice() {
        [] => report(
            "artifact-path",
            "runtime stage never copies the artifact".to_string(),
        ),
        [copy] => check_artifact_copy(
            copy,
            builder,
            runtime_workdir.as_deref(),
            config,
            &mut report,
        ),
        many => report(
            "layer-minimality",
            format!("runtime stage copies {} times; only the artifact may be copied", many.len()),
        ),
    }

    // layer-minimality / runtime-surface
    for instruction in &runtime.instructions {
        match instruction.keyword.as_str() {
            "RUN" | "ADD" => report(
                "layer-minimality",
                format!(
                    "line {}: {} in the runtime stage adds content beyond the artifact",
                    instruction.line, instruction.keyword
                ),
            ),
            "ENV" | "EXPOSE" | "VOLUME" => report(
                "runtime-surface",
                format!(
                    "line {}: {} declares runtime configuration the service does not define",
                    instruction.line, instruction.keyword
                ),
            ),
            _ => {}
        }
    }

    // entry-command
    let entries: Vec<&Instruction> = runtime
        .instructions
        .iter()
        .filter(|instruction| matches!(instruction.keyword.as_str(), "CMD" | "ENTRYPOINT"))
        .collect();
    match entries.as_slice() {
        [entry] => check_entry(entry, runtime_workdir.as_deref(), config, &mut report),
        other => report(
            "entry-command",
            format!(
                "runtime stage must declare exactly one CMD or ENTRYPOINT, found {}",
                other.len()
            ),
        ),
    }

    findings
}

fn check_artifact_copy<F>(
    copy: &Instruction,
    builder: &Stage,
    runtime_workdir: Option<&str>,
    config: &PipelineConfig,
    report: &mut F,
) where
    F: FnMut(&'static str, String),
{
    let Some(spec) = parse_copy(&copy.args) else {
        report(
            "artifact-path",
            format!("line {}: cannot read COPY `{}`", copy.line, copy.args),
        );
        return;
    };

    // `--from` names the builder by alias or by its index (always 0).
    let from_builder = match spec.from.as_deref() {
        Some(from) => match from.parse::<usize>() {
            Ok(index) => index == 0,
            Err(_) => builder.alias.as_deref() == Some(from),
        },
        None => false,
    };
    if !from_builder {
        report(
            "artifact-path",
            format!(
                "line {}: artifact must be copied --from={}",
                copy.line,
                builder.alias.as_deref().unwrap_or("<unnamed builder>")
            ),
        );
    }

    let [source] = spec.sources.as_slice() else {
        report(
            "artifact-path",
            format!("line {}: COPY must name exactly one source", copy.line),
        );
        return;
    };

    let source_path = resolve_path(builder.workdir().as_deref(), source);
    let expected_source = config.artifact_build_path();
    if source_path != expected_source {
        report(
            "artifact-path",
            format!(
                "line {}: copies {} but the builder produces {}",
                copy.line, source_path, expected_source
            ),
        );
    }

    let mut dest_path = resolve_path(runtime_workdir, &spec.dest);
    let dest_is_dir = spec.dest.ends_with('/')
        || spec.dest == "."
        || runtime_workdir.map(|w| w.trim_end_matches('/')) == Some(dest_path.as_str());
    if dest_is_dir {
        let file_name = source_path.rsplit('/').next().unwrap_or_default();
        dest_path = resolve_path(Some(&dest_path), file_name);
    }
    if dest_path != config.artifact_runtime_path() {
        report(
            "artifact-path",
            format!(
                "line {}: artifact lands at {}, expected {}",
                copy.line,
                dest_path,
                config.artifact_runtime_path()
            ),
        );
    }
}

fn check_entry<F>(
    entry: &Instruction,
    runtime_workdir: Option<&str>,
    config: &PipelineConfig,
    report: &mut F,
) where
    F: FnMut(&'static str, String),
{
    let Some(command) = parse_exec_form(&entry.args) else {
        report(
            "entry-command",
            format!(
                "line {}: shell form `{}` wraps the artifact in /bin/sh; use exec form",
                entry.line, entry.args
            ),
        );
        return;
    };

    let Some((program, args)) = command.split_first() else {
        report(
            "entry-command",
            format!("line {}: empty {}", entry.line, entry.keyword),
        );
        return;
    };

    let program_path = resolve_path(runtime_workdir, program);
    if program_path != config.artifact_runtime_path() {
        report(
            "entry-command",
            format!(
                "line {}: starts {} instead of {}",
                entry.line,
                program_path,
                config.artifact_runtime_path()
            ),
        );
    }
    if args != config.entry_args.as_slice() {
        report(
            "entry-command",
            format!(
                "line {}: arguments {:?} differ from configured {:?}",
                entry.line, args, config.entry_args
            ),
        );
    }
}

/// Turns findings into a single error.
pub fn ensure_sound(findings: &[Finding]) -> Result<()> {
    if findings.is_empty() {
        return Ok(());
    }
    Err(ApiError::ManifestError {
        message: findings
            .iter()
            .map(Finding::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    })
}
