// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Stage definition table
//!
//! The whole pipeline is declarative data: each stage names its inputs,
//! its output artifact, an invocation recipe, a failure policy, and a
//! timeout. The runner is a single generic interpreter over this table,
//! so adding or reordering stages never touches orchestration code.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::config::RunConfig;

/// A named, staged file. The key is stable and used in logs and the run
/// summary; the relative path is the on-disk contract downstream scripts
/// key off, so both are fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    key: &'static str,
    rel_path: &'static str,
}

impl ArtifactKey {
    pub const fn new(key: &'static str, rel_path: &'static str) -> Self {
        Self { key, rel_path }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Path relative to the staging root
    pub fn rel_path(&self) -> &'static str {
        self.rel_path
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Artifact keys for every stage output. File names and numbering are the
/// external contract: they match the layout downstream tooling expects,
/// including the numbering gap left by the screenshot stage.
pub mod keys {
    use super::ArtifactKey;

    pub const SUBFINDER: ArtifactKey =
        ArtifactKey::new("01_subfinder", "output/01_subfinder.txt");
    pub const AMASS_PASSIVE: ArtifactKey =
        ArtifactKey::new("02_amass_passive", "output/02_amass_passive.txt");
    pub const SUBS_UNIQ: ArtifactKey =
        ArtifactKey::new("03_subs_uniq", "output/03_subs_uniq.txt");
    pub const DNSX_RESOLVED: ArtifactKey =
        ArtifactKey::new("04_dnsx_resolved", "output/04_dnsx_resolved.txt");
    pub const HOSTS_RESOLVED: ArtifactKey =
        ArtifactKey::new("05_hosts_resolved", "output/05_hosts_resolved.txt");
    pub const NAABU_TOP1K: ArtifactKey =
        ArtifactKey::new("06_naabu_top1k", "output/06_naabu_top1k.txt");
    pub const NAABU_FULL: ArtifactKey =
        ArtifactKey::new("07_naabu_full", "output/07_naabu_full.txt");
    pub const OPEN_PORTS: ArtifactKey =
        ArtifactKey::new("08_open_ports", "output/08_open_ports.txt");
    pub const HTTPX_SUBS: ArtifactKey =
        ArtifactKey::new("09_httpx_subs", "output/09_httpx_subs.txt");
    pub const HTTPX_PORTS: ArtifactKey =
        ArtifactKey::new("10_httpx_ports", "output/10_httpx_ports.txt");
    pub const LIVE_URLS: ArtifactKey =
        ArtifactKey::new("11_live_urls", "output/11_live_urls.txt");
    pub const GOWITNESS_MANIFEST: ArtifactKey =
        ArtifactKey::new("gowitness", "screenshots/gowitness.json");
    pub const CNAME_CANDIDATES: ArtifactKey =
        ArtifactKey::new("12_cname_candidates", "output/12_cname_candidates.txt");
    pub const NUCLEI_WEB: ArtifactKey =
        ArtifactKey::new("13_nuclei_web", "output/13_nuclei_web.txt");
    pub const NUCLEI_TAKEOVER: ArtifactKey =
        ArtifactKey::new("14_nuclei_takeover", "output/14_nuclei_takeover.txt");
    pub const GAU: ArtifactKey = ArtifactKey::new("15_gau", "output/15_gau.txt");
    pub const PARAMS: ArtifactKey = ArtifactKey::new("16_params", "output/16_params.txt");
    pub const FFUF_DIRS: ArtifactKey =
        ArtifactKey::new("17_ffuf_dirs", "output/17_ffuf_dirs.txt");
    pub const FFUF_PARAMS: ArtifactKey =
        ArtifactKey::new("18_ffuf_params", "output/18_ffuf_params.txt");
    pub const JS_ENDPOINTS: ArtifactKey =
        ArtifactKey::new("19_js_endpoints", "output/19_js_endpoints.txt");
    pub const ROBOTS: ArtifactKey = ArtifactKey::new("20_robots", "output/20_robots.txt");
}

/// Whether a stage failure aborts the pipeline or is recorded and skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Fatal,
    Skippable,
}

/// One declared input artifact of a stage
#[derive(Debug, Clone, Copy)]
pub struct StageInput {
    pub key: ArtifactKey,
    /// Optional inputs may be absent (their producing stage was skippable
    /// and failed); merges treat them as empty.
    pub optional: bool,
}

impl StageInput {
    pub const fn required(key: ArtifactKey) -> Self {
        Self { key, optional: false }
    }

    pub const fn optional(key: ArtifactKey) -> Self {
        Self { key, optional: true }
    }
}

/// One element of an external tool's argument vector
#[derive(Debug, Clone)]
pub enum Arg {
    /// Literal argument; relative paths resolve against the staging root
    /// because the child runs with the staging root as its cwd
    Lit(String),
    /// Replaced with the absolute path of a staged input artifact
    Artifact(ArtifactKey),
    /// Replaced with the stage's own in-flight output path, for tools
    /// that write their result file themselves
    OutputPath,
}

/// How the stage's primary artifact gets its bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child stdout is streamed into the artifact
    Stdout,
    /// The tool writes the artifact path handed to it via `Arg::OutputPath`
    ToolManaged,
}

/// Recipe for invoking one external tool
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub bin: &'static str,
    pub args: Vec<Arg>,
    /// Artifact piped to the child's stdin, if any
    pub stdin: Option<ArtifactKey>,
    pub output_mode: OutputMode,
}

/// Recipe for in-process line surgery over the stage's inputs.
///
/// Plain merge is the filter-less, field-less, sorted case: concatenate,
/// trim, drop blanks, sort, dedup. `filter` keeps only lines containing a
/// substring; `fields` projects zero-based whitespace columns. With
/// `sorted` off, input order is preserved and duplicates are kept.
#[derive(Debug, Clone, Default)]
pub struct MergeRecipe {
    pub filter: Option<&'static str>,
    pub fields: Option<&'static [usize]>,
    pub sorted: bool,
}

impl MergeRecipe {
    pub const fn sorted() -> Self {
        Self {
            filter: None,
            fields: None,
            sorted: true,
        }
    }
}

/// Invocation recipe for a stage
#[derive(Debug, Clone)]
pub enum Invocation {
    Tool(ToolInvocation),
    Merge(MergeRecipe),
}

/// Static definition of one pipeline stage
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    /// 1-based position; fixes total ordering
    pub index: usize,
    pub name: &'static str,
    /// Artifact keys this stage reads, in order
    pub inputs: Vec<StageInput>,
    /// Primary artifact this stage produces
    pub output: Option<ArtifactKey>,
    pub invocation: Invocation,
    pub failure_policy: FailurePolicy,
    pub timeout: Duration,
}

impl StageDescriptor {
    /// External binary this stage invokes, if it is a tool stage
    pub fn tool_bin(&self) -> Option<&'static str> {
        match &self.invocation {
            Invocation::Tool(t) => Some(t.bin),
            Invocation::Merge(_) => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.failure_policy == FailurePolicy::Fatal
    }
}

/// Every external executable the pipeline can invoke
pub const REQUIRED_TOOLS: &[&str] = &[
    "subfinder", "amass", "dnsx", "naabu", "httpx", "nuclei", "gau", "unfurl", "ffuf",
    "gowitness", "curl",
];

fn lit(s: impl Into<String>) -> Arg {
    Arg::Lit(s.into())
}

/// Build the 21-stage recon catalog for a target.
///
/// Argument vectors, rates and artifact names are carried over verbatim
/// from the tooling this pipeline grew around; `config` supplies the
/// wordlist path and per-stage timeout overrides.
pub fn build_catalog(target: &str, config: &RunConfig) -> Vec<StageDescriptor> {
    use keys::*;
    use FailurePolicy::{Fatal, Skippable};

    let wordlist = config.wordlist.display().to_string();

    let mut stages = vec![
        StageDescriptor {
            index: 1,
            name: "subfinder",
            inputs: vec![],
            output: Some(SUBFINDER),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "subfinder",
                args: vec![lit("-d"), lit(target), lit("-all"), lit("-silent")],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Fatal,
            timeout: Duration::from_secs(900),
        },
        StageDescriptor {
            index: 2,
            name: "amass-passive",
            inputs: vec![],
            output: Some(AMASS_PASSIVE),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "amass",
                args: vec![lit("enum"), lit("-passive"), lit("-d"), lit(target)],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(1800),
        },
        StageDescriptor {
            index: 3,
            name: "merge-subdomains",
            inputs: vec![
                StageInput::required(SUBFINDER),
                StageInput::optional(AMASS_PASSIVE),
            ],
            output: Some(SUBS_UNIQ),
            invocation: Invocation::Merge(MergeRecipe::sorted()),
            failure_policy: Fatal,
            timeout: Duration::from_secs(60),
        },
        StageDescriptor {
            index: 4,
            name: "dnsx-resolve",
            inputs: vec![StageInput::required(SUBS_UNIQ)],
            output: Some(DNSX_RESOLVED),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "dnsx",
                args: vec![
                    lit("-l"),
                    Arg::Artifact(SUBS_UNIQ),
                    lit("-a"),
                    lit("-aaaa"),
                    lit("-cname"),
                    lit("-ns"),
                    lit("-resp"),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Fatal,
            timeout: Duration::from_secs(900),
        },
        StageDescriptor {
            index: 5,
            name: "extract-hosts",
            inputs: vec![StageInput::required(DNSX_RESOLVED)],
            output: Some(HOSTS_RESOLVED),
            invocation: Invocation::Merge(MergeRecipe {
                filter: None,
                fields: Some(&[0]),
                sorted: true,
            }),
            failure_policy: Fatal,
            timeout: Duration::from_secs(60),
        },
        StageDescriptor {
            index: 6,
            name: "naabu-top1k",
            inputs: vec![StageInput::required(HOSTS_RESOLVED)],
            output: Some(NAABU_TOP1K),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "naabu",
                args: vec![
                    lit("-list"),
                    Arg::Artifact(HOSTS_RESOLVED),
                    lit("-p"),
                    lit("top-1000"),
                    lit("-rate"),
                    lit("2000"),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(1800),
        },
        StageDescriptor {
            index: 7,
            name: "naabu-full",
            inputs: vec![StageInput::required(HOSTS_RESOLVED)],
            output: Some(NAABU_FULL),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "naabu",
                args: vec![
                    lit("-list"),
                    Arg::Artifact(HOSTS_RESOLVED),
                    lit("-p"),
                    lit("-"),
                    lit("-rate"),
                    lit("500"),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(7200),
        },
        StageDescriptor {
            index: 8,
            name: "merge-open-ports",
            inputs: vec![
                StageInput::optional(NAABU_TOP1K),
                StageInput::optional(NAABU_FULL),
            ],
            output: Some(OPEN_PORTS),
            invocation: Invocation::Merge(MergeRecipe::sorted()),
            failure_policy: Skippable,
            timeout: Duration::from_secs(60),
        },
        StageDescriptor {
            index: 9,
            name: "httpx-subdomains",
            inputs: vec![StageInput::required(SUBS_UNIQ)],
            output: Some(HTTPX_SUBS),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "httpx",
                args: vec![
                    lit("-l"),
                    Arg::Artifact(SUBS_UNIQ),
                    lit("-status-code"),
                    lit("-title"),
                    lit("-tech-detect"),
                    lit("-follow-redirects"),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Fatal,
            timeout: Duration::from_secs(900),
        },
        StageDescriptor {
            index: 10,
            name: "httpx-ports",
            inputs: vec![StageInput::required(OPEN_PORTS)],
            output: Some(HTTPX_PORTS),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "httpx",
                args: vec![
                    lit("-l"),
                    Arg::Artifact(OPEN_PORTS),
                    lit("-status-code"),
                    lit("-title"),
                    lit("-tech-detect"),
                    lit("-follow-redirects"),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(900),
        },
        StageDescriptor {
            index: 11,
            name: "merge-live-urls",
            inputs: vec![
                StageInput::required(HTTPX_SUBS),
                StageInput::optional(HTTPX_PORTS),
            ],
            output: Some(LIVE_URLS),
            invocation: Invocation::Merge(MergeRecipe {
                filter: None,
                fields: Some(&[0]),
                sorted: true,
            }),
            failure_policy: Fatal,
            timeout: Duration::from_secs(60),
        },
        StageDescriptor {
            index: 12,
            name: "gowitness",
            inputs: vec![StageInput::required(LIVE_URLS)],
            output: Some(GOWITNESS_MANIFEST),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "gowitness",
                args: vec![
                    lit("file"),
                    lit("-f"),
                    Arg::Artifact(LIVE_URLS),
                    lit("-t"),
                    lit("5"),
                    lit("--timeout"),
                    lit("10"),
                    lit("--log-level"),
                    lit("warn"),
                    lit("--destination"),
                    lit("screenshots"),
                    lit("--json"),
                    Arg::OutputPath,
                ],
                stdin: None,
                output_mode: OutputMode::ToolManaged,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(1800),
        },
        StageDescriptor {
            index: 13,
            name: "cname-candidates",
            inputs: vec![StageInput::required(DNSX_RESOLVED)],
            output: Some(CNAME_CANDIDATES),
            invocation: Invocation::Merge(MergeRecipe {
                filter: Some("CNAME"),
                fields: Some(&[0, 4]),
                sorted: false,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(60),
        },
        StageDescriptor {
            index: 14,
            name: "nuclei-web",
            inputs: vec![StageInput::required(LIVE_URLS)],
            output: Some(NUCLEI_WEB),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "nuclei",
                args: vec![
                    lit("-l"),
                    Arg::Artifact(LIVE_URLS),
                    lit("-severity"),
                    lit("critical,high,medium"),
                    lit("-rl"),
                    lit("50"),
                    lit("-c"),
                    lit("50"),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(7200),
        },
        StageDescriptor {
            index: 15,
            name: "nuclei-takeover",
            inputs: vec![StageInput::required(SUBS_UNIQ)],
            output: Some(NUCLEI_TAKEOVER),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "nuclei",
                args: vec![
                    lit("-t"),
                    lit("http/takeovers/"),
                    lit("-l"),
                    Arg::Artifact(SUBS_UNIQ),
                    lit("-rl"),
                    lit("30"),
                    lit("-c"),
                    lit("30"),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(3600),
        },
        StageDescriptor {
            index: 16,
            name: "gau",
            inputs: vec![],
            output: Some(GAU),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "gau",
                args: vec![
                    lit("--providers"),
                    lit("wayback,otx,urlscan"),
                    lit(target),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(1800),
        },
        StageDescriptor {
            index: 17,
            name: "extract-params",
            inputs: vec![StageInput::required(GAU)],
            output: Some(PARAMS),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "unfurl",
                args: vec![lit("--unique"), lit("keys")],
                stdin: Some(GAU),
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(300),
        },
        StageDescriptor {
            index: 18,
            name: "ffuf-dirs",
            inputs: vec![],
            output: Some(FFUF_DIRS),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "ffuf",
                args: vec![
                    lit("-u"),
                    lit(format!("https://{}/FUZZ", target)),
                    lit("-w"),
                    lit(wordlist.as_str()),
                    lit("-mc"),
                    lit("200,204,301,302,307,401,403"),
                    lit("-o"),
                    Arg::OutputPath,
                    lit("-of"),
                    lit("txt"),
                ],
                stdin: None,
                output_mode: OutputMode::ToolManaged,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(3600),
        },
        StageDescriptor {
            index: 19,
            name: "ffuf-params",
            inputs: vec![StageInput::required(PARAMS)],
            output: Some(FFUF_PARAMS),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "ffuf",
                args: vec![
                    lit("-u"),
                    lit(format!("https://{}/search?FUZZ=test", target)),
                    lit("-w"),
                    Arg::Artifact(PARAMS),
                    lit("-mc"),
                    lit("all"),
                    lit("-o"),
                    Arg::OutputPath,
                    lit("-of"),
                    lit("txt"),
                ],
                stdin: None,
                output_mode: OutputMode::ToolManaged,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(3600),
        },
        StageDescriptor {
            index: 20,
            name: "js-endpoints",
            inputs: vec![StageInput::required(LIVE_URLS)],
            output: Some(JS_ENDPOINTS),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "httpx",
                args: vec![
                    lit("-l"),
                    Arg::Artifact(LIVE_URLS),
                    lit("-path"),
                    lit("discovery"),
                    lit("-store-response-dir"),
                    lit("output/js_out"),
                    lit("-match-regex"),
                    lit("\\.js($|\\?)"),
                ],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(900),
        },
        StageDescriptor {
            index: 21,
            name: "robots-txt",
            inputs: vec![],
            output: Some(ROBOTS),
            invocation: Invocation::Tool(ToolInvocation {
                bin: "curl",
                args: vec![lit("-s"), lit(format!("https://{}/robots.txt", target))],
                stdin: None,
                output_mode: OutputMode::Stdout,
            }),
            failure_policy: Skippable,
            timeout: Duration::from_secs(60),
        },
    ];

    for stage in &mut stages {
        if let Some(timeout) = config.timeout_for(stage.name) {
            stage.timeout = timeout;
        }
    }

    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn catalog() -> Vec<StageDescriptor> {
        build_catalog("example.com", &RunConfig::default())
    }

    #[test]
    fn test_indices_are_contiguous_and_one_based() {
        let stages = catalog();
        assert_eq!(stages.len(), 21);
        for (i, stage) in stages.iter().enumerate() {
            assert_eq!(stage.index, i + 1);
        }
    }

    #[test]
    fn test_inputs_reference_strictly_earlier_outputs() {
        let stages = catalog();
        for stage in &stages {
            for input in &stage.inputs {
                let producer = stages
                    .iter()
                    .find(|s| s.output == Some(input.key))
                    .unwrap_or_else(|| panic!("no producer for {}", input.key));
                assert!(
                    producer.index < stage.index,
                    "stage {} reads {} produced by later stage {}",
                    stage.index,
                    input.key,
                    producer.index
                );
            }
        }
    }

    #[test]
    fn test_output_keys_are_unique() {
        let stages = catalog();
        let mut seen = HashSet::new();
        for stage in &stages {
            if let Some(out) = stage.output {
                assert!(seen.insert(out.key()), "duplicate output {}", out);
            }
        }
    }

    #[test]
    fn test_artifact_numbering_matches_external_contract() {
        let stages = catalog();
        // The screenshot stage produces the manifest, not a numbered file,
        // so the stage after it continues at 12.
        assert_eq!(stages[11].output.unwrap().rel_path(), "screenshots/gowitness.json");
        assert_eq!(
            stages[12].output.unwrap().rel_path(),
            "output/12_cname_candidates.txt"
        );
        assert_eq!(stages[20].output.unwrap().rel_path(), "output/20_robots.txt");
    }

    #[test]
    fn test_tool_bins_are_all_declared() {
        let stages = catalog();
        for stage in &stages {
            if let Some(bin) = stage.tool_bin() {
                assert!(
                    REQUIRED_TOOLS.contains(&bin),
                    "stage '{}' uses undeclared tool '{}'",
                    stage.name,
                    bin
                );
            }
        }
    }

    #[test]
    fn test_target_is_interpolated() {
        let stages = build_catalog("test.example.org", &RunConfig::default());
        let Invocation::Tool(tool) = &stages[0].invocation else {
            panic!("stage 1 must be a tool stage");
        };
        assert!(tool
            .args
            .iter()
            .any(|a| matches!(a, Arg::Lit(s) if s == "test.example.org")));
    }

    #[test]
    fn test_config_timeout_override() {
        let mut config = RunConfig::default();
        config.timeouts.insert("nuclei-web".into(), 42);
        let stages = build_catalog("example.com", &config);

        let nuclei = stages.iter().find(|s| s.name == "nuclei-web").unwrap();
        assert_eq!(nuclei.timeout, Duration::from_secs(42));
    }
}
