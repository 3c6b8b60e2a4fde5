use crate::backend::ScanBackend;
use async_trait::async_trait;
use scanbox_core::{
    Finding, OsiLayer, ScanboxError, ScanboxResult, SelfTestResult, Severity, Target,
};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Category of every finding produced here.
pub const SUBDOMAIN_CATEGORY: &str = "Subdomain";

/// Target attribute toggling passive (no DNS resolution) enumeration.
pub const NO_DNS_ATTRIBUTE: &str = "NO_DNS";

/// How long the `-version` self-test may run.
pub const SELF_TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-target scan options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Domain to enumerate.
    pub domain: String,
    /// Passive enumeration only.
    pub passive: bool,
}

impl ScanOptions {
    /// Reads the options from a target. `NO_DNS` defaults to passive and must
    /// be a boolean when present.
    pub fn from_target(target: &Target) -> ScanboxResult<Self> {
        let passive = match target.attributes.get(NO_DNS_ATTRIBUTE) {
            None => true,
            Some(serde_json::Value::Bool(no_dns)) => *no_dns,
            Some(_) => {
                return Err(ScanboxError::Scan(format!(
                    "Scan Parameter '{NO_DNS_ATTRIBUTE}' must be boolean"
                )))
            }
        };
        Ok(Self {
            domain: target.location.clone(),
            passive,
        })
    }
}

/// One resolved address of a subdomain, as printed by the enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressRecord {
    /// IP address.
    #[serde(default)]
    pub ip: String,
    /// Netblock containing the address.
    #[serde(default)]
    pub cidr: String,
    /// Autonomous system number.
    #[serde(default)]
    pub asn: u32,
    /// AS description.
    #[serde(default)]
    pub desc: String,
}

/// One line of enumerator JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubdomainRecord {
    /// Fully qualified subdomain.
    pub name: String,
    /// Registered domain it belongs to.
    #[serde(default)]
    pub domain: String,
    /// Resolved addresses; empty in passive mode.
    #[serde(default)]
    pub addresses: Vec<AddressRecord>,
    /// How the name was discovered (e.g. `cert`, `dns`).
    #[serde(default)]
    pub tag: String,
    /// Data source that reported it.
    #[serde(default)]
    pub source: String,
}

/// Converts an enumerator record into a finding with a fresh id.
pub fn create_finding(record: &SubdomainRecord) -> Finding {
    let addresses: Vec<serde_json::Value> = record
        .addresses
        .iter()
        .map(|a| {
            serde_json::json!({
                "ADDRESS": a.ip,
                "NETBLOCK": a.cidr,
                "ASN": a.asn,
                "DESCRIPTION": a.desc,
            })
        })
        .collect();

    Finding::new(&record.name, &record.name, SUBDOMAIN_CATEGORY)
        .with_description(format!("Found subdomain {}", record.name))
        .with_severity(Severity::Informational)
        .with_osi_layer(OsiLayer::Network)
        .with_attribute("Tag", record.tag.clone().into())
        .with_attribute("NAME", record.name.clone().into())
        .with_attribute("SOURCE", record.source.clone().into())
        .with_attribute("DOMAIN", record.domain.clone().into())
        .with_attribute("SUBDOMAIN", record.name.clone().into())
        .with_attribute("ADDRESSES", serde_json::Value::Array(addresses))
}

/// Parses enumerator stdout: one JSON record per line. Lines that are not
/// records (banners, progress) are skipped.
pub fn parse_records(stdout: &str) -> Vec<SubdomainRecord> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<SubdomainRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, line, "Skipping non-record enumerator output");
                None
            }
        })
        .collect()
}

/// Which enumerator binary to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratorConfig {
    /// Program name or path.
    #[serde(default = "default_program")]
    pub program: String,
    /// Extra arguments appended to every scan.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_program() -> String {
    "amass".to_string()
}

impl Default for EnumeratorConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            extra_args: vec![],
        }
    }
}

/// Subdomain backend that shells out to an external enumerator.
///
/// Runs `<program> enum -d <domain> -json /dev/stdout [-passive] [-v]`
/// once per target and turns every output record into a finding.
pub struct CommandEnumerator {
    config: EnumeratorConfig,
    verbose: bool,
    self_test_timeout: Duration,
}

impl CommandEnumerator {
    /// Creates the backend. An empty program name cannot be run at all and
    /// is rejected.
    pub fn new(config: EnumeratorConfig) -> ScanboxResult<Self> {
        if config.program.trim().is_empty() {
            return Err(ScanboxError::BackendInit(
                "Enumerator program must not be empty".into(),
            ));
        }
        Ok(Self {
            config,
            verbose: false,
            self_test_timeout: SELF_TEST_TIMEOUT,
        })
    }

    /// Passes the enumerator's own verbose flag.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Overrides how long the self-test may run.
    pub fn with_self_test_timeout(mut self, timeout: Duration) -> Self {
        self.self_test_timeout = timeout;
        self
    }

    fn args(&self, options: &ScanOptions) -> Vec<String> {
        let mut args = vec![
            "enum".to_string(),
            "-d".to_string(),
            options.domain.clone(),
            "-json".to_string(),
            "/dev/stdout".to_string(),
        ];
        if options.passive {
            args.push("-passive".to_string());
        }
        if self.verbose {
            args.push("-v".to_string());
        }
        args.extend(self.config.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl ScanBackend for CommandEnumerator {
    fn name(&self) -> &str {
        &self.config.program
    }

    async fn self_test(&self) -> SelfTestResult {
        let output = tokio::time::timeout(
            self.self_test_timeout,
            tokio::process::Command::new(&self.config.program)
                .arg("-version")
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let output = match output {
            Ok(output) => output,
            Err(_) => {
                return SelfTestResult {
                    version: String::new(),
                    details: format!(
                        "Version probe did not finish within {}s",
                        self.self_test_timeout.as_secs()
                    ),
                    successful: false,
                };
            }
        };

        match output {
            Ok(output) if output.status.success() => {
                // some versions print the version on stderr
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let version = if stdout.trim().is_empty() {
                    stderr.trim().to_string()
                } else {
                    stdout.trim().to_string()
                };
                SelfTestResult {
                    version,
                    details: "Enumerator answered the version probe".into(),
                    successful: true,
                }
            }
            Ok(output) => SelfTestResult {
                version: String::new(),
                details: format!(
                    "Version probe exited with {}",
                    output.status.code().unwrap_or(-1)
                ),
                successful: false,
            },
            Err(e) => SelfTestResult {
                version: String::new(),
                details: format!("Failed to run '{}': {e}", self.config.program),
                successful: false,
            },
        }
    }

    async fn scan(&self, target: &Target) -> ScanboxResult<Vec<Finding>> {
        let options = ScanOptions::from_target(target)?;
        info!(domain = %options.domain, passive = options.passive, "Starting enumeration");

        let output = tokio::process::Command::new(&self.config.program)
            .args(self.args(&options))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ScanboxError::Scan(format!("Failed to start enumeration: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                domain = %options.domain,
                code = output.status.code().unwrap_or(-1),
                "Enumerator failed"
            );
            return Err(ScanboxError::Scan(format!(
                "Enumeration of '{}' failed (exit {}): {}",
                options.domain,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let findings: Vec<Finding> = parse_records(&stdout).iter().map(create_finding).collect();
        debug!(domain = %options.domain, count = findings.len(), "All results are in");
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_with(attr: Option<serde_json::Value>) -> Target {
        let mut target = Target::new("t", "securecodebox.io");
        if let Some(value) = attr {
            target.attributes.insert(NO_DNS_ATTRIBUTE.into(), value);
        }
        target
    }

    #[test]
    fn test_create_finding() {
        let record = SubdomainRecord {
            name: "foobar.securecodebox.io".into(),
            domain: "securecodebox.io".into(),
            ..Default::default()
        };
        let finding = create_finding(&record);

        assert_eq!(finding.name, "foobar.securecodebox.io");
        assert_eq!(finding.description, "Found subdomain foobar.securecodebox.io");
        assert_eq!(finding.location, "foobar.securecodebox.io");
        assert_eq!(finding.severity, Severity::Informational);
        assert_eq!(finding.category, "Subdomain");
        assert_eq!(finding.osi_layer, OsiLayer::Network);
        assert_eq!(finding.attributes["DOMAIN"], "securecodebox.io");
        assert_eq!(finding.attributes["SUBDOMAIN"], "foobar.securecodebox.io");
        assert_eq!(finding.attributes["ADDRESSES"], serde_json::json!([]));
        assert!(!finding.id.is_empty());
    }

    #[test]
    fn test_create_finding_addresses() {
        let record = SubdomainRecord {
            name: "www.example.com".into(),
            addresses: vec![AddressRecord {
                ip: "93.184.216.34".into(),
                cidr: "93.184.216.0/24".into(),
                asn: 15133,
                desc: "EDGECAST".into(),
            }],
            ..Default::default()
        };
        let finding = create_finding(&record);
        assert_eq!(
            finding.attributes["ADDRESSES"],
            serde_json::json!([{
                "ADDRESS": "93.184.216.34",
                "NETBLOCK": "93.184.216.0/24",
                "ASN": 15133,
                "DESCRIPTION": "EDGECAST",
            }])
        );
    }

    #[test]
    fn test_findings_get_distinct_ids() {
        let record = SubdomainRecord {
            name: "a.example.com".into(),
            ..Default::default()
        };
        assert_ne!(create_finding(&record).id, create_finding(&record).id);
    }

    #[test]
    fn test_no_dns_defaults_to_passive() {
        let options = ScanOptions::from_target(&target_with(None)).unwrap();
        assert!(options.passive);
        assert_eq!(options.domain, "securecodebox.io");
    }

    #[test]
    fn test_no_dns_bool_is_respected() {
        let options =
            ScanOptions::from_target(&target_with(Some(serde_json::json!(false)))).unwrap();
        assert!(!options.passive);
    }

    #[test]
    fn test_no_dns_must_be_bool() {
        let err = ScanOptions::from_target(&target_with(Some(serde_json::json!("yes"))))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Scan error: Scan Parameter 'NO_DNS' must be boolean"
        );
    }

    #[test]
    fn test_parse_records_skips_noise() {
        let stdout = r#"
Querying sources...
{"name":"a.example.com","domain":"example.com","addresses":[],"tag":"cert","source":"crtsh"}
{"name":"b.example.com","domain":"example.com"}
not json
"#;
        let records = parse_records(stdout);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag, "cert");
        assert_eq!(records[1].name, "b.example.com");
    }

    #[test]
    fn test_args() {
        let backend = CommandEnumerator::new(EnumeratorConfig {
            program: "amass".into(),
            extra_args: vec!["-timeout".into(), "10".into()],
        })
        .unwrap()
        .with_verbose(true);
        let args = backend.args(&ScanOptions {
            domain: "example.com".into(),
            passive: true,
        });
        assert_eq!(
            args,
            vec![
                "enum", "-d", "example.com", "-json", "/dev/stdout", "-passive", "-v", "-timeout",
                "10"
            ]
        );
    }

    #[test]
    fn test_empty_program_is_init_error() {
        let result = CommandEnumerator::new(EnumeratorConfig {
            program: "  ".into(),
            extra_args: vec![],
        });
        assert!(matches!(result, Err(ScanboxError::BackendInit(_))));
    }

    #[tokio::test]
    async fn test_missing_program_fails_self_test() {
        let backend = CommandEnumerator::new(EnumeratorConfig {
            program: "/nonexistent/enumerator".into(),
            extra_args: vec![],
        })
        .unwrap();
        let result = backend.self_test().await;
        assert!(!result.successful);
        assert!(result.details.contains("/nonexistent/enumerator"));
    }
}
