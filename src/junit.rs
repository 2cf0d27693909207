#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use glob::glob;

/// At most this many failing tests are listed individually in a report.
pub const MAX_LISTED_FAILURES: usize = 10;

/// One failed or errored test case from a JUnit report.
#[derive(Debug, Clone)]
pub struct FailureDetail {
    /// Test method name.
    pub name:      String,
    /// Fully qualified test class name.
    pub classname: String,
    /// Failure message reported by the test runner.
    pub message:   String,
}

impl std::fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {}", self.classname, self.name, self.message)
    }
}

/// Aggregated test counts across every suite in a build, plus the individual
/// failures and any problems hit while reading the reports.
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    /// Total number of test cases.
    pub total:    usize,
    /// Number of passing test cases.
    pub passed:   usize,
    /// Number of failing test cases; runner errors count as failures.
    pub failed:   usize,
    /// Number of skipped test cases.
    pub skipped:  usize,
    /// Details of each failed test case.
    pub failures: Vec<FailureDetail>,
    /// Problems encountered while locating or parsing reports. These are
    /// report-reading problems, not test failures.
    pub errors:   Vec<String>,
}

impl ExecutionSummary {
    /// Folds one suite's counts into the summary. Runner errors are treated
    /// as failures.
    fn add_suite(&mut self, tests: usize, failures: usize, errors: usize, skipped: usize) {
        let failed = failures + errors;
        self.total += tests;
        self.failed += failed;
        self.skipped += skipped;
        self.passed += tests.saturating_sub(failed + skipped);
    }

    /// Percentage of tests that passed, 0 when no tests ran.
    pub fn score_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    /// Whether any test results were found at all.
    pub fn has_results(&self) -> bool {
        self.total > 0
    }
}

/// An opening tag fragment pulled out of a report document.
#[derive(Debug)]
pub struct Tag {
    /// Tag name, e.g. `testsuite`.
    pub name:         String,
    /// Attributes in document order.
    pub attributes:   Vec<(String, String)>,
    /// Whether the fragment ends in `/`.
    pub self_closing: bool,
}

impl Tag {
    /// Returns the raw value of the named attribute.
    fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the named attribute parsed as a count, 0 when absent or not a
    /// number.
    fn count(&self, key: &str) -> usize {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
    }
}

peg::parser! {
    /// Grammar for single opening-tag fragments from Gradle's JUnit XML
    /// reports. The surrounding scanner handles prologs, comments, CDATA
    /// sections, and closing tags.
    grammar xml() for str {
        /// matches any number of whitespace characters
        rule whitespace() = quiet!{[' ' | '\n' | '\t' | '\r']+}

        /// matches an XML tag or attribute name
        rule name() -> String
            = w:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | ':']+)
            { w.to_string() }

        /// matches a double-quoted attribute value
        rule value() -> String
            = "\"" v:$([^'"']*) "\"" { v.to_string() }

        /// matches one `key="value"` attribute
        rule attribute() -> (String, String)
            = whitespace() k:name() whitespace()? "=" whitespace()? v:value()
            { (k, v) }

        /// parses an opening tag fragment, without the angle brackets
        pub rule tag() -> Tag
            = n:name() a:attribute()* whitespace()? s:"/"?
            { Tag { name: n, attributes: a, self_closing: s.is_some() } }
    }
}

/// Replaces the five standard XML entities with their characters.
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Walks one report document tag by tag, folding suite counts and failure
/// details into the summary. CDATA blocks (stacktraces, captured output) and
/// comments are skipped wholesale.
fn scan_document(text: &str, summary: &mut ExecutionSummary) -> Result<(), String> {
    let mut rest = text;
    let mut current_case: Option<(String, String)> = None;
    let mut case_faulted = false;

    while let Some(pos) = rest.find('<') {
        rest = &rest[pos + 1..];

        if let Some(tail) = rest.strip_prefix("![CDATA[") {
            let Some(end) = tail.find("]]>") else { break };
            rest = &tail[end + 3..];
            continue;
        }
        if let Some(tail) = rest.strip_prefix("!--") {
            let Some(end) = tail.find("-->") else { break };
            rest = &tail[end + 3..];
            continue;
        }
        if rest.starts_with('?') || rest.starts_with('!') {
            let Some(end) = rest.find('>') else { break };
            rest = &rest[end + 1..];
            continue;
        }
        if let Some(tail) = rest.strip_prefix('/') {
            let Some(end) = tail.find('>') else { break };
            if tail[..end].trim() == "testcase" {
                current_case = None;
            }
            rest = &tail[end + 1..];
            continue;
        }

        let Some(end) = rest.find('>') else { break };
        let fragment = &rest[..end];
        rest = &rest[end + 1..];

        let tag = xml::tag(fragment).map_err(|e| format!("malformed tag `{fragment}`: {e}"))?;
        match tag.name.as_str() {
            "testsuite" => summary.add_suite(
                tag.count("tests"),
                tag.count("failures"),
                tag.count("errors"),
                tag.count("skipped"),
            ),
            "testcase" => {
                case_faulted = false;
                if tag.self_closing {
                    current_case = None;
                } else {
                    current_case = Some((
                        tag.get("classname").unwrap_or("unknown").to_owned(),
                        tag.get("name").unwrap_or("unknown").to_owned(),
                    ));
                }
            }
            "failure" | "error" => {
                // Only the first fault per test case is recorded.
                if let Some((classname, name)) = &current_case
                    && !case_faulted
                {
                    summary.failures.push(FailureDetail {
                        name:      name.clone(),
                        classname: classname.clone(),
                        message:   unescape(tag.get("message").unwrap_or("")),
                    });
                    case_faulted = true;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Parses every JUnit XML report under the project's standard Gradle report
/// directory (`build/test-results/test`) into a single summary.
///
/// Missing reports and unparseable files are recorded in
/// [`ExecutionSummary::errors`] instead of failing the grading run; a student
/// whose build produced no reports still gets a report saying so.
pub fn parse_results(project_path: &Path) -> ExecutionSummary {
    let mut summary = ExecutionSummary::default();

    let report_dir = project_path.join("build").join("test-results").join("test");
    if !report_dir.exists() {
        summary
            .errors
            .push(format!("Test report directory not found: {}", report_dir.display()));
        return summary;
    }

    let pattern = report_dir.join("**/*.xml");
    let Some(pattern) = pattern.to_str() else {
        summary
            .errors
            .push(format!("Non-UTF-8 report path {}", report_dir.display()));
        return summary;
    };
    let Ok(entries) = glob(pattern) else {
        summary.errors.push("Invalid test report glob pattern".to_string());
        return summary;
    };

    let mut found_any = false;
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                summary.errors.push(format!("Could not read report entry: {e}"));
                continue;
            }
        };
        found_any = true;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                if let Err(e) = scan_document(&text, &mut summary) {
                    summary.errors.push(format!("Error parsing {file_name}: {e}"));
                }
            }
            Err(e) => summary.errors.push(format!("Could not read {file_name}: {e}")),
        }
    }

    if !found_any {
        summary.errors.push("No test report XML files found".to_string());
    }

    summary
}
