// semantic.rs - The security-scan seam and a regex reference analyzer.
//
// The scan stage asks eight yes/no questions about each changed file. Real
// deployments plug in taint-aware detectors; `PatternAnalyzer` answers the
// same questions with line-level regex heuristics so the engine is useful
// out of the box.

use cg_changeset::{Severity, SourceLanguage, Violation, ViolationSource};
use regex::Regex;

use crate::error::EvaluatorError;
use crate::evaluator::{guarded, PolicyInput};

/// Security predicates over a code snippet.
pub trait SemanticAnalyzer: Send + Sync {
    /// Code reaches a SQL execution sink.
    fn has_sql_sink(&self, code: &str, language: SourceLanguage) -> Result<bool, EvaluatorError>;
    /// SQL reaching the sink is passed as bound parameters.
    fn uses_parameterized_sql(&self, code: &str, language: SourceLanguage) -> Result<bool, EvaluatorError>;
    fn has_xss_sink(&self, code: &str, language: SourceLanguage) -> Result<bool, EvaluatorError>;
    fn has_command_injection(&self, code: &str, language: SourceLanguage) -> Result<bool, EvaluatorError>;
    fn has_path_traversal(&self, code: &str, language: SourceLanguage) -> Result<bool, EvaluatorError>;
    fn has_nosql_injection(&self, code: &str, language: SourceLanguage) -> Result<bool, EvaluatorError>;
    fn has_ldap_injection(&self, code: &str, language: SourceLanguage) -> Result<bool, EvaluatorError>;
    fn has_xxe(&self, code: &str, language: SourceLanguage) -> Result<bool, EvaluatorError>;
}

type Predicate = fn(&dyn SemanticAnalyzer, &str, SourceLanguage) -> Result<bool, EvaluatorError>;

struct Detector {
    rule: &'static str,
    severity: Severity,
    message: &'static str,
    check: Predicate,
}

const DETECTORS: &[Detector] = &[
    Detector {
        rule: "sql_injection",
        severity: Severity::Critical,
        message: "SQL reaches an execution sink without parameterization",
        check: |a, code, lang| {
            Ok(a.has_sql_sink(code, lang)? && !a.uses_parameterized_sql(code, lang)?)
        },
    },
    Detector {
        rule: "xss",
        severity: Severity::High,
        message: "Unescaped content reaches an HTML sink",
        check: |a, code, lang| a.has_xss_sink(code, lang),
    },
    Detector {
        rule: "command_injection",
        severity: Severity::Critical,
        message: "Dynamic input reaches a shell or eval sink",
        check: |a, code, lang| a.has_command_injection(code, lang),
    },
    Detector {
        rule: "path_traversal",
        severity: Severity::High,
        message: "File access may escape its intended directory",
        check: |a, code, lang| a.has_path_traversal(code, lang),
    },
    Detector {
        rule: "nosql_injection",
        severity: Severity::High,
        message: "Request data flows into a NoSQL query operator",
        check: |a, code, lang| a.has_nosql_injection(code, lang),
    },
    Detector {
        rule: "ldap_injection",
        severity: Severity::High,
        message: "LDAP filter is built from unescaped input",
        check: |a, code, lang| a.has_ldap_injection(code, lang),
    },
    Detector {
        rule: "xxe",
        severity: Severity::High,
        message: "XML parser resolves external entities",
        check: |a, code, lang| a.has_xxe(code, lang),
    },
];

/// Run every detector against every input.
///
/// A detector that errors or panics is logged and contributes nothing; the
/// remaining detectors still run.
pub(crate) fn scan(analyzer: &dyn SemanticAnalyzer, inputs: &[PolicyInput]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for input in inputs {
        for detector in DETECTORS {
            let outcome = guarded(|| (detector.check)(analyzer, &input.code, input.language));
            match outcome {
                Ok(true) => violations.push(
                    Violation::new(
                        detector.rule,
                        detector.severity,
                        format!("{} in '{}'", detector.message, input.file_path),
                        ViolationSource::Semantic,
                    )
                    .with_file(input.file_path.clone()),
                ),
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    detector = detector.rule,
                    file = %input.file_path,
                    error = %e,
                    "semantic detector failed; ignoring"
                ),
            }
        }
    }
    violations
}

/// Regex heuristics for the eight predicates. Language-agnostic; tuned for
/// Python and JavaScript idioms.
pub struct PatternAnalyzer {
    sql_sink: Regex,
    sql_keyword: Regex,
    sql_bound_params: Regex,
    interpolation: Regex,
    xss: Regex,
    command: Regex,
    traversal: Regex,
    nosql: Regex,
    ldap_context: Regex,
    ldap_filter: Regex,
    xxe: Regex,
}

impl PatternAnalyzer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            sql_sink: Regex::new(r"(?i)\b(?:execute|executemany|executescript|raw|query)\s*\(")?,
            sql_keyword: Regex::new(
                r"(?i)\b(?:select\s.+\sfrom|insert\s+into|update\s+\w+\s+set|delete\s+from|drop\s+table)\b",
            )?,
            sql_bound_params: Regex::new(
                r#"(?i)\b(?:execute|executemany|query)\s*\(\s*(?:"[^"]*"|'[^']*')\s*,"#,
            )?,
            interpolation: Regex::new(
                r#"(?i)(?:\bf["']|["']\s*\+|\+\s*["']|["']\s*%\s*[\w(]|\.format\s*\(|\$\{)"#,
            )?,
            xss: Regex::new(
                r"(?i)(?:\.innerHTML\s*=|\.outerHTML\s*=|document\.write\s*\(|dangerouslySetInnerHTML|\|\s*safe\b|\bmark_safe\s*\(|\bMarkup\s*\()",
            )?,
            command: Regex::new(
                r"(?i)(?:\bos\.system\s*\(|\bos\.popen\s*\(|\bsubprocess\.\w+\s*\([^)]*shell\s*=\s*True|\bchild_process\.exec(?:Sync)?\s*\(|\bexecSync\s*\(|\beval\s*\()",
            )?,
            traversal: Regex::new(
                r"(?i)(?:\.\.[/\\]|\b(?:open|readFile|readFileSync|send_file|sendFile)\s*\([^)]*\b(?:request|req)\.)",
            )?,
            nosql: Regex::new(
                r"(?i)(?:\$where\b|\.find(?:_one|One)?\s*\([^)]*\b(?:req|request)\.(?:body|query|params|args|json))",
            )?,
            ldap_context: Regex::new(r"(?i)\bldap")?,
            ldap_filter: Regex::new(
                r#"(?i)\b(?:uid|cn|mail|samaccountname)=["']?\s*(?:\+|%s|\{|\$\{)"#,
            )?,
            xxe: Regex::new(
                r"(?i)(?:resolve_entities\s*=\s*True|<!ENTITY\s+\w+\s+SYSTEM|feature_external_ges\s*,\s*True|\bnoent\s*:\s*true)",
            )?,
        })
    }
}

impl SemanticAnalyzer for PatternAnalyzer {
    fn has_sql_sink(&self, code: &str, _language: SourceLanguage) -> Result<bool, EvaluatorError> {
        Ok(self.sql_sink.is_match(code) && self.sql_keyword.is_match(code))
    }

    fn uses_parameterized_sql(&self, code: &str, _language: SourceLanguage) -> Result<bool, EvaluatorError> {
        Ok(self.sql_bound_params.is_match(code) && !self.interpolation.is_match(code))
    }

    fn has_xss_sink(&self, code: &str, _language: SourceLanguage) -> Result<bool, EvaluatorError> {
        Ok(self.xss.is_match(code))
    }

    fn has_command_injection(&self, code: &str, _language: SourceLanguage) -> Result<bool, EvaluatorError> {
        Ok(self.command.is_match(code))
    }

    fn has_path_traversal(&self, code: &str, _language: SourceLanguage) -> Result<bool, EvaluatorError> {
        Ok(self.traversal.is_match(code))
    }

    fn has_nosql_injection(&self, code: &str, _language: SourceLanguage) -> Result<bool, EvaluatorError> {
        Ok(self.nosql.is_match(code))
    }

    fn has_ldap_injection(&self, code: &str, _language: SourceLanguage) -> Result<bool, EvaluatorError> {
        Ok(self.ldap_context.is_match(code) && self.ldap_filter.is_match(code))
    }

    fn has_xxe(&self, code: &str, _language: SourceLanguage) -> Result<bool, EvaluatorError> {
        Ok(self.xxe.is_match(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use cg_changeset::{FileChange, Operation};

    const PY: SourceLanguage = SourceLanguage::Python;

    fn analyzer() -> PatternAnalyzer {
        PatternAnalyzer::new().unwrap()
    }

    fn inputs_for(path: &str, code: &str) -> Vec<PolicyInput> {
        let op = Operation::new("scan").with_change(FileChange::new(path).with_modified_code(code));
        PolicyInput::all_from(&op, &EvaluationContext::default())
    }

    #[test]
    fn concatenated_sql_is_injection() {
        let code = r#"cursor.execute("SELECT * FROM users WHERE id = " + user_id)"#;
        let a = analyzer();
        assert!(a.has_sql_sink(code, PY).unwrap());
        assert!(!a.uses_parameterized_sql(code, PY).unwrap());

        let found = scan(&a, &inputs_for("db.py", code));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "sql_injection");
        assert_eq!(found[0].severity, Severity::Critical);
        assert_eq!(found[0].source, ViolationSource::Semantic);
        assert_eq!(found[0].file.as_deref(), Some("db.py"));
    }

    #[test]
    fn bound_parameters_are_safe() {
        let code = r#"cursor.execute("SELECT * FROM users WHERE id = %s", (user_id,))"#;
        let a = analyzer();
        assert!(a.has_sql_sink(code, PY).unwrap());
        assert!(a.uses_parameterized_sql(code, PY).unwrap());
        assert!(scan(&a, &inputs_for("db.py", code)).is_empty());
    }

    #[test]
    fn fstring_sql_is_injection_even_with_comma() {
        let code = r#"cursor.execute(f"DELETE FROM jobs WHERE owner = '{name}'", ())"#;
        let found = scan(&analyzer(), &inputs_for("jobs.py", code));
        assert!(found.iter().any(|v| v.rule == "sql_injection"));
    }

    #[test]
    fn each_detector_fires_on_its_pattern() {
        let cases = [
            ("ui.js", "el.innerHTML = userInput;", "xss"),
            ("run.py", "os.system('ls ' + path)", "command_injection"),
            ("run.py", "subprocess.run(cmd, shell=True)", "command_injection"),
            ("files.py", "open('../../etc/passwd')", "path_traversal"),
            ("files.py", "open(request.args['name'])", "path_traversal"),
            ("users.js", "db.users.find({ $where: expr })", "nosql_injection"),
            ("users.js", "db.users.findOne(req.body)", "nosql_injection"),
            (
                "auth.py",
                "conn = ldap.initialize(url)\nconn.search_s(base, scope, \"(uid=\" + name + \")\")",
                "ldap_injection",
            ),
            ("xml.py", "parser = etree.XMLParser(resolve_entities=True)", "xxe"),
        ];
        let a = analyzer();
        for (path, code, rule) in cases {
            let found = scan(&a, &inputs_for(path, code));
            assert!(
                found.iter().any(|v| v.rule == rule),
                "expected {} for {:?}, got {:?}",
                rule,
                code,
                found
            );
        }
    }

    #[test]
    fn plain_code_is_clean() {
        let code = "def total(items):\n    return sum(i.price for i in items)\n";
        assert!(scan(&analyzer(), &inputs_for("cart.py", code)).is_empty());
    }

    struct Flaky;

    impl SemanticAnalyzer for Flaky {
        fn has_sql_sink(&self, _: &str, _: SourceLanguage) -> Result<bool, EvaluatorError> {
            Err(EvaluatorError::Failed("detector offline".into()))
        }
        fn uses_parameterized_sql(&self, _: &str, _: SourceLanguage) -> Result<bool, EvaluatorError> {
            Ok(false)
        }
        fn has_xss_sink(&self, _: &str, _: SourceLanguage) -> Result<bool, EvaluatorError> {
            panic!("detector crashed")
        }
        fn has_command_injection(&self, _: &str, _: SourceLanguage) -> Result<bool, EvaluatorError> {
            Ok(true)
        }
        fn has_path_traversal(&self, _: &str, _: SourceLanguage) -> Result<bool, EvaluatorError> {
            Ok(false)
        }
        fn has_nosql_injection(&self, _: &str, _: SourceLanguage) -> Result<bool, EvaluatorError> {
            Ok(false)
        }
        fn has_ldap_injection(&self, _: &str, _: SourceLanguage) -> Result<bool, EvaluatorError> {
            Ok(false)
        }
        fn has_xxe(&self, _: &str, _: SourceLanguage) -> Result<bool, EvaluatorError> {
            Ok(false)
        }
    }

    #[test]
    fn failing_detectors_contribute_nothing() {
        let found = scan(&Flaky, &inputs_for("a.py", "x = 1"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "command_injection");
    }
}
