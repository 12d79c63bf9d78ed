//! Rule-based phrase translator.
//!
//! When a line's first word is not a command, the whole line is tried
//! against an ordered list of [`TranslationRule`]s. The first rule whose
//! matchers all hit produces a synthesized command line. Matching
//! ([`match_rule`]) and synthesis ([`synthesize`]) are separate pure
//! functions.
//!
//! Rules are declared in TOML:
//!
//! ```toml
//! [[rules]]
//! name = "make-folder"
//! command = "mkdir"
//! args = ["{name}"]
//! match = [{ regex = '^make (?:a )?folder (?P<name>.+)$' }]
//! ```

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use termcore_types::error::{Result, TermError};

use crate::registry::CommandRegistry;
use crate::rules::BUILTIN_RULES;
use crate::tokenizer::{ParsedInput, join_line};

/// Captured text by role name.
pub type Roles = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Rule model
// ---------------------------------------------------------------------------

/// One condition a phrase must satisfy.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Whole-word (or whole-phrase) containment, case-insensitive.
    Keyword(String),
    /// Case-insensitive regex search; named groups become roles.
    Regex(Regex),
}

/// One element of a rule's argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgTemplate {
    Literal(String),
    /// `{role}`: replaced by the captured text, dropped if not captured.
    Role(String),
}

impl ArgTemplate {
    fn parse(s: &str) -> Self {
        match s.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(role) if !role.is_empty() && !role.contains(['{', '}']) => {
                Self::Role(role.to_string())
            },
            _ => Self::Literal(s.to_string()),
        }
    }
}

/// A phrase pattern mapped to a command.
#[derive(Debug, Clone)]
pub struct TranslationRule {
    pub name: String,
    pub matchers: Vec<Matcher>,
    pub command: String,
    pub args: Vec<ArgTemplate>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    name: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(rename = "match")]
    matchers: Vec<MatcherSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MatcherSpec {
    Keyword(String),
    Regex(String),
}

/// Parse a TOML rule list, compiling every pattern.
pub fn parse_rules(text: &str) -> Result<Vec<TranslationRule>> {
    let file: RuleFile = toml::from_str(text)?;
    file.rules
        .into_iter()
        .map(|spec| -> Result<TranslationRule> {
            if spec.matchers.is_empty() {
                return Err(TermError::Config(format!(
                    "rule '{}' has no matchers",
                    spec.name
                )));
            }
            let matchers = spec
                .matchers
                .into_iter()
                .map(|m| -> Result<Matcher> {
                    Ok(match m {
                        MatcherSpec::Keyword(k) => Matcher::Keyword(collapse(&k).to_lowercase()),
                        MatcherSpec::Regex(p) => {
                            Matcher::Regex(RegexBuilder::new(&p).case_insensitive(true).build()?)
                        },
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TranslationRule {
                name: spec.name,
                matchers,
                command: spec.command,
                args: spec.args.iter().map(|a| ArgTemplate::parse(a)).collect(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Matching and synthesis
// ---------------------------------------------------------------------------

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse runs of whitespace to one space.
///
/// Case and punctuation are kept so captures carry the user's spelling;
/// matching itself is case-insensitive.
pub fn normalize(phrase: &str) -> String {
    collapse(phrase)
}

/// A phrase ready for matching: the collapsed text plus, for every byte
/// of it, the byte offset it came from in the raw line.
#[derive(Debug, Clone)]
pub struct Phrase<'a> {
    raw: &'a str,
    text: String,
    origin: Vec<usize>,
}

impl<'a> Phrase<'a> {
    pub fn new(raw: &'a str) -> Self {
        let mut text = String::with_capacity(raw.len());
        let mut origin = Vec::with_capacity(raw.len());
        let mut gap = false;
        for (i, c) in raw.char_indices() {
            if c.is_whitespace() {
                gap = !text.is_empty();
                continue;
            }
            if gap {
                text.push(' ');
                origin.push(i);
                gap = false;
            }
            text.push(c);
            origin.extend(i..i + c.len_utf8());
        }
        Self { raw, text, origin }
    }

    /// The collapsed text rules are matched against.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Captured text for `start..end` of the collapsed text, trimmed.
    /// A quoted capture loses its quotes and keeps the raw line's
    /// spacing inside them.
    fn capture(&self, start: usize, end: usize) -> &str {
        let span = &self.text[start..end];
        let start = start + (span.len() - span.trim_start().len());
        let end = start + span.trim().len();
        let inner = &self.text[start..end];
        for q in ['"', '\''] {
            if inner.len() >= 2 && inner.starts_with(q) && inner.ends_with(q) {
                return &self.raw[self.origin[start] + 1..self.origin[end - 1]];
            }
        }
        inner
    }
}

/// Test a phrase against a rule, returning captured roles when every
/// matcher hits.
pub fn match_rule(rule: &TranslationRule, phrase: &Phrase<'_>) -> Option<Roles> {
    let padded = format!(" {} ", phrase.text().to_lowercase());
    let mut roles = Roles::new();
    for matcher in &rule.matchers {
        match matcher {
            Matcher::Keyword(k) => {
                if !padded.contains(&format!(" {k} ")) {
                    return None;
                }
            },
            Matcher::Regex(re) => {
                let caps = re.captures(phrase.text())?;
                for name in re.capture_names().flatten() {
                    if let Some(m) = caps.name(name) {
                        let text = phrase.capture(m.start(), m.end());
                        if !text.is_empty() {
                            roles.insert(name.to_string(), text.to_string());
                        }
                    }
                }
            },
        }
    }
    Some(roles)
}

/// Build the command line for a matched rule.
pub fn synthesize(rule: &TranslationRule, roles: &Roles) -> ParsedInput {
    let args: Vec<String> = rule
        .args
        .iter()
        .filter_map(|a| match a {
            ArgTemplate::Literal(s) => Some(s.clone()),
            ArgTemplate::Role(r) => roles.get(r).cloned(),
        })
        .collect();
    ParsedInput {
        raw: join_line(&rule.command, &args),
        command: rule.command.clone(),
        args,
    }
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// A successful translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Name of the rule that fired.
    pub rule: String,
    pub parsed: ParsedInput,
}

/// Ordered, immutable rule set.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    rules: Vec<TranslationRule>,
}

impl Translator {
    /// Use `rules` as given, in order.
    pub fn new(rules: Vec<TranslationRule>) -> Self {
        Self { rules }
    }

    /// The built-in rule set, checked against `registry`.
    pub fn builtin(registry: &CommandRegistry) -> Result<Self> {
        Self::with_user_rules(None, registry)
    }

    /// User rules (TOML) first, then the built-in set. Every target must
    /// be a registered command.
    pub fn with_user_rules(user: Option<&str>, registry: &CommandRegistry) -> Result<Self> {
        let mut rules = match user {
            Some(text) => parse_rules(text)?,
            None => Vec::new(),
        };
        let user_count = rules.len();
        rules.extend(parse_rules(BUILTIN_RULES)?);
        let translator = Self::new(rules);
        translator.check_targets(registry)?;
        log::debug!(
            "Loaded {} translation rules ({user_count} user)",
            translator.rules.len()
        );
        Ok(translator)
    }

    /// Fail if any rule targets an unregistered command.
    pub fn check_targets(&self, registry: &CommandRegistry) -> Result<()> {
        match self.rules.iter().find(|r| !registry.contains(&r.command)) {
            Some(rule) => Err(TermError::Config(format!(
                "translation rule '{}' targets unknown command '{}'",
                rule.name, rule.command
            ))),
            None => Ok(()),
        }
    }

    pub fn rules(&self) -> &[TranslationRule] {
        &self.rules
    }

    /// Translate a whole input line. First full match wins.
    pub fn translate(&self, raw: &str) -> Result<Translation> {
        let phrase = Phrase::new(raw);
        for rule in &self.rules {
            if let Some(roles) = match_rule(rule, &phrase) {
                let parsed = synthesize(rule, &roles);
                log::debug!(
                    "Rule '{}': '{}' -> '{}'",
                    rule.name,
                    phrase.text(),
                    parsed.raw
                );
                return Ok(Translation {
                    rule: rule.name.clone(),
                    parsed,
                });
            }
        }
        Err(TermError::Unrecognized(raw.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register_builtins;
    use termcore_types::ErrorKind;

    fn builtin() -> Translator {
        let mut reg = CommandRegistry::new();
        register_builtins(&mut reg).unwrap();
        Translator::builtin(&reg).unwrap()
    }

    fn line(t: &Translator, phrase: &str) -> String {
        t.translate(phrase).unwrap().parsed.raw
    }

    #[test]
    fn builtin_rules_parse() {
        let rules = parse_rules(BUILTIN_RULES).unwrap();
        assert!(rules.len() > 20);
        let mut names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), rules.len(), "rule names are unique");
    }

    #[test]
    fn create_folder_phrase() {
        let t = builtin();
        let tr = t.translate("create a new folder called test").unwrap();
        assert_eq!(tr.parsed.command, "mkdir");
        assert_eq!(tr.parsed.args, vec!["test"]);
        assert_eq!(tr.rule, "make-folder");
    }

    #[test]
    fn listing_phrases() {
        let t = builtin();
        assert_eq!(line(&t, "show me all files"), "ls");
        assert_eq!(line(&t, "list the files in the current directory"), "ls");
        assert_eq!(line(&t, "What is in this folder?"), "ls");
        assert_eq!(line(&t, "show me the files in docs"), "ls docs");
    }

    #[test]
    fn file_phrases() {
        let t = builtin();
        assert_eq!(line(&t, "show me the contents of the file notes.txt"), "cat notes.txt");
        assert_eq!(line(&t, "copy the file a.txt to b.txt"), "cp a.txt b.txt");
        assert_eq!(line(&t, "rename file old.txt to new.txt"), "mv old.txt new.txt");
        assert_eq!(line(&t, "delete the file junk.log"), "rm junk.log");
        assert_eq!(line(&t, "look for TODO in the file main.rs"), "grep TODO main.rs");
        assert_eq!(line(&t, "locate files named *.rs"), "find . -name *.rs");
    }

    #[test]
    fn navigation_and_location() {
        let t = builtin();
        assert_eq!(line(&t, "go to the folder projects"), "cd projects");
        assert_eq!(line(&t, "navigate to /tmp"), "cd /tmp");
        assert_eq!(line(&t, "go up one level"), "cd ..");
        assert_eq!(line(&t, "where am I?"), "pwd");
        assert_eq!(line(&t, "what is my current directory"), "pwd");
    }

    #[test]
    fn system_phrases() {
        let t = builtin();
        assert_eq!(line(&t, "show me running processes"), "ps");
        assert_eq!(line(&t, "terminate process 4242"), "kill 4242");
        assert_eq!(line(&t, "how much disk space is left"), "df");
        assert_eq!(line(&t, "show memory usage"), "free");
        assert_eq!(line(&t, "what can you do"), "help");
    }

    #[test]
    fn captures_keep_case_and_drop_quotes() {
        let t = builtin();
        let tr = t.translate("Create a folder named \"My Stuff\"").unwrap();
        assert_eq!(tr.parsed.args, vec!["My Stuff"]);
        assert_eq!(tr.parsed.raw, "mkdir \"My Stuff\"");
        assert_eq!(line(&t, "say Hello World"), "echo \"Hello World\"");
    }

    #[test]
    fn greeting_is_unrecognized() {
        let t = builtin();
        let err = t.translate("hello there").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedInput);
        assert!(format!("{err}").contains("hello there"));
    }

    #[test]
    fn whitespace_and_case_are_normalized() {
        let t = builtin();
        assert_eq!(line(&t, "  SHOW   me   ALL files  "), "ls");
    }

    #[test]
    fn earlier_rule_wins() {
        let rules = parse_rules(
            r#"
[[rules]]
name = "first"
command = "echo"
args = ["one"]
match = [{ keyword = "greet" }]

[[rules]]
name = "second"
command = "echo"
args = ["two"]
match = [{ regex = "greet" }]
"#,
        )
        .unwrap();
        let t = Translator::new(rules);
        for _ in 0..10 {
            let tr = t.translate("please greet everyone").unwrap();
            assert_eq!(tr.rule, "first");
            assert_eq!(tr.parsed.args, vec!["one"]);
        }
    }

    #[test]
    fn all_matchers_must_hit() {
        let rules = parse_rules(
            r#"
[[rules]]
name = "both"
command = "df"
match = [{ keyword = "disk" }, { regex = '\b(?:space|usage)\b' }]
"#,
        )
        .unwrap();
        let rule = &rules[0];
        assert!(match_rule(rule, &Phrase::new("disk usage")).is_some());
        assert!(match_rule(rule, &Phrase::new("disk")).is_none());
        // Keyword is whole-word only.
        assert!(match_rule(rule, &Phrase::new("diskette usage")).is_none());
    }

    #[test]
    fn missing_role_is_omitted() {
        let rules = parse_rules(
            r#"
[[rules]]
name = "list"
command = "ls"
args = ["{path}"]
match = [{ regex = '^list(?: (?P<path>\S+))?$' }]
"#,
        )
        .unwrap();
        let t = Translator::new(rules);
        assert!(t.translate("list").unwrap().parsed.args.is_empty());
        assert_eq!(t.translate("list /etc").unwrap().parsed.args, vec!["/etc"]);
    }

    #[test]
    fn user_rules_take_priority() {
        let mut reg = CommandRegistry::new();
        register_builtins(&mut reg).unwrap();
        let user = r#"
[[rules]]
name = "my-ls"
command = "ls"
args = ["-"]
match = [{ regex = '^show me all files$' }]
"#;
        let t = Translator::with_user_rules(Some(user), &reg).unwrap();
        assert_eq!(t.translate("show me all files").unwrap().rule, "my-ls");
    }

    #[test]
    fn unknown_target_rejected() {
        let reg = CommandRegistry::new();
        let err = Translator::builtin(&reg).unwrap_err();
        assert!(matches!(err, TermError::Config(_)));
    }

    #[test]
    fn bad_regex_rejected() {
        let err = parse_rules(
            r#"
[[rules]]
name = "broken"
command = "ls"
match = [{ regex = "(unclosed" }]
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn template_parsing() {
        assert_eq!(ArgTemplate::parse("{name}"), ArgTemplate::Role("name".into()));
        assert_eq!(ArgTemplate::parse("-name"), ArgTemplate::Literal("-name".into()));
        assert_eq!(ArgTemplate::parse("{}"), ArgTemplate::Literal("{}".into()));
    }

    #[test]
    fn normalize_only_collapses_whitespace() {
        assert_eq!(normalize("  where   am i?! "), "where am i?!");
        assert_eq!(normalize("cd .."), "cd ..");
        assert_eq!(normalize("Hello"), "Hello");
    }

    #[test]
    fn trailing_punctuation() {
        let t = builtin();
        assert_eq!(line(&t, "where am I?"), "pwd");
        assert_eq!(line(&t, "go home."), "cd");
        assert_eq!(line(&t, "navigate to .."), "cd ..");
        assert_eq!(line(&t, "show me the files in ."), "ls .");
        assert_eq!(line(&t, "say hello world!"), "echo \"hello world!\"");
        assert_eq!(line(&t, "navigate to docs ?"), "cd docs");
    }

    #[test]
    fn quoted_capture_keeps_inner_spacing() {
        let t = builtin();
        let tr = t.translate("make   a folder named \"My   Stuff\"  ").unwrap();
        assert_eq!(tr.parsed.args, vec!["My   Stuff"]);
        let tr = t.translate("copy the file 'a  b.txt' to   c.txt").unwrap();
        assert_eq!(tr.parsed.args, vec!["a  b.txt", "c.txt"]);
    }

    #[test]
    fn phrase_maps_back_to_raw_offsets() {
        let p = Phrase::new("  say \t \"x  y\"");
        assert_eq!(p.text(), "say \"x y\"");
        assert_eq!(p.capture(4, p.text().len()), "x  y");
        assert_eq!(p.capture(0, 3), "say");
    }
}
