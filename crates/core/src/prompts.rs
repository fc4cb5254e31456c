use crate::error::{ConfigError, GenerateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const QUESTION_PLACEHOLDER: &str = "{question}";
const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Prompt-template variant controlling how question and context reach the model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Strategy {
    #[default]
    #[serde(rename = "v1_delimiters")]
    Delimiters,
    #[serde(rename = "v2_json_output")]
    JsonOutput,
    #[serde(rename = "v3_few_shot")]
    FewShot,
    #[serde(rename = "v4_chain_of_thought")]
    ChainOfThought,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Delimiters,
        Strategy::JsonOutput,
        Strategy::FewShot,
        Strategy::ChainOfThought,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Strategy::Delimiters => "v1_delimiters",
            Strategy::JsonOutput => "v2_json_output",
            Strategy::FewShot => "v3_few_shot",
            Strategy::ChainOfThought => "v4_chain_of_thought",
        }
    }

    /// Strategies whose id mentions json expect a structured answer.
    pub fn expects_json(&self) -> bool {
        self.id().contains("json")
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.id().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ConfigError::UnknownStrategy(value.to_string()))
    }
}

/// Loads strategy templates from `<dir>/<strategy id>.txt`.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, strategy: Strategy) -> Result<String, GenerateError> {
        let path = self.dir.join(format!("{}.txt", strategy.id()));
        if !path.is_file() {
            return Err(GenerateError::PromptNotFound(format!(
                "{} ({})",
                strategy.id(),
                path.display()
            )));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    /// Every strategy asset must exist; checked once at startup.
    pub fn verify(&self) -> Result<(), GenerateError> {
        for strategy in Strategy::ALL {
            self.load(strategy)?;
        }
        Ok(())
    }
}

/// Fills `{question}` and `{context}`; a template missing either gets both appended instead.
pub fn render_prompt(template: &str, question: &str, context: &str) -> String {
    if template.contains(QUESTION_PLACEHOLDER) && template.contains(CONTEXT_PLACEHOLDER) {
        // Context goes in last so text inside it is never taken for a placeholder.
        return template
            .replace(QUESTION_PLACEHOLDER, question)
            .replace(CONTEXT_PLACEHOLDER, context);
    }
    format!("{template}\n\nQuestion:\n{question}\n\nContext:\n{context}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn strategies_parse_from_their_ids() -> Result<(), ConfigError> {
        assert_eq!("v2_json_output".parse::<Strategy>()?, Strategy::JsonOutput);
        assert_eq!("V4_CHAIN_OF_THOUGHT".parse::<Strategy>()?, Strategy::ChainOfThought);
        assert!("v9_unknown".parse::<Strategy>().is_err());
        Ok(())
    }

    #[test]
    fn only_the_json_strategy_expects_json() {
        let json_strategies = Strategy::ALL
            .into_iter()
            .filter(Strategy::expects_json)
            .collect::<Vec<_>>();
        assert_eq!(json_strategies, vec![Strategy::JsonOutput]);
    }

    #[test]
    fn placeholders_are_substituted() {
        let rendered = render_prompt("Q: {question}\nC: {context}", "why?", "because");
        assert_eq!(rendered, "Q: why?\nC: because");
    }

    #[test]
    fn missing_placeholders_fall_back_to_suffixes() {
        let rendered = render_prompt("Answer carefully.", "why?", "because");
        assert_eq!(
            rendered,
            "Answer carefully.\n\nQuestion:\nwhy?\n\nContext:\nbecause"
        );
    }

    #[test]
    fn missing_asset_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("v1_delimiters.txt"), "{question} {context}")?;
        let library = PromptLibrary::new(dir.path());

        assert!(library.load(Strategy::Delimiters).is_ok());
        assert!(matches!(
            library.load(Strategy::FewShot),
            Err(GenerateError::PromptNotFound(_))
        ));
        assert!(library.verify().is_err());
        Ok(())
    }
}
