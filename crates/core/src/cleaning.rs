use crate::error::IngestError;
use regex::Regex;
use tracing::debug;

const PAGE_NUMBER_LINE: &str = r"(?m)^[ \t]*\d+[ \t]*$";
const WHITESPACE_RUN: &str = r"\s+";
const HYPHEN_BREAK: &str = r"(\w+)-\s+(\w+)";

/// Trailing sections that carry no retrievable content, in the order they are cut.
const BOILERPLATE_SECTIONS: [(&str, &str); 5] = [
    ("references", r"(?i)\breferences\b"),
    ("acknowledgments", r"(?i)\backnowledge?ments?\b"),
    ("conflicts of interest", r"(?i)\bconflicts?\s+of\s+interest\b"),
    ("data availability", r"(?i)\bdata\s+availability\b"),
    ("informed consent", r"(?i)\binformed\s+consent\b"),
];

/// Normalizes raw PDF text into a single line of prose.
pub struct TextCleaner {
    page_number: Regex,
    whitespace: Regex,
    hyphen_break: Regex,
}

impl TextCleaner {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            page_number: Regex::new(PAGE_NUMBER_LINE)?,
            whitespace: Regex::new(WHITESPACE_RUN)?,
            hyphen_break: Regex::new(HYPHEN_BREAK)?,
        })
    }

    /// Drops lines holding only a number, collapses whitespace runs to one
    /// space and rejoins words hyphenated across a line break.
    pub fn clean(&self, raw: &str) -> String {
        let without_page_numbers = self.page_number.replace_all(raw, "");
        let collapsed = self.whitespace.replace_all(&without_page_numbers, " ");
        let rejoined = self.hyphen_break.replace_all(&collapsed, "${1}${2}");
        rejoined.trim().to_string()
    }
}

pub struct SectionTrimmer {
    sections: Vec<(&'static str, Regex)>,
}

impl SectionTrimmer {
    pub fn new() -> Result<Self, IngestError> {
        let sections = BOILERPLATE_SECTIONS
            .iter()
            .map(|(name, pattern)| Ok((*name, Regex::new(pattern)?)))
            .collect::<Result<Vec<_>, IngestError>>()?;
        Ok(Self { sections })
    }

    /// Cuts the text at the first whole-word heading of each boilerplate
    /// section. Each pattern is searched in what previous cuts left behind.
    pub fn trim(&self, text: &str) -> String {
        let mut remaining = text;
        for (name, pattern) in &self.sections {
            if let Some(found) = pattern.find(remaining) {
                debug!(section = name, offset = found.start(), "trimming boilerplate");
                remaining = &remaining[..found.start()];
            }
        }
        remaining.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_collapsed() -> Result<(), IngestError> {
        let cleaner = TextCleaner::new()?;
        assert_eq!(cleaner.clean("A  \t  lot\nof   spacing "), "A lot of spacing");
        Ok(())
    }

    #[test]
    fn hyphen_line_breaks_are_rejoined() -> Result<(), IngestError> {
        let cleaner = TextCleaner::new()?;
        assert_eq!(
            cleaner.clean("graph neu-\nral networks and state-of-the-art"),
            "graph neural networks and state-of-the-art"
        );
        Ok(())
    }

    #[test]
    fn isolated_page_numbers_are_removed() -> Result<(), IngestError> {
        let cleaner = TextCleaner::new()?;
        let raw = "end of page one\n12\nstart of page two with 3 items";
        assert_eq!(
            cleaner.clean(raw),
            "end of page one start of page two with 3 items"
        );
        Ok(())
    }

    #[test]
    fn empty_input_yields_empty_output() -> Result<(), IngestError> {
        let cleaner = TextCleaner::new()?;
        assert_eq!(cleaner.clean(""), "");
        assert_eq!(cleaner.clean(" \n\t "), "");
        Ok(())
    }

    #[test]
    fn trimmer_cuts_at_first_reference_heading() -> Result<(), IngestError> {
        let trimmer = SectionTrimmer::new()?;
        let text = "Body of the paper. REFERENCES [1] Smith 2020.";
        assert_eq!(trimmer.trim(text), "Body of the paper.");
        Ok(())
    }

    #[test]
    fn trimmer_requires_whole_words() -> Result<(), IngestError> {
        let trimmer = SectionTrimmer::new()?;
        let text = "Cross-referencesX are kept. Preferences too.";
        assert_eq!(trimmer.trim(text), text);
        Ok(())
    }

    #[test]
    fn trimmer_applies_cuts_sequentially() -> Result<(), IngestError> {
        let trimmer = SectionTrimmer::new()?;
        let text = "Intro. Acknowledgments thanks. Methods. References list. Data availability here.";
        assert_eq!(trimmer.trim(text), "Intro.");
        Ok(())
    }
}
