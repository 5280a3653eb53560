//! Honorific and function titles, partitioned by the gender they imply.
//!
//! The table is data: it drives entity-span extension, representative
//! cleaning and gender decisions, and can be replaced from a JSON file of the
//! form `{"female": [...], "male": [...], "mixed": [...]}`.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleGender {
    Female,
    Male,
    Mixed,
}

const FEMALE: &[&str] = &[
    "mrs", "ms", "miss", "madam", "lady", "dame", "queen", "princess", "sister", "duchess",
    "baroness", "mme", "madame", "mlle", "mademoiselle", "présidente", "mairesse", "directrice",
    "députée", "sénatrice", "conseillère", "ministre-présidente", "reine", "soeur", "sœur",
];

const MALE: &[&str] = &[
    "mr", "sir", "lord", "king", "prince", "father", "brother", "duke", "baron", "m",
    "monsieur", "président", "directeur", "député", "sénateur", "conseiller", "roi", "frère",
    "père",
];

const MIXED: &[&str] = &[
    "dr", "doctor", "prof", "professor", "rev", "reverend", "hon", "judge", "justice", "sen",
    "senator", "rep", "gov", "governor", "mayor", "minister", "premier", "chief", "sgt",
    "capt", "gen", "docteur", "docteure", "me", "maître", "pr", "professeur", "professeure",
    "ministre", "maire", "juge", "chef", "sergent", "capitaine", "général",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TitleTable {
    #[serde(default)]
    female: Vec<String>,
    #[serde(default)]
    male: Vec<String>,
    #[serde(default)]
    mixed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TitleTaxonomy {
    titles: HashMap<String, TitleGender>,
}

impl Default for TitleTaxonomy {
    fn default() -> Self {
        let table = TitleTable {
            female: FEMALE.iter().map(|s| (*s).to_string()).collect(),
            male: MALE.iter().map(|s| (*s).to_string()).collect(),
            mixed: MIXED.iter().map(|s| (*s).to_string()).collect(),
        };
        Self::from_table(table)
    }
}

impl TitleTaxonomy {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table: TitleTable = serde_json::from_str(&content).map_err(ConfigError::Json)?;
        Ok(Self::from_table(table))
    }

    fn from_table(table: TitleTable) -> Self {
        let mut titles = HashMap::new();
        for (list, gender) in [
            (table.mixed, TitleGender::Mixed),
            (table.male, TitleGender::Male),
            (table.female, TitleGender::Female),
        ] {
            for title in list {
                titles.insert(normalize(&title), gender);
            }
        }
        Self { titles }
    }

    /// Gender class of a word if it is a title (`"Mme"`, `"Dr."`, `"présidente"`).
    #[must_use]
    pub fn classify(&self, word: &str) -> Option<TitleGender> {
        self.titles.get(&normalize(word)).copied()
    }

    #[must_use]
    pub fn is_title(&self, word: &str) -> bool {
        self.classify(word).is_some()
    }

    /// Drop leading title words. A name made only of titles keeps its last
    /// word so the result is never empty.
    #[must_use]
    pub fn strip_titles(&self, name: &str) -> String {
        let words: Vec<&str> = name.split_whitespace().collect();
        let skip = words
            .iter()
            .take_while(|w| self.is_title(w))
            .count()
            .min(words.len().saturating_sub(1));
        words[skip..].join(" ")
    }

    /// Lowercased title words found anywhere in a name.
    #[must_use]
    pub fn titles_in(&self, name: &str) -> BTreeSet<String> {
        name.split_whitespace()
            .filter(|w| self.is_title(w))
            .map(normalize)
            .collect()
    }

    /// A gender is implied only when every gendered title agrees.
    #[must_use]
    pub fn implied_gender<'a>(
        &self,
        titles: impl IntoIterator<Item = &'a String>,
    ) -> Option<TitleGender> {
        let mut female = false;
        let mut male = false;
        for title in titles {
            match self.classify(title) {
                Some(TitleGender::Female) => female = true,
                Some(TitleGender::Male) => male = true,
                _ => {}
            }
        }
        match (female, male) {
            (true, false) => Some(TitleGender::Female),
            (false, true) => Some(TitleGender::Male),
            _ => None,
        }
    }
}

fn normalize(word: &str) -> String {
    word.trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_and_period_insensitive() {
        let titles = TitleTaxonomy::default();
        assert_eq!(titles.classify("Mme"), Some(TitleGender::Female));
        assert_eq!(titles.classify("M."), Some(TitleGender::Male));
        assert_eq!(titles.classify("Dr."), Some(TitleGender::Mixed));
        assert_eq!(titles.classify("Dupont"), None);
    }

    #[test]
    fn test_strip_titles() {
        let titles = TitleTaxonomy::default();
        assert_eq!(titles.strip_titles("Mme Marie Martin"), "Marie Martin");
        assert_eq!(titles.strip_titles("Dr. Jane Smith"), "Jane Smith");
        assert_eq!(titles.strip_titles("Le président"), "Le président");
        assert_eq!(titles.strip_titles("Madame"), "Madame");
    }

    #[test]
    fn test_implied_gender() {
        let titles = TitleTaxonomy::default();
        let set = |words: &[&str]| words.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        assert_eq!(titles.implied_gender(&set(&["mme", "dr"])), Some(TitleGender::Female));
        assert_eq!(titles.implied_gender(&set(&["ministre"])), None);
        assert_eq!(titles.implied_gender(&set(&["mme", "m"])), None);
    }

    #[test]
    fn test_load_custom_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titles.json");
        std::fs::write(&path, r#"{"female": ["Hon"], "mixed": []}"#).unwrap();
        let titles = TitleTaxonomy::load(&path).unwrap();
        assert_eq!(titles.classify("hon."), Some(TitleGender::Female));
        assert_eq!(titles.classify("Mme"), None);
    }
}
