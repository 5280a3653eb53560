//! Dependency-label adapter.
//!
//! English models emit ClearNLP labels and French models emit Universal
//! Dependencies labels. Extraction code never looks at raw label strings; it
//! asks for a [`Relation`] instead.

use serde::{Deserialize, Serialize};

use super::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Root,
    NominalSubject,
    ClausalComplement,
    OpenComplement,
    Object,
    Preposition,
    PrepositionObject,
    CaseMarker,
    Oblique,
    Apposition,
    FlatName,
    Conjunct,
    Copula,
    Auxiliary,
    Determiner,
    Negation,
    Punctuation,
    Other,
}

impl Relation {
    #[must_use]
    pub fn from_label(language: Language, label: &str) -> Self {
        match language {
            Language::English => Self::from_clear_label(label),
            Language::French => Self::from_ud_label(label),
        }
    }

    fn from_clear_label(label: &str) -> Self {
        match label {
            "ROOT" | "root" => Self::Root,
            "nsubj" | "nsubjpass" | "csubj" | "csubjpass" | "expl" => Self::NominalSubject,
            "ccomp" => Self::ClausalComplement,
            "xcomp" => Self::OpenComplement,
            "dobj" | "obj" | "dative" => Self::Object,
            "prep" => Self::Preposition,
            "pobj" => Self::PrepositionObject,
            "case" => Self::CaseMarker,
            "appos" => Self::Apposition,
            "compound" | "flat" => Self::FlatName,
            "conj" => Self::Conjunct,
            "cop" => Self::Copula,
            "aux" | "auxpass" => Self::Auxiliary,
            "det" | "predet" => Self::Determiner,
            "neg" => Self::Negation,
            "punct" => Self::Punctuation,
            _ => Self::Other,
        }
    }

    fn from_ud_label(label: &str) -> Self {
        let (base, subtype) = label.split_once(':').unwrap_or((label, ""));
        match (base, subtype) {
            ("ROOT" | "root", _) => Self::Root,
            ("nsubj" | "csubj" | "expl", _) => Self::NominalSubject,
            ("ccomp", _) => Self::ClausalComplement,
            ("xcomp", _) => Self::OpenComplement,
            ("obj" | "iobj", _) => Self::Object,
            ("case", _) => Self::CaseMarker,
            ("obl" | "nmod", _) => Self::Oblique,
            ("appos", _) => Self::Apposition,
            ("flat", "name" | "") => Self::FlatName,
            ("conj", _) => Self::Conjunct,
            ("cop", _) => Self::Copula,
            ("aux", _) => Self::Auxiliary,
            ("det", _) => Self::Determiner,
            ("punct", _) => Self::Punctuation,
            _ => Self::Other,
        }
    }
}

/// Universal part-of-speech tags as emitted by both parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Pos {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    Space,
    #[serde(other)]
    X,
}

impl Pos {
    #[must_use]
    pub const fn is_nominal(self) -> bool {
        matches!(self, Self::Noun | Self::Propn | Self::Pron)
    }
}
