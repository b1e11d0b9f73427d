//! Structured LLM responses and their locale-specific JSON shapes.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{language::Language, visualization::VisualizationGoal};

/// A response type the model must return as JSON. `schema` describes the
/// expected object in the prompt language and is appended to the system prompt.
pub trait ResponseSchema: DeserializeOwned {
    fn schema(language: Language) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationDecision {
    pub should_be_regenerated: bool,
}

impl ResponseSchema for RegenerationDecision {
    fn schema(language: Language) -> &'static str {
        match language {
            Language::En => r#"{"should_be_regenerated": <bool, true only if the output contains errors that make regeneration necessary>}"#,
            Language::De => r#"{"should_be_regenerated": <bool, nur true wenn die Ausgabe Fehler enthält, die eine Neugenerierung erfordern>}"#,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    #[serde(default)]
    pub explanation: String,
    pub code: String,
}

impl ResponseSchema for GeneratedCode {
    fn schema(language: Language) -> &'static str {
        match language {
            Language::En => r#"{"explanation": "<short description of what the script does>", "code": "<the complete script source>"}"#,
            Language::De => r#"{"explanation": "<kurze Beschreibung, was das Skript tut>", "code": "<der vollständige Quelltext des Skripts>"}"#,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalList {
    pub goals: Vec<VisualizationGoal>,
}

impl ResponseSchema for GoalList {
    fn schema(language: Language) -> &'static str {
        match language {
            Language::En => r#"{"goals": [{"index": <int>, "question": "<question about the data>", "visualization": "<chart type>", "rationale": "<why, naming the columns>"}]}"#,
            Language::De => r#"{"goals": [{"index": <int>, "question": "<Frage an die Daten>", "visualization": "<Diagrammtyp>", "rationale": "<Begründung mit Spaltennamen>"}]}"#,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub critic_notes: String,
    #[serde(default)]
    pub suggestions: String,
    pub needs_refactoring: bool,
}

impl ResponseSchema for JudgeVerdict {
    fn schema(language: Language) -> &'static str {
        match language {
            Language::En => r#"{"critic_notes": "<detailed critique>", "suggestions": "<concrete improvements>", "needs_refactoring": <bool>}"#,
            Language::De => r#"{"critic_notes": "<ausführliche Kritik>", "suggestions": "<konkrete Verbesserungen>", "needs_refactoring": <bool>}"#,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub score: u8,
    pub rationale: String,
}

/// LIDA self-evaluation of one visualization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LidaEvaluation {
    pub bugs: Score,
    pub transformation: Score,
    pub compliance: Score,
    #[serde(rename = "type")]
    pub chart_type: Score,
    pub encoding: Score,
    pub aesthetics: Score,
}

impl LidaEvaluation {
    /// Dimension names in response and CSV column order.
    pub const DIMENSIONS: [&'static str; 6] =
        ["bugs", "transformation", "compliance", "type", "encoding", "aesthetics"];

    pub fn scores(&self) -> [(&'static str, &Score); 6] {
        let [bugs, transformation, compliance, chart_type, encoding, aesthetics] = Self::DIMENSIONS;
        [
            (bugs, &self.bugs),
            (transformation, &self.transformation),
            (compliance, &self.compliance),
            (chart_type, &self.chart_type),
            (encoding, &self.encoding),
            (aesthetics, &self.aesthetics),
        ]
    }

    /// Sum over the six dimensions, out of 60.
    pub fn total(&self) -> u32 {
        self.scores().iter().map(|(_, s)| u32::from(s.score)).sum()
    }

    /// Mean score, out of 10.
    pub fn average(&self) -> f64 {
        f64::from(self.total()) / 6.0
    }
}

impl ResponseSchema for LidaEvaluation {
    fn schema(language: Language) -> &'static str {
        match language {
            Language::En => r#"{"bugs": {"score": <1-10>, "rationale": "<why>"}, "transformation": {...}, "compliance": {...}, "type": {...}, "encoding": {...}, "aesthetics": {...}} where every dimension has the same {"score", "rationale"} shape"#,
            Language::De => r#"{"bugs": {"score": <1-10>, "rationale": "<Begründung>"}, "transformation": {...}, "compliance": {...}, "type": {...}, "encoding": {...}, "aesthetics": {...}} wobei jede Dimension dieselbe Form {"score", "rationale"} hat"#,
        }
    }
}
